//! Output generation for researched dossiers.
//!
//! # Submodules
//!
//! - [`json`]: Writes a [`crate::models::Dossier`] to a UTF-8 JSON file

pub mod json;
