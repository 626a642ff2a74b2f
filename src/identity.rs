//! Person identity validation.
//!
//! Confirming that the researched name belongs to the intended individual
//! (registry lookups, document numbers) needs external datasets this crate
//! does not have. The stage is kept as an interface so such a source can be
//! plugged in. The default implementation reports that nothing was checked
//! instead of accepting or rejecting names on its own.

use crate::models::{IdentityStatus, VerifiedNewsItem};
use tracing::debug;

/// Validates that the researched person is who the analyst means.
pub trait IdentityValidator {
    async fn validate(&self, person_name: &str, news: &[VerifiedNewsItem]) -> IdentityStatus;
}

/// Validator used until a real data source is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UncheckedIdentity;

impl IdentityValidator for UncheckedIdentity {
    async fn validate(&self, person_name: &str, news: &[VerifiedNewsItem]) -> IdentityStatus {
        debug!(person = %person_name, news = news.len(), "No identity source configured");
        IdentityStatus::Unchecked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unchecked_does_not_special_case_names() {
        for name in ["João Silva", "Maria Souza"] {
            assert_eq!(
                UncheckedIdentity.validate(name, &[]).await,
                IdentityStatus::Unchecked
            );
        }
    }
}
