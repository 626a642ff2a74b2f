//! Error kinds surfaced by the research pipeline.
//!
//! Only [`ResearchError::Configuration`] is ever fatal. Transport and parse
//! failures are absorbed where they happen: a failed search query contributes
//! nothing to the batch, and a failed page fetch counts as "not the main
//! subject".

use thiserror::Error;

/// Failure raised by a pipeline collaborator.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Network, DNS, timeout or non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed JSON from the search provider or an undecodable page body.
    #[error("parse error: {0}")]
    Parse(String),

    /// Missing credential or unusable configuration file.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for ResearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ResearchError::Parse(e.to_string())
        } else {
            ResearchError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ResearchError {
    fn from(e: serde_json::Error) -> Self {
        ResearchError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let e = ResearchError::Configuration("SERPER_API_KEY is not set".to_string());
        assert_eq!(e.to_string(), "configuration error: SERPER_API_KEY is not set");
    }

    #[test]
    fn test_json_error_maps_to_parse() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(ResearchError::from(err), ResearchError::Parse(_)));
    }
}
