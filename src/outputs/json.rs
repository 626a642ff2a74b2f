//! JSON output of a researched dossier.
//!
//! The document is pretty-printed UTF-8 with non-ASCII characters left
//! unescaped, so names like "João" stay readable in the file.

use crate::models::Dossier;
use crate::utils::ensure_parent_dir;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Write a [`Dossier`] to `path`, creating the parent directory if needed.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn write_dossier(dossier: &Dossier, path: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(dossier)?;

    ensure_parent_dir(path).await?;
    fs::write(path, json).await?;
    info!(news = dossier.news.len(), "Wrote dossier JSON");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchResult, IdentityStatus, ScoredNewsItem, VerifiedNewsItem};
    use chrono::Local;

    #[tokio::test]
    async fn test_write_dossier_keeps_non_ascii() {
        let now = Local::now();
        let item = VerifiedNewsItem {
            title: "João Silva é investigado por corrupção".to_string(),
            link: "https://news.example/1".to_string(),
            snippet: "Operação da PF".to_string(),
            published_date: "3 dias atrás".to_string(),
            source_query: "\"João Silva\" corrupção".to_string(),
        };
        let dossier = Dossier {
            person_name: "João Silva".to_string(),
            identity_status: IdentityStatus::Unchecked,
            batch: BatchResult {
                start_timestamp: now,
                end_timestamp: now,
                duration_seconds: 1.25,
                news_results: vec![item.clone()],
                failed_urls: vec!["https://news.example/2".to_string()],
            },
            news: vec![ScoredNewsItem {
                item,
                relevance_score: Some("8".to_string()),
            }],
        };

        let dir = std::env::temp_dir().join(format!("kyc_news_dossier_json_{}", std::process::id()));
        let path = dir.join("resultado.json");
        write_dossier(&dossier, &path).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("João Silva é investigado por corrupção"));
        assert!(!written.contains("\\u00e3"));
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["news"][0]["relevance_score"], "8");
        assert_eq!(parsed["batch"]["failed_urls"][0], "https://news.example/2");
        assert_eq!(parsed["identity_status"], "unchecked");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
