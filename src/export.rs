//! History export into the web-accessible static directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::history::HistoryLog;

// ---

pub const EXPORT_FILE: &str = "beer_keg_history.json";

/// Public link to the exported file.
pub const EXPORT_URL: &str = "/local/beer_keg_history.json";

/// Write the history as pretty-printed JSON; returns the written path.
pub async fn write_history(static_dir: &Path, history: &HistoryLog) -> Result<PathBuf> {
    // ---
    let path = static_dir.join(EXPORT_FILE);
    let body = serde_json::to_string_pretty(&history.to_value())?;

    tokio::fs::create_dir_all(static_dir)
        .await
        .with_context(|| format!("Failed to create {}", static_dir.display()))?;
    tokio::fs::write(&path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!("Exported {} pour records to {}", history.len(), path.display());
    Ok(path)
}

/// Contents of the last export, if one exists.
pub async fn read_export(static_dir: &Path) -> Result<Option<String>> {
    // ---
    match tokio::fs::read_to_string(static_dir.join(EXPORT_FILE)).await {
        Ok(body) => Ok(Some(body)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context("Failed to read history export"),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::PourHistoryEntry;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_export_writes_pretty_json() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("www");

        let mut history = HistoryLog::new(500);
        history.append(PourHistoryEntry {
            timestamp: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
            keg: "k1".to_string(),
            pour_oz: 12.0,
            weight_before: 15.0,
            weight_after: 14.66,
            temperature: Some(4.0),
        });

        let path = write_history(&static_dir, &history).await.unwrap();
        assert_eq!(path, static_dir.join(EXPORT_FILE));

        let body = read_export(&static_dir).await.unwrap().unwrap();
        assert!(body.starts_with("[\n  {"));
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, history.to_value());
    }

    #[tokio::test]
    async fn test_missing_export_is_none() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_export(dir.path()).await.unwrap(), None);
    }
}
