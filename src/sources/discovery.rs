//! REST discovery of kegs on the device.

use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use super::extract_records;
use crate::models::RawKegRecord;

// ---

/// Derive the REST base (`scheme://host[:port]`) from the stream URL.
///
/// `ws` maps to `http`, `wss` to `https`, anything else to `http`.
pub fn rest_base_url(stream_url: &str) -> Result<String> {
    // ---
    let url = Url::parse(stream_url)?;
    let scheme = match url.scheme() {
        "wss" => "https",
        _ => "http",
    };
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("stream URL '{}' has no host", stream_url))?;

    Ok(match url.port() {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    })
}

#[derive(Debug, Clone)]
pub struct KegApiClient {
    client: Client,
    base_url: String,
}

impl KegApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // ---
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_stream_url(stream_url: &str) -> Result<Self> {
        Self::new(rest_base_url(stream_url)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn candidate_urls(&self) -> [String; 2] {
        [
            format!("{}/api/kegs", self.base_url),
            format!("{}/api/kegs/", self.base_url),
        ]
    }

    /// Fetch the keg list, trying each candidate URL in turn.
    ///
    /// Any failure moves on to the next URL; when all fail the result is
    /// empty rather than an error.
    pub async fn fetch_kegs(&self) -> Vec<RawKegRecord> {
        // ---
        for url in self.candidate_urls() {
            match self.fetch_from(&url).await {
                Ok(Some(records)) => {
                    tracing::debug!("Fetched {} kegs from {}", records.len(), url);
                    return records;
                }
                Ok(None) => tracing::debug!("Unrecognized keg payload from {}", url),
                Err(e) => tracing::warn!("REST GET {} failed: {}", url, e),
            }
        }
        Vec::new()
    }

    async fn fetch_from(&self, url: &str) -> Result<Option<Vec<RawKegRecord>>> {
        // ---
        let response = self.client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(anyhow!("status {}", response.status()));
        }
        let payload: Value = response.json().await?;
        Ok(extract_records(&payload))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use mockito::Server;
    use serde_json::json;

    #[test]
    fn test_rest_base_url() {
        // ---
        assert_eq!(
            rest_base_url("ws://192.168.1.40:8080/ws").unwrap(),
            "http://192.168.1.40:8080"
        );
        assert_eq!(
            rest_base_url("wss://kegs.example.com/live?x=1").unwrap(),
            "https://kegs.example.com"
        );
        assert_eq!(
            rest_base_url("http://kegs.local/stream").unwrap(),
            "http://kegs.local"
        );
        assert!(rest_base_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_fetch_bare_array() {
        // ---
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/kegs")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{"id": "k1", "weight": 18.0}, {"id": "k2"}]).to_string())
            .create_async()
            .await;

        let client = KegApiClient::new(server.url()).unwrap();
        let records = client.fetch_kegs().await;

        assert_eq!(records.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_trailing_slash() {
        // ---
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/api/kegs")
            .with_status(404)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/kegs/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"kegs": [{"id": "Keg One", "weight": "12.5"}]}).to_string())
            .create_async()
            .await;

        let client = KegApiClient::new(server.url()).unwrap();
        let records = client.fetch_kegs().await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].to_normalized().keg_id, "keg_one");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_body_tries_next_url() {
        // ---
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/kegs")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;
        server
            .mock("GET", "/api/kegs/")
            .with_status(200)
            .with_body(json!([{"id": "k1"}]).to_string())
            .create_async()
            .await;

        let client = KegApiClient::new(server.url()).unwrap();
        assert_eq!(client.fetch_kegs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_complete_failure_is_empty() {
        // ---
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/kegs")
            .with_status(500)
            .create_async()
            .await;
        server
            .mock("GET", "/api/kegs/")
            .with_status(200)
            .with_body(json!({"status": "ok"}).to_string())
            .create_async()
            .await;

        let client = KegApiClient::new(server.url()).unwrap();
        assert!(client.fetch_kegs().await.is_empty());
    }
}
