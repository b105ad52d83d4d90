//! Google Cloud Storage client over the JSON API.
//!
//! Uses plain HTTPS (`storage.googleapis.com`) with an optional OAuth bearer
//! token; public buckets work without one. Only the two operations the
//! pipeline needs are implemented: media download and prefix listing.

use super::{ObjectStore, StoreError};
use serde::Deserialize;
use std::time::Duration;

const API_BASE: &str = "https://storage.googleapis.com/storage/v1";

/// Response shape of the objects.list endpoint.
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListedObject>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
}

/// GCS-backed object store for a single bucket.
pub struct GcsStore {
    client: reqwest::blocking::Client,
    bucket: String,
    token: Option<String>,
}

impl GcsStore {
    pub fn new(bucket: impl Into<String>, token: Option<String>) -> Result<GcsStore, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(GcsStore {
            client,
            bucket: bucket.into(),
            token,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn media_url(&self, key: &str) -> String {
        // Sales keys are date-stamped ASCII names, no path separators to escape.
        format!("{API_BASE}/b/{}/o/{key}?alt=media", self.bucket)
    }

    fn with_auth(
        &self,
        req: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

impl ObjectStore for GcsStore {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.media_url(key);
        let resp = self
            .with_auth(self.client.get(&url))
            .send()
            .map_err(|e| StoreError::Transport {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        }
        if !resp.status().is_success() {
            return Err(StoreError::Transport {
                key: key.to_string(),
                reason: format!("HTTP {}", resp.status()),
            });
        }

        let bytes = resp.bytes().map_err(|e| StoreError::Transport {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{API_BASE}/b/{}/o?prefix={prefix}", self.bucket);
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={token}"));
            }

            let resp = self
                .with_auth(self.client.get(&url))
                .send()
                .map_err(|e| StoreError::List(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(StoreError::List(format!("HTTP {}", resp.status())));
            }

            let page: ListResponse = resp
                .json()
                .map_err(|e| StoreError::List(format!("response parse: {e}")))?;

            names.extend(page.items.into_iter().map(|o| o.name));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(names)
    }
}
