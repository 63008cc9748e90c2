use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::Fetcher;
use crate::error::FetchError;
use crate::storage::RemoteItem;

/// Wire form of one pinned item as served by the snapshot endpoint.
#[derive(Debug, Deserialize)]
struct WireItem {
    id: i64,
    #[serde(default)]
    text: String,
    pinned_at: DateTime<Utc>,
    #[serde(default)]
    photo_url: Option<String>,
}

/// Fetcher that pulls the snapshot from an HTTP endpoint serving a JSON
/// array of pinned items.
///
/// Photo attachments are downloaded concurrently once the item list is
/// known, and a failed download fails the whole fetch: the reconciler
/// only ever sees a complete snapshot.
pub struct HttpFetcher {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpFetcher {
    pub fn new(endpoint: Url, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            token,
        }
    }

    async fn fetch_snapshot(&self) -> Result<Vec<RemoteItem>, FetchError> {
        let mut request = self.client.get(self.endpoint.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        let items: Vec<WireItem> = serde_json::from_str(&body)?;
        debug!(count = items.len(), "snapshot listed");

        let attachments = join_all(items.iter().map(|item| self.fetch_attachment(item))).await;

        let mut snapshot = Vec::with_capacity(items.len());
        for (item, attachment) in items.into_iter().zip(attachments) {
            snapshot.push(RemoteItem {
                remote_id: item.id,
                text: item.text,
                pinned_at: item.pinned_at,
                attachment: attachment?,
            });
        }
        snapshot.sort_by_key(|item| item.remote_id);
        Ok(snapshot)
    }

    async fn fetch_attachment(&self, item: &WireItem) -> Result<Option<Vec<u8>>, FetchError> {
        let Some(raw) = item.photo_url.as_deref() else {
            return Ok(None);
        };
        let target = self
            .endpoint
            .join(raw)
            .map_err(|e| FetchError::Remote(format!("attachment url {raw:?}: {e}")))?;
        let response = self.client.get(target).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let bytes = response.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteItem>, FetchError>> + Send + '_>> {
        Box::pin(self.fetch_snapshot())
    }
}
