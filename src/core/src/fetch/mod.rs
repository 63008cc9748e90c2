mod http;

pub use http::HttpFetcher;

use std::future::Future;
use std::pin::Pin;

use crate::error::FetchError;
use crate::storage::RemoteItem;

/// Supplies the full current snapshot of pinned items.
///
/// The returned snapshot must be fully materialized: every attachment has
/// been collected before the reconciler sees the list. An empty snapshot
/// is valid and means nothing is currently pinned.
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteItem>, FetchError>> + Send + '_>>;
}
