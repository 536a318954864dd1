//! Source of the remote calendar feed.

use crate::error::FetchError;

/// Produces the raw bytes of the upstream calendar on demand.
#[allow(async_fn_in_trait)]
pub trait FeedSource {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}
