//! HTTP feed source.

use icsmirror_core::{FeedSource, FetchError};

pub struct HttpFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: impl Into<String>) -> Self {
        HttpFeed {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl FeedSource for HttpFeed {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        log::info!("Downloading {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(body.to_vec())
    }
}
