use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::instrument;

use super::{PageFetcher, UpstreamError, http_client, read_success_body};

const WEBSITE: &str = "website";

/// Plain GET of a page's markup.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    http: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, url: &str) -> Result<String, UpstreamError> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(UpstreamError::transport(WEBSITE))?;
        read_success_body(WEBSITE, res).await
    }
}
