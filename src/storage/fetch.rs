use super::{ResourceFetcher, StorageError};
use std::io;
use std::time::Duration;

/// Fetches `file://` URLs from disk and `http(s)://` URLs over the network.
pub struct DefaultFetcher {
    client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new(timeout: Duration) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("folio-media/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl ResourceFetcher for DefaultFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        if let Some(path) = url.strip_prefix("file://") {
            return match tokio::fs::read(path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(StorageError::NotFound(url.to_string()))
                }
                Err(e) => Err(e.into()),
            };
        }

        if url.starts_with("http://") || url.starts_with("https://") {
            log::debug!("fetching {url}");
            let response = self.client.get(url).send().await?.error_for_status()?;
            let bytes = response.bytes().await?;
            return Ok(bytes.to_vec());
        }

        Err(StorageError::Rejected(format!("unsupported URL scheme: {url}")))
    }
}
