//! `http://` and `https://` sources.

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::trace;

use super::{FetchError, Getter, Request};

/// Downloads a URL with a plain GET request.
#[derive(Debug, Clone, Default)]
pub struct HttpGetter {
    client: Client,
}

impl HttpGetter {
    /// Create a getter with a default client (no timeout).
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a getter around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Getter for HttpGetter {
    async fn get_file(&self, request: &Request) -> Result<(), FetchError> {
        let url = request.source.to_string();
        let http_error = |source| FetchError::Http {
            url: url.clone(),
            source,
        };

        let mut response = self
            .client
            .get(request.source.clone())
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(&request.destination)
            .await
            .map_err(|e| FetchError::io(&request.destination, e))?;

        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await.map_err(http_error)? {
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::io(&request.destination, e))?;
            written += chunk.len();
        }
        file.flush()
            .await
            .map_err(|e| FetchError::io(&request.destination, e))?;

        trace!(url = %url, bytes = written, "Download complete");
        Ok(())
    }
}
