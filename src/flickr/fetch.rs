//! Streams original photo files from the Flickr CDN to disk.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use flickr_cli_core::contract::BinaryFetcher;
use flickr_cli_core::error::TransferError;

pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    /// Share the connection pool of an existing client.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl BinaryFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, TransferError> {
        let transport = |e: reqwest::Error| TransferError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };
        let io = |source: std::io::Error| TransferError::Io {
            path: dest.to_path_buf(),
            source,
        };

        let response = self.http.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            tracing::error!(url, status = %status, "Download returned non-success status");
            return Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await.map_err(io)?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport)?;
            file.write_all(&chunk).await.map_err(io)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io)?;
        tracing::debug!(url, bytes = written, path = %dest.display(), "Downloaded file");
        Ok(written)
    }
}
