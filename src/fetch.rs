use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("reguscape/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u128 },
    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    #[cfg(test)]
    fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "text/html,application/xhtml+xml")
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            Ok::<String, FetchError>(response.text().await?)
        };

        // Dropping the request future on expiry cancels the in-flight fetch.
        let body = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis(),
            })??;

        debug!(url = %url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn local_fetcher() -> HttpFetcher {
        HttpFetcher::with_client(reqwest::Client::builder().no_proxy().build().unwrap())
    }

    /// Answers the first connection with `response`, after reading the request head.
    async fn serve_once(response: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = [0u8; 4096];
            let _ = socket.read(&mut buffer).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        addr
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let url = format!("http://{addr}/search");
        let err = local_fetcher()
            .fetch_text(&url, Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::Timeout { ref url, timeout_ms: 50 } if url.ends_with("/search")
        ));
        server.abort();
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let addr =
            serve_once("HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n").await;

        let url = format!("http://{addr}/plan/1");
        let err = local_fetcher()
            .fetch_text(&url, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert_eq!(err.to_string(), format!("{url} returned 503"));
    }

    #[tokio::test]
    async fn success_returns_body_text() {
        let addr = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 13\r\nconnection: close\r\n\r\n<p>plans</p>\n",
        )
        .await;

        let body = local_fetcher()
            .fetch_text(&format!("http://{addr}/"), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(body, "<p>plans</p>\n");
    }
}
