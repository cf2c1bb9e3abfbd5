//! HTTP segment fetcher.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::config::DownloadConfig;
use super::error::DownloadError;
use super::traits::SegmentFetcher;

/// Streams segments over unauthenticated HTTP GET.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher using the request timeout and user agent from `config`.
    pub fn new(config: &DownloadConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DownloadError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SegmentFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|e| DownloadError::invalid_url(url, e.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DownloadError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let expected = response.content_length();
        let mut file = File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::transport(url, e))?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        if let Some(expected) = expected {
            if received != expected {
                return Err(DownloadError::Incomplete { expected, received });
            }
        }

        debug!(url = url, bytes = received, "Segment stream completed");
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::DownloadTask;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serves one canned raw HTTP response per connection.
    async fn serve_raw(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let response = response.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let mut request = Vec::new();
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let _ = socket.write_all(&response).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    fn ok_response(body: &[u8]) -> Vec<u8> {
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        response
    }

    #[tokio::test]
    async fn test_fetch_writes_full_body() {
        let base = serve_raw(ok_response(b"ID3-audio-bytes")).await;
        let dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(&DownloadConfig::default()).unwrap();

        let mut task = DownloadTask::new(0, format!("{}/clip.mp3", base), &dir.path().join("downloads"));
        task.fetch(&fetcher).await.unwrap();

        assert!(task.succeeded);
        assert_eq!(task.bytes_written, 15);
        let contents = tokio::fs::read(&task.destination_path).await.unwrap();
        assert_eq!(contents, b"ID3-audio-bytes");
    }

    #[tokio::test]
    async fn test_fetch_not_found_fails() {
        let base = serve_raw(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
        )
        .await;
        let dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(&DownloadConfig::default()).unwrap();

        let mut task = DownloadTask::new(0, format!("{}/missing.mp3", base), dir.path());
        let err = task.fetch(&fetcher).await.unwrap_err();

        assert!(matches!(err, DownloadError::HttpStatus { status: 404, .. }));
        assert!(!task.succeeded);
        assert!(task.error.is_some());
        assert!(!task.destination_path.exists());
    }

    #[tokio::test]
    async fn test_fetch_truncated_body_fails() {
        let mut response =
            b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(b"only-a-few-bytes");
        let base = serve_raw(response).await;
        let dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(&DownloadConfig::default()).unwrap();

        let mut task = DownloadTask::new(0, format!("{}/cut.mp3", base), dir.path());
        assert!(task.fetch(&fetcher).await.is_err());
        assert!(!task.succeeded);
        assert!(!task.destination_path.exists());
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let dir = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(&DownloadConfig::default()).unwrap();

        let mut task = DownloadTask::new(0, "::not-a-url::", dir.path());
        let err = task.fetch(&fetcher).await.unwrap_err();
        assert!(matches!(err, DownloadError::InvalidUrl { .. }));
    }
}
