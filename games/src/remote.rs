//! Monthly game archives from the chess.com public API.

use crate::model::{Game, MonthlyArchive};
use std::future::Future;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.chess.com";
const USER_AGENT: &str = concat!("chess-analyser/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("No games found for {0}")]
    NotFound(String),
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
    #[error("Could not decode games: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Transport failures, server errors and rate limiting may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status(code) => *code >= 500 || *code == 429,
            Self::NotFound(_) | Self::Decode(_) | Self::InvalidRequest(_) => false,
        }
    }
}

/// Somewhere a player's finished games can be fetched from.
pub trait RemoteGameSource: Send + Sync {
    /// Games `username` finished in the given calendar month.
    fn fetch_games(
        &self,
        username: &str,
        year: i32,
        month: u32,
    ) -> impl Future<Output = Result<Vec<Game>, FetchError>> + Send;
}

pub struct ChessComClient {
    client: reqwest::Client,
    base_url: String,
    retries: u32,
    backoff: Duration,
}

impl ChessComClient {
    /// Client for the public API, retrying failed requests up to `retries` times.
    pub fn new(retries: u32) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, DEFAULT_BASE_URL, retries))
    }

    /// Client against another host, e.g. a local test server.
    pub fn with_client(client: reqwest::Client, base_url: &str, retries: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retries,
            backoff: RETRY_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn archive_url(&self, username: &str, year: i32, month: u32) -> String {
        format!(
            "{}/pub/player/{}/games/{}/{:02}",
            self.base_url, username, year, month
        )
    }

    async fn fetch_once(&self, url: &str, username: &str) -> Result<Vec<Game>, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(username.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        let archive: MonthlyArchive = serde_json::from_str(&body)?;
        Ok(archive.games)
    }
}

impl RemoteGameSource for ChessComClient {
    #[tracing::instrument(level = "info", skip(self))]
    async fn fetch_games(
        &self,
        username: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<Game>, FetchError> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Err(FetchError::InvalidRequest("empty username".to_string()));
        }
        if !(1..=12).contains(&month) {
            return Err(FetchError::InvalidRequest(format!("month {} out of range", month)));
        }

        let url = self.archive_url(&username, year, month);
        let mut attempt = 0;
        loop {
            match self.fetch_once(&url, &username).await {
                Ok(games) => {
                    tracing::info!(count = games.len(), "Fetched games");
                    return Ok(games);
                }
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "Fetch failed, retrying: {}", e);
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => {
                    tracing::error!("Fetch failed: {}", e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const FIXTURE: &str = include_str!("../tests/fixtures/chesscom_archive.json");

    /// Serve one canned response per connection, in order, repeating the last.
    async fn serve(responses: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[n.min(responses.len() - 1)].clone();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let reply = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn client(base_url: &str, retries: u32) -> ChessComClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        ChessComClient::with_client(http, base_url, retries).with_backoff(Duration::from_millis(1))
    }

    #[test]
    fn test_archive_url() {
        let c = client(DEFAULT_BASE_URL, 0);
        assert_eq!(
            c.archive_url("hikaru", 2024, 3),
            "https://api.chess.com/pub/player/hikaru/games/2024/03"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(FetchError::Status(503).is_retryable());
        assert!(FetchError::Status(429).is_retryable());
        assert!(!FetchError::Status(403).is_retryable());
        assert!(!FetchError::NotFound("x".into()).is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_decodes_games() {
        let (url, hits) = serve(vec![(200, FIXTURE.to_string())]).await;
        let games = client(&url, 0).fetch_games("Alice", 2024, 3).await.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].white.username, "alice");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let (url, hits) = serve(vec![(404, "{}".to_string())]).await;
        let err = client(&url, 3).fetch_games("ghost", 2024, 3).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(ref u) if u == "ghost"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let (url, hits) = serve(vec![
            (503, "{}".to_string()),
            (500, "{}".to_string()),
            (200, FIXTURE.to_string()),
        ])
        .await;
        let games = client(&url, 3).fetch_games("alice", 2024, 3).await.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let (url, hits) = serve(vec![(502, "{}".to_string())]).await;
        let err = client(&url, 2).fetch_games("alice", 2024, 3).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(502)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_bad_body_is_decode_error() {
        let (url, _) = serve(vec![(200, "<html>".to_string())]).await;
        let err = client(&url, 3).fetch_games("alice", 2024, 3).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_rejects_invalid_period() {
        let c = client("http://127.0.0.1:9", 0);
        assert!(matches!(
            c.fetch_games("alice", 2024, 13).await,
            Err(FetchError::InvalidRequest(_))
        ));
        assert!(matches!(
            c.fetch_games("  ", 2024, 1).await,
            Err(FetchError::InvalidRequest(_))
        ));
    }
}
