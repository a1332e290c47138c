//! Reset client.
//!
//! Sends `RESET\n` and returns the server's response line. Every failure is
//! returned to the caller; nothing here exits the process.

use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Upper bound on the response read.
pub const RESPONSE_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to timer server at {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("timed out talking to timer server at {addr}")]
    Timeout { addr: String },

    #[error("failed to send reset command: {0}")]
    Send(std::io::Error),

    #[error("failed to read response: {0}")]
    Read(std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ResetClient {
    addr: String,
    timeout: Duration,
}

impl ResetClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send the reset command and return the raw response.
    pub async fn reset(&self) -> Result<String, ClientError> {
        tokio::time::timeout(self.timeout, self.exchange())
            .await
            .map_err(|_| ClientError::Timeout {
                addr: self.addr.clone(),
            })?
    }

    async fn exchange(&self) -> Result<String, ClientError> {
        let mut stream = TcpStream::connect(self.addr.as_str())
            .await
            .map_err(|source| ClientError::Connect {
                addr: self.addr.clone(),
                source,
            })?;

        stream
            .write_all(b"RESET\n")
            .await
            .map_err(ClientError::Send)?;

        let mut response = Vec::with_capacity(64);
        (&mut stream)
            .take(RESPONSE_BUFFER_SIZE as u64)
            .read_to_end(&mut response)
            .await
            .map_err(ClientError::Read)?;

        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn sends_reset_and_returns_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            reader
                .get_mut()
                .write_all(b"No timer is running\n")
                .await
                .unwrap();
            line
        });

        let response = ResetClient::new(addr.to_string()).reset().await.unwrap();
        assert_eq!(response, "No timer is running\n");
        assert_eq!(server.await.unwrap(), "RESET\n");
    }

    #[tokio::test]
    async fn connection_refused_is_returned() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = ResetClient::new(addr.to_string()).reset().await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
        assert!(err.to_string().contains(&addr.to_string()));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let err = ResetClient::new(addr.to_string())
            .with_timeout(Duration::from_millis(100))
            .reset()
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout { .. }));
    }
}
