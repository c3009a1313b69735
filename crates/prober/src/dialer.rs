use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};

/// Why a connect attempt produced no sample.
#[derive(Debug, Error)]
pub enum DialError {
    /// The handshake did not finish within the connect timeout.
    #[error("connection timed out")]
    Timeout,

    /// The OS rejected the connection (refused, unreachable, DNS failure, ...).
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Opens a connection and reports how long the handshake took.
#[async_trait]
pub trait Dialer: Clone + Send + Sync + 'static {
    /// Connects to `host:port`, closing the connection as soon as it is
    /// established, and returns the elapsed time.
    async fn dial(&self, host: &str, port: u16, limit: Duration) -> Result<Duration, DialError>;
}

/// TCP connect-handshake dialer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, host: &str, port: u16, limit: Duration) -> Result<Duration, DialError> {
        let start = Instant::now();
        let stream = timeout(limit, TcpStream::connect((host, port)))
            .await
            .map_err(|_| DialError::Timeout)??;
        let elapsed = start.elapsed();

        drop(stream);

        Ok(elapsed)
    }
}
