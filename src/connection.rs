use crate::error::{AnthemError, Result};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Address of a receiver's control port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Limits applied to a single exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeLimits {
    pub connect_timeout: Duration,
    /// Bounds both the write and the wait for the first reply bytes
    pub io_timeout: Duration,
    /// Size of the single read performed for the reply
    pub max_response_bytes: usize,
}

/// Send one command and read one reply
///
/// A fresh connection is opened for every call and dropped before
/// returning, whatever the outcome. The reply is whatever a single read
/// returns (at most `max_response_bytes`), decoded as UTF-8 with trailing
/// whitespace removed; the receiver protocol has no framing beyond the `;`
/// delimiter, so a short read is returned as-is.
pub async fn exchange(endpoint: &Endpoint, payload: &str, limits: &ExchangeLimits) -> Result<String> {
    tracing::debug!("Connecting to {}", endpoint);

    let mut stream = match timeout(
        limits.connect_timeout,
        TcpStream::connect((endpoint.host.as_str(), endpoint.port)),
    )
    .await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(connect_error(endpoint, e)),
        Err(_) => {
            let e = std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connect timed out after {:?}", limits.connect_timeout),
            );
            return Err(connect_error(endpoint, e));
        }
    };

    if let Err(e) = stream.set_nodelay(true) {
        tracing::warn!("Failed to set TCP_NODELAY on {}: {}", endpoint, e);
    }

    tracing::debug!("Sending {:?} to {}", payload, endpoint);
    let send = async {
        stream.write_all(payload.as_bytes()).await?;
        stream.flush().await
    };
    match timeout(limits.io_timeout, send).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(send_error(endpoint, e)),
        Err(_) => {
            let e = std::io::Error::new(std::io::ErrorKind::TimedOut, "write timed out");
            return Err(send_error(endpoint, e));
        }
    }

    let mut buf = vec![0u8; limits.max_response_bytes];
    let n = match timeout(limits.io_timeout, stream.read(&mut buf)).await {
        Ok(Ok(0)) => {
            tracing::warn!("{} closed the connection without replying", endpoint);
            return Err(AnthemError::ConnectionClosed);
        }
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            tracing::warn!("Failed to read from {}: {}", endpoint, e);
            return Err(AnthemError::Io(e));
        }
        Err(_) => {
            tracing::warn!(
                "Timeout ({:?}) waiting for a response after sending {:?} to {}",
                limits.io_timeout,
                payload,
                endpoint
            );
            return Err(AnthemError::ResponseTimeout {
                host: endpoint.host.clone(),
                port: endpoint.port,
                timeout: limits.io_timeout,
            });
        }
    };

    let response = String::from_utf8_lossy(&buf[..n]).trim_end().to_string();
    tracing::debug!("Response from {}: {:?}", endpoint, response);
    Ok(response)
}

fn connect_error(endpoint: &Endpoint, source: std::io::Error) -> AnthemError {
    tracing::warn!("Unable to connect to {}: {}", endpoint, source);
    AnthemError::ConnectError {
        host: endpoint.host.clone(),
        port: endpoint.port,
        source,
    }
}

fn send_error(endpoint: &Endpoint, source: std::io::Error) -> AnthemError {
    tracing::warn!("Unable to send payload to {}: {}", endpoint, source);
    AnthemError::SendError {
        host: endpoint.host.clone(),
        port: endpoint.port,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn limits(io_timeout: Duration) -> ExchangeLimits {
        ExchangeLimits {
            connect_timeout: Duration::from_secs(2),
            io_timeout,
            max_response_bytes: 1024,
        }
    }

    async fn test_listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, Endpoint::new("127.0.0.1", port))
    }

    #[tokio::test]
    async fn exchange_returns_trimmed_reply() {
        let (listener, endpoint) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = stream.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"P1?;");
            stream.write_all(b"P1S3V-40M0D2\r\n").await.unwrap();
        });

        let reply = exchange(&endpoint, "P1?;", &limits(Duration::from_secs(2)))
            .await
            .unwrap();
        assert_eq!(reply, "P1S3V-40M0D2");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn short_reply_is_returned_as_is() {
        let (listener, endpoint) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = stream.read(&mut buf).await.unwrap();
            stream.write_all(b"P1S3V-40M0D2").await.unwrap();
        });

        let mut limits = limits(Duration::from_secs(2));
        limits.max_response_bytes = 4;
        let reply = exchange(&endpoint, "P1?;", &limits).await.unwrap();
        assert_eq!(reply, "P1S3");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn silence_is_a_response_timeout() {
        let (listener, endpoint) = test_listener().await;

        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let result = exchange(&endpoint, "P2?;", &limits(Duration::from_millis(100))).await;
        match result {
            Err(AnthemError::ResponseTimeout { port, timeout, .. }) => {
                assert_eq!(port, endpoint.port);
                assert_eq!(timeout, Duration::from_millis(100));
            }
            other => panic!("expected ResponseTimeout, got {:?}", other),
        }
        server.abort();
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        let (listener, endpoint) = test_listener().await;
        drop(listener);

        let result = exchange(&endpoint, "P1?;", &limits(Duration::from_secs(1))).await;
        match result {
            Err(AnthemError::ConnectError { host, port, .. }) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, endpoint.port);
            }
            other => panic!("expected ConnectError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn closed_without_reply() {
        let (listener, endpoint) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = stream.read(&mut buf).await.unwrap();
        });

        let result = exchange(&endpoint, "P1?;", &limits(Duration::from_secs(2))).await;
        assert!(
            matches!(result, Err(AnthemError::ConnectionClosed)),
            "expected ConnectionClosed, got {:?}",
            result
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn each_exchange_uses_a_new_connection() {
        let (listener, endpoint) = test_listener().await;

        let server = tokio::spawn(async move {
            for reply in [b"P1P1" as &[u8], b"P1P0"] {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 64];
                let _ = stream.read(&mut buf).await.unwrap();
                stream.write_all(reply).await.unwrap();
            }
        });

        let limits = limits(Duration::from_secs(2));
        assert_eq!(exchange(&endpoint, "P1P?;", &limits).await.unwrap(), "P1P1");
        assert_eq!(exchange(&endpoint, "P1P?;", &limits).await.unwrap(), "P1P0");
        server.await.unwrap();
    }
}
