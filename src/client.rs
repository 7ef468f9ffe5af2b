//! MLLP client: one framed request, one framed response.

use std::time::Duration;

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use crate::config::EndpointConfig;
use crate::error::{MllpError, TransportError};
use crate::mllp::MllpCodec;

/// Sends encoded messages to a single remote endpoint.
///
/// Each call opens its own connection, so one client can be shared freely. Nothing is retried.
#[derive(Debug, Clone)]
pub struct MllpClient {
    host: String,
    port: u16,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl MllpClient {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout,
            response_timeout,
        }
    }

    pub fn from_config(config: &EndpointConfig) -> Self {
        Self::new(
            config.host.clone(),
            config.port,
            config.connect_timeout(),
            config.response_timeout(),
        )
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Sends `encoded` wrapped in MLLP framing and waits for the reply frame.
    ///
    /// Returns the reply with its framing removed. The wait covers both writing the request
    /// and reading the whole response, and is bounded by the response timeout. The connection
    /// is closed before this returns, whatever the outcome.
    pub async fn send_and_receive(&self, encoded: &str) -> Result<String, TransportError> {
        let endpoint = self.endpoint();

        debug!("Connecting to {}", endpoint);
        let stream = timeout(
            self.connect_timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout {
            endpoint: endpoint.clone(),
            stage: "connect",
            after: self.connect_timeout,
        })?
        .map_err(|source| TransportError::Connection {
            endpoint: endpoint.clone(),
            source,
        })?;

        let mut transport = Framed::new(stream, MllpCodec::new());

        let exchange = async {
            transport.send(BytesMut::from(encoded)).await?;
            info!("Message sent to {}, awaiting acknowledgment...", endpoint);
            transport.next().await.transpose()
        };

        let frame = match timeout(self.response_timeout, exchange).await {
            Err(_) => {
                return Err(TransportError::Timeout {
                    endpoint,
                    stage: "response",
                    after: self.response_timeout,
                })
            }
            Ok(Err(e)) => return Err(codec_error(endpoint, e)),
            Ok(Ok(None)) => return Err(TransportError::ConnectionClosed { endpoint }),
            Ok(Ok(Some(frame))) => frame,
        };

        debug!("Received {} byte response from {}", frame.len(), endpoint);
        String::from_utf8(frame.to_vec()).map_err(|e| TransportError::Framing {
            endpoint,
            reason: format!("response is not valid UTF-8: {}", e),
        })
    }
}

fn codec_error(endpoint: String, error: MllpError) -> TransportError {
    match error {
        MllpError::Io(source) => TransportError::Connection { endpoint, source },
        MllpError::Framing(reason) => TransportError::Framing { endpoint, reason },
    }
}
