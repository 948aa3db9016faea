use crate::ring::NodeAddress;
use crate::transport::sender::{MessageSender, SendError};
use crate::wire::Message;
use bytes::Bytes;
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::time::{self, Duration};
use tokio_util::codec::{FramedWrite, LengthDelimitedCodec};

#[derive(Clone, Debug)]
pub(crate) struct ConnectOptions {
    pub(crate) max_attempts: u32,
    pub(crate) retry_interval: Duration,
    pub(crate) connect_timeout: Duration,
    // Pacing delay after each send. Consecutive messages from one handler go out on separate
    // connections and are handled by separate tasks, so this keeps them from overtaking each other.
    pub(crate) post_send_pause: Duration,
}

/// TcpMessageSender opens a fresh connection per message, writes one length-delimited frame, and
/// closes it.
pub(crate) struct TcpMessageSender {
    logger: slog::Logger,
    options: ConnectOptions,
}

impl TcpMessageSender {
    pub(crate) fn new(logger: slog::Logger, options: ConnectOptions) -> Self {
        TcpMessageSender { logger, options }
    }

    async fn connect_with_retry(&self, to: &NodeAddress) -> Result<TcpStream, SendError> {
        let max_attempts = self.options.max_attempts;

        for attempt in 1..=max_attempts {
            let connect = TcpStream::connect((to.ip.as_str(), to.port));
            match time::timeout(self.options.connect_timeout, connect).await {
                Ok(Ok(stream)) => return Ok(stream),
                Ok(Err(e)) => {
                    slog::debug!(self.logger, "Connect attempt {}/{} to {} failed: {}", attempt, max_attempts, to, e);
                }
                Err(_) => {
                    slog::debug!(self.logger, "Connect attempt {}/{} to {} timed out", attempt, max_attempts, to);
                }
            }

            if attempt < max_attempts {
                time::sleep(self.options.retry_interval).await;
            }
        }

        Err(SendError::ConnectRetriesExhausted {
            address: to.clone(),
            attempts: max_attempts,
        })
    }
}

#[async_trait::async_trait]
impl MessageSender for TcpMessageSender {
    async fn send(&self, to: &NodeAddress, message: &Message) -> Result<(), SendError> {
        let stream = self.connect_with_retry(to).await?;

        let mut frames = FramedWrite::new(stream, LengthDelimitedCodec::new());
        let write_result = match frames.send(Bytes::from(message.to_string())).await {
            Ok(()) => frames.close().await,
            Err(e) => Err(e),
        };
        write_result.map_err(|source| SendError::Io {
            address: to.clone(),
            source,
        })?;

        slog::debug!(self.logger, "Sent to {}: '{}'", to, message);

        if !self.options.post_send_pause.is_zero() {
            time::sleep(self.options.post_send_pause).await;
        }

        Ok(())
    }
}
