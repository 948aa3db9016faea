use crate::server::{MessageRouter, ServerShutdownSignal};
use crate::transport::read_message;
use crate::wire::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// MessageServer accepts protocol connections. Each connection carries exactly one message and is
/// handled on its own task, so a slow handler never blocks the accept loop.
pub(crate) struct MessageServer {
    logger: slog::Logger,
    router: Arc<MessageRouter>,
}

impl MessageServer {
    pub(crate) fn new(logger: slog::Logger, router: MessageRouter) -> Self {
        MessageServer {
            logger,
            router: Arc::new(router),
        }
    }

    pub(crate) async fn run(self, listener: TcpListener, mut shutdown_signal: ServerShutdownSignal) {
        match listener.local_addr() {
            Ok(addr) => slog::info!(self.logger, "Listening on '{:?}'", addr),
            Err(e) => slog::warn!(self.logger, "Listening on unknown address: {}", e),
        }

        loop {
            tokio::select! {
                _ = &mut shutdown_signal => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let logger = self.logger.clone();
                        let router = self.router.clone();
                        tokio::spawn(Self::handle_connection(logger, router, stream, peer));
                    }
                    Err(e) => slog::warn!(self.logger, "Failed to accept connection: {}", e),
                },
            }
        }

        slog::info!(self.logger, "Server run() has exited");
    }

    async fn handle_connection(logger: slog::Logger, router: Arc<MessageRouter>, stream: TcpStream, peer: SocketAddr) {
        let text = match read_message(stream).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                slog::debug!(logger, "Connection from {} closed without a message", peer);
                return;
            }
            Err(e) => {
                slog::warn!(logger, "Failed to read message from {}: {}", peer, e);
                return;
            }
        };

        slog::debug!(logger, "ServerWire - {}: '{}'", peer, text);

        match text.parse::<Message>() {
            Ok(message) => {
                router.route(message).await;
            }
            Err(e) => slog::warn!(logger, "Ignoring malformed message from {}: {} ('{}')", peer, e, text),
        }
    }
}
