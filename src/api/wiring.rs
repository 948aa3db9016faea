use crate::api::client::{RingNodeClient, RingNodeHandle};
use crate::api::options::RingOptionsValidated;
use crate::api::{create_console_stream, RingOptions};
use crate::ring::{NeighborInfo, NodeAddress, NodeId, NodeRole, RingNode};
use crate::server::{self, MessageRouter, MessageServer};
use crate::transport::TcpMessageSender;
use std::convert::TryFrom;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct RingNodeConfig {
    pub id: NodeId,
    // What peers are told to connect to. The listener itself binds on all interfaces.
    pub advertise_ip: String,
    // 0 picks a free port; the bound port is what gets advertised.
    pub listen_port: u16,
    pub role: NodeRole,
    pub info_logger: slog::Logger,
    pub options: RingOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum RingNodeCreationError {
    #[error("Illegal options for configuring node: {0}")]
    IllegalNodeOptions(String),
    #[error("Failed to listen on port {port}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
}

pub async fn try_create_ring_node(config: RingNodeConfig) -> Result<RingNodeClient, RingNodeCreationError> {
    let root_logger = config.info_logger.new(slog::o!("NodeId" => config.id.as_u32()));
    let listen_port = config.listen_port;

    let options = RingOptionsValidated::try_from(config.options)
        .map_err(|e| RingNodeCreationError::IllegalNodeOptions(e.to_string()))?;

    let listener = TcpListener::bind(("0.0.0.0", listen_port))
        .await
        .map_err(|source| RingNodeCreationError::Bind { port: listen_port, source })?;
    let bound_port = listener
        .local_addr()
        .map_err(|source| RingNodeCreationError::Bind { port: listen_port, source })?
        .port();

    let address = NodeAddress::new(config.advertise_ip, bound_port);
    let me = NeighborInfo::new(address.clone(), config.id);

    let sender = Arc::new(TcpMessageSender::new(root_logger.clone(), options.connect_options()));
    let (console_publisher, console_stream) = create_console_stream();

    let (node, lifecycle_listener) = RingNode::new(root_logger.clone(), me, config.role, sender, console_publisher);
    let node = Arc::new(node);

    slog::info!(
        root_logger,
        "Created name server {:?} at {} (bootstrap: {})",
        config.id,
        address,
        node.is_bootstrap()
    );

    let (server_shutdown_handle, server_shutdown_signal) = server::shutdown_signal();
    let router = MessageRouter::new(root_logger.clone(), node.clone());
    let message_server = MessageServer::new(root_logger, router);
    tokio::spawn(message_server.run(listener, server_shutdown_signal));

    Ok(RingNodeClient {
        handle: RingNodeHandle::new(node, address, server_shutdown_handle),
        console_stream,
        lifecycle_listener,
    })
}
