mod router;
mod server;
mod shutdown;

pub(crate) use router::MessageRouter;
pub(crate) use server::MessageServer;
pub(crate) use shutdown::shutdown_signal;
pub(crate) use shutdown::ServerShutdownHandle;
pub(crate) use shutdown::ServerShutdownSignal;
