//! This mod is meant to hold most of the code for the library's client-facing API.
mod client;
mod config;
mod console_stream;
mod options;
mod wiring;

pub use client::RingNodeClient;
pub use client::RingNodeHandle;
pub use config::ConfigError;
pub use config::NodeConfigFile;
pub use console_stream::ConsoleStream;
pub use options::RingOptions;
pub use wiring::try_create_ring_node;
pub use wiring::RingNodeConfig;
pub use wiring::RingNodeCreationError;

// So RingNode can publish operator-facing text.
pub(crate) use console_stream::create_console_stream;
pub(crate) use console_stream::ConsoleStreamPublisher;
