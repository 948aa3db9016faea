mod api;
mod console;
mod ring;
mod server;
mod transport;
mod wire;

pub use api::try_create_ring_node;
pub use api::ConfigError;
pub use api::ConsoleStream;
pub use api::NodeConfigFile;
pub use api::RingNodeClient;
pub use api::RingNodeConfig;
pub use api::RingNodeCreationError;
pub use api::RingNodeHandle;
pub use api::RingOptions;
pub use console::run_console;
pub use ring::Entry;
pub use ring::Key;
pub use ring::KeyError;
pub use ring::KeyRange;
pub use ring::LeaveNotice;
pub use ring::LifecycleListener;
pub use ring::NeighborInfo;
pub use ring::NodeAddress;
pub use ring::NodeId;
pub use ring::NodeLifecycle;
pub use ring::NodeRole;
pub use ring::NodeStatus;
pub use ring::OperatorCommandError;
pub use ring::Trace;
pub use ring::HASH_SIZE;
pub use transport::MessageSender;
pub use transport::SendError;
pub use wire::Message;
pub use wire::MessageParseError;

// Learning 1: `create::{root_mod}` should not have any code. Just `mod` and `pub use` statements.
// Learning 2: All `mod` statements, anywhere, should not be `pub`. Only export `pub` via individual
//             use statements.
//
// This keeps the `crate::{root_mod}` root_mod only responsible for exporting types to the rest of
// crate, and allows me to organize my root_mod impl however I want.
