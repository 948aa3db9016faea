mod framing;
mod sender;
mod tcp;
#[cfg(test)]
mod test_utils;

pub(crate) use framing::read_message;
pub use sender::MessageSender;
pub use sender::SendError;
pub(crate) use tcp::ConnectOptions;
pub(crate) use tcp::TcpMessageSender;
#[cfg(test)]
pub(crate) use test_utils::RecordingSender;
