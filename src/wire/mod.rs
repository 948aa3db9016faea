mod message;

pub use message::is_wire_safe_value;
pub use message::Message;
pub use message::MessageParseError;
