//! Text form of the ring protocol. One message is one command line: a command token followed by
//! space-separated arguments. Only the `print` payload may contain spaces or newlines.

use crate::ring::{Entry, Key, KeyError, NeighborInfo, NodeAddress, NodeId, Trace};
use std::fmt;
use std::str::FromStr;

const REGISTER: &str = "register";
const EXIT: &str = "exit";
const REMOVE_SELF: &str = "remove_self";
const LOOKUP: &str = "lookup";
const INSERT: &str = "insert";
const DELETE: &str = "delete";
const TRANSFER: &str = "transfer";
const TRANSFER_REQUEST: &str = "transfer_request";
const SET_NEXT: &str = "set_next";
const SET_PREV: &str = "set_prev";
const PRINT: &str = "print";

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Join request from `joiner`, forwarded until it reaches the owner of `joiner.id`.
    Register { joiner: NeighborInfo, trace: Trace },
    /// Leave request for `id`, forwarded until it reaches the predecessor of `id`.
    Exit { id: NodeId },
    RemoveSelf,
    Lookup { key: Key, trace: Trace },
    Insert { key: Key, value: String, trace: Trace },
    Delete { key: Key, trace: Trace },
    /// Bulk hand-off. Also sets the receiver's range to `[receiver id, end]`.
    Transfer { end: Key, entries: Vec<Entry> },
    TransferRequest { destination: NodeAddress },
    SetNext(NeighborInfo),
    SetPrev(NeighborInfo),
    Print { text: String },
}

impl Message {
    pub fn command(&self) -> &'static str {
        match self {
            Message::Register { .. } => REGISTER,
            Message::Exit { .. } => EXIT,
            Message::RemoveSelf => REMOVE_SELF,
            Message::Lookup { .. } => LOOKUP,
            Message::Insert { .. } => INSERT,
            Message::Delete { .. } => DELETE,
            Message::Transfer { .. } => TRANSFER,
            Message::TransferRequest { .. } => TRANSFER_REQUEST,
            Message::SetNext(_) => SET_NEXT,
            Message::SetPrev(_) => SET_PREV,
            Message::Print { .. } => PRINT,
        }
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum MessageParseError {
    #[error("empty message")]
    Empty,
    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),
    #[error("{command} expects {expected} arguments, got {actual}")]
    WrongArgumentCount {
        command: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{command}: {source}")]
    BadKey {
        command: &'static str,
        #[source]
        source: KeyError,
    },
    #[error("{command}: {port} is not a port number")]
    BadPort { command: &'static str, port: String },
    #[error("transfer: malformed entry \"{0}\"")]
    BadTransferEntry(String),
    #[error("value \"{0}\" cannot be carried on the wire")]
    BadValue(String),
}

/// A value travels as a single token and, inside a transfer, between `,` and `;` separators.
pub fn is_wire_safe_value(value: &str) -> bool {
    !value.is_empty() && !value.contains(|c: char| c.is_whitespace() || c == ',' || c == ';')
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut split = line.splitn(2, ' ');
        let command = split.next().filter(|c| !c.is_empty()).ok_or(MessageParseError::Empty)?;
        let rest = split.next().unwrap_or("");

        if command == PRINT {
            return Ok(Message::Print { text: rest.to_string() });
        }

        let args: Vec<&str> = rest.split(' ').filter(|a| !a.is_empty()).collect();

        match command {
            REGISTER => {
                let [ip, port, id, trace] = expect_args::<4>(REGISTER, &args)?;
                Ok(Message::Register {
                    joiner: NeighborInfo::new(
                        NodeAddress::new(ip, parse_port(REGISTER, port)?),
                        parse_key(REGISTER, id)?,
                    ),
                    trace: parse_trace(REGISTER, trace)?,
                })
            }
            EXIT => {
                let [id] = expect_args::<1>(EXIT, &args)?;
                Ok(Message::Exit {
                    id: parse_key(EXIT, id)?,
                })
            }
            REMOVE_SELF => {
                expect_args::<0>(REMOVE_SELF, &args)?;
                Ok(Message::RemoveSelf)
            }
            LOOKUP => {
                let [key, trace] = expect_args::<2>(LOOKUP, &args)?;
                Ok(Message::Lookup {
                    key: parse_key(LOOKUP, key)?,
                    trace: parse_trace(LOOKUP, trace)?,
                })
            }
            INSERT => {
                let [key, value, trace] = expect_args::<3>(INSERT, &args)?;
                if !is_wire_safe_value(value) {
                    return Err(MessageParseError::BadValue(value.to_string()));
                }
                Ok(Message::Insert {
                    key: parse_key(INSERT, key)?,
                    value: value.to_string(),
                    trace: parse_trace(INSERT, trace)?,
                })
            }
            DELETE => {
                let [key, trace] = expect_args::<2>(DELETE, &args)?;
                Ok(Message::Delete {
                    key: parse_key(DELETE, key)?,
                    trace: parse_trace(DELETE, trace)?,
                })
            }
            TRANSFER => {
                // The entry list is empty when the drained range held no data.
                let (end, entries) = match args.as_slice() {
                    [end] => (*end, ""),
                    [end, entries] => (*end, *entries),
                    _ => {
                        return Err(MessageParseError::WrongArgumentCount {
                            command: TRANSFER,
                            expected: 2,
                            actual: args.len(),
                        })
                    }
                };
                Ok(Message::Transfer {
                    end: parse_key(TRANSFER, end)?,
                    entries: parse_entries(entries)?,
                })
            }
            TRANSFER_REQUEST => {
                let [ip, port] = expect_args::<2>(TRANSFER_REQUEST, &args)?;
                Ok(Message::TransferRequest {
                    destination: NodeAddress::new(ip, parse_port(TRANSFER_REQUEST, port)?),
                })
            }
            SET_NEXT => {
                let [ip, port, id] = expect_args::<3>(SET_NEXT, &args)?;
                Ok(Message::SetNext(parse_neighbor(SET_NEXT, ip, port, id)?))
            }
            SET_PREV => {
                let [ip, port, id] = expect_args::<3>(SET_PREV, &args)?;
                Ok(Message::SetPrev(parse_neighbor(SET_PREV, ip, port, id)?))
            }
            other => Err(MessageParseError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let command = self.command();
        match self {
            Message::Register { joiner, trace } => write!(
                f,
                "{} {} {} {} {}",
                command, joiner.address.ip, joiner.address.port, joiner.id, trace
            ),
            Message::Exit { id } => write!(f, "{} {}", command, id),
            Message::RemoveSelf => write!(f, "{}", command),
            Message::Lookup { key, trace } | Message::Delete { key, trace } => {
                write!(f, "{} {} {}", command, key, trace)
            }
            Message::Insert { key, value, trace } => write!(f, "{} {} {} {}", command, key, value, trace),
            Message::Transfer { end, entries } => {
                let entries: Vec<String> = entries.iter().map(|(k, v)| format!("{},{}", k, v)).collect();
                if entries.is_empty() {
                    write!(f, "{} {}", command, end)
                } else {
                    write!(f, "{} {} {}", command, end, entries.join(";"))
                }
            }
            Message::TransferRequest { destination } => {
                write!(f, "{} {} {}", command, destination.ip, destination.port)
            }
            Message::SetNext(neighbor) | Message::SetPrev(neighbor) => write!(
                f,
                "{} {} {} {}",
                command, neighbor.address.ip, neighbor.address.port, neighbor.id
            ),
            Message::Print { text } => write!(f, "{} {}", command, text),
        }
    }
}

fn expect_args<'a, const N: usize>(
    command: &'static str,
    args: &[&'a str],
) -> Result<[&'a str; N], MessageParseError> {
    let mut out = [""; N];
    if args.len() != N {
        return Err(MessageParseError::WrongArgumentCount {
            command,
            expected: N,
            actual: args.len(),
        });
    }
    out.copy_from_slice(args);
    Ok(out)
}

fn parse_key(command: &'static str, s: &str) -> Result<Key, MessageParseError> {
    s.parse::<Key>()
        .map_err(|source| MessageParseError::BadKey { command, source })
}

fn parse_port(command: &'static str, s: &str) -> Result<u16, MessageParseError> {
    s.parse::<u16>().map_err(|_| MessageParseError::BadPort {
        command,
        port: s.to_string(),
    })
}

fn parse_trace(command: &'static str, s: &str) -> Result<Trace, MessageParseError> {
    s.parse::<Trace>()
        .map_err(|source| MessageParseError::BadKey { command, source })
}

fn parse_neighbor(command: &'static str, ip: &str, port: &str, id: &str) -> Result<NeighborInfo, MessageParseError> {
    Ok(NeighborInfo::new(
        NodeAddress::new(ip, parse_port(command, port)?),
        parse_key(command, id)?,
    ))
}

fn parse_entries(s: &str) -> Result<Vec<Entry>, MessageParseError> {
    s.split(';')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.split(',');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) if is_wire_safe_value(value) => {
                    Ok((parse_key(TRANSFER, key)?, value.to_string()))
                }
                _ => Err(MessageParseError::BadTransferEntry(entry.to_string())),
            }
        })
        .collect()
}
