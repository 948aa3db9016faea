use crate::ring::{Entry, Key, KeyError, NodeAddress, NodeId, NodeRole};
use crate::wire::is_wire_safe_value;
use std::io;
use std::path::{Path, PathBuf};

/// NodeConfigFile is the on-disk description of one node.
///
/// ```text
/// <id>
/// <listenPort>
/// <bootIp> <bootPort>        (member)
/// <key> <value>              (bootstrap, zero or more)
/// ```
///
/// `id` and `listenPort` are the first two whitespace-separated tokens and may share a line.
/// Whatever follows the port on its line is ignored.
#[derive(Debug)]
pub struct NodeConfigFile {
    pub id: NodeId,
    pub listen_port: u16,
    pub role: NodeRole,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Config must start with a node id and a listening port")]
    MissingHeader,
    #[error("Invalid node id")]
    BadId(#[source] KeyError),
    #[error("Invalid listening port '{0}'")]
    BadPort(String),
    #[error("Missing '<ip> <port>' line for the bootstrap name server")]
    MissingBootstrap,
    #[error("Invalid bootstrap line '{0}'")]
    BadBootstrap(String),
    #[error("Invalid seed line '{0}'")]
    BadSeedPair(String),
}

impl NodeConfigFile {
    pub fn from_path<P: AsRef<Path>>(path: P, bootstrap: bool) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&text, bootstrap)
    }

    pub fn parse(text: &str, bootstrap: bool) -> Result<Self, ConfigError> {
        let mut lines = text.lines();

        let mut header = Vec::with_capacity(2);
        while header.len() < 2 {
            let line = lines.next().ok_or(ConfigError::MissingHeader)?;
            header.extend(line.split_whitespace().take(2 - header.len()));
        }

        let id = header[0].parse::<Key>().map_err(ConfigError::BadId)?;
        let listen_port = header[1]
            .parse::<u16>()
            .map_err(|_| ConfigError::BadPort(header[1].to_string()))?;

        let mut remaining = lines.map(str::trim).filter(|line| !line.is_empty());
        let role = if bootstrap {
            let seed_entries = remaining.map(parse_seed_pair).collect::<Result<Vec<_>, _>>()?;
            NodeRole::Bootstrap { seed_entries }
        } else {
            let line = remaining.next().ok_or(ConfigError::MissingBootstrap)?;
            NodeRole::Member {
                bootstrap: parse_bootstrap(line)?,
            }
        };

        Ok(NodeConfigFile { id, listen_port, role })
    }
}

fn parse_bootstrap(line: &str) -> Result<NodeAddress, ConfigError> {
    let bad = || ConfigError::BadBootstrap(line.to_string());

    let mut tokens = line.split_whitespace();
    let ip = tokens.next().ok_or_else(bad)?;
    let port = tokens.next().ok_or_else(bad)?.parse::<u16>().map_err(|_| bad())?;

    Ok(NodeAddress::new(ip, port))
}

fn parse_seed_pair(line: &str) -> Result<Entry, ConfigError> {
    let bad = || ConfigError::BadSeedPair(line.to_string());

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 2 || !is_wire_safe_value(tokens[1]) {
        return Err(bad());
    }
    let key = tokens[0].parse::<Key>().map_err(|_| bad())?;

    Ok((key, tokens[1].to_string()))
}
