use crate::ring::{Key, HASH_SIZE};

/// One line typed at the operator console.
#[derive(Debug, PartialEq)]
pub(crate) enum ConsoleCommand {
    Empty,
    Lookup(Key),
    Insert(Key, String),
    Delete(Key),
    Enter,
    Leave,
    Status,
    Quit,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub(crate) enum ConsoleCommandError {
    #[error("Error : lookup requires a single argument [key].")]
    LookupArity,
    #[error("Error : insert requires two arguments [key] and [value].")]
    InsertArity,
    #[error("Error : delete requires a single argument [key].")]
    DeleteArity,
    #[error("Error : {0} is not a number.")]
    NotANumber(String),
    #[error("Error : Invalid key")]
    InvalidKey,
    #[error("Invalid command \"{0}\"")]
    Unknown(String),
}

impl ConsoleCommand {
    /// Parses a console line. The bootstrap runs the data commands; every other node only manages
    /// its own membership. `exit` means "shut down" on the bootstrap and "leave the ring" elsewhere.
    pub(crate) fn parse(line: &str, is_bootstrap: bool) -> Result<Self, ConsoleCommandError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let command = match tokens.first() {
            Some(command) => command.to_lowercase(),
            None => return Ok(ConsoleCommand::Empty),
        };
        let args = &tokens[1..];

        if is_bootstrap {
            match command.as_str() {
                "lookup" => match args {
                    [key] => Ok(ConsoleCommand::Lookup(parse_key(key)?)),
                    _ => Err(ConsoleCommandError::LookupArity),
                },
                "insert" => match args {
                    [key, value] => Ok(ConsoleCommand::Insert(parse_key(key)?, value.to_string())),
                    _ => Err(ConsoleCommandError::InsertArity),
                },
                "delete" => match args {
                    [key] => Ok(ConsoleCommand::Delete(parse_key(key)?)),
                    _ => Err(ConsoleCommandError::DeleteArity),
                },
                "status" => Ok(ConsoleCommand::Status),
                "quit" | "exit" => Ok(ConsoleCommand::Quit),
                _ => Err(ConsoleCommandError::Unknown(command)),
            }
        } else {
            match command.as_str() {
                "enter" => Ok(ConsoleCommand::Enter),
                "exit" => Ok(ConsoleCommand::Leave),
                "status" => Ok(ConsoleCommand::Status),
                _ => Err(ConsoleCommandError::Unknown(command)),
            }
        }
    }
}

// Any integer is "a number"; only the range check makes it a key.
fn parse_key(token: &str) -> Result<Key, ConsoleCommandError> {
    let value = token
        .parse::<i64>()
        .map_err(|_| ConsoleCommandError::NotANumber(token.to_string()))?;

    if value < 0 || value >= i64::from(HASH_SIZE) {
        return Err(ConsoleCommandError::InvalidKey);
    }

    Key::new(value as u32).map_err(|_| ConsoleCommandError::InvalidKey)
}
