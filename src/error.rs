use thiserror::Error;

#[derive(Error, Debug)]
pub enum VmsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Transfer error: {0}")]
    Transfer(String),

    #[error("Aborted: {0}")]
    UserAbort(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected command output: {0}")]
    Parse(String),

    #[error("Queue entry {0} is not part of this job")]
    UnknownEntry(String),
}

pub type Error = VmsError;
pub type Result<T> = std::result::Result<T, Error>;
