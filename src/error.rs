use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PinError {
    #[error("invalid pin number: {0}")]
    InvalidPin(u32),
    #[error("pin {0} is not exported")]
    NotExported(u32),
    #[error("pin {0} is already exported")]
    AlreadyExported(u32),
    #[error("unable to open {0}: {1}")]
    Unreachable(String, #[source] io::Error),
    #[error("i/o error on {0}: {1}")]
    Io(String, #[source] io::Error),
    #[error("invalid direction: {0}")]
    InvalidDirection(String),
    #[error("invalid edge: {0}")]
    InvalidEdge(String),
    #[error("configuration error: {0}")]
    Config(String),
}
