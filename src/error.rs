use std::io;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("ERR - Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("ERR - Io: {0}")]
    Io(#[from] io::Error),

    #[error("ERR - Codec: {0}")]
    Codec(String),

    #[error("ERR - Object missing: {0}")]
    ObjectMissing(String),

    #[error("ERR - Pack format: {0}")]
    PackFormat(String),

    #[error("ERR - Network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("ERR - Remote: {0}")]
    Remote(String),

    #[error("ERR - Other: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    pub(crate) fn pack(msg: impl Into<String>) -> Self {
        Self::PackFormat(msg.into())
    }
}
