#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid binary at word {offset}: {reason}")]
    InvalidBinary { offset: usize, reason: String },

    #[error("invalid id {id}: {reason}")]
    InvalidId { id: u32, reason: String },

    #[error("invalid control flow in {context}: {reason}")]
    InvalidCfg { context: String, reason: String },

    #[error("invalid module layout: {0}")]
    InvalidLayout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn bad_binary(offset: usize, reason: impl Into<String>) -> Self {
        Self::InvalidBinary {
            offset,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
