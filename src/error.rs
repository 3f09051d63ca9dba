use thiserror;

/// The Result type for slide48.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid direction {0:?}, expected one of up, down, left, right")]
    InvalidDirection(String),

    #[error(
        "unsupported board size {0}, expected {} through {}",
        crate::engine::MIN_SIZE,
        crate::engine::MAX_SIZE
    )]
    InvalidSize(usize),

    #[error("malformed save: {reason}")]
    MalformedSave { reason: String },

    #[error("unable to encode save")]
    EncodeError(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSave {
            reason: reason.into(),
        }
    }

    /// Whether this error came from unreadable persisted data. Callers are expected to start a
    /// fresh game when it does.
    pub fn is_malformed_save(&self) -> bool {
        matches!(self, Self::MalformedSave { .. })
    }
}
