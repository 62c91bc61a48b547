use serde::{Deserialize, Serialize};

/// Errors returned by dispatch sessions and transports.
///
/// Per-recipient validation problems are not errors; they are reported on the
/// recipient entry itself. Stale callbacks are discarded without an error.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RelayError {
    #[error("rejected: {reason}")]
    Rejected { reason: String },

    #[error("not ready: {reason}")]
    NotReady { reason: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("session closed")]
    Closed,
}

impl RelayError {
    /// Convenience constructor for a synchronous transport rejection.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected { reason: reason.into() }
    }

    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::NotReady { reason: reason.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// The bare reason text, without the variant prefix `Display` adds.
    ///
    /// This is what ends up inside `DispatchState::Failed`.
    pub fn reason(&self) -> String {
        match self {
            Self::Rejected { reason } | Self::NotReady { reason } => reason.clone(),
            Self::Config { message } => message.clone(),
            Self::Closed => "session closed".to_owned(),
        }
    }
}
