use crate::error::RelayError;
use crate::status::CorrelationKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Asynchronous report about one outbound unit.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Sent,
    DeliveryConfirmed,
    TransportFailure { reason: String },
}

impl Outcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::TransportFailure { reason: reason.into() }
    }

    /// Maps a transport's "sent" report. A sent report that is not OK is a failure.
    pub fn from_sent_result(ok: bool) -> Self {
        if ok {
            Self::Sent
        } else {
            Self::failure("send error")
        }
    }
}

/// Callback channel the transport reports outcomes through.
///
/// May be invoked zero or more times per key, in any order, from any thread.
pub trait OutcomeHandler: Send + Sync {
    fn on_outcome(&self, key: CorrelationKey, outcome: Outcome);
}

impl<F> OutcomeHandler for F
where
    F: Fn(CorrelationKey, Outcome) + Send + Sync,
{
    fn on_outcome(&self, key: CorrelationKey, outcome: Outcome) {
        self(key, outcome)
    }
}

/// An acquired sending capability.
pub trait Transport: Send + Sync {
    /// Synchronous accept/reject. Actual delivery is reported later through the
    /// [`OutcomeHandler`] registered at acquisition.
    fn send(&self, address: &str, body: &str, key: CorrelationKey) -> Result<(), RelayError>;
}

pub trait TransportProvider: Send + Sync {
    /// Acquires a transport that reports outcomes to `handler`, or `None` when
    /// no sending capability exists at all.
    fn acquire(&self, handler: Arc<dyn OutcomeHandler>) -> Option<Arc<dyn Transport>>;
}

/// A provider that never has a transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unavailable;

impl TransportProvider for Unavailable {
    fn acquire(&self, _handler: Arc<dyn OutcomeHandler>) -> Option<Arc<dyn Transport>> {
        None
    }
}
