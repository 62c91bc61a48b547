//! Dispatch of a short text message to a set of recipients, with per-recipient
//! delivery tracking.
//!
//! - [`RecipientSet`]: the editable, self-validating recipient list
//! - [`StatusStore`]: delivery states of the live batch, keyed by [`CorrelationKey`]
//! - [`DispatchCoordinator`]: snapshots the list and hands one unit per recipient
//!   to a [`Transport`]
//! - [`CallbackRouter`]: applies asynchronous [`Outcome`]s to the right slot, exactly once
//! - [`Session`]: caller-owned container wiring the above for a presentation layer

pub mod address;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod recipient;
pub mod router;
pub mod session;
pub mod status;
pub mod transport;

pub use address::{policy_for_region, AddressPolicy, ExactMatchPolicy, NanpPolicy};
pub use config::SessionConfig;
pub use dispatch::{DispatchCoordinator, DispatchReport, NO_TRANSPORT};
pub use error::RelayError;
pub use recipient::{RecipientEntry, RecipientSet};
pub use router::{next_state, CallbackRouter, Disposition};
pub use session::{RecipientStatus, Session, SessionSnapshot, SessionWatch};
pub use status::{CorrelationKey, DispatchState, StatusStore, StatusTable, StoreUpdate};
pub use transport::{Outcome, OutcomeHandler, Transport, TransportProvider, Unavailable};
