//! An in-process transport that plays back configured outcomes on a tokio
//! runtime. Used by the `textrelay` binary and for exercising sessions end to
//! end without a carrier.

use crate::config::LoopbackConfig;
use std::sync::Arc;
use std::time::Duration;
use textrelay_core::{
    CorrelationKey, Outcome, OutcomeHandler, RelayError, Transport, TransportProvider,
};
use tokio::runtime::Handle;

pub const LOOPBACK_REJECTED: &str = "refused by loopback";
pub const LOOPBACK_FAILED: &str = "loopback carrier failure";

fn digits(address: &str) -> String {
    address.chars().filter(char::is_ascii_digit).collect()
}

fn listed(list: &[String], address: &str) -> bool {
    list.iter().any(|entry| digits(entry) == address)
}

#[derive(Clone, Debug)]
pub struct LoopbackProvider {
    config: LoopbackConfig,
    runtime: Handle,
}

impl LoopbackProvider {
    pub fn new(config: LoopbackConfig, runtime: Handle) -> Self {
        Self { config, runtime }
    }

    /// Binds to the runtime the caller is running on.
    ///
    /// Panics outside a tokio runtime, like [`Handle::current`].
    pub fn current(config: LoopbackConfig) -> Self {
        Self::new(config, Handle::current())
    }
}

impl TransportProvider for LoopbackProvider {
    fn acquire(&self, handler: Arc<dyn OutcomeHandler>) -> Option<Arc<dyn Transport>> {
        if !self.config.available {
            log::info!("loopback transport disabled by configuration");
            return None;
        }
        Some(Arc::new(LoopbackTransport {
            config: self.config.clone(),
            runtime: self.runtime.clone(),
            handler,
        }))
    }
}

struct LoopbackTransport {
    config: LoopbackConfig,
    runtime: Handle,
    handler: Arc<dyn OutcomeHandler>,
}

impl LoopbackTransport {
    fn report_after(&self, delay_ms: u64, key: CorrelationKey, outcome: Outcome) {
        let handler = self.handler.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            log::debug!("{key}: loopback reports {outcome:?}");
            handler.on_outcome(key, outcome);
        });
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, address: &str, _body: &str, key: CorrelationKey) -> Result<(), RelayError> {
        if listed(&self.config.reject, address) {
            return Err(RelayError::rejected(LOOPBACK_REJECTED));
        }

        if listed(&self.config.fail, address) {
            self.report_after(self.config.sent_delay_ms, key, Outcome::failure(LOOPBACK_FAILED));
            return Ok(());
        }

        self.report_after(self.config.sent_delay_ms, key, Outcome::Sent);
        if !listed(&self.config.undelivered, address) {
            self.report_after(self.config.delivery_delay_ms, key, Outcome::DeliveryConfirmed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_match_on_digits() {
        let list = vec!["(555) 123-4567".to_owned()];
        assert!(listed(&list, "5551234567"));
        assert!(!listed(&list, "5559876543"));
    }
}
