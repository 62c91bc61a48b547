use serde::Deserialize;
use std::fs;
use std::path::Path;
use textrelay_core::{RelayError, SessionConfig};

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub loopback: LoopbackConfig,
}

/// Behaviour of the in-process loopback transport.
///
/// Address lists are matched on digits only, so `555-123-4567` and
/// `5551234567` name the same recipient.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoopbackConfig {
    pub available: bool,
    pub sent_delay_ms: u64,
    pub delivery_delay_ms: u64,
    /// Refused synchronously at send time.
    pub reject: Vec<String>,
    /// Reported as a transport failure instead of sent.
    pub fail: Vec<String>,
    /// Sent but never confirmed.
    pub undelivered: Vec<String>,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            available: true,
            sent_delay_ms: 50,
            delivery_delay_ms: 250,
            reject: Vec::new(),
            fail: Vec::new(),
            undelivered: Vec::new(),
        }
    }
}

impl CliConfig {
    pub fn from_toml(input: &str) -> Result<Self, RelayError> {
        let config: Self =
            toml::from_str(input).map_err(|err| RelayError::config(err.to_string()))?;
        config.session.validate()?;
        if config.loopback.delivery_delay_ms < config.loopback.sent_delay_ms {
            log::warn!(
                "loopback delivery_delay_ms ({}) < sent_delay_ms ({}), confirmations arrive first",
                config.loopback.delivery_delay_ms,
                config.loopback.sent_delay_ms
            );
        }
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|err| RelayError::config(format!("{}: {err}", path.display())))?;
        Self::from_toml(&contents)
    }
}
