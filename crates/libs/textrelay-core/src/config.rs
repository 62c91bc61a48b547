use crate::address::{policy_for_region, AddressPolicy, DEFAULT_REGION};
use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn default_region() -> String {
    DEFAULT_REGION.to_owned()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Region whose address rules apply, e.g. `US`.
    #[serde(default = "default_region")]
    pub region: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { region: default_region() }
    }
}

impl SessionConfig {
    pub fn from_toml(input: &str) -> Result<Self, RelayError> {
        let config: Self =
            toml::from_str(input).map_err(|err| RelayError::config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|err| RelayError::config(format!("{}: {err}", path.display())))?;
        Self::from_toml(&contents)
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.region.trim().is_empty() {
            return Err(RelayError::config("region must not be empty"));
        }
        Ok(())
    }

    pub fn address_policy(&self) -> Arc<dyn AddressPolicy> {
        policy_for_region(&self.region)
    }
}
