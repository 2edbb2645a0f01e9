use std::time::Duration;

use serde::Deserialize;
use wireup_config::{ConfigError, ConfigProvider};

/// Config section the options are read from
pub const OPTIONS_SECTION: &str = "container";

/// Behaviour of the initialization pipeline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Upper bound for the whole initialization - `None` waits forever
    pub init_timeout_ms: Option<u64>,
    /// Initialize independent branches concurrently
    ///
    /// When disabled, definitions are built strictly one at a time in graph order.
    pub concurrent_init: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            init_timeout_ms: None,
            concurrent_init: true,
        }
    }
}

impl ContainerOptions {
    /// Reads the options from the `container` section - missing section means defaults
    pub fn from_config(config: &ConfigProvider) -> Result<Self, ConfigError> {
        match config.section::<ContainerOptions>(OPTIONS_SECTION) {
            Ok(options) => Ok((*options).clone()),
            Err(ConfigError::Missing(_)) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    pub fn init_timeout(&self) -> Option<Duration> {
        self.init_timeout_ms.map(Duration::from_millis)
    }
}
