//! Bridge and plugin configuration.
//!
//! Everything here is plain data loaded once, before the audio thread starts.
//!
//! ```toml
//! [bridge]
//! max_block_size = 8192
//! queue_capacity = 64
//! oversize = "truncate"
//! tick_budget = { at_most = 1024 }
//!
//! [amplifier]
//! default_gain = 0.3
//! max_samples = "unbounded"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::nodes::{DEFAULT_GAIN, DEFAULT_MAX_SAMPLES};

/// An optional upper limit.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    Unbounded,
    AtMost(usize),
}

impl Limit {
    /// Is `n` within the limit?
    #[inline]
    pub fn allows(self, n: usize) -> bool {
        match self {
            Limit::Unbounded => true,
            Limit::AtMost(max) => n <= max,
        }
    }

    #[inline]
    pub fn as_option(self) -> Option<usize> {
        match self {
            Limit::Unbounded => None,
            Limit::AtMost(max) => Some(max),
        }
    }
}

impl From<Option<usize>> for Limit {
    fn from(value: Option<usize>) -> Self {
        value.map_or(Limit::Unbounded, Limit::AtMost)
    }
}

/// What to do with a block larger than the bridge's capacity.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversizePolicy {
    /// Refuse the block and leave the output untouched
    #[default]
    Reject,
    /// Process the first `max_block_size` samples only
    Truncate,
}

/// Policies of one [`Bridge`](crate::bridge::Bridge).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Capacity of the bridge-owned audio block, allocated once.
    pub max_block_size: usize,

    /// Capacity of the network's message queue.
    pub queue_capacity: usize,

    pub oversize: OversizePolicy,

    /// How many exported emissions one run records for inspection.
    pub observation_capacity: usize,

    /// Ring size for the monitor transport.
    pub monitor_capacity: usize,

    /// Controller ticks one run may spend waiting for completion.
    pub tick_budget: Limit,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_block_size: 8192,
            queue_capacity: 64,
            oversize: OversizePolicy::Reject,
            observation_capacity: 256,
            monitor_capacity: 256,
            tick_budget: Limit::AtMost(4096),
        }
    }
}

impl BridgeConfig {
    pub fn with_max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_oversize(mut self, oversize: OversizePolicy) -> Self {
        self.oversize = oversize;
        self
    }

    pub fn with_tick_budget(mut self, tick_budget: Limit) -> Self {
        self.tick_budget = tick_budget;
        self
    }

    /// Reject settings the bridge cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_block_size == 0 {
            return Err(ConfigError::invalid("max_block_size", "must be non-zero"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid("queue_capacity", "must be non-zero"));
        }
        if self.monitor_capacity == 0 {
            return Err(ConfigError::invalid("monitor_capacity", "must be non-zero"));
        }
        if self.tick_budget == Limit::AtMost(0) {
            return Err(ConfigError::invalid("tick_budget", "must allow at least one tick"));
        }
        Ok(())
    }
}

/// Settings of the amplitude node in the shipped amplifier graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmplifierConfig {
    /// Gain before the host sets one.
    pub default_gain: f32,

    /// Largest buffer the node accepts.
    pub max_samples: Limit,
}

impl Default for AmplifierConfig {
    fn default() -> Self {
        Self {
            default_gain: DEFAULT_GAIN,
            max_samples: Limit::AtMost(DEFAULT_MAX_SAMPLES),
        }
    }
}

impl AmplifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_gain.is_finite() {
            return Err(ConfigError::invalid("default_gain", "must be finite"));
        }
        Ok(())
    }
}

/// Full configuration of the plugin library.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub bridge: BridgeConfig,
    pub amplifier: AmplifierConfig,
}

impl PluginConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: PluginConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bridge.validate()?;
        self.amplifier.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PluginConfig::default();
        assert_eq!(config.bridge.max_block_size, 8192);
        assert_eq!(config.bridge.queue_capacity, 64);
        assert_eq!(config.bridge.tick_budget, Limit::AtMost(4096));
        assert_eq!(config.bridge.oversize, OversizePolicy::Reject);
        assert_eq!(config.amplifier.default_gain, 0.3);
        assert_eq!(config.amplifier.max_samples, Limit::AtMost(10_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(PluginConfig::from_toml_str("").unwrap(), PluginConfig::default());
    }

    #[test]
    fn parse_overrides() {
        let config = PluginConfig::from_toml_str(
            r#"
            [bridge]
            max_block_size = 512
            oversize = "truncate"
            tick_budget = "unbounded"

            [amplifier]
            default_gain = 1.5
            max_samples = { at_most = 256 }
            "#,
        )
        .unwrap();

        assert_eq!(config.bridge.max_block_size, 512);
        assert_eq!(config.bridge.queue_capacity, 64);
        assert_eq!(config.bridge.oversize, OversizePolicy::Truncate);
        assert_eq!(config.bridge.tick_budget, Limit::Unbounded);
        assert_eq!(config.amplifier.default_gain, 1.5);
        assert_eq!(config.amplifier.max_samples.as_option(), Some(256));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let err = PluginConfig::from_toml_str("[bridge]\nqueue_capacity = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "queue_capacity", .. }));

        let err = PluginConfig::from_toml_str("[bridge]\ntick_budget = { at_most = 0 }\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "tick_budget", .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = PluginConfig::from_toml_str("[bridge\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn toml_round_trip() {
        let config = PluginConfig {
            bridge: BridgeConfig::default()
                .with_oversize(OversizePolicy::Truncate)
                .with_tick_budget(Limit::Unbounded),
            amplifier: AmplifierConfig {
                default_gain: 0.5,
                max_samples: Limit::Unbounded,
            },
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(PluginConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blockflow.toml");
        std::fs::write(&path, "[bridge]\nmax_block_size = 128\n").unwrap();

        let config = PluginConfig::load(&path).unwrap();
        assert_eq!(config.bridge.max_block_size, 128);

        let missing = PluginConfig::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn limits() {
        assert!(Limit::Unbounded.allows(usize::MAX));
        assert!(Limit::AtMost(3).allows(3));
        assert!(!Limit::AtMost(3).allows(4));
        assert_eq!(Limit::from(None), Limit::Unbounded);
        assert_eq!(Limit::from(Some(2)), Limit::AtMost(2));
    }
}
