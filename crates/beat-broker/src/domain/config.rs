//! Broker configuration with validation.
//!
//! Values come from defaults, a serialized document, or environment
//! variables (`BEAT_*`).

use crate::domain::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::warn;

/// Cutoff of the low-pass filter applied before analysis.
pub const DEFAULT_LOWPASS_CUTOFF_HZ: f32 = 240.0;

/// Capacity of in-memory transport channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Main broker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Window rendering
    pub render: RenderConfig,
    /// Worker process launch
    pub worker: WorkerConfig,
    /// Transport sizing
    pub transport: TransportConfig,
}

impl BrokerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.render.validate()?;

        if self.transport.channel_capacity == 0 {
            return Err(ConfigError::InvalidCapacity(
                "channel_capacity cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// - `BEAT_LOWPASS_CUTOFF_HZ`: filter cutoff (default: 240)
    /// - `BEAT_CHANNEL`: `first` or `mixdown` (default: first)
    /// - `BEAT_TARGET_SAMPLE_RATE`: resample rate in Hz (default: unset)
    /// - `BEAT_WORKER_PROGRAM`: worker executable
    /// - `BEAT_WORKER_ARGS`: whitespace-separated worker arguments
    /// - `BEAT_CHANNEL_CAPACITY`: in-memory channel capacity (default: 64)
    ///
    /// An unrecognised `BEAT_CHANNEL` is logged and the default kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(cutoff) = lookup("BEAT_LOWPASS_CUTOFF_HZ").and_then(|v| v.parse().ok()) {
            config.render.lowpass_cutoff_hz = cutoff;
        }

        if let Some(channel) = lookup("BEAT_CHANNEL") {
            match channel.parse() {
                Ok(selection) => config.render.channel = selection,
                Err(e) => warn!(error = %e, "Ignoring BEAT_CHANNEL, using first channel"),
            }
        }

        config.render.target_sample_rate =
            lookup("BEAT_TARGET_SAMPLE_RATE").and_then(|v| v.parse().ok());

        config.worker.program = lookup("BEAT_WORKER_PROGRAM");

        if let Some(args) = lookup("BEAT_WORKER_ARGS") {
            config.worker.args = args.split_whitespace().map(str::to_string).collect();
        }

        if let Some(capacity) = lookup("BEAT_CHANNEL_CAPACITY").and_then(|v| v.parse().ok()) {
            config.transport.channel_capacity = capacity;
        }

        config
    }
}

/// How a multi-channel source is reduced to the single analysed channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelSelection {
    /// Use the first channel only.
    #[default]
    First,
    /// Average all channels.
    Mixdown,
}

impl FromStr for ChannelSelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "mixdown" => Ok(Self::Mixdown),
            _ => Err(ConfigError::InvalidChannel(s.to_string())),
        }
    }
}

/// Window rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Low-pass cutoff in Hz
    pub lowpass_cutoff_hz: f32,
    /// Channel reduction strategy
    pub channel: ChannelSelection,
    /// Resample the window to this rate; `None` keeps the source rate
    pub target_sample_rate: Option<u32>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            lowpass_cutoff_hz: DEFAULT_LOWPASS_CUTOFF_HZ,
            channel: ChannelSelection::First,
            target_sample_rate: None,
        }
    }
}

impl RenderConfig {
    /// Validate rendering parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.lowpass_cutoff_hz.is_finite() || self.lowpass_cutoff_hz <= 0.0 {
            return Err(ConfigError::InvalidCutoff(format!(
                "{} Hz",
                self.lowpass_cutoff_hz
            )));
        }

        if self.target_sample_rate == Some(0) {
            return Err(ConfigError::InvalidSampleRate(
                "target_sample_rate cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

/// Worker process configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Executable speaking the worker protocol on stdio
    pub program: Option<String>,
    /// Arguments passed to the executable
    pub args: Vec<String>,
}

impl WorkerConfig {
    /// Program to launch, if configured.
    pub fn program(&self) -> Result<&str, ConfigError> {
        self.program
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(ConfigError::MissingWorkerProgram)
    }
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Buffer size of in-memory request/response channels
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BrokerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.render.lowpass_cutoff_hz, 240.0);
        assert_eq!(config.render.channel, ChannelSelection::First);
        assert!(config.render.target_sample_rate.is_none());
    }

    #[test]
    fn test_zero_cutoff_rejected() {
        let mut config = BrokerConfig::default();
        config.render.lowpass_cutoff_hz = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCutoff(_))
        ));
    }

    #[test]
    fn test_zero_target_rate_rejected() {
        let mut config = BrokerConfig::default();
        config.render.target_sample_rate = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = BrokerConfig::default();
        config.transport.channel_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCapacity(_))
        ));
    }

    #[test]
    fn test_missing_worker_program() {
        let worker = WorkerConfig::default();
        assert_eq!(worker.program(), Err(ConfigError::MissingWorkerProgram));

        let worker = WorkerConfig {
            program: Some("beat-worker".into()),
            args: vec![],
        };
        assert_eq!(worker.program(), Ok("beat-worker"));
    }

    #[test]
    fn test_channel_selection_parses() {
        assert_eq!("first".parse(), Ok(ChannelSelection::First));
        assert_eq!(" MixDown ".parse(), Ok(ChannelSelection::Mixdown));
        assert_eq!(
            "mix".parse::<ChannelSelection>(),
            Err(ConfigError::InvalidChannel("mix".into()))
        );
    }

    #[test]
    fn test_lookup_reads_every_key() {
        let config = BrokerConfig::from_lookup(|key| {
            match key {
                "BEAT_LOWPASS_CUTOFF_HZ" => Some("180"),
                "BEAT_CHANNEL" => Some("mixdown"),
                "BEAT_TARGET_SAMPLE_RATE" => Some("22050"),
                "BEAT_WORKER_PROGRAM" => Some("beat-worker"),
                "BEAT_WORKER_ARGS" => Some("--threads 2"),
                "BEAT_CHANNEL_CAPACITY" => Some("8"),
                _ => None,
            }
            .map(str::to_string)
        });

        assert_eq!(config.render.lowpass_cutoff_hz, 180.0);
        assert_eq!(config.render.channel, ChannelSelection::Mixdown);
        assert_eq!(config.render.target_sample_rate, Some(22050));
        assert_eq!(config.worker.program(), Ok("beat-worker"));
        assert_eq!(config.worker.args, vec!["--threads", "2"]);
        assert_eq!(config.transport.channel_capacity, 8);
    }

    #[test]
    fn test_unrecognised_channel_keeps_default() {
        let config = BrokerConfig::from_lookup(|key| {
            (key == "BEAT_CHANNEL").then(|| "mixdwon".to_string())
        });
        assert_eq!(config.render.channel, ChannelSelection::First);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: BrokerConfig =
            serde_json::from_str(r#"{ "render": { "channel": "mixdown" } }"#).unwrap();
        assert_eq!(config.render.channel, ChannelSelection::Mixdown);
        assert_eq!(config.render.lowpass_cutoff_hz, DEFAULT_LOWPASS_CUTOFF_HZ);
        assert_eq!(config.transport.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }
}
