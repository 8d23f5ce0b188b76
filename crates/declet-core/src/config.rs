#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! Configuration is plain data with a `Default`, `with_*` builders, and an
//! optional environment overlay. Invalid environment values are logged and
//! ignored; they never abort startup.

use tracing::warn;

use crate::error::ConfigError;

/// Environment variable overriding [`SchedulerConfig::max_ticks_per_drain`].
pub const MAX_TICKS_ENV: &str = "DECLET_MAX_TICKS_PER_DRAIN";

/// Configuration for [`TickQueue`](crate::schedule::TickQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Upper bound on ticks run by a single `drain()`. Tasks that keep
    /// rescheduling themselves are cut off here instead of spinning forever.
    pub max_ticks_per_drain: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_ticks_per_drain: 64,
        }
    }
}

impl SchedulerConfig {
    /// Set the drain budget. Zero is clamped to one.
    #[must_use]
    pub fn with_max_ticks_per_drain(mut self, ticks: usize) -> Self {
        self.max_ticks_per_drain = ticks.max(1);
        self
    }

    /// Defaults overlaid with `DECLET_MAX_TICKS_PER_DRAIN`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(MAX_TICKS_ENV) {
            match parse_positive(MAX_TICKS_ENV, &raw) {
                Ok(ticks) => config.max_ticks_per_drain = ticks,
                Err(err) => warn!(message = "config.invalid", error = %err),
            }
        }
        config
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    let value = raw
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        })?;
    if value == 0 {
        return Err(ConfigError::Zero { key });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_overrides_default() {
        let config = SchedulerConfig::from_lookup(|key| {
            (key == MAX_TICKS_ENV).then(|| " 8 ".to_string())
        });
        assert_eq!(config.max_ticks_per_drain, 8);
    }

    #[test]
    fn invalid_values_fall_back() {
        let garbage = SchedulerConfig::from_lookup(|_| Some("many".to_string()));
        assert_eq!(garbage, SchedulerConfig::default());

        let zero = SchedulerConfig::from_lookup(|_| Some("0".to_string()));
        assert_eq!(zero, SchedulerConfig::default());
    }

    #[test]
    fn parse_errors_name_the_key() {
        let err = parse_positive(MAX_TICKS_ENV, "x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "DECLET_MAX_TICKS_PER_DRAIN: expected a positive integer, got \"x\""
        );
        assert_eq!(
            parse_positive(MAX_TICKS_ENV, "0"),
            Err(ConfigError::Zero { key: MAX_TICKS_ENV })
        );
    }

    #[test]
    fn builder_clamps_zero() {
        let config = SchedulerConfig::default().with_max_ticks_per_drain(0);
        assert_eq!(config.max_ticks_per_drain, 1);
    }
}
