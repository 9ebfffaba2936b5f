//! Configuration schema
//!
//! Typed configuration for a signal controller and its simulation driver.
//! Durations are written as strings with a unit suffix (`ms`, `s`, `m`,
//! `h`), for example `4000ms` or `5s`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::phase::cycle::{DEFAULT_MAX_CYCLE, DEFAULT_MIN_CYCLE};

/// Default pause between two checks of the phase loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default number of vehicles the driver spawns.
pub const DEFAULT_VEHICLES: usize = 3;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalConfig {
    /// Range each randomized cycle length is drawn from.
    #[serde(default)]
    pub cycle: CycleConfig,

    /// Pause between two loop checks.
    #[serde(default = "default_poll_interval", with = "duration_format")]
    pub poll_interval: Duration,

    /// Seed for the cycle generator; OS entropy when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Use this exact cycle length for every phase instead of a random one.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "optional_duration_format"
    )]
    pub fixed_cycle: Option<Duration>,

    /// Vehicle tasks spawned by the simulation driver.
    #[serde(default = "default_vehicles")]
    pub vehicles: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            cycle: CycleConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            seed: None,
            fixed_cycle: None,
            vehicles: DEFAULT_VEHICLES,
        }
    }
}

/// Inclusive cycle length bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleConfig {
    /// Shortest cycle.
    #[serde(default = "default_min_cycle", with = "duration_format")]
    pub min: Duration,

    /// Longest cycle.
    #[serde(default = "default_max_cycle", with = "duration_format")]
    pub max: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_CYCLE,
            max: DEFAULT_MAX_CYCLE,
        }
    }
}

const fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

const fn default_min_cycle() -> Duration {
    DEFAULT_MIN_CYCLE
}

const fn default_max_cycle() -> Duration {
    DEFAULT_MAX_CYCLE
}

const fn default_vehicles() -> usize {
    DEFAULT_VEHICLES
}

/// Parses a duration string like `"4000ms"`, `"5s"`, `"2m"`, `"1h"`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if the format is invalid.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidValue {
        field: "duration".to_string(),
        value: s.to_string(),
        expected: "a whole number with suffix ms, s, m, or h".to_string(),
    };

    let (digits, scale_ms) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3_600_000)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60_000)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1000)
    } else {
        return Err(invalid());
    };

    let n: u64 = digits.trim().parse().map_err(|_| invalid())?;
    n.checked_mul(scale_ms)
        .map(Duration::from_millis)
        .ok_or_else(invalid)
}

/// Formats a duration in the largest unit that represents it exactly.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms == 0 {
        "0ms".to_string()
    } else if ms % 3_600_000 == 0 {
        format!("{}h", ms / 3_600_000)
    } else if ms % 60_000 == 0 {
        format!("{}m", ms / 60_000)
    } else if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{ms}ms")
    }
}

mod duration_format {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

mod optional_duration_format {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&super::format_duration(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| super::parse_duration(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
