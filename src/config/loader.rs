//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check and raw read
//! 2. UTF-8 BOM stripping
//! 3. YAML parsing into [`SignalConfig`]
//! 4. Validation (hard errors and warnings)

use std::path::Path;

use crate::config::schema::SignalConfig;
use crate::error::ConfigError;

/// Default upper bound on configuration file size.
const DEFAULT_MAX_CONFIG_SIZE: usize = 64 * 1024;

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: SignalConfig,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Loads and validates a configuration file.
///
/// The size limit defaults to 64 KiB and can be raised with
/// `TRAFFICSIGNAL_MAX_CONFIG_SIZE`.
///
/// # Errors
///
/// Returns `ConfigError::MissingFile` if the file cannot be read,
/// `ConfigError::ParseError` for malformed YAML, and
/// `ConfigError::InvalidValue` for values that fail validation.
pub fn load(path: &Path) -> Result<LoadResult, ConfigError> {
    let max_size = env_or("TRAFFICSIGNAL_MAX_CONFIG_SIZE", DEFAULT_MAX_CONFIG_SIZE);

    let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
        path: path.to_path_buf(),
    })?;

    let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
    if file_size > max_size {
        return Err(ConfigError::InvalidValue {
            field: "file_size".to_string(),
            value: format!("{file_size} bytes"),
            expected: format!("at most {max_size} bytes"),
        });
    }

    let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
        path: path.to_path_buf(),
    })?;

    load_str(&raw, path)
}

/// Parses and validates configuration text. `path` is only used in errors.
///
/// # Errors
///
/// Returns `ConfigError::ParseError` for malformed YAML and
/// `ConfigError::InvalidValue` for values that fail validation.
pub fn load_str(raw: &str, path: &Path) -> Result<LoadResult, ConfigError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let config: SignalConfig = if raw.trim().is_empty() {
        SignalConfig::default()
    } else {
        serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?
    };

    let warnings = validate(&config)?;
    Ok(LoadResult { config, warnings })
}

/// Checks a configuration for invalid values.
///
/// Returns the non-fatal warnings on success.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for the first hard error found.
pub fn validate(config: &SignalConfig) -> Result<Vec<LoadWarning>, ConfigError> {
    let mut warnings = Vec::new();

    if config.cycle.min.is_zero() {
        return Err(invalid("cycle.min", "0ms", "a positive duration"));
    }
    if config.cycle.min > config.cycle.max {
        return Err(ConfigError::InvalidValue {
            field: "cycle.max".to_string(),
            value: format!("{:?}", config.cycle.max),
            expected: format!("at least cycle.min ({:?})", config.cycle.min),
        });
    }
    if config.poll_interval.is_zero() {
        return Err(invalid("poll_interval", "0ms", "a positive duration"));
    }
    if let Some(fixed) = config.fixed_cycle {
        if fixed.is_zero() {
            return Err(invalid("fixed_cycle", "0ms", "a positive duration"));
        }
        if fixed < config.cycle.min || fixed > config.cycle.max {
            warnings.push(LoadWarning {
                message: format!(
                    "fixed cycle {fixed:?} lies outside [{:?}, {:?}]",
                    config.cycle.min, config.cycle.max
                ),
                location: Some("fixed_cycle".to_string()),
            });
        }
        if config.seed.is_some() {
            warnings.push(LoadWarning {
                message: "seed has no effect with a fixed cycle".to_string(),
                location: Some("seed".to_string()),
            });
        }
    }
    if config.poll_interval > config.cycle.min {
        warnings.push(LoadWarning {
            message: format!(
                "poll interval {:?} exceeds the shortest cycle; toggles will lag",
                config.poll_interval
            ),
            location: Some("poll_interval".to_string()),
        });
    }
    if config.vehicles == 0 {
        warnings.push(LoadWarning {
            message: "no vehicles configured; the signal will toggle unobserved".to_string(),
            location: Some("vehicles".to_string()),
        });
    }

    Ok(warnings)
}

fn invalid(field: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;

    fn path() -> PathBuf {
        PathBuf::from("signal.yaml")
    }

    #[test]
    fn test_empty_input_is_default() {
        let result = load_str("", &path()).unwrap();
        assert_eq!(result.config, SignalConfig::default());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_bom_is_stripped() {
        let result = load_str("\u{feff}vehicles: 2\n", &path()).unwrap();
        assert_eq!(result.config.vehicles, 2);
    }

    #[test]
    fn test_parse_error_carries_path() {
        let err = load_str("cycle: [", &path()).unwrap_err();
        match err {
            ConfigError::ParseError { path, .. } => assert_eq!(path, PathBuf::from("signal.yaml")),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_min_greater_than_max_rejected() {
        let err = load_str("cycle:\n  min: 6s\n  max: 4s\n", &path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "cycle.max"));
    }

    #[test]
    fn test_zero_cycle_rejected() {
        let err = load_str("cycle:\n  min: 0ms\n  max: 1s\n", &path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "cycle.min"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let err = load_str("poll_interval: 0ms\n", &path()).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "poll_interval")
        );
    }

    #[test]
    fn test_slow_poll_warns() {
        let result = load_str("poll_interval: 10s\n", &path()).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].location.as_deref(), Some("poll_interval"));
    }

    #[test]
    fn test_fixed_cycle_outside_range_warns() {
        let result = load_str("fixed_cycle: 1s\nseed: 3\n", &path()).unwrap();
        let locations: Vec<_> = result
            .warnings
            .iter()
            .filter_map(|w| w.location.as_deref())
            .collect();
        assert_eq!(locations, vec!["fixed_cycle", "seed"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cycle:\n  min: 100ms\n  max: 200ms\nseed: 11").unwrap();

        let result = load(file.path()).unwrap();
        assert_eq!(result.config.cycle.min, Duration::from_millis(100));
        assert_eq!(result.config.cycle.max, Duration::from_millis(200));
        assert_eq!(result.config.seed, Some(11));
    }
}
