//! `validate` command
//!
//! Loads each configuration file and reports errors and warnings without
//! starting a controller.

use tracing::warn;

use crate::cli::args::ValidateArgs;
use crate::config::load;
use crate::error::{ConfigError, Result};

/// Validates every file in `args`, stopping at the first failure.
///
/// # Errors
///
/// Returns the first load or validation error. With `--strict`, the first
/// warning is reported as a `ConfigError::InvalidValue`.
pub fn run(args: &ValidateArgs) -> Result<()> {
    for path in &args.files {
        let result = load(path)?;

        for warning in &result.warnings {
            warn!(
                path = %path.display(),
                location = warning.location.as_deref().unwrap_or("-"),
                "{}",
                warning.message
            );
        }

        if args.strict {
            if let Some(first) = result.warnings.first() {
                return Err(ConfigError::InvalidValue {
                    field: first.location.clone().unwrap_or_default(),
                    value: first.message.clone(),
                    expected: "no warnings in strict mode".to_string(),
                }
                .into());
            }
        }

        println!("{}: ok", path.display());
    }
    Ok(())
}
