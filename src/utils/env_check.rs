//! Precondition checks for required configuration variables

use crate::config::Config;
use crate::errors::{BackupError, Result};
use tracing::debug;

/// Find which of `names` cannot be resolved from the environment or the config.
///
/// A name is present when the process environment holds a non-empty value for it
/// or the config exposes a non-empty value under the same name. Missing names are
/// returned in the order given. With `raise_on_missing` a non-empty result becomes
/// [`BackupError::MissingVariables`] listing exactly the missing names.
pub fn check_env_variables(
    names: &[&str],
    config: &Config,
    raise_on_missing: bool,
) -> Result<Vec<String>> {
    let mut missing: Vec<String> = Vec::new();

    for name in names {
        if config.lookup(name).is_none() && !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
    }

    if !missing.is_empty() {
        debug!("Missing required variables: {:?}", missing);
        if raise_on_missing {
            return Err(BackupError::MissingVariables(missing));
        }
    }

    Ok(missing)
}
