//! Credential resolution
//!
//! The API key for the reasoning engine is resolved at startup, in
//! order: the `FOREMAN_API_KEY` environment variable, the
//! `OPENAI_API_KEY` environment variable, then the OS keychain entry
//! under service `foreman`. A missing credential is a startup failure;
//! it is never prompted for and never read from the config file.
//!
//! Keychain backends by platform:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (libsecret)

pub mod string;

pub use string::SecretString;

use keyring::Entry;
use sdk::EngineError;
use tracing::debug;

/// Environment variable checked first
pub const API_KEY_ENV: &str = "FOREMAN_API_KEY";

/// Fallback environment variable, matching the upstream API's own name
pub const API_KEY_ENV_FALLBACK: &str = "OPENAI_API_KEY";

/// Keychain service name
const KEYRING_SERVICE: &str = "foreman";

/// Keychain entry key
const KEYRING_KEY: &str = "api_key";

/// Resolve the reasoning API key.
///
/// # Errors
///
/// Returns [`EngineError::MissingCredential`] when neither environment
/// variable is set and the keychain has no entry, and
/// [`EngineError::Config`] when the keychain backend itself fails.
pub fn resolve_api_key() -> Result<SecretString, EngineError> {
    for var in [API_KEY_ENV, API_KEY_ENV_FALLBACK] {
        if let Ok(value) = std::env::var(var) {
            if !value.trim().is_empty() {
                debug!(source = var, "resolved API key from environment");
                return Ok(SecretString::new(value));
            }
        }
    }

    let entry = Entry::new(KEYRING_SERVICE, KEYRING_KEY)
        .map_err(|e| EngineError::Config(format!("Failed to open keyring entry: {}", e)))?;

    match entry.get_password() {
        Ok(secret) => {
            debug!("resolved API key from keychain");
            Ok(SecretString::new(secret))
        }
        Err(keyring::Error::NoEntry) => {
            Err(EngineError::MissingCredential(API_KEY_ENV.to_string()))
        }
        Err(e) => Err(EngineError::Config(format!(
            "Failed to read keyring entry: {}",
            e
        ))),
    }
}

/// Store the API key in the OS keychain.
///
/// Used by the `login` subcommand so the key survives across shells
/// without living in any file.
pub fn store_api_key(value: &str) -> Result<(), EngineError> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_KEY)
        .map_err(|e| EngineError::Config(format!("Failed to open keyring entry: {}", e)))?;

    entry
        .set_password(value)
        .map_err(|e| EngineError::Config(format!("Failed to store keyring entry: {}", e)))?;

    Ok(())
}
