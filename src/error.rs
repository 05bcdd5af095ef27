//! Custom error types for the crate.
//!
//! This module defines the primary error type, `SimError`, used everywhere a
//! fallible operation can surface a problem to its caller. Using the
//! `thiserror` crate, it provides a centralized and consistent taxonomy:
//!
//! - **`Catalog`** / **`Yaml`**: load-time failures in the device or resource
//!   catalog (duplicate dialogue queries, malformed format directives,
//!   bindings without a matching end-of-message convention). These indicate
//!   an unusable configuration and are fatal at startup.
//! - **`Config`**: wraps errors from the `config` crate when loading
//!   `Settings` from a TOML file.
//! - **`Format`** / **`Parse`**: a value was incompatible with a command's
//!   format directive, or response text did not match the expected shape.
//!   Never silently coerced; always returned to the caller.
//! - **`NoGetter`** / **`NoSetter`** / **`UnknownProperty`**: the requested
//!   operation does not exist on the addressed property.
//! - **`Transport`** / **`Timeout`**: channel failures and bounded-wait
//!   expiry. A timed-out session stays usable; see
//!   [`DeviceSession::drain`](crate::session::DeviceSession::drain).
//! - **`DeviceReported`**: the instrument answered with its configured error
//!   sentinel instead of a value.
//!
//! All per-command errors are recoverable at the session level.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type SimResult<T> = std::result::Result<T, SimError>;

/// Errors surfaced by catalog loading, command dispatch and simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Catalog parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Property '{0}' has no getter")]
    NoGetter(String),

    #[error("Property '{0}' has no setter")]
    NoSetter(String),

    #[error("Unknown property '{0}'")]
    UnknownProperty(String),

    #[error("Unknown resource address '{0}'")]
    UnknownResource(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out after {0:?} waiting for a response")]
    Timeout(Duration),

    #[error("Device reported an error: {0}")]
    DeviceReported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = SimError::NoSetter("ch1".to_string());
        assert_eq!(err.to_string(), "Property 'ch1' has no setter");

        let err = SimError::Timeout(Duration::from_millis(250));
        assert!(err.to_string().contains("250ms"));
    }
}
