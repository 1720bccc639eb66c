//! Error types for Orbit
//!
//! Query handling itself never fails: adding matches to a dead query is a
//! no-op and misbehaving extensions are isolated. The errors here cover the
//! surfaces around it (configuration, persistence, registry bookkeeping).

use thiserror::Error;

/// Errors that can occur in Orbit
#[derive(Debug, Error)]
pub enum OrbitError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extension registry misuse
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("Config serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON errors (usage store)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Misuse of the extension registry. Non-fatal: the registry is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Extension '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("Extension '{0}' is not registered")]
    NotRegistered(String),
}

/// Result type alias for Orbit operations
pub type OrbitResult<T> = Result<T, OrbitError>;
