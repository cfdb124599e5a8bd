//! Error types for the background-connection service.
//!
//! Registry operations report their expected outcomes (full accept list,
//! nothing to remove) as plain booleans; this module covers everything
//! around them: configuration, address parsing and the manager task.

use thiserror::Error;

/// Main error type for the background-connection service.
#[derive(Error, Debug)]
pub enum BgConnError {
   #[error("I/O error: {0}")]
   Io(#[from] std::io::Error),

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),

   #[error("Invalid Bluetooth address: {0}")]
   InvalidAddress(String),

   #[error("Manager has been shut down")]
   ManagerShutdown,
}

/// Convenience type alias for Results with `BgConnError`.
pub type Result<T> = std::result::Result<T, BgConnError>;
