//! Error handling for the dartgen code generation library.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. It uses `thiserror` for easy
//! error handling and implements conversions from common error types.
//!
//! # Examples
//!
//! ```
//! use dartgen_core::error::{Error, Result};
//!
//! fn might_fail(dir_exists: bool) -> Result<()> {
//!     if !dir_exists {
//!         return Err(Error::input("input directory does not exist"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(might_fail(false).is_err());
//! ```

use thiserror::Error;

/// Result type for dartgen generation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dartgen generation operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or missing generator input (directory, document)
    #[error("Input error: {0}")]
    Input(String),

    /// OpenAPI error
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// Template error
    #[error("Template error: {0}")]
    Template(String),

    /// Template engine error
    #[error("Template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The target service file could not be patched
    #[error("Service file error: {0}")]
    Surgery(String),
}

impl Error {
    /// Create a new input error
    pub fn input<S: Into<String>>(msg: S) -> Self {
        Self::Input(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new OpenAPI error
    pub fn openapi<S: Into<String>>(msg: S) -> Self {
        Self::OpenApi(msg.into())
    }

    /// Create a new template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Self::Template(msg.into())
    }

    /// Create a new service file error
    pub fn surgery<S: Into<String>>(msg: S) -> Self {
        Self::Surgery(msg.into())
    }

    /// Whether the error was caused by the generator input rather than by
    /// generation itself. Input errors are raised before anything is written.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Input(_) | Self::Json(_))
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Config(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Config(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_classified() {
        assert!(Error::input("missing").is_input_error());
        assert!(!Error::surgery("no class").is_input_error());
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(Error::from(json_err).is_input_error());
    }

    #[test]
    fn test_display_prefixes() {
        assert_eq!(
            Error::openapi("Schema 'X' not found").to_string(),
            "OpenAPI error: Schema 'X' not found"
        );
        assert_eq!(Error::from("bad").to_string(), "Configuration error: bad");
    }
}
