//! Error types
//!
//! Cache operations never fail; these cover configuration and the
//! inspection shell.

use thiserror::Error;

// == Config Error Enum ==
/// Errors raised while loading configuration from the environment.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but is not an unsigned integer
    #[error("{var} must be a whole number of milliseconds, got {value:?}")]
    InvalidNumber { var: String, value: String },

    /// Interval variable is zero
    #[error("{0} must be greater than zero")]
    ZeroInterval(String),

    /// Unrecognized expiry mode
    #[error("Unknown expiry mode {0:?}, expected \"best-effort\" or \"strict\"")]
    InvalidMode(String),
}

// == Shell Error Enum ==
/// Errors raised while parsing an inspection shell command.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShellError {
    /// Command was given without a required argument
    #[error("{command} command requires {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    /// Command word not recognized
    #[error("Unknown command")]
    UnknownCommand(String),
}

// == Result Type Alias ==
/// Convenience Result type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;
