//! Error types for the SCPI driver layer.
//!
//! This module defines `ScpiError`, the single error type returned by the
//! property engine, the adapters and every instrument driver. It is built with
//! `thiserror` so lower-level errors (`std::io::Error`, `figment::Error`,
//! `serialport::Error`) convert automatically with the `?` operator.
//!
//! ## Error Taxonomy
//!
//! - **`Validation`**: a value was rejected before anything was transmitted.
//!   The instrument is left in its prior state.
//! - **`Lookup`**: a reply token has no logical counterpart in a value map.
//! - **`AccessDenied`**: read of a write-only property or write of a
//!   read-only one.
//! - **`Instrument`**: the device reported errors through an error-check hook.
//! - **`Timeout`** / **`Io`** / **`Serial`** / **`Visa`**: transport failures,
//!   propagated unchanged. Nothing is retried.
//! - **`Config`** / **`Configuration`** / **`FeatureNotEnabled`**: setup
//!   problems detected before talking to hardware.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type ScpiResult<T> = std::result::Result<T, ScpiError>;

/// Primary error type for instrument communication.
#[derive(Error, Debug)]
pub enum ScpiError {
    /// Value rejected by a validator or missing from a value map.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Reply token that does not match any mapped value.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Property does not support the requested direction.
    #[error("Property '{property}' is {access}")]
    AccessDenied {
        /// Name of the property
        property: String,
        /// "read-only" or "write-only"
        access: &'static str,
    },

    /// Errors reported by the instrument itself.
    #[error("Instrument reported errors: {}", .0.join("; "))]
    Instrument(Vec<String>),

    /// No reply within the adapter timeout.
    #[error("Timed out after {0:?} waiting for the instrument")]
    Timeout(Duration),

    /// Standard I/O failure on the underlying byte channel.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened or configured.
    #[cfg(feature = "instrument_serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// VISA library failure.
    #[cfg(feature = "instrument_visa")]
    #[error("VISA error: {0}")]
    Visa(String),

    /// Reply could not be converted to the requested type.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Command template could not be formatted.
    #[error("Format error: {0}")]
    Format(String),

    /// Malformed IEEE 488.2 binary block.
    #[error("Binary block error: {0}")]
    BinaryBlock(String),

    /// Reply exceeded [`crate::limits::MAX_RESPONSE_SIZE`].
    #[error("Response exceeded {max_bytes} bytes")]
    ResponseTooLarge {
        /// Limit that was hit
        max_bytes: usize,
    },

    /// Channel id not provided by the driver.
    #[error("Unknown channel '{0}'")]
    UnknownChannel(String),

    /// Property name not declared by the driver.
    #[error("Unknown property '{0}'")]
    UnknownProperty(String),

    /// Semantic configuration problem.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Configuration file or environment could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Functionality compiled out.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl From<figment::Error> for ScpiError {
    fn from(err: figment::Error) -> Self {
        ScpiError::Config(Box::new(err))
    }
}

impl ScpiError {
    /// Build a validation error from anything displayable.
    pub fn validation(message: impl Into<String>) -> Self {
        ScpiError::Validation(message.into())
    }

    /// True if this error was raised before any bytes were sent.
    pub fn is_rejected_before_send(&self) -> bool {
        matches!(
            self,
            ScpiError::Validation(_)
                | ScpiError::AccessDenied { .. }
                | ScpiError::Format(_)
                | ScpiError::UnknownChannel(_)
        )
    }
}
