//! Error types for identifier validation and fixed-point arithmetic.

use thiserror::Error;

/// Errors that can occur while validating or decoding identifiers (public
/// keys, signatures) that round-trip through base58.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Decoded base58 payload is not the expected byte width.
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// Base58 alphabet/checksum failure.
    #[error("invalid base58 string: {0}")]
    InvalidBase58(String),

    /// Custom validation failure with message.
    #[error("validation failed: {message}")]
    Custom { message: String },
}

/// Errors that can occur during fixed-point arithmetic operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FixedPointError {
    /// Value exceeds the maximum representable value for the type.
    #[error("overflow: value {value} exceeds maximum representable value")]
    Overflow { value: f64 },

    /// Value is below the minimum representable value for the type.
    #[error("underflow: value {value} is below minimum representable value")]
    Underflow { value: f64 },

    /// Invalid decimal string format.
    #[error("invalid decimal string: '{input}' - expected numeric format")]
    InvalidDecimal { input: String },

    /// Division by zero in fixed-point arithmetic.
    #[error("division by zero in fixed-point arithmetic")]
    DivisionByZero,

    /// Value is not finite (NaN or infinity).
    #[error("value is not finite: {value}")]
    NotFinite { value: f64 },
}
