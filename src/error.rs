//! Error types shared by the SCF engine

use thiserror::Error;

/// Errors raised by the tight-binding SCF engine.
///
/// Running out of SCF cycles is not an error: it is reported through
/// [`crate::ScfStatus::MaxIterationsReached`] so the partial result stays
/// inspectable.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScfError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Numerical error: {0}")]
    Numerical(String),
}

pub type Result<T> = std::result::Result<T, ScfError>;

impl ScfError {
    pub fn config(msg: impl Into<String>) -> Self {
        ScfError::Configuration(msg.into())
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        ScfError::Numerical(msg.into())
    }
}
