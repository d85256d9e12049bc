//! Unified error type for the blinktorch-lib crate.
//!
//! [`BlinkError`] wraps module-specific errors (`RateError`, `TorchError`,
//! `OutputError`, `LeaseError`) and the string-carrying `Config` and `Color`
//! kinds. `From` impls let `?` propagate across module boundaries.

use std::fmt;
use std::time::Duration;

use crate::lease::LeaseError;
use crate::output::OutputError;
use crate::rate::RateError;
use crate::torch::TorchError;

#[derive(Debug)]
pub enum BlinkError {
    /// Blink rate validation or parsing.
    Rate(RateError),
    /// Light source access (discovery, lock, mode).
    Torch(TorchError),
    /// An output failed while being driven.
    Output(OutputError),
    /// Background-execution lease could not be acquired.
    Lease(LeaseError),
    /// Standard I/O error (config persistence, LED discovery).
    Io(std::io::Error),
    /// A controller was asked to toggle with a zero interval.
    InvalidInterval(Duration),
    /// Configuration validation error.
    Config(String),
    /// Color parsing error.
    Color(String),
}

impl fmt::Display for BlinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlinkError::Rate(e) => write!(f, "{e}"),
            BlinkError::Torch(e) => write!(f, "{e}"),
            BlinkError::Output(e) => write!(f, "{e}"),
            BlinkError::Lease(e) => write!(f, "{e}"),
            BlinkError::Io(e) => write!(f, "I/O error: {e}"),
            BlinkError::InvalidInterval(d) => {
                write!(f, "Blink interval must be positive, got {d:?}")
            }
            BlinkError::Config(e) => write!(f, "Config error: {e}"),
            BlinkError::Color(e) => write!(f, "Color error: {e}"),
        }
    }
}

impl std::error::Error for BlinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlinkError::Rate(e) => Some(e),
            BlinkError::Torch(e) => Some(e),
            BlinkError::Output(e) => Some(e),
            BlinkError::Lease(e) => Some(e),
            BlinkError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RateError> for BlinkError {
    fn from(e: RateError) -> Self {
        BlinkError::Rate(e)
    }
}

impl From<TorchError> for BlinkError {
    fn from(e: TorchError) -> Self {
        BlinkError::Torch(e)
    }
}

impl From<OutputError> for BlinkError {
    fn from(e: OutputError) -> Self {
        BlinkError::Output(e)
    }
}

impl From<LeaseError> for BlinkError {
    fn from(e: LeaseError) -> Self {
        BlinkError::Lease(e)
    }
}

impl From<std::io::Error> for BlinkError {
    fn from(e: std::io::Error) -> Self {
        BlinkError::Io(e)
    }
}

/// Crate-level Result alias using [`BlinkError`].
pub type Result<T> = std::result::Result<T, BlinkError>;
