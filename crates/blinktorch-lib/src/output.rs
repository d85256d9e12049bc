//! Blink outputs: the side effect a controller drives on every toggle.

use std::fmt;

use crate::torch::TorchError;

#[derive(Debug)]
pub enum OutputError {
    /// The light refused exclusive access or the mode change.
    HardwareConfiguration(TorchError),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::HardwareConfiguration(e) => {
                write!(f, "Hardware configuration failed: {e}")
            }
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::HardwareConfiguration(e) => Some(e),
        }
    }
}

impl From<TorchError> for OutputError {
    fn from(e: TorchError) -> Self {
        OutputError::HardwareConfiguration(e)
    }
}

/// Something that can be switched between an "on" and an "off" presentation.
pub trait BlinkOutput {
    /// Short name for log messages, e.g. `"torch"`.
    fn name(&self) -> &'static str;

    /// Present the given state. An error makes the owning controller stop.
    fn apply(&mut self, on: bool) -> Result<(), OutputError>;

    /// Whether blinking this output needs a background-execution lease.
    fn wants_lease(&self) -> bool {
        false
    }
}
