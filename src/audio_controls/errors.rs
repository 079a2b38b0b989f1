//! Level-control error types.

use thiserror::Error;

/// Errors that can occur while creating or wiring faders and volmeters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// The requested curve is not one of cubic, IEC or logarithmic.
    #[error("unknown fader type: {0}")]
    UnknownFaderType(String),

    /// A connection was requested for a signal the handler never registered.
    #[error("signal \"{0}\" is not registered")]
    UnknownSignal(String),

    /// A signal name was registered twice on the same handler.
    #[error("signal \"{0}\" is already registered")]
    DuplicateSignal(String),
}
