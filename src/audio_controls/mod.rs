//! Audio Controls Module
//!
//! This module provides level control for audio sources. It is organized into
//! sub-modules, each with a specific responsibility:
//!
//! - [`curves`]: Conversion curves between fader deflection, dB and linear gain
//! - [`constants`]: Curve breakpoints and fader bounds
//! - [`errors`]: Level-control error types
//! - [`signal`]: Per-instance named signal handler
//! - [`source`]: The audio source capability surface and an in-memory source
//! - [`fader`]: Gain control pushing its value to an attached source
//! - [`volmeter`]: Level meter turning raw samples into display positions
//! - [`tap`]: Ring-buffer bridge for polling signals from another thread
//!
//! Faders and volmeters each own a [`SignalHandler`] and attach to at most one
//! [`AudioSource`] at a time. They never hold their own lock while calling into
//! a source or signalling their observers, so sources may notify synchronously
//! from inside a setter.

use env_logger::{Builder, Env};

mod binding;
pub mod constants;
pub mod curves;
pub mod errors;
pub mod fader;
pub mod signal;
pub mod source;
pub mod tap;
pub mod volmeter;

pub use curves::{FaderType, db_to_mul, mul_to_db};
pub use errors::ControlError;
pub use fader::Fader;
pub use signal::{ListenerId, Signal, SignalCallback, SignalHandler};
pub use source::{AudioSource, MemorySource};
pub use tap::{SignalReceiver, tap};
pub use volmeter::Volmeter;

/// Setup and configure the logger for level-control diagnostics.
pub fn setup_logger() {
    // Default to `info`; per-sample dispatch logs at `trace`.
    // Users can override via `RUST_LOG`, e.g. `RUST_LOG=level_controls=debug`.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init()
        .unwrap_or(()); // Ignore initialization errors
}
