//! Fader and volume meter controls bound to audio sources.

pub mod audio_controls;
pub mod messages;

pub use audio_controls::{
    AudioSource, ControlError, Fader, FaderType, ListenerId, MemorySource, SignalHandler,
    Volmeter, setup_logger,
};
pub use messages::{FaderSignal, SourceSignal, VolmeterSignal};
