//! Audio source capability surface.
//!
//! Faders and volmeters never own a source. They only need to read and write its
//! linear gain and to listen on its [`SignalHandler`]. [`MemorySource`] is a small
//! thread-safe implementation used by embedders that drive levels themselves.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::audio_controls::errors::ControlError;
use crate::audio_controls::signal::SignalHandler;
use crate::messages::SourceSignal;

/// An upstream audio producer a fader or volmeter can attach to.
///
/// The handler must register every name in
/// [`SourceSignal::NAMES`](crate::audio_controls::Signal::NAMES). `set_volume`
/// may signal [`SourceSignal::Volume`] synchronously; callers never hold a lock
/// while calling it.
pub trait AudioSource: Send + Sync {
    /// Current linear gain.
    fn volume(&self) -> f32;

    /// Sets the linear gain.
    fn set_volume(&self, mul: f32);

    fn signal_handler(&self) -> &SignalHandler<SourceSignal>;
}

/// In-memory source storing its gain atomically.
///
/// Every gain change is echoed as a [`SourceSignal::Volume`] notification on the
/// calling thread. Dropping the source signals [`SourceSignal::Destroy`] unless
/// [`destroy`](Self::destroy) already did.
pub struct MemorySource {
    volume: AtomicU32,
    destroyed: AtomicBool,
    signals: SignalHandler<SourceSignal>,
}

impl MemorySource {
    /// Creates a source at unity gain.
    pub fn new() -> Result<Self, ControlError> {
        Self::with_volume(1.0)
    }

    /// Creates a source at the given linear gain.
    pub fn with_volume(mul: f32) -> Result<Self, ControlError> {
        Ok(Self {
            volume: AtomicU32::new(mul.to_bits()),
            destroyed: AtomicBool::new(false),
            signals: SignalHandler::for_payload()?,
        })
    }

    /// Publishes a raw level sample in linear scale.
    pub fn emit_levels(&self, level: f32, magnitude: f32, peak: f32) {
        self.signals.signal(&SourceSignal::VolumeLevel {
            level,
            magnitude,
            peak,
        });
    }

    /// Announces destruction to every listener. Only the first call signals.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        log::debug!("Source destroyed");
        self.signals.signal(&SourceSignal::Destroy);
    }

    /// Whether [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

impl AudioSource for MemorySource {
    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Acquire))
    }

    fn set_volume(&self, mul: f32) {
        self.volume.store(mul.to_bits(), Ordering::Release);
        self.signals.signal(&SourceSignal::Volume(mul));
    }

    fn signal_handler(&self) -> &SignalHandler<SourceSignal> {
        &self.signals
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Sources with scripted behavior for unit tests elsewhere in the crate.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Changes its own gain the first time its handler is looked up, standing in
    /// for a setter on another thread that lands while a listener is attaching.
    pub(crate) struct ShiftingSource {
        inner: MemorySource,
        shift_to: f32,
        shifted: AtomicBool,
    }

    impl ShiftingSource {
        pub(crate) fn new(volume: f32, shift_to: f32) -> Self {
            Self {
                inner: MemorySource::with_volume(volume).unwrap(),
                shift_to,
                shifted: AtomicBool::new(false),
            }
        }
    }

    impl AudioSource for ShiftingSource {
        fn volume(&self) -> f32 {
            self.inner.volume()
        }

        fn set_volume(&self, mul: f32) {
            self.inner.set_volume(mul);
        }

        fn signal_handler(&self) -> &SignalHandler<SourceSignal> {
            if !self.shifted.swap(true, Ordering::SeqCst) {
                self.inner.set_volume(self.shift_to);
            }
            self.inner.signal_handler()
        }
    }
}
