//! Fader: maps a deflection to the gain of an attached source.
//!
//! A [`Fader`] stores its gain in dB and offers it in three units: dB, a
//! normalized deflection (through its [`FaderType`] curve) and a linear
//! multiplier. Setting any of them pushes the linear gain to the attached
//! source. Volume changes that reach the source some other way are re-broadcast
//! as [`FaderSignal::VolumeChanged`].
//!
//! The source echoes every gain the fader pushes. The fader swallows the next
//! notification after each set so its own change is not reported back as an
//! external one. This is a single-slot latch: a second notification arriving
//! before the echo has been consumed is treated as the echo.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::audio_controls::binding::{self, SourceRef, SourceSlot};
use crate::audio_controls::curves::{FaderType, db_to_mul, mul_to_db};
use crate::audio_controls::errors::ControlError;
use crate::audio_controls::signal::{ListenerId, SignalHandler};
use crate::audio_controls::source::AudioSource;
use crate::messages::{FaderSignal, SIGNAL_DESTROY, SIGNAL_VOLUME, SourceSignal};

/// Source signals a fader listens to.
const SOURCE_SIGNALS: [&str; 2] = [SIGNAL_VOLUME, SIGNAL_DESTROY];

struct FaderState {
    /// Current gain in dB.
    cur_db: f32,
    source: SourceSlot,
    /// Set by every local change; consumed by the next source notification.
    ignore_next_signal: bool,
}

struct FaderShared {
    id: ListenerId,
    fader_type: FaderType,
    max_db: f32,
    min_db: f32,
    state: Mutex<FaderState>,
    signals: SignalHandler<FaderSignal>,
}

impl FaderShared {
    fn lock_state(&self) -> MutexGuard<'_, FaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_source_signal(&self, signal: &SourceSignal) {
        match signal {
            SourceSignal::Volume(mul) => self.source_volume_changed(*mul),
            SourceSignal::Destroy => self.detach_source(),
            SourceSignal::VolumeLevel { .. } => {}
        }
    }

    fn source_volume_changed(&self, mul: f32) {
        let db = {
            let mut state = self.lock_state();
            if state.ignore_next_signal {
                state.ignore_next_signal = false;
                log::trace!("Fader {} consumed its own volume echo", self.id);
                return;
            }

            let db = mul_to_db(mul);
            state.cur_db = db;
            db
        };

        self.signals
            .signal(&FaderSignal::VolumeChanged { fader: self.id, db });
    }

    /// Disconnects from the current source, if any. Caller holds the state lock.
    fn release_source(&self, state: &mut FaderState) {
        if let Some(source) = state.source.take() {
            binding::disconnect_listeners(&source, self.id, &SOURCE_SIGNALS);
            log::debug!("Fader {} detached from source", self.id);
        }
    }

    fn detach_source(&self) {
        let mut state = self.lock_state();
        self.release_source(&mut state);
    }
}

/// Gain control bound to at most one [`AudioSource`].
pub struct Fader {
    shared: Arc<FaderShared>,
}

impl Fader {
    /// Creates a detached fader at 0 dB.
    ///
    /// # Returns
    ///
    /// - `Ok(Fader)`: A fader using `fader_type` and its dB bounds
    /// - `Err(ControlError)`: The fader's signal handler could not be set up
    pub fn new(fader_type: FaderType) -> Result<Self, ControlError> {
        let (min_db, max_db) = fader_type.db_bounds();
        let shared = FaderShared {
            id: ListenerId::next(),
            fader_type,
            max_db,
            min_db,
            state: Mutex::new(FaderState {
                cur_db: 0.0,
                source: SourceSlot::default(),
                ignore_next_signal: false,
            }),
            signals: SignalHandler::for_payload()?,
        };

        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    /// Listener identity, also carried by every emitted [`FaderSignal`].
    pub fn id(&self) -> ListenerId {
        self.shared.id
    }

    /// Curve used by the deflection accessors.
    pub fn fader_type(&self) -> FaderType {
        self.shared.fader_type
    }

    /// Upper clamp bound in dB.
    pub fn max_db(&self) -> f32 {
        self.shared.max_db
    }

    /// Lower clamp bound in dB; anything below becomes silence.
    pub fn min_db(&self) -> f32 {
        self.shared.min_db
    }

    /// Handler carrying this fader's [`FaderSignal`]s.
    pub fn signal_handler(&self) -> &SignalHandler<FaderSignal> {
        &self.shared.signals
    }

    /// Sets the gain in dB and pushes it to the attached source.
    ///
    /// Values above the upper bound saturate at it. Values below the lower bound
    /// become `-inf` (silence), not the bound itself. NaN is ignored.
    ///
    /// # Returns
    ///
    /// `true` if the value was stored as given, `false` if it was clamped or
    /// ignored.
    pub fn set_db(&self, db: f32) -> bool {
        if db.is_nan() {
            return false;
        }

        let shared = &self.shared;
        let (source, mul, clamped) = {
            let mut state = shared.lock_state();
            let mut clamped = false;
            let mut db = db;

            if db > shared.max_db {
                db = shared.max_db;
                clamped = true;
            }
            if db < shared.min_db {
                db = f32::NEG_INFINITY;
                clamped = true;
            }

            state.cur_db = db;
            state.ignore_next_signal = true;
            (state.source.get(), db_to_mul(db), clamped)
        };

        if let Some(source) = source {
            source.set_volume(mul);
        }

        !clamped
    }

    /// Current gain in dB.
    pub fn db(&self) -> f32 {
        self.shared.lock_state().cur_db
    }

    /// Sets the gain from a normalized deflection mapped through the fader curve.
    pub fn set_deflection(&self, deflection: f32) -> bool {
        self.set_db(self.shared.fader_type.position_to_db(deflection))
    }

    /// Current gain as a normalized deflection.
    pub fn deflection(&self) -> f32 {
        let db = self.db();
        self.shared.fader_type.db_to_position(db)
    }

    /// Sets the gain from a linear multiplier.
    pub fn set_mul(&self, mul: f32) -> bool {
        self.set_db(mul_to_db(mul))
    }

    /// Current gain as a linear multiplier.
    pub fn mul(&self) -> f32 {
        db_to_mul(self.db())
    }

    /// Attaches the fader to `source`, replacing any previous attachment.
    ///
    /// The fader listens for the source's volume and destroy signals until
    /// detached, then adopts its current gain.
    pub fn attach_source<S>(&self, source: &Arc<S>) -> Result<(), ControlError>
    where
        S: AudioSource + 'static,
    {
        let shared = &self.shared;
        let weak: Weak<S> = Arc::downgrade(source);
        let source_ref: SourceRef = weak;

        let mut state = shared.lock_state();
        shared.release_source(&mut state);

        binding::connect_listeners(
            &**source,
            shared.id,
            shared,
            &SOURCE_SIGNALS,
            FaderShared::on_source_signal,
        )?;

        // Read after connecting: later changes queue behind the state lock.
        let db = mul_to_db(source.volume());
        state.source.set(source_ref);
        state.cur_db = db;
        log::debug!("Fader {} attached to source at {db} dB", shared.id);

        Ok(())
    }

    /// Stops listening to the attached source. Does nothing when detached.
    pub fn detach_source(&self) {
        self.shared.detach_source();
    }

    /// Whether a live source is attached.
    pub fn is_attached(&self) -> bool {
        self.shared.lock_state().source.is_attached()
    }

    /// Detaches and releases the fader.
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for Fader {
    fn drop(&mut self) {
        self.shared.detach_source();
    }
}

impl fmt::Debug for Fader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("Fader")
            .field("id", &self.shared.id)
            .field("fader_type", &self.shared.fader_type)
            .field("db", &state.cur_db)
            .field("attached", &state.source.is_attached())
            .finish()
    }
}
