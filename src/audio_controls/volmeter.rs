//! Volume meter producing display levels for an attached source.
//!
//! Raw level samples arrive pre-fader and in linear scale. The [`Volmeter`]
//! multiplies each value by the source's last known gain, converts it to dB and
//! maps it through its curve, so the emitted levels read as post-fader
//! positions.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::audio_controls::binding::{self, SourceRef, SourceSlot};
use crate::audio_controls::curves::{FaderType, db_to_mul, mul_to_db};
use crate::audio_controls::errors::ControlError;
use crate::audio_controls::signal::{ListenerId, SignalHandler};
use crate::audio_controls::source::AudioSource;
use crate::messages::{
    SIGNAL_DESTROY, SIGNAL_VOLUME, SIGNAL_VOLUME_LEVEL, SourceSignal, VolmeterSignal,
};

const SOURCE_SIGNALS: [&str; 3] = [SIGNAL_VOLUME, SIGNAL_VOLUME_LEVEL, SIGNAL_DESTROY];

struct VolmeterState {
    /// Source gain in dB, tracked from volume notifications.
    cur_db: f32,
    source: SourceSlot,
}

struct VolmeterShared {
    id: ListenerId,
    fader_type: FaderType,
    state: Mutex<VolmeterState>,
    signals: SignalHandler<VolmeterSignal>,
}

impl VolmeterShared {
    fn lock_state(&self) -> MutexGuard<'_, VolmeterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_source_signal(&self, signal: &SourceSignal) {
        match *signal {
            SourceSignal::Volume(mul) => self.lock_state().cur_db = mul_to_db(mul),
            SourceSignal::VolumeLevel {
                level,
                magnitude,
                peak,
            } => self.source_volume_levels(level, magnitude, peak),
            SourceSignal::Destroy => self.detach_source(),
        }
    }

    fn source_volume_levels(&self, level: f32, magnitude: f32, peak: f32) {
        let (level, magnitude, peak) = {
            let state = self.lock_state();
            let mul = db_to_mul(state.cur_db);
            let to_position = |value: f32| self.fader_type.db_to_position(mul_to_db(value * mul));
            (to_position(level), to_position(magnitude), to_position(peak))
        };

        log::trace!("Volmeter {} levels {level} / {magnitude} / {peak}", self.id);
        self.signals.signal(&VolmeterSignal::LevelsUpdated {
            volmeter: self.id,
            level,
            magnitude,
            peak,
        });
    }

    fn release_source(&self, state: &mut VolmeterState) {
        if let Some(source) = state.source.take() {
            binding::disconnect_listeners(&source, self.id, &SOURCE_SIGNALS);
            log::debug!("Volmeter {} detached from source", self.id);
        }
    }

    fn detach_source(&self) {
        let mut state = self.lock_state();
        self.release_source(&mut state);
    }
}

/// Level meter bound to at most one [`AudioSource`].
pub struct Volmeter {
    shared: Arc<VolmeterShared>,
}

impl Volmeter {
    /// Creates a detached volmeter mapping levels through `fader_type`.
    pub fn new(fader_type: FaderType) -> Result<Self, ControlError> {
        let shared = VolmeterShared {
            id: ListenerId::next(),
            fader_type,
            state: Mutex::new(VolmeterState {
                cur_db: 0.0,
                source: SourceSlot::default(),
            }),
            signals: SignalHandler::for_payload()?,
        };

        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    /// Listener identity, also carried by every emitted [`VolmeterSignal`].
    pub fn id(&self) -> ListenerId {
        self.shared.id
    }

    /// Curve the emitted levels are mapped through.
    pub fn fader_type(&self) -> FaderType {
        self.shared.fader_type
    }

    /// Handler carrying this volmeter's [`VolmeterSignal`]s.
    pub fn signal_handler(&self) -> &SignalHandler<VolmeterSignal> {
        &self.shared.signals
    }

    /// Last known source gain in dB. Informational only.
    pub fn db(&self) -> f32 {
        self.shared.lock_state().cur_db
    }

    /// Attaches the volmeter to `source`, replacing any previous attachment.
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
            VolmeterShared::on_source_signal,
        )?;

        // Read after connecting: later changes queue behind the state lock.
        let db = mul_to_db(source.volume());
        state.source.set(source_ref);
        state.cur_db = db;
        log::debug!("Volmeter {} attached to source at {db} dB", shared.id);

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

    /// Detaches and releases the volmeter.
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for Volmeter {
    fn drop(&mut self) {
        self.shared.detach_source();
    }
}

impl fmt::Debug for Volmeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("Volmeter")
            .field("id", &self.shared.id)
            .field("fader_type", &self.shared.fader_type)
            .field("db", &state.cur_db)
            .field("attached", &state.source.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_controls::fader::Fader;
    use crate::audio_controls::source::MemorySource;
    use crate::audio_controls::source::testing::ShiftingSource;
    use crate::messages::SIGNAL_LEVELS_UPDATED;

    fn create_test_source(volume: f32) -> Arc<MemorySource> {
        Arc::new(MemorySource::with_volume(volume).unwrap())
    }

    fn record(volmeter: &Volmeter) -> Arc<Mutex<Vec<VolmeterSignal>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        volmeter
            .signal_handler()
            .connect(SIGNAL_LEVELS_UPDATED, ListenerId::next(), move |signal| {
                sink.lock().unwrap().push(*signal);
            })
            .unwrap();
        log
    }

    #[test]
    fn test_volmeter_creation() {
        let volmeter = Volmeter::new(FaderType::Log).unwrap();
        assert_eq!(volmeter.fader_type(), FaderType::Log);
        assert_eq!(volmeter.db(), 0.0);
        assert!(!volmeter.is_attached());
    }

    #[test]
    fn test_attach_adopts_source_volume() {
        let source = create_test_source(0.25);
        let volmeter = Volmeter::new(FaderType::Cubic).unwrap();

        volmeter.attach_source(&source).unwrap();

        assert!(volmeter.is_attached());
        assert!((volmeter.db() - mul_to_db(0.25)).abs() < 1e-6);
        for name in SOURCE_SIGNALS {
            assert_eq!(source.signal_handler().connection_count(name), 1);
        }
    }

    #[test]
    fn test_attach_sees_gain_changed_while_connecting() {
        let source = Arc::new(ShiftingSource::new(1.0, 0.25));
        let volmeter = Volmeter::new(FaderType::Log).unwrap();

        volmeter.attach_source(&source).unwrap();

        assert!((volmeter.db() - mul_to_db(0.25)).abs() < 1e-6);
    }

    #[test]
    fn test_levels_are_gain_compensated() {
        for fader_type in FaderType::ALL {
            let source = create_test_source(0.5);
            let volmeter = Volmeter::new(fader_type).unwrap();
            volmeter.attach_source(&source).unwrap();
            let log = record(&volmeter);

            source.emit_levels(0.5, 0.25, 0.8);

            let gain = db_to_mul(volmeter.db());
            let expected = |sample: f32| fader_type.db_to_position(mul_to_db(sample * gain));

            let events = log.lock().unwrap().clone();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].volmeter(), volmeter.id());

            let (level, magnitude, peak) = events[0].levels();
            assert!((level - expected(0.5)).abs() < 1e-6, "{fader_type}");
            assert!((magnitude - expected(0.25)).abs() < 1e-6, "{fader_type}");
            assert!((peak - expected(0.8)).abs() < 1e-6, "{fader_type}");
        }
    }

    #[test]
    fn test_unity_gain_maps_straight_through_curve() {
        let source = create_test_source(1.0);
        let volmeter = Volmeter::new(FaderType::Iec).unwrap();
        volmeter.attach_source(&source).unwrap();
        let log = record(&volmeter);

        source.emit_levels(0.1, 1.0, 0.0);

        let (level, magnitude, peak) = log.lock().unwrap()[0].levels();
        assert!((level - FaderType::Iec.db_to_position(-20.0)).abs() < 1e-5);
        assert_eq!(magnitude, 1.0);
        assert_eq!(peak, 0.0);
    }

    #[test]
    fn test_volume_change_updates_compensation_silently() {
        let source = create_test_source(1.0);
        let volmeter = Volmeter::new(FaderType::Cubic).unwrap();
        volmeter.attach_source(&source).unwrap();
        let log = record(&volmeter);

        source.set_volume(0.1);
        assert!(log.lock().unwrap().is_empty());
        assert!((volmeter.db() - (-20.0)).abs() < 1e-4);

        source.emit_levels(1.0, 1.0, 1.0);
        let (level, _, _) = log.lock().unwrap()[0].levels();
        assert!((level - FaderType::Cubic.db_to_position(-20.0)).abs() < 1e-5);

        source.set_volume(0.0);
        source.emit_levels(1.0, 1.0, 1.0);
        assert_eq!(log.lock().unwrap()[1].levels(), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_tracks_fader_changes() {
        let source = create_test_source(1.0);
        let fader = Fader::new(FaderType::Cubic).unwrap();
        let volmeter = Volmeter::new(FaderType::Cubic).unwrap();
        fader.attach_source(&source).unwrap();
        volmeter.attach_source(&source).unwrap();

        fader.set_db(-6.0);

        assert!((volmeter.db() - (-6.0)).abs() < 1e-4);
    }

    #[test]
    fn test_attach_replaces_previous_source() {
        let first = create_test_source(1.0);
        let second = create_test_source(0.5);
        let volmeter = Volmeter::new(FaderType::Log).unwrap();
        let log = record(&volmeter);

        volmeter.attach_source(&first).unwrap();
        volmeter.attach_source(&second).unwrap();

        for name in SOURCE_SIGNALS {
            assert_eq!(first.signal_handler().connection_count(name), 0);
            assert_eq!(second.signal_handler().connection_count(name), 1);
        }

        first.emit_levels(1.0, 1.0, 1.0);
        assert!(log.lock().unwrap().is_empty());

        second.emit_levels(1.0, 1.0, 1.0);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_source_destroy_detaches() {
        let source = create_test_source(1.0);
        let volmeter = Volmeter::new(FaderType::Cubic).unwrap();
        volmeter.attach_source(&source).unwrap();
        let log = record(&volmeter);

        source.destroy();

        assert!(!volmeter.is_attached());
        source.emit_levels(1.0, 1.0, 1.0);
        assert!(log.lock().unwrap().is_empty());
        for name in SOURCE_SIGNALS {
            assert_eq!(source.signal_handler().connection_count(name), 0);
        }
    }

    #[test]
    fn test_detach_and_destroy() {
        let source = create_test_source(1.0);
        let volmeter = Volmeter::new(FaderType::Cubic).unwrap();

        volmeter.detach_source();
        volmeter.attach_source(&source).unwrap();
        volmeter.detach_source();
        assert!(!volmeter.is_attached());

        volmeter.attach_source(&source).unwrap();
        volmeter.destroy();
        for name in SOURCE_SIGNALS {
            assert_eq!(source.signal_handler().connection_count(name), 0);
        }
    }
}
