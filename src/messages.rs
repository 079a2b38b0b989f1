//! Signal payloads exchanged between sources, faders, volmeters and their observers.
//!
//! Each enum is the payload type of one [`SignalHandler`](crate::audio_controls::SignalHandler);
//! the variant decides which registered signal name it is dispatched under.

use crate::audio_controls::signal::{ListenerId, Signal};

/// Source volume changed; carries the new linear gain.
pub const SIGNAL_VOLUME: &str = "volume";

/// Source produced a raw level sample.
pub const SIGNAL_VOLUME_LEVEL: &str = "volume_level";

/// Source is being destroyed.
pub const SIGNAL_DESTROY: &str = "destroy";

/// Fader observed an external volume change.
pub const SIGNAL_VOLUME_CHANGED: &str = "volume_changed";

/// Volmeter produced display levels.
pub const SIGNAL_LEVELS_UPDATED: &str = "levels_updated";

/// Message emitted by an audio source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceSignal {
    /// The source volume changed.
    ///
    /// # Parameters
    /// * `0` - New linear gain multiplier
    Volume(f32),

    /// Raw level sample, all values in linear scale (pre-fader).
    VolumeLevel {
        level: f32,
        magnitude: f32,
        peak: f32,
    },

    /// The source is going away; listeners must stop referencing it.
    Destroy,
}

impl Signal for SourceSignal {
    const NAMES: &'static [&'static str] = &[SIGNAL_VOLUME, SIGNAL_VOLUME_LEVEL, SIGNAL_DESTROY];

    fn name(&self) -> &'static str {
        match self {
            SourceSignal::Volume(_) => SIGNAL_VOLUME,
            SourceSignal::VolumeLevel { .. } => SIGNAL_VOLUME_LEVEL,
            SourceSignal::Destroy => SIGNAL_DESTROY,
        }
    }
}

/// Message emitted by a fader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaderSignal {
    /// The attached source changed volume without going through the fader.
    VolumeChanged { fader: ListenerId, db: f32 },
}

impl FaderSignal {
    pub fn fader(&self) -> ListenerId {
        match self {
            FaderSignal::VolumeChanged { fader, .. } => *fader,
        }
    }

    pub fn db(&self) -> f32 {
        match self {
            FaderSignal::VolumeChanged { db, .. } => *db,
        }
    }
}

impl Signal for FaderSignal {
    const NAMES: &'static [&'static str] = &[SIGNAL_VOLUME_CHANGED];

    fn name(&self) -> &'static str {
        match self {
            FaderSignal::VolumeChanged { .. } => SIGNAL_VOLUME_CHANGED,
        }
    }
}

/// Message emitted by a volmeter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolmeterSignal {
    /// Curve-mapped, gain-compensated levels of the last sample.
    LevelsUpdated {
        volmeter: ListenerId,
        level: f32,
        magnitude: f32,
        peak: f32,
    },
}

impl VolmeterSignal {
    pub fn volmeter(&self) -> ListenerId {
        match self {
            VolmeterSignal::LevelsUpdated { volmeter, .. } => *volmeter,
        }
    }

    /// Returns `(level, magnitude, peak)`.
    pub fn levels(&self) -> (f32, f32, f32) {
        match self {
            VolmeterSignal::LevelsUpdated {
                level,
                magnitude,
                peak,
                ..
            } => (*level, *magnitude, *peak),
        }
    }
}

impl Signal for VolmeterSignal {
    const NAMES: &'static [&'static str] = &[SIGNAL_LEVELS_UPDATED];

    fn name(&self) -> &'static str {
        match self {
            VolmeterSignal::LevelsUpdated { .. } => SIGNAL_LEVELS_UPDATED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_registered_for_every_variant() {
        let source_signals = [
            SourceSignal::Volume(1.0),
            SourceSignal::VolumeLevel {
                level: 0.0,
                magnitude: 0.0,
                peak: 0.0,
            },
            SourceSignal::Destroy,
        ];
        for signal in source_signals {
            assert!(SourceSignal::NAMES.contains(&signal.name()));
        }

        let fader = FaderSignal::VolumeChanged {
            fader: ListenerId::next(),
            db: -6.0,
        };
        assert!(FaderSignal::NAMES.contains(&fader.name()));

        let volmeter = VolmeterSignal::LevelsUpdated {
            volmeter: ListenerId::next(),
            level: 0.1,
            magnitude: 0.2,
            peak: 0.3,
        };
        assert!(VolmeterSignal::NAMES.contains(&volmeter.name()));
    }

    #[test]
    fn test_accessors() {
        let id = ListenerId::next();

        let fader = FaderSignal::VolumeChanged { fader: id, db: -6.0 };
        assert_eq!(fader.fader(), id);
        assert_eq!(fader.db(), -6.0);

        let volmeter = VolmeterSignal::LevelsUpdated {
            volmeter: id,
            level: 0.1,
            magnitude: 0.2,
            peak: 0.3,
        };
        assert_eq!(volmeter.volmeter(), id);
        assert_eq!(volmeter.levels(), (0.1, 0.2, 0.3));
    }
}
