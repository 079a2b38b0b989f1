//! Conversion curves between fader deflection and decibels.
//!
//! Every [`FaderType`] is a matched pair of functions mapping a normalized position
//! (`0.0..=1.0`) to dB and back. The public API works in `f32`; the curves are
//! evaluated in `f64` so the piecewise IEC table stays monotonic across its
//! breakpoints after rounding.

use std::fmt;
use std::str::FromStr;

use crate::audio_controls::constants::{
    FADER_MAX_DB, IEC_BREAKPOINTS, IEC_MIN_POSITION, IEC_TAIL_DB_PER_POSITION, LOG_FADER_MIN_DB,
    LOG_OFFSET_DB, LOG_OFFSET_VAL, LOG_RANGE_DB, LOG_RANGE_VAL,
};
use crate::audio_controls::errors::ControlError;

/// Converts a linear gain multiplier to dB. A gain of zero is `-inf`.
#[inline]
pub fn mul_to_db(mul: f32) -> f32 {
    if mul == 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * mul.log10()
    }
}

/// Converts dB to a linear gain multiplier. `-inf` is a gain of zero.
#[inline]
pub fn db_to_mul(db: f32) -> f32 {
    if db == f32::NEG_INFINITY {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}

/// Taper used to map a fader position to dB.
///
/// The set is closed; a fader or volmeter picks one at construction and keeps it
/// for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaderType {
    /// dB of `position³`, a gentle taper close to perceived loudness.
    Cubic,
    /// Piecewise linear segments modelled on IEC 60268-18 meter scales.
    Iec,
    /// Exponential taper over a fixed 96 dB range.
    Log,
}

impl FaderType {
    /// All curve types, in raw tag order.
    pub const ALL: [FaderType; 3] = [FaderType::Cubic, FaderType::Iec, FaderType::Log];

    /// Maps a normalized position to dB.
    pub fn position_to_db(self, position: f32) -> f32 {
        let position = f64::from(position);
        let db = match self {
            Self::Cubic => cubic_position_to_db(position),
            Self::Iec => iec_position_to_db(position),
            Self::Log => log_position_to_db(position),
        };
        db as f32
    }

    /// Maps dB back to a normalized position.
    pub fn db_to_position(self, db: f32) -> f32 {
        let db = f64::from(db);
        let position = match self {
            Self::Cubic => cubic_db_to_position(db),
            Self::Iec => iec_db_to_position(db),
            Self::Log => log_db_to_position(db),
        };
        position as f32
    }

    /// Fader clamp bounds as `(min_db, max_db)`.
    pub fn db_bounds(self) -> (f32, f32) {
        match self {
            Self::Cubic | Self::Iec => (f32::NEG_INFINITY, FADER_MAX_DB),
            Self::Log => (LOG_FADER_MIN_DB, FADER_MAX_DB),
        }
    }

    /// Configuration name of the curve.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cubic => "cubic",
            Self::Iec => "iec",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for FaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FaderType {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cubic" => Ok(Self::Cubic),
            "iec" => Ok(Self::Iec),
            "log" | "logarithmic" => Ok(Self::Log),
            _ => Err(ControlError::UnknownFaderType(s.to_string())),
        }
    }
}

impl TryFrom<u32> for FaderType {
    type Error = ControlError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or_else(|| ControlError::UnknownFaderType(raw.to_string()))
    }
}

fn cubic_position_to_db(position: f64) -> f64 {
    if position == 1.0 {
        return 0.0;
    }
    if position <= 0.0 {
        return f64::NEG_INFINITY;
    }

    20.0 * (position * position * position).log10()
}

fn cubic_db_to_position(db: f64) -> f64 {
    if db == 0.0 {
        return 1.0;
    }
    if db == f64::NEG_INFINITY {
        return 0.0;
    }

    10.0_f64.powf(db / 20.0).cbrt()
}

fn iec_position_to_db(position: f64) -> f64 {
    if position >= 1.0 {
        return 0.0;
    }
    if position <= 0.0 {
        return f64::NEG_INFINITY;
    }

    for segment in IEC_BREAKPOINTS.windows(2) {
        let (hi_pos, hi_db) = segment[0];
        let (lo_pos, lo_db) = segment[1];
        if position >= lo_pos {
            return lo_db + (position - lo_pos) / (hi_pos - lo_pos) * (hi_db - lo_db);
        }
    }

    let (tail_pos, tail_db) = IEC_BREAKPOINTS[IEC_BREAKPOINTS.len() - 1];
    if position >= IEC_MIN_POSITION {
        return tail_db + (position - tail_pos) * IEC_TAIL_DB_PER_POSITION;
    }

    f64::NEG_INFINITY
}

fn iec_db_to_position(db: f64) -> f64 {
    if db >= 0.0 {
        return 1.0;
    }
    if db == f64::NEG_INFINITY {
        return 0.0;
    }

    for segment in IEC_BREAKPOINTS.windows(2) {
        let (hi_pos, hi_db) = segment[0];
        let (lo_pos, lo_db) = segment[1];
        if db >= lo_db {
            return lo_pos + (db - lo_db) / (hi_db - lo_db) * (hi_pos - lo_pos);
        }
    }

    let (tail_pos, tail_db) = IEC_BREAKPOINTS[IEC_BREAKPOINTS.len() - 1];
    let floor_db = tail_db + (IEC_MIN_POSITION - tail_pos) * IEC_TAIL_DB_PER_POSITION;
    if db >= floor_db {
        return tail_pos + (db - tail_db) / IEC_TAIL_DB_PER_POSITION;
    }

    0.0
}

fn log_position_to_db(position: f64) -> f64 {
    if position >= 1.0 {
        return 0.0;
    }
    if position <= 0.0 {
        return f64::NEG_INFINITY;
    }

    let span = LOG_RANGE_DB + LOG_OFFSET_DB;
    -span * (span / LOG_OFFSET_DB).powf(-position) + LOG_OFFSET_DB
}

fn log_db_to_position(db: f64) -> f64 {
    if db >= 0.0 {
        return 1.0;
    }
    if db <= -LOG_RANGE_DB {
        return 0.0;
    }

    (-(-db + LOG_OFFSET_DB).log10() - LOG_RANGE_VAL) / (LOG_OFFSET_VAL - LOG_RANGE_VAL)
}
