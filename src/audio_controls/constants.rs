//! Curve and fader configuration constants.

/// Headroom of the logarithmic curve in dB.
pub const LOG_OFFSET_DB: f64 = 6.0;

/// Usable range of the logarithmic curve in dB.
pub const LOG_RANGE_DB: f64 = 96.0;

/// Equals `-log10(LOG_OFFSET_DB)`.
pub const LOG_OFFSET_VAL: f64 = -0.778_151_250_383_643_6;

/// Equals `-log10(LOG_RANGE_DB + LOG_OFFSET_DB)`.
pub const LOG_RANGE_VAL: f64 = -2.008_600_171_761_917_6;

/// IEC 60268-18 style breakpoints as `(position, dB)`, ordered from the top of the
/// fader travel downwards.
pub const IEC_BREAKPOINTS: [(f64, f64); 7] = [
    (1.0, 0.0),
    (0.75, -9.0),
    (0.5, -20.0),
    (0.3, -30.0),
    (0.15, -40.0),
    (0.075, -50.0),
    (0.025, -60.0),
];

/// Lowest position covered by the IEC table; anything below is silence.
pub const IEC_MIN_POSITION: f64 = 0.001;

/// dB travelled by the last IEC segment per unit of position.
pub const IEC_TAIL_DB_PER_POSITION: f64 = 90.0 / 0.025;

/// Upper fader bound shared by every curve.
pub const FADER_MAX_DB: f32 = 0.0;

/// Lower fader bound of the logarithmic curve.
pub const LOG_FADER_MIN_DB: f32 = -96.0;

/// Default capacity of a signal tap ring buffer.
pub const DEFAULT_TAP_CAPACITY: usize = 256;
