//! The FPS/period unit family.
//!
//! Frame rates and frame times are two views of the same measurement; the
//! report layer can ask for either. Conversion goes through seconds-per-frame
//! so every pair of units in the family composes. A rate of 0 FPS maps to an
//! infinite period by definition, not as an error.

/// A display unit the conversion family understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Frames per second (a rate; more is better).
    Fps,
    /// Seconds per frame.
    S,
    /// Milliseconds per frame.
    Ms,
    /// Microseconds per frame.
    Us,
}

impl Unit {
    /// Parse a unit string. Returns `None` for units outside the family,
    /// which are displayed verbatim and never converted.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fps" => Some(Self::Fps),
            "s" => Some(Self::S),
            "ms" => Some(Self::Ms),
            "us" | "\u{b5}s" => Some(Self::Us),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fps => "FPS",
            Self::S => "s",
            Self::Ms => "ms",
            Self::Us => "us",
        }
    }

    /// True when larger values mean better performance.
    pub fn more_is_better(&self) -> bool {
        matches!(self, Self::Fps)
    }
}

/// Convert `value` from one unit of the family to another.
pub fn convert(value: f64, from: Unit, to: Unit) -> f64 {
    if from == to {
        return value;
    }
    from_seconds(to_seconds(value, from), to)
}

fn to_seconds(value: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Fps => {
            if value == 0.0 {
                f64::INFINITY
            } else {
                1.0 / value
            }
        }
        Unit::S => value,
        Unit::Ms => value / 1e3,
        Unit::Us => value / 1e6,
    }
}

fn from_seconds(seconds: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Fps => {
            if seconds == 0.0 {
                f64::INFINITY
            } else {
                1.0 / seconds
            }
        }
        Unit::S => seconds,
        Unit::Ms => seconds * 1e3,
        Unit::Us => seconds * 1e6,
    }
}
