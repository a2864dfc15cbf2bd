use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

/// Shape of the notch marking the top of each section.
/// Takes the height within the marker band, in [0, 1], and returns how much of the nominal radius is kept: 1 at both
/// edges of the band, dipping to 0 (full marker depth) in between.
pub trait DeformFunction {
    fn profile(&self, h: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Marker {
    /// Smooth single dip, `cos(2πh)/2 + 0.5`
    #[default]
    Cosine,
    /// Straight sided V, `|2h - 1|`
    Vee,
}

impl DeformFunction for Marker {
    fn profile(&self, h: f64) -> f64 {
        match self {
            Marker::Cosine => (TAU * h).cos() / 2.0 + 0.5,
            Marker::Vee => (2.0 * h - 1.0).abs(),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Cosine => write!(f, "cosine"),
            Marker::Vee => write!(f, "vee"),
        }
    }
}

impl FromStr for Marker {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(Marker::Cosine),
            "vee" => Ok(Marker::Vee),
            _ => Err(ConfigError::UnknownName {
                kind: "marker shape",
                name: s.to_string(),
            }),
        }
    }
}
