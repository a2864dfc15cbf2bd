use thiserror::Error;

/// Problems with the tower parameters. All of them are fatal, and are reported before any G-code is written.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The shape needs at least a triangle to be a closed loop
    #[error("Need at least 3 points around the shape, got {0}")]
    TooFewPoints(usize),

    #[error("Degenerate shape: {0}")]
    DegenerateShape(String),

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("No flow rates to test")]
    NoFlowTargets,

    #[error("Section height {section_height}mm is less than one {layer_height}mm layer")]
    SectionTooShort {
        section_height: f64,
        layer_height: f64,
    },

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Unknown {kind} \"{name}\"")]
    UnknownName { kind: &'static str, name: String },
}
