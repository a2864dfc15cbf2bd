//! Parameters for the tower, with the checks that have to pass before any G-code is generated.
use std::fmt;

use nalgebra::geometry::Point2;

use crate::extrusion::ExtrusionModel;
use crate::geometry::{Shape, ShapeSample};
use crate::marker::Marker;
use crate::ConfigError;

/// Relative slack when dividing a section into layers, so that 10 / 0.2 counts as 50 layers and not 49.
const LAYER_TOLERANCE: f64 = 1e-9;

/// Far more than any real tower; a G-code file this long would already be several gigabytes.
const MAX_MOVES: usize = 50_000_000;

#[derive(Debug, Clone, PartialEq)]
pub struct TowerConfig {
    /// Flow rates to test, in mm³/s. One section each, printed in this order.
    pub flows: Vec<f64>,
    pub extrusion_width: f64,
    pub layer_height: f64,
    pub section_height: f64,
    pub brim_loops: usize,
    pub filament_diameter: f64,
    pub extrusion_multiplier: f64,
    /// Max width or height of the shape, in mm
    pub size: f64,
    pub center: Point2<f64>,
    pub num_points: usize,
    pub shape: Shape,
    pub marker_height: f64,
    pub marker_depth: f64,
    pub marker: Marker,
    /// Turn cooling on once the layers get above this height
    pub fan_on_height: Option<f64>,
}

impl Default for TowerConfig {
    fn default() -> Self {
        TowerConfig {
            flows: vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
            extrusion_width: 0.4,
            layer_height: 0.2,
            section_height: 10.0,
            brim_loops: 5,
            filament_diameter: 1.75,
            extrusion_multiplier: 1.0,
            size: 100.0,
            center: Point2::new(60.0, 60.0),
            num_points: 128,
            shape: Shape::Circle,
            marker_height: 2.0,
            marker_depth: 1.0,
            marker: Marker::Cosine,
            fan_on_height: Some(3.0),
        }
    }
}

/// Questionable, but printable, settings
#[derive(Debug, Clone, PartialEq)]
pub enum Lint {
    /// Section height isn't a whole number of layers; each section comes out `lost` mm short
    UnevenSections { layers: usize, lost: f64 },
    /// Flow at `index` is lower than the one before it
    DecreasingFlows { index: usize },
    MarkerTallerThanSection,
}

impl fmt::Display for Lint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lint::UnevenSections { layers, lost } => write!(
                f,
                "Section height is not a whole number of layers, printing {layers} layers per section ({lost:.3}mm short)"
            ),
            Lint::DecreasingFlows { index } => {
                write!(f, "Flow rate #{index} is lower than the one before it")
            }
            Lint::MarkerTallerThanSection => {
                write!(f, "Section marker is taller than the section")
            }
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

impl TowerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("Layer height", self.layer_height)?;
        positive("Extrusion width", self.extrusion_width)?;
        positive("Section height", self.section_height)?;
        positive("Filament diameter", self.filament_diameter)?;
        positive("Extrusion multiplier", self.extrusion_multiplier)?;
        positive("Size", self.size)?;
        positive("Section marker height", self.marker_height)?;
        if !(self.marker_depth >= 0.0) {
            return Err(ConfigError::NonPositive {
                name: "Section marker depth",
                value: self.marker_depth,
            });
        }
        // The marker can't eat the whole shape
        if self.marker_depth >= self.size / 2.0 {
            return Err(ConfigError::OutOfRange {
                name: "Section marker depth",
                value: self.marker_depth,
                min: 0.0,
                max: self.size / 2.0,
            });
        }
        if self.flows.is_empty() {
            return Err(ConfigError::NoFlowTargets);
        }
        for &flow in &self.flows {
            positive("Flow rate", flow)?;
        }
        if self.layers_per_section() == 0 {
            return Err(ConfigError::SectionTooShort {
                section_height: self.section_height,
                layer_height: self.layer_height,
            });
        }
        if let Shape::Sinusoidal { amplitude, .. } = self.shape {
            if !(0.0..=1.0).contains(&amplitude) {
                return Err(ConfigError::OutOfRange {
                    name: "Bumpyness",
                    value: amplitude,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        if self.num_points < 3 {
            return Err(ConfigError::TooFewPoints(self.num_points));
        }
        let moves = self.total_moves();
        if moves.map_or(true, |m| m > MAX_MOVES) {
            return Err(ConfigError::OutOfRange {
                name: "Total moves",
                value: moves.map_or(f64::INFINITY, |m| m as f64),
                min: 1.0,
                max: MAX_MOVES as f64,
            });
        }
        Ok(())
    }

    /// Moves in the whole tower, or `None` if the count doesn't fit in a `usize`
    pub fn total_moves(&self) -> Option<usize> {
        self.flows
            .len()
            .checked_mul(self.layers_per_section())?
            .checked_mul(self.num_points)
    }

    /// Find settings that will print, but probably not the way the user meant
    pub fn lint(&self) -> Vec<Lint> {
        let mut lints = Vec::new();

        let ratio = self.section_height / self.layer_height;
        if (ratio - ratio.round()).abs() > LAYER_TOLERANCE * ratio.max(1.0) {
            let layers = self.layers_per_section();
            lints.push(Lint::UnevenSections {
                layers,
                lost: self.section_height - layers as f64 * self.layer_height,
            });
        }
        for (index, pair) in self.flows.windows(2).enumerate() {
            if pair[1] < pair[0] {
                lints.push(Lint::DecreasingFlows { index: index + 1 });
            }
        }
        if self.marker_height > self.section_height {
            lints.push(Lint::MarkerTallerThanSection);
        }

        lints
    }

    /// Whole layers in each section. Any remainder is dropped, so sections may come out slightly short.
    pub fn layers_per_section(&self) -> usize {
        let layers = (self.section_height / self.layer_height) * (1.0 + LAYER_TOLERANCE);
        if layers.is_finite() && layers > 0.0 {
            layers.floor() as usize
        } else {
            0
        }
    }

    /// Height of the top of the last layer
    pub fn tower_height(&self) -> f64 {
        self.flows.len() as f64 * self.layers_per_section() as f64 * self.layer_height
    }

    pub fn extrusion_model(&self) -> ExtrusionModel {
        ExtrusionModel::new(
            self.layer_height,
            self.extrusion_width,
            self.filament_diameter,
            self.extrusion_multiplier,
        )
    }

    pub fn sample_shape(&self) -> Result<ShapeSample, ConfigError> {
        ShapeSample::new(&self.shape, self.num_points, self.layer_height)
    }
}
