//! Filament feed for a bead of constant rectangular cross-section.
//!
//! Assumes the bead is exactly `layer_height` by `bead_width` no matter how fast the head moves. How far reality
//! departs from that at high flow is what the printed tower measures.
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrusionModel {
    pub layer_height: f64,
    pub bead_width: f64,
    pub filament_diameter: f64,
    pub multiplier: f64,
}

impl ExtrusionModel {
    pub fn new(layer_height: f64, bead_width: f64, filament_diameter: f64, multiplier: f64) -> Self {
        ExtrusionModel {
            layer_height,
            bead_width,
            filament_diameter,
            multiplier,
        }
    }

    /// Cross-section of the deposited bead, in mm²
    pub fn bead_area(&self) -> f64 {
        self.layer_height * self.bead_width
    }

    /// Cross-section of the filament going into the extruder, in mm²
    pub fn filament_area(&self) -> f64 {
        PI * (self.filament_diameter / 2.0).powi(2)
    }

    /// mm of filament per mm of bead, before the multiplier
    pub fn feed_ratio(&self) -> f64 {
        self.bead_area() / self.filament_area()
    }

    /// Filament to feed while laying a bead of length `distance`
    pub fn extrusion_for(&self, distance: f64) -> f64 {
        distance * self.feed_ratio() * self.multiplier
    }

    pub fn per_segment(&self, segment_lengths: &[f64]) -> Vec<f64> {
        segment_lengths
            .iter()
            .map(|&d| self.extrusion_for(d))
            .collect()
    }

    /// Head feed rate, in mm/min, that pushes `flow` mm³/s through the bead cross-section
    pub fn feedrate_for_flow(&self, flow: f64) -> f64 {
        (flow / self.bead_area()) * 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    fn model() -> ExtrusionModel {
        ExtrusionModel::new(0.2, 0.4, 1.75, 1.0)
    }

    #[test]
    fn test_areas() {
        let m = model();
        assert!((m.bead_area() - 0.08).abs() < EPSILON);
        assert!((m.filament_area() - 2.405_281_875_5).abs() < 1e-9);
        assert!((m.feed_ratio() - 0.08 / m.filament_area()).abs() < EPSILON);
    }

    #[test]
    fn test_extrusion_is_linear_in_distance_and_multiplier() {
        let m = model();
        let e1 = m.extrusion_for(10.0);
        assert!((m.extrusion_for(20.0) - 2.0 * e1).abs() < EPSILON);

        let over = ExtrusionModel {
            multiplier: 1.1,
            ..m
        };
        assert!((over.extrusion_for(10.0) - 1.1 * e1).abs() < EPSILON);
    }

    #[test]
    fn test_per_segment() {
        let m = model();
        let e = m.per_segment(&[0.0, 1.0, 2.5]);
        assert_eq!(e.len(), 3);
        assert_eq!(e[0], 0.0);
        assert!((e[2] - 2.5 * m.feed_ratio()).abs() < EPSILON);
    }

    #[test]
    fn test_feedrate_for_flow() {
        let m = model();
        // 10mm³/s through a 0.08mm² bead is 125mm/s
        assert!((m.feedrate_for_flow(10.0) - 7500.0).abs() < 1e-9);
        let thick = ExtrusionModel {
            layer_height: 0.3,
            ..m
        };
        assert!((thick.feedrate_for_flow(12.0) - 6000.0).abs() < 1e-9);
    }
}
