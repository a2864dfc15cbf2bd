use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;

use nalgebra::geometry::Point2;

use crate::ConfigError;

/// A closed shape in polar form: radius as a function of angle, for angles in [0, 2π).
pub trait RadiusFunction {
    fn radius(&self, theta: f64) -> f64;

    /// Name and parameters of the shape, for the G-code header
    fn tag(&self) -> ShapeTag;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTag {
    pub name: &'static str,
    pub params: Vec<(&'static str, f64)>,
}

impl fmt::Display for ShapeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, " ({})", params.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Shape {
    #[default]
    Circle,
    /// `1 + amplitude * sin(lobes * theta + pi/2)`. Amplitude 0.2 with 2 lobes gives a gently bumpy oval.
    Sinusoidal { amplitude: f64, lobes: u32 },
}

impl RadiusFunction for Shape {
    fn radius(&self, theta: f64) -> f64 {
        match *self {
            Shape::Circle => 1.0,
            Shape::Sinusoidal { amplitude, lobes } => {
                1.0 + amplitude * (lobes as f64 * theta + FRAC_PI_2).sin()
            }
        }
    }

    fn tag(&self) -> ShapeTag {
        match *self {
            Shape::Circle => ShapeTag {
                name: "circle",
                params: vec![],
            },
            Shape::Sinusoidal { amplitude, lobes } => ShapeTag {
                name: "sinusoidal",
                params: vec![("amplitude", amplitude), ("lobes", lobes as f64)],
            },
        }
    }
}

/// One lap of the shape, normalized so that the furthest point reaches 1 in X or Y.
/// Scale by (size / 2) and offset by the center to get machine coordinates.
#[derive(Debug, Clone)]
pub struct ShapeSample {
    angles: Vec<f64>,
    radii: Vec<f64>,
    points: Vec<Point2<f64>>,
    z_offsets: Vec<f64>,
}

impl ShapeSample {
    /// Sample `shape` at `num_points` evenly spaced angles (no duplicate endpoint), and spread one layer of Z rise
    /// across the lap so consecutive laps form a continuous spiral.
    pub fn new(
        shape: &dyn RadiusFunction,
        num_points: usize,
        layer_height: f64,
    ) -> Result<Self, ConfigError> {
        if num_points < 3 {
            return Err(ConfigError::TooFewPoints(num_points));
        }
        let angles: Vec<f64> = (0..num_points)
            .map(|i| TAU * i as f64 / num_points as f64)
            .collect();
        let raw_radii: Vec<f64> = angles.iter().map(|&theta| shape.radius(theta)).collect();

        if let Some(r) = raw_radii.iter().find(|r| !(**r >= 0.0)) {
            return Err(ConfigError::DegenerateShape(format!(
                "{} has radius {r}",
                shape.tag()
            )));
        }

        // Largest extent in either axis
        let norm = angles
            .iter()
            .zip(&raw_radii)
            .map(|(theta, r)| (theta.cos() * r).abs().max((theta.sin() * r).abs()))
            .fold(0.0, f64::max);
        if !(norm > 0.0) || !norm.is_finite() {
            return Err(ConfigError::DegenerateShape(format!(
                "{} has no extent to normalize",
                shape.tag()
            )));
        }

        let radii: Vec<f64> = raw_radii.iter().map(|r| r / norm).collect();
        let points = angles
            .iter()
            .zip(&radii)
            .map(|(theta, r)| Point2::new(theta.cos() * r, theta.sin() * r))
            .collect();
        let z_offsets = (0..num_points)
            .map(|i| layer_height * i as f64 / (num_points - 1) as f64)
            .collect();

        Ok(ShapeSample {
            angles,
            radii,
            points,
            z_offsets,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    /// Normalized radius at each angle
    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn z_offsets(&self) -> &[f64] {
        &self.z_offsets
    }

    /// Length of the segment leading into each point. Point 0 is reached from the last point, closing the loop.
    pub fn segment_lengths(&self) -> Vec<f64> {
        let n = self.points.len();
        (0..n)
            .map(|i| nalgebra::distance(&self.points[(i + n - 1) % n], &self.points[i]))
            .collect()
    }

    pub fn perimeter(&self) -> f64 {
        self.segment_lengths().iter().sum()
    }
}
