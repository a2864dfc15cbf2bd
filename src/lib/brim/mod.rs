//! Brim loops printed flat on the first layer, before the tower itself. They purge the nozzle and help the tower stick.
use nalgebra::geometry::{Point2, Point3};

use crate::config::TowerConfig;
use crate::extrusion::ExtrusionModel;
use crate::geometry::ShapeSample;
use crate::MotionRecord;

/// Iterator over the brim moves. The outermost loop sits `loops * bead_width` outside the shape, and the offset
/// shrinks steadily with every point so the last point lands on the shape itself.
pub struct BrimGenerator<'a> {
    sample: &'a ShapeSample,
    model: ExtrusionModel,
    loops: usize,
    half_size: f64,
    center: Point2<f64>,
    z: f64,
    feedrate: Option<f64>,
    index: usize,
    previous: Option<Point2<f64>>,
}

impl<'a> BrimGenerator<'a> {
    pub fn new(config: &TowerConfig, sample: &'a ShapeSample) -> Self {
        let model = config.extrusion_model();
        BrimGenerator {
            sample,
            model,
            loops: config.brim_loops,
            half_size: config.size / 2.0,
            center: config.center,
            z: config.layer_height,
            // The brim goes down at the first section's speed
            feedrate: config.flows.first().map(|&f| model.feedrate_for_flow(f)),
            index: 0,
            previous: None,
        }
    }

    pub fn total_points(&self) -> usize {
        self.loops * self.sample.len()
    }

    fn point_at(&self, k: usize) -> Point2<f64> {
        let n = self.sample.len();
        let total = self.total_points();
        let theta = self.sample.angles()[k % n];
        let offset =
            self.loops as f64 * self.model.bead_width * (1.0 - k as f64 / (total - 1) as f64);
        let r = self.sample.radii()[k % n] * self.half_size + offset;
        Point2::new(
            theta.cos() * r + self.center.x,
            theta.sin() * r + self.center.y,
        )
    }
}

impl<'a> Iterator for BrimGenerator<'a> {
    type Item = MotionRecord;

    fn next(&mut self) -> Option<MotionRecord> {
        if self.index >= self.total_points() {
            return None;
        }
        let p = self.point_at(self.index);
        // Travel to the very first point without extruding
        let extrusion = match self.previous {
            Some(prev) => self.model.extrusion_for(nalgebra::distance(&prev, &p)),
            None => 0.0,
        };
        let mut record = MotionRecord::new(Point3::new(p.x, p.y, self.z), extrusion);
        if self.index == 0 {
            if let Some(feed) = self.feedrate {
                record = record.with_feedrate(feed);
            }
        }
        self.previous = Some(p);
        self.index += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total_points().saturating_sub(self.index);
        (left, Some(left))
    }
}
