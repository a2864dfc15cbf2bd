//! The tower itself: one continuous spiral, split into sections that each run at their own flow rate.
//!
//! Generation walks sections, then layers within the section, then points around the shape. Each layer rises a full
//! layer height over its lap, so the laps join into a seamless helix. The top `marker_height` mm of each section is
//! pulled in by up to `marker_depth` mm to leave a notch you can find on the printed part.
use nalgebra::geometry::{Point2, Point3};
use tracing::debug;

use crate::config::TowerConfig;
use crate::geometry::ShapeSample;
use crate::marker::DeformFunction;
use crate::MotionRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub index: usize,
    /// Target flow, in mm³/s
    pub flow: f64,
    /// Head feed rate giving `flow`, in mm/min
    pub feedrate: f64,
    /// Z of the first layer in the section
    pub start_z: f64,
    /// Where the next section starts: `start_z` plus the height of all the section's layers
    pub end_z: f64,
    /// Points above this height are pulled in to form the marker
    pub marker_start: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TowerEvent {
    SectionStart(Section),
    LayerStart { flow: f64, layer: usize },
    /// Layers are now high enough for the part cooling fan. Sent at most once.
    EnableCooling,
    Move(MotionRecord),
}

/// Streams the tower, in print order. All the state that changes while printing (current layer height, whether the
/// fan is on) lives here.
pub struct TowerGenerator<'a> {
    config: &'a TowerConfig,
    sample: &'a ShapeSample,
    /// Filament per segment of the unit shape
    extrusions: Vec<f64>,
    layers_per_section: usize,
    section: Option<Section>,
    section_index: usize,
    layer: usize,
    point: usize,
    layer_z: f64,
    layer_started: bool,
    cooling_on: bool,
    moves_emitted: usize,
}

impl<'a> TowerGenerator<'a> {
    pub fn new(config: &'a TowerConfig, sample: &'a ShapeSample) -> Self {
        let extrusions = config
            .extrusion_model()
            .per_segment(&sample.segment_lengths());
        TowerGenerator {
            config,
            sample,
            extrusions,
            layers_per_section: config.layers_per_section(),
            section: None,
            section_index: 0,
            layer: 0,
            point: 0,
            layer_z: config.layer_height,
            layer_started: false,
            cooling_on: false,
            moves_emitted: 0,
        }
    }

    /// Number of moves the whole tower takes. Saturates for configs that `validate` would reject.
    pub fn total_moves(&self) -> usize {
        self.config
            .flows
            .len()
            .saturating_mul(self.layers_per_section)
            .saturating_mul(self.sample.len())
    }

    fn start_section(&mut self, flow: f64) -> Section {
        let c = self.config;
        let section = Section {
            index: self.section_index,
            flow,
            feedrate: c.extrusion_model().feedrate_for_flow(flow),
            start_z: self.layer_z,
            end_z: self.layer_z + self.layers_per_section as f64 * c.layer_height,
            marker_start: self.layer_z + (c.section_height - c.marker_height),
        };
        debug!(
            "Section {} at {:.3}mm: {:.2}mm³/s, F{:.3}",
            section.index, section.start_z, section.flow, section.feedrate
        );
        self.section = Some(section.clone());
        section
    }

    /// Scale factor for the unit shape at height `z`: half the size, less any marker indentation.
    fn radius_at(&self, z: f64, marker_start: f64) -> f64 {
        let c = self.config;
        let deform = if z > marker_start {
            let h = (z - marker_start) / c.marker_height;
            c.marker_depth * (1.0 - c.marker.profile(h))
        } else {
            0.0
        };
        c.size / 2.0 - deform
    }

    fn make_move(&self, marker_start: f64, feedrate: f64) -> MotionRecord {
        let i = self.point;
        let z = self.sample.z_offsets()[i] + self.layer_z;
        let radius = self.radius_at(z, marker_start);
        let p: Point2<f64> = self.sample.points()[i];
        let center = self.config.center;
        let record = MotionRecord::new(
            Point3::new(p.x * radius + center.x, p.y * radius + center.y, z),
            // Extrusion scales with the shape, so a narrower lap gets proportionally less filament
            self.extrusions[i] * radius,
        );
        if self.layer == 0 && i == 0 {
            record.with_feedrate(feedrate)
        } else {
            record
        }
    }

    fn finish_layer(&mut self) {
        self.point = 0;
        self.layer += 1;
        self.layer_z += self.config.layer_height;
        self.layer_started = false;
        if self.layer >= self.layers_per_section {
            self.layer = 0;
            self.section_index += 1;
            self.section = None;
        }
    }
}

impl<'a> Iterator for TowerGenerator<'a> {
    type Item = TowerEvent;

    fn next(&mut self) -> Option<TowerEvent> {
        if self.layers_per_section == 0 || self.sample.is_empty() {
            return None;
        }
        let flow = *self.config.flows.get(self.section_index)?;

        let (marker_start, feedrate) = match &self.section {
            Some(s) => (s.marker_start, s.feedrate),
            None => return Some(TowerEvent::SectionStart(self.start_section(flow))),
        };

        if !self.layer_started {
            self.layer_started = true;
            return Some(TowerEvent::LayerStart {
                flow,
                layer: self.layer,
            });
        }

        if self.point == 0 && !self.cooling_on {
            if let Some(fan_z) = self.config.fan_on_height {
                if self.layer_z > fan_z {
                    self.cooling_on = true;
                    return Some(TowerEvent::EnableCooling);
                }
            }
        }

        let record = self.make_move(marker_start, feedrate);
        self.moves_emitted += 1;
        self.point += 1;
        if self.point >= self.sample.len() {
            self.finish_layer();
        }
        Some(TowerEvent::Move(record))
    }

    /// Counts the moves still to come. The other events come on top of that.
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.total_moves().saturating_sub(self.moves_emitted), None)
    }
}
