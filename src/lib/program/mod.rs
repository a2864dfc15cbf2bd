//! Turns the brim and tower into a complete G-code file: parameter summary, user start code, the moves, user end code.
use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use crate::brim::BrimGenerator;
use crate::config::TowerConfig;
use crate::geometry::RadiusFunction;
use crate::tower::{TowerEvent, TowerGenerator};
use crate::{fan_on, g1, gcode_comment, preamble, trailer};

pub const DEFAULT_START_GCODE: &str = "print_start EXTRUDER=215 BED=60\n";
pub const DEFAULT_END_GCODE: &str = "G1 E-2 ; small retract at the end\nprint_end ; end script from macro\n";

/// Everything about the output that doesn't change the shape of the tower
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramOptions {
    pub name: Option<String>,
    /// Copied verbatim before the tower. Should at least heat up and home the machine.
    pub start_gcode: String,
    pub end_gcode: String,
    /// Acceleration limit, in mm/s²
    pub max_accel: f64,
    pub fan_speed: u8,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        ProgramOptions {
            name: None,
            start_gcode: DEFAULT_START_GCODE.to_string(),
            end_gcode: DEFAULT_END_GCODE.to_string(),
            max_accel: 20000.0,
            fan_speed: 255,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgramStats {
    pub brim_moves: usize,
    pub tower_moves: usize,
    /// Total filament fed, in mm
    pub filament: f64,
}

/// Save the parameters as comments, so you can see later what a printed tower was testing
pub fn header(config: &TowerConfig, options: &ProgramOptions, file: &mut dyn Write) -> Result<()> {
    let model = config.extrusion_model();
    let flows: Vec<String> = config.flows.iter().map(|f| format!("{f:.2}")).collect();

    if let Some(name) = &options.name {
        gcode_comment(file, name)?;
    }
    gcode_comment(file, "Flow rate test tower")?;
    gcode_comment(file, "Test parameters:")?;
    gcode_comment(file, &format!("Testing values {} mm3/s", flows.join(", ")))?;
    gcode_comment(file, &format!("Layer height: {:.2}mm", config.layer_height))?;
    gcode_comment(
        file,
        &format!("Filament diameter: {:.2}mm", config.filament_diameter),
    )?;
    gcode_comment(
        file,
        &format!("Extrusion multiplier: {:.2}", config.extrusion_multiplier),
    )?;
    gcode_comment(
        file,
        &format!("Extrusion width (given): {:.2}mm", config.extrusion_width),
    )?;
    gcode_comment(file, &format!("Shape: {}", config.shape.tag()))?;
    gcode_comment(
        file,
        &format!(
            "Section marker: {} {:.2}mm high, {:.2}mm deep",
            config.marker, config.marker_height, config.marker_depth
        ),
    )?;
    gcode_comment(file, &format!("Shape size: {:.2}mm", config.size))?;
    gcode_comment(file, &format!("Section height: {:.2}mm", config.section_height))?;
    gcode_comment(
        file,
        &format!(
            "Center point: {:.2}, {:.2} mm",
            config.center.x, config.center.y
        ),
    )?;
    gcode_comment(file, &format!("Num points: {}", config.num_points))?;
    for flow in &config.flows {
        let feed = model.feedrate_for_flow(*flow);
        gcode_comment(
            file,
            &format!(
                "  {flow:.2} mm3/s = {:.1} mm/s (F{feed:.3})",
                feed / 60.0
            ),
        )?;
    }
    writeln!(file)?;
    Ok(())
}

/// Write the whole program for `config`. Nothing is written if the config is rejected.
pub fn write_program(config: &TowerConfig, options: &ProgramOptions, file: &mut dyn Write) -> Result<ProgramStats> {
    config.validate().context("Invalid tower parameters")?;
    let sample = config.sample_shape().context("Sampling tower shape")?;
    let mut stats = ProgramStats::default();

    header(config, options, file)?;
    preamble(&options.start_gcode, options.max_accel, file)?;

    if let Some(first) = config.flows.first() {
        gcode_comment(file, &format!("Brim speed: {first:.2} mm3/s"))?;
    }
    for record in BrimGenerator::new(config, &sample) {
        stats.brim_moves += 1;
        stats.filament += record.extrusion;
        g1(file, (&record).into())?;
    }
    writeln!(file)?;

    for event in TowerGenerator::new(config, &sample) {
        match event {
            TowerEvent::SectionStart(section) => {
                gcode_comment(file, &format!("Speed: {:.3} mm3/s", section.flow))?;
            }
            TowerEvent::LayerStart { flow, layer } => {
                gcode_comment(file, &format!("Speed {flow:.3} Layer {layer}"))?;
            }
            TowerEvent::EnableCooling => {
                info!(
                    "Fan on, layers above {:.2}mm",
                    config.fan_on_height.unwrap_or_default()
                );
                fan_on(file, options.fan_speed)?;
            }
            TowerEvent::Move(record) => {
                stats.tower_moves += 1;
                stats.filament += record.extrusion;
                g1(file, (&record).into())?;
            }
        }
    }

    trailer(&options.end_gcode, file)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TowerConfig {
        TowerConfig {
            flows: vec![10.0, 11.0],
            num_points: 16,
            section_height: 1.0,
            marker_height: 0.4,
            brim_loops: 2,
            fan_on_height: Some(0.5),
            ..Default::default()
        }
    }

    fn render(config: &TowerConfig, options: &ProgramOptions) -> (String, ProgramStats) {
        let mut out = Vec::new();
        let stats = write_program(config, options, &mut out).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn test_program_layout() {
        let c = small_config();
        let options = ProgramOptions {
            name: Some("tower".to_string()),
            ..Default::default()
        };
        let (text, stats) = render(&c, &options);

        assert_eq!(stats.brim_moves, 32);
        assert_eq!(stats.tower_moves, 2 * 5 * 16);
        let g1_lines = text.lines().filter(|l| l.starts_with("G1 X")).count();
        assert_eq!(g1_lines, stats.brim_moves + stats.tower_moves);

        assert!(text.starts_with(";tower\n;Flow rate test tower\n"));
        let start = text.find("print_start").unwrap();
        let accel = text.find("M204 S20000").unwrap();
        let first_move = text.find("G1 X").unwrap();
        let fan = text.find("M106 S255").unwrap();
        let end = text.find("print_end").unwrap();
        assert!(start < accel && accel < first_move && first_move < fan && fan < end);
        assert_eq!(text.matches("M106").count(), 1);
        assert!(text.trim_end().ends_with("print_end ; end script from macro"));
    }

    #[test]
    fn test_feed_rates_in_output() {
        let c = small_config();
        let (text, _) = render(&c, &ProgramOptions::default());
        // 10mm³/s at 0.2 x 0.4 is 7500mm/min: once for the brim, once for the first section
        assert_eq!(text.matches(" F7500.000").count(), 2);
        assert_eq!(text.matches(" F8250.000").count(), 1);
        assert!(text.contains(";Speed: 11.000 mm3/s"));
        assert!(text.contains(";Speed 11.000 Layer 4"));
    }

    #[test]
    fn test_shape_in_header() {
        let c = TowerConfig {
            shape: crate::geometry::Shape::Sinusoidal {
                amplitude: 0.2,
                lobes: 2,
            },
            ..small_config()
        };
        let (text, _) = render(&c, &ProgramOptions::default());
        assert!(text.contains(";Shape: sinusoidal (amplitude=0.2, lobes=2)\n"));
    }

    #[test]
    fn test_invalid_config_writes_nothing() {
        let bad = TowerConfig {
            flows: vec![],
            ..small_config()
        };
        let mut out = Vec::new();
        assert!(write_program(&bad, &ProgramOptions::default(), &mut out).is_err());
        assert!(out.is_empty());
    }

    fn z_values(text: &str) -> Vec<f64> {
        text.lines()
            .filter(|l| l.starts_with("G1 X"))
            .filter_map(|l| l.split_whitespace().find(|w| w.starts_with('Z')))
            .map(|w| w[1..].parse().unwrap())
            .collect()
    }

    #[test]
    fn test_z_never_drops_across_layer_heights() {
        // The shape sample holds per-point z offsets, so it has to match the layer height in use
        for layer_height in [0.1, 0.25, 0.3] {
            let c = TowerConfig {
                layer_height,
                section_height: 1.5,
                marker_height: 0.5,
                ..small_config()
            };
            let (text, stats) = render(&c, &ProgramOptions::default());
            let z = z_values(&text);
            assert_eq!(z.len(), stats.brim_moves + stats.tower_moves);
            for (i, pair) in z.windows(2).enumerate() {
                assert!(pair[1] >= pair[0], "layer height {layer_height}, move {i}: {pair:?}");
            }
        }
    }

    #[test]
    fn test_filament_total() {
        let c = small_config();
        let (_, stats) = render(&c, &ProgramOptions::default());
        assert!(stats.filament > 0.0);
    }
}
