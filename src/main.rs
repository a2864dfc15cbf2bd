//! G-Code generator for flow rate test towers
//!
//! Prints one spiral tower, in sections, each at a higher volumetric flow than the last. Each section ends in a small
//! notch so they can be told apart afterwards. Look for the section where the walls start to go rough, or the
//! extruder starts to skip, and that's the practical flow limit for the hotend and filament.
use anyhow::{Context, Result};
use flowtower::config::TowerConfig;
use flowtower::geometry::Shape;
use flowtower::marker::Marker;
use flowtower::ConfigError;
use flowtower::program::{write_program, ProgramOptions, DEFAULT_END_GCODE, DEFAULT_START_GCODE};
use nalgebra::geometry::Point2;
use std::fs::{read_to_string, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;
use structopt::StructOpt;
use tracing::{info, warn};

/// Outline choices on the command line. The sinusoidal parameters come from their own options.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ShapeKind {
    Circle,
    Sinusoidal,
}

impl FromStr for ShapeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "circle" => Ok(ShapeKind::Circle),
            "sinusoidal" => Ok(ShapeKind::Sinusoidal),
            _ => Err(ConfigError::UnknownName {
                kind: "shape",
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "flow_tower",
    about = "Generates a spiral test tower for finding the max volumetric flow of a 3D printer"
)]
struct Opt {
    /// Flow rates to test, in mm3/s, lowest first. Defaults to 10 through 15.
    #[structopt(long)]
    flows: Vec<f64>,

    /// Width of extrusion, in mm
    #[structopt(long, default_value = "0.4")]
    extrusion_width: f64,

    /// Layer thickness, in mm
    #[structopt(long, default_value = "0.2")]
    layer_height: f64,

    /// Height of each section, in mm
    #[structopt(long, default_value = "10")]
    section_height: f64,

    /// Number of loops in the brim. Also used for initial purge
    #[structopt(long, default_value = "5")]
    brim_loops: usize,

    /// Filament diameter, in mm
    #[structopt(long, default_value = "1.75")]
    filament_dia: f64,

    /// Extrusion multiplier, should probably be 1
    #[structopt(long, default_value = "1.0")]
    extrusion_mult: f64,

    /// Max width or height of the shape, in mm
    #[structopt(long, default_value = "100")]
    size: f64,

    /// Center of the tower on the bed, in mm
    #[structopt(long, default_value = "60")]
    center_x: f64,

    #[structopt(long, default_value = "60")]
    center_y: f64,

    /// Number of points around the shape
    #[structopt(long, default_value = "128")]
    points: usize,

    /// Outline of the tower
    #[structopt(long, default_value = "circle", possible_values = &["circle", "sinusoidal"])]
    shape: ShapeKind,

    /// Bumpyness of the sinusoidal shape, in [0, 1]
    #[structopt(long, default_value = "0.2")]
    bumpyness: f64,

    /// Number of bumps on the sinusoidal shape
    #[structopt(long, default_value = "2")]
    lobes: u32,

    /// Height of the section marker, in mm, taken from the top of each section
    #[structopt(long, default_value = "2")]
    marker_height: f64,

    /// Depth of the section marker, in mm
    #[structopt(long, default_value = "1")]
    marker_depth: f64,

    #[structopt(long, default_value = "cosine", possible_values = &["cosine", "vee"])]
    marker_shape: Marker,

    /// Maximum acceleration, in mm/s2
    #[structopt(long, default_value = "20000")]
    max_accel: f64,

    /// Part cooling fan speed, once the tower is off the bed
    #[structopt(long, default_value = "255")]
    fan_speed: u8,

    /// Height to turn the fan on at, in mm
    #[structopt(long, default_value = "3")]
    fan_on_height: f64,

    /// Leave the fan off for the whole print
    #[structopt(long)]
    no_fan: bool,

    /// File with start G-code: copy it from your slicer. At a minimum set and wait for temperature, and home.
    #[structopt(long, parse(from_os_str))]
    start_gcode: Option<PathBuf>,

    /// File with end G-code: copy it from your slicer
    #[structopt(long, parse(from_os_str))]
    end_gcode: Option<PathBuf>,

    /// Name for the job
    #[structopt(short, long)]
    name: Option<String>,

    /// Output file for the resulting G code
    #[structopt(short, long, parse(from_os_str))]
    output: PathBuf,
}

fn tower_config(opt: &Opt) -> TowerConfig {
    let defaults = TowerConfig::default();
    let shape = match opt.shape {
        ShapeKind::Circle => Shape::Circle,
        ShapeKind::Sinusoidal => Shape::Sinusoidal {
            amplitude: opt.bumpyness,
            lobes: opt.lobes,
        },
    };
    TowerConfig {
        flows: if opt.flows.is_empty() {
            defaults.flows
        } else {
            opt.flows.clone()
        },
        extrusion_width: opt.extrusion_width,
        layer_height: opt.layer_height,
        section_height: opt.section_height,
        brim_loops: opt.brim_loops,
        filament_diameter: opt.filament_dia,
        extrusion_multiplier: opt.extrusion_mult,
        size: opt.size,
        center: Point2::new(opt.center_x, opt.center_y),
        num_points: opt.points,
        shape,
        marker_height: opt.marker_height,
        marker_depth: opt.marker_depth,
        marker: opt.marker_shape,
        fan_on_height: if opt.no_fan {
            None
        } else {
            Some(opt.fan_on_height)
        },
    }
}

fn read_block(path: &Option<PathBuf>, default: &str) -> Result<String> {
    match path {
        Some(path) => read_to_string(path).with_context(|| format!("Reading {}", path.display())),
        None => Ok(default.to_string()),
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn help_text(config: &TowerConfig) {
    info!(
        "Tower is {:.1}mm tall: {} sections of {} layers, {:.1}mm across",
        config.tower_height(),
        config.flows.len(),
        config.layers_per_section(),
        config.size
    );
    let model = config.extrusion_model();
    if let (Some(first), Some(last)) = (config.flows.first(), config.flows.last()) {
        info!(
            "Head speed goes from {:.1}mm/s to {:.1}mm/s",
            model.feedrate_for_flow(*first) / 60.0,
            model.feedrate_for_flow(*last) / 60.0
        );
    }
}

fn main() -> Result<()> {
    init_logging();
    let opt = Opt::from_args();
    let config = tower_config(&opt);

    // Check everything before touching the output file
    config.validate()?;
    for lint in config.lint() {
        warn!("{lint}");
    }
    config.sample_shape()?;
    let options = ProgramOptions {
        name: opt.name.clone(),
        start_gcode: read_block(&opt.start_gcode, DEFAULT_START_GCODE)?,
        end_gcode: read_block(&opt.end_gcode, DEFAULT_END_GCODE)?,
        max_accel: opt.max_accel,
        fan_speed: opt.fan_speed,
    };
    help_text(&config);

    info!("Writing G-code to {}", opt.output.display());
    let mut file = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&opt.output)
            .with_context(|| format!("Opening {}", opt.output.display()))?,
    );
    let stats = write_program(&config, &options, &mut file)?;
    file.flush()?;

    info!(
        "Done: {} brim moves, {} tower moves, {:.0}mm of filament",
        stats.brim_moves, stats.tower_moves, stats.filament
    );
    Ok(())
}
