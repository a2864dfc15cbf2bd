use std::io::{Result, Write};

use nalgebra::geometry::Point3;

pub mod brim;
pub mod config;
pub mod error;
pub mod extrusion;
pub mod geometry;
pub mod marker;
pub mod program;
pub mod tower;

pub use error::ConfigError;

pub fn gcode_comment(file: &mut dyn Write, s: &str) -> Result<()> {
    writeln!(file, ";{s}")
}

/// Copy a user supplied block of G-code into the output, making sure it ends on a fresh line.
pub fn raw_block(file: &mut dyn Write, block: &str) -> Result<()> {
    if block.is_empty() {
        return Ok(());
    }
    write!(file, "{block}")?;
    if !block.ends_with('\n') {
        writeln!(file)?;
    }
    Ok(())
}

pub fn preamble(start_gcode: &str, max_accel: f64, file: &mut dyn Write) -> Result<()> {
    // Machine specific startup (heating, homing) goes first, straight from the user
    raw_block(file, start_gcode)?;

    // Then put the machine into the mode the rest of the program expects
    let preamble_str = "G21 ; set units to millimeters
G90 ; use absolute coordinates
M83 ; extruder relative mode
M107 ; fans off";
    writeln!(file, "{preamble_str}")?;
    writeln!(file, "M204 S{max_accel:.0} ; print acceleration")?;
    writeln!(file)?;

    Ok(())
}

pub fn trailer(end_gcode: &str, file: &mut dyn Write) -> Result<()> {
    writeln!(file)?;
    fan_off(file)?;
    raw_block(file, end_gcode)
}

pub fn fan_on(file: &mut dyn Write, speed: u8) -> Result<()> {
    writeln!(file, "M106 S{speed} ; fan on")
}

pub fn fan_off(file: &mut dyn Write) -> Result<()> {
    writeln!(file, "M107 ; fan off")
}

/// One linear move of the print head, in print order.
/// `extrusion` is the length of filament fed during the move, in mm (relative E).
/// `feedrate`, when set, changes the modal feed rate (mm/min) starting with this move.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionRecord {
    pub position: Point3<f64>,
    pub extrusion: f64,
    pub feedrate: Option<f64>,
}

impl MotionRecord {
    pub fn new(position: Point3<f64>, extrusion: f64) -> Self {
        MotionRecord {
            position,
            extrusion,
            feedrate: None,
        }
    }

    pub fn with_feedrate(mut self, feedrate: f64) -> Self {
        self.feedrate = Some(feedrate);
        self
    }
}

#[derive(Clone, Debug)]
pub struct PosAndFeed {
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    e: Option<f64>,
    feed: Option<f64>,
}

pub fn xyze(x: f64, y: f64, z: f64, e: f64) -> PosAndFeed {
    PosAndFeed {
        x: Some(x),
        y: Some(y),
        z: Some(z),
        e: Some(e),
        feed: None,
    }
}

pub fn xyzef(x: f64, y: f64, z: f64, e: f64, feed: f64) -> PosAndFeed {
    PosAndFeed {
        x: Some(x),
        y: Some(y),
        z: Some(z),
        e: Some(e),
        feed: Some(feed),
    }
}

impl From<&MotionRecord> for PosAndFeed {
    fn from(r: &MotionRecord) -> Self {
        let p = &r.position;
        match r.feedrate {
            Some(feed) => xyzef(p.x, p.y, p.z, r.extrusion, feed),
            None => xyze(p.x, p.y, p.z, r.extrusion),
        }
    }
}

impl PosAndFeed {
    fn as_gvals(&self, file: &mut dyn Write) -> Result<()> {
        if self.x.is_none()
            && self.y.is_none()
            && self.z.is_none()
            && self.e.is_none()
            && self.feed.is_none()
        {
            panic!("Refusing to make empty move");
        }
        g_val(file, "X", self.x, 3)?;
        g_val(file, "Y", self.y, 3)?;
        g_val(file, "Z", self.z, 3)?;
        g_val(file, "E", self.e, 4)?;
        g_val(file, "F", self.feed, 3)?;
        Ok(())
    }
}

/// Emit a gcode parameter value with a fixed number of decimals, if `ov` is `Some`.
fn g_val(file: &mut dyn Write, name: &str, ov: Option<f64>, decimals: usize) -> Result<()> {
    if let Some(v) = ov {
        write!(file, " {name}{v:.decimals$}")
    } else {
        Ok(())
    }
}

fn g_move_linear(file: &mut dyn Write, g: &str, p: &PosAndFeed) -> Result<()> {
    write!(file, "{g}")?;
    p.as_gvals(file)?;
    writeln!(file)?;
    Ok(())
}

pub fn g1(file: &mut dyn Write, p: PosAndFeed) -> Result<()> {
    if let Some(z) = p.z {
        assert!(z >= 0.0, "Print move below the bed");
    }
    g_move_linear(file, "G1", &p)
}
