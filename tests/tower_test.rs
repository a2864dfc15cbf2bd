use flowtower::brim::BrimGenerator;
use flowtower::config::TowerConfig;
use flowtower::geometry::Shape;
use flowtower::marker::Marker;
use flowtower::program::{write_program, ProgramOptions};
use flowtower::tower::{TowerEvent, TowerGenerator};
use flowtower::{ConfigError, MotionRecord};

fn tower_moves(config: &TowerConfig) -> Vec<MotionRecord> {
    let sample = config.sample_shape().unwrap();
    TowerGenerator::new(config, &sample)
        .filter_map(|e| match e {
            TowerEvent::Move(r) => Some(r),
            _ => None,
        })
        .collect()
}

#[test]
fn test_record_counts() {
    let config = TowerConfig {
        flows: vec![5.0, 6.0, 7.0],
        section_height: 2.0,
        marker_height: 0.5,
        num_points: 32,
        brim_loops: 4,
        ..Default::default()
    };
    let sample = config.sample_shape().unwrap();
    assert_eq!(BrimGenerator::new(&config, &sample).count(), 32 * 4);
    assert_eq!(tower_moves(&config).len(), 3 * 10 * 32);
}

#[test]
fn test_default_tower() {
    let config = TowerConfig::default();
    let moves = tower_moves(&config);
    assert_eq!(moves.len(), 6 * 50 * 128);

    let last = moves.last().unwrap();
    assert!((last.position.z - config.tower_height() - config.layer_height).abs() < 1e-6);
    // z only ever goes up
    for pair in moves.windows(2) {
        assert!(pair[1].position.z >= pair[0].position.z - 1e-9);
    }
    // And stays within the footprint
    for r in &moves {
        assert!((r.position.x - 60.0).abs() <= 50.0 + 1e-9);
        assert!((r.position.y - 60.0).abs() <= 50.0 + 1e-9);
    }
}

#[test]
fn test_vee_marker_reaches_full_depth() {
    let config = TowerConfig {
        flows: vec![10.0],
        section_height: 2.0,
        marker_height: 0.8,
        marker_depth: 2.0,
        marker: Marker::Vee,
        num_points: 8,
        fan_on_height: None,
        ..Default::default()
    };
    let moves = tower_moves(&config);
    let min_x = moves
        .iter()
        .step_by(8)
        .map(|r| r.position.x)
        .fold(f64::INFINITY, f64::min);
    // Point 0 of every lap is on the +X axis, 110mm at full size
    assert!((min_x - 108.0).abs() < 1e-6);
}

#[test]
fn test_bumpy_program() {
    let config = TowerConfig {
        flows: vec![8.0, 9.0],
        section_height: 1.0,
        marker_height: 0.4,
        shape: Shape::Sinusoidal {
            amplitude: 0.3,
            lobes: 3,
        },
        num_points: 48,
        ..Default::default()
    };
    let mut out = Vec::new();
    let stats = write_program(&config, &ProgramOptions::default(), &mut out).unwrap();
    assert_eq!(stats.brim_moves, 5 * 48);
    assert_eq!(stats.tower_moves, 2 * 5 * 48);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(";Shape: sinusoidal (amplitude=0.3, lobes=3)"));
    // Brim starts with a travel move
    let first_move = text.lines().find(|l| l.starts_with("G1 X")).unwrap();
    assert!(first_move.contains(" E0.0000 "));
}

#[test]
fn test_degenerate_config_is_rejected() {
    let config = TowerConfig {
        num_points: 2,
        ..Default::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::TooFewPoints(2)));
    assert_eq!(
        config.sample_shape().unwrap_err(),
        ConfigError::TooFewPoints(2)
    );
}
