//! Integration test: program files to block chains.

use std::f64::consts::{FRAC_PI_2, PI};
use std::io::Write;

use cnc_common::point::Point;
use cnc_control::block::{Block, BlockKind};
use cnc_control::{BlockError, GeometryError, Program, ProgramError};

use super::support::config;

const PART: &str = "\
# pocket outline
N10 G00 X0 Y0 Z5
N20 G01 Z-1 F300 S12000 T3
N30 X20 F600
N40 G03 X30 Y10 I0 J10
N50 G01 Y20
N60 G02 X20 Y30 R10
n70 g1 x 0
N80 G92 X1
N90 Y0
";

#[test]
fn part_program_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(PART.as_bytes()).unwrap();

    let program = Program::load(file.path(), &config().kinematics).unwrap();
    assert_eq!(program.len(), 9);

    let blocks: Vec<&Block> = program.cursor().collect();
    let kinds: Vec<BlockKind> = blocks.iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::Rapid,
            BlockKind::Line,
            BlockKind::Line,
            BlockKind::ArcCcw,
            BlockKind::Line,
            BlockKind::ArcCw,
            BlockKind::Line,
            BlockKind::SetOffset,
            BlockKind::Line,
        ]
    );

    // Spindle and tool carry over until changed.
    assert!(blocks[2..].iter().all(|b| b.spindle == 12000.0 && b.tool == 3));
    assert_eq!(blocks[2].feed_nominal, 600.0);
    assert_eq!(blocks[3].feed_nominal, 600.0);

    // Every block starts where the previous one ended.
    for pair in blocks.windows(2) {
        assert_eq!(pair[1].start, pair[0].target);
    }
    assert_eq!(blocks[8].target, Point::new(0.0, 0.0, -1.0));
}

#[test]
fn geometry_of_part_program() {
    let program = Program::parse_str(PART, &config().kinematics).unwrap();
    let blocks: Vec<&Block> = program.cursor().collect();

    // Quarter CCW arc of radius 10 tangent to the preceding line.
    let arc = blocks[3];
    assert!(arc.center.approx_eq(&Point::new(20.0, 10.0, -1.0), 1e-9));
    assert!((arc.length - 10.0 * FRAC_PI_2).abs() < 1e-9);
    assert!((arc.corner_angle - PI).abs() < 1e-9);

    // Line leaving the arc along its end tangent.
    assert!((blocks[4].corner_angle - PI).abs() < 1e-9);

    // Short-way CW arc from (30,20) to (20,30) bulges away from (20,20).
    let cw = blocks[5];
    assert!(cw.center.approx_eq(&Point::new(30.0, 30.0, -1.0), 1e-9));
    assert!((cw.sweep + FRAC_PI_2).abs() < 1e-9);
    assert!((cw.length - cw.sweep.abs() * cw.radius.abs()).abs() < 1e-12);

    // Right-angle turns of the plunge and the outline.
    assert!((blocks[2].corner_angle - FRAC_PI_2).abs() < 1e-9);
}

#[test]
fn interpolation_endpoints_for_every_block() {
    let program = Program::parse_str(PART, &config().kinematics).unwrap();
    for block in &program {
        assert!(block.interpolate(0.0).approx_eq(&block.start, 1e-9), "{block}");
        assert!(block.interpolate(1.0).approx_eq(&block.target, 1e-9), "{block}");
        assert_eq!(block.progress(block.profile.dt_total), 1.0);
        if block.length > 0.0 {
            assert_eq!(block.progress(0.0), 0.0);
        }
    }
}

#[test]
fn reparsing_is_deterministic() {
    let limits = config().kinematics;
    let a = Program::parse_str(PART, &limits).unwrap();
    let b = Program::parse_str(PART, &limits).unwrap();
    assert_eq!(a, b);

    // Re-deriving from source text with the same predecessor gives the same block.
    let blocks: Vec<&Block> = a.cursor().collect();
    for pair in blocks.windows(2) {
        let again = Block::parse(&pair[1].source_text, Some(pair[0]), &limits).unwrap();
        assert_eq!(again.profile, pair[1].profile);
        assert_eq!(again.target, pair[1].target);
        assert_eq!(again.length, pair[1].length);
    }
}

#[test]
fn degenerate_arc_reports_its_line() {
    let err = Program::parse_str("G1 X0 Y0 F600\nG2 X100 Y0 R10\n", &config().kinematics)
        .unwrap_err();
    match err {
        ProgramError::Block { line, source, .. } => {
            assert_eq!(line, 2);
            assert!(matches!(
                source,
                BlockError::Geometry(GeometryError::DegenerateArc { .. })
            ));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn feed_move_without_feed_is_rejected() {
    let err = Program::parse_str("G1 X10\n", &config().kinematics).unwrap_err();
    assert!(matches!(
        err,
        ProgramError::Block {
            source: BlockError::Profile(_),
            ..
        }
    ));
}
