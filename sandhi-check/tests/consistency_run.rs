//! End-to-end consistency runs against the mock part

mod common;

use common::{HOME, Harness, halves, max_mismatch};
use sandhi_check::core::types::ControlMode;
use sandhi_check::{Clock, ConsistencyCheck, Error};
use sandhi_check::analysis::AnalysisOutcome;
use sandhi_check::series::SeriesKind;
use std::time::Duration;

#[test]
fn test_consistent_part_series_match() {
    let h = Harness::healthy();
    let mut check = h.consistency();
    let report = check.run().unwrap();
    check.tear_down();

    assert_eq!(report.cycles, 4);
    assert_eq!(report.files.len(), 5);
    assert_eq!(report.analysis, AnalysisOutcome::ScriptMissing);
    assert_wrist_matrix(&report);

    let positions = h.rows(SeriesKind::JointMotorPosition);
    assert_eq!(positions.len(), report.frames);
    assert!(positions[0].iter().all(|v| *v == 0.0));
    for j in 0..3 {
        assert!(max_mismatch(&positions, j) < 1e-4, "joint {}", j);
        assert!(max_mismatch(&h.rows(SeriesKind::JointMotorVelocity), j) < 1e-4);
    }

    // The part really moved
    let span = positions
        .iter()
        .map(|row| row[0].abs())
        .fold(0.0, f64::max);
    assert!(span > 100.0);
}

fn assert_wrist_matrix(report: &sandhi_check::RunReport) {
    let forward = report.coupling.forward();
    assert_eq!(forward.nrows(), 3);
    assert_eq!(forward[(2, 1)], 1.6455);
    assert_eq!(forward[(0, 1)], 0.0);
}

#[test]
fn test_derived_series_skip_first_frame() {
    let h = Harness::healthy();
    let report = h.consistency().run().unwrap();

    assert_eq!(h.rows(SeriesKind::JointDerivedVelocity).len(), report.frames - 1);
    assert_eq!(h.rows(SeriesKind::MotorDerivedVelocity).len(), report.frames - 1);
    assert_eq!(h.rows(SeriesKind::JointMotorPositionReversed).len(), report.frames);
}

#[test]
fn test_reversed_series_first_row_offset() {
    let h = Harness::healthy();
    h.consistency().run().unwrap();

    let rows = h.rows(SeriesKind::JointMotorPositionReversed);

    // First frame has no motor offset yet, so the joint offset is counted twice
    let (joint, motor_to_joint) = halves(&rows[0]);
    for j in 0..3 {
        assert!((joint[j] - HOME[j]).abs() < 0.5);
        assert!((motor_to_joint[j] - 2.0 * joint[j]).abs() < 1e-4);
    }
    for j in 0..3 {
        assert!(max_mismatch(&rows[1..], j) < 1e-4);
    }
}

#[test]
fn test_wrong_gearbox_shows_in_series() {
    let h = Harness::new(|sim| sim.axes[1].reported_gearbox = Some(50.0));
    h.consistency().run().unwrap();

    let positions = h.rows(SeriesKind::JointMotorPosition);
    assert!(max_mismatch(&positions, 0) < 1e-4);
    assert!(max_mismatch(&positions, 1) > 100.0);
}

#[test]
fn test_inverted_motor_encoder_shows_in_series() {
    let h = Harness::new(|sim| sim.axes[0].motor_sign = -1.0);
    h.consistency().run().unwrap();

    let positions = h.rows(SeriesKind::JointMotorPosition);
    for row in &positions {
        let (motor, joint_to_motor) = halves(row);
        assert!((motor[0] + joint_to_motor[0]).abs() < 1e-4);
    }
    assert!(max_mismatch(&positions, 0) > 100.0);
}

#[test]
fn test_read_failure_aborts_with_partial_export() {
    // Ten frames of six bulk reads
    let h = Harness::new(|sim| sim.faults.fail_bulk_reads_after = Some(60));
    let err = h.consistency().run().unwrap_err();

    assert!(matches!(err, Error::SensorRead { reading: "getEncoders", .. }));
    assert_eq!(h.rows(SeriesKind::JointMotorPosition).len(), 10);
    assert_eq!(h.rows(SeriesKind::JointDerivedVelocity).len(), 9);

    // Torn down: back home
    let positions = h.part.joint_positions();
    for j in 0..3 {
        assert!((positions[j] - HOME[j]).abs() < 0.5);
    }
}

#[test]
fn test_stuck_joint_times_out_leg() {
    let h = Harness::new(|sim| sim.faults.stuck_axes = vec![2]);
    let err = h.consistency().run().unwrap_err();

    match err {
        Error::MotionTimeout {
            target,
            cycle,
            joints,
            ..
        } => {
            assert_eq!(target, "min");
            assert_eq!(cycle, 0);
            assert_eq!(joints, vec![2]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(h.clock.now() >= Duration::from_secs(20));
}

#[test]
fn test_malformed_coupling_block() {
    let h = Harness::new(|sim| sim.reported_coupling = Some(vec![vec![1.0, 0.0, 1.0]]));
    let err = h.consistency().run().unwrap_err();

    assert!(matches!(err, Error::MatrixShape { block: 0, len: 3 }));
    assert_eq!(h.part.bulk_reads(), 0);
}

#[test]
fn test_export_failure_tears_down() {
    let mut h = Harness::healthy();
    let blocker = h.dir.path().join("not_a_dir");
    std::fs::write(&blocker, "").unwrap();
    h.config.output.directory = blocker;

    let err = h.consistency().run().unwrap_err();

    assert!(matches!(err, Error::Io(_)));
    assert_eq!(h.part.control_modes()[..3], [ControlMode::Position; 3]);
    let positions = h.part.joint_positions();
    for j in 0..3 {
        assert!((positions[j] - HOME[j]).abs() < 0.5);
    }
}

#[test]
fn test_invalid_leg_timeout_fails_before_motion() {
    let mut h = Harness::healthy();
    h.config.test.timing.leg_timeout_s = -1.0;

    let result = ConsistencyCheck::setup(&h.config, Box::new(h.part.clone()), h.clock.clone());

    assert!(matches!(result, Err(Error::Config(ref msg)) if msg.contains("leg_timeout_s")));
    assert_eq!(h.part.bulk_reads(), 0);
    assert!(h.part.control_modes().iter().all(|m| *m == ControlMode::Position));
}
