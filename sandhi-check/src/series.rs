//! Sample series accumulator and export
//!
//! Five series are collected per run, each row pairing two per-joint vectors:
//!
//! | Series | Left | Right |
//! |--------|------|-------|
//! | `jointPos_MotorPos` | motor position (relative) | joint-to-motor position (relative) |
//! | `jointVel_motorVel` | motor velocity | joint-to-motor velocity |
//! | `joint_derivedVel_vel` | joint velocity | derived joint velocity |
//! | `motor_derivedVel_vel` | motor velocity | derived motor velocity |
//! | `jointPos_MotorPos_reversed` | joint position | motor-to-joint position |
//!
//! The two derived-velocity series have no row for the first frame.

use crate::error::Result;
use crate::sampler::SampleFrame;
use nalgebra::DVector;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// The five consistency series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    JointMotorPosition,
    JointMotorVelocity,
    JointDerivedVelocity,
    MotorDerivedVelocity,
    JointMotorPositionReversed,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 5] = [
        SeriesKind::JointMotorPosition,
        SeriesKind::JointMotorVelocity,
        SeriesKind::JointDerivedVelocity,
        SeriesKind::MotorDerivedVelocity,
        SeriesKind::JointMotorPositionReversed,
    ];

    /// Series name used in file names
    pub fn name(self) -> &'static str {
        match self {
            SeriesKind::JointMotorPosition => "jointPos_MotorPos",
            SeriesKind::JointMotorVelocity => "jointVel_motorVel",
            SeriesKind::JointDerivedVelocity => "joint_derivedVel_vel",
            SeriesKind::MotorDerivedVelocity => "motor_derivedVel_vel",
            SeriesKind::JointMotorPositionReversed => "jointPos_MotorPos_reversed",
        }
    }

    /// `<prefix>_<name>_<part>.txt`
    pub fn file_name(self, prefix: &str, part: &str) -> String {
        format!("{}_{}_{}.txt", prefix, self.name(), part)
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// One row: two vectors compared against each other
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub left: DVector<f64>,
    pub right: DVector<f64>,
}

/// Ordered, append-only series of one run
#[derive(Debug, Clone, Default)]
pub struct SeriesAccumulator {
    series: [Vec<Row>; 5],
    frames: usize,
}

impl SeriesAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the rows of one frame
    pub fn push(&mut self, frame: &SampleFrame) {
        self.add(
            SeriesKind::JointMotorPosition,
            &frame.motor_relative,
            &frame.joint_to_motor_relative,
        );
        self.add(
            SeriesKind::JointMotorVelocity,
            &frame.motor.velocity,
            &frame.joint_to_motor_velocity,
        );
        if let Some(d) = &frame.derivatives {
            self.add(SeriesKind::JointDerivedVelocity, &frame.joint.velocity, &d.joint);
            self.add(SeriesKind::MotorDerivedVelocity, &frame.motor.velocity, &d.motor);
        }
        self.add(
            SeriesKind::JointMotorPositionReversed,
            &frame.joint.position,
            &frame.motor_to_joint_absolute,
        );
        self.frames += 1;
    }

    fn add(&mut self, kind: SeriesKind, left: &DVector<f64>, right: &DVector<f64>) {
        self.series[kind.slot()].push(Row {
            left: left.clone(),
            right: right.clone(),
        });
    }

    pub fn rows(&self, kind: SeriesKind) -> &[Row] {
        &self.series[kind.slot()]
    }

    /// Frames pushed so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Write every series to `dir`, one file each
    pub fn export(&self, dir: &Path, prefix: &str, part: &str) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        let mut paths = Vec::with_capacity(SeriesKind::ALL.len());
        for kind in SeriesKind::ALL {
            let path = dir.join(kind.file_name(prefix, part));
            let mut out = BufWriter::new(File::create(&path)?);
            for row in self.rows(kind) {
                write_row(&mut out, row)?;
            }
            out.flush()?;

            log::info!("Saved {} rows to {}", self.rows(kind).len(), path.display());
            paths.push(path);
        }
        Ok(paths)
    }
}

fn write_row<W: Write>(out: &mut W, row: &Row) -> std::io::Result<()> {
    let values: Vec<String> = row
        .left
        .iter()
        .chain(row.right.iter())
        .map(|v| format!("{:.6}", v))
        .collect();
    writeln!(out, "{}", values.join(" "))
}
