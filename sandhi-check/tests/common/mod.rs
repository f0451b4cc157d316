//! Test utilities for running the checks against the mock part.
//!
//! Every harness runs on a [`ManualClock`], so a full sweep with 20 s leg
//! budgets completes without real waiting.

#![allow(dead_code)]

use sandhi_check::devices::mock::MockJointDriver;
use sandhi_check::devices::mock::config::SimulationConfig;
use sandhi_check::series::SeriesKind;
use sandhi_check::{Config, ConsistencyCheck, ManualClock, SignCheck};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

pub const PART: &str = "left_wrist";
pub const HOME: [f64; 3] = [10.0, -5.0, 0.0];

/// Three coupled joints (one 3x3 block) on a four-axis part
pub const BASE_CONFIG: &str = r#"
[device]
type = "mock"
name = "test part"

[device.simulation]
coupling = [[1.0, 0.0, 0.0, -1.0, 1.6455, 0.0, -1.0, 1.6455, 1.6455]]

[test]
robot = "sim"
part = "left_wrist"
joints = [0, 1, 2]
home = [10.0, -5.0, 0.0]
min = [5.0, -10.0, -5.0]
max = [15.0, 0.0, 5.0]
speed = [20.0, 20.0, 20.0]
tolerance = 0.5
matrix_size = 3
cycles = 4

[output]
script_dirs = []

[sign_check]
joints = [0, 1]
home = [0.0, 0.0]
speed = [20.0, 20.0]
pwm_start = [0.5, 0.5]
pwm_step = [0.5, 0.5]
pwm_max = [4.0, 4.0]
"#;

/// Mock part, configuration and output directory of one test
pub struct Harness {
    pub config: Config,
    pub clock: Arc<ManualClock>,
    /// Handle on the simulated part for inspection
    pub part: MockJointDriver,
    pub dir: TempDir,
}

impl Harness {
    /// Base configuration with the simulation adjusted by `tweak`
    pub fn new(tweak: impl FnOnce(&mut SimulationConfig)) -> Self {
        let mut config = Config::parse(BASE_CONFIG).unwrap();
        let dir = tempfile::tempdir().unwrap();
        config.output.directory = dir.path().to_path_buf();

        let mut simulation = config.device.simulation.clone().unwrap_or_default();
        tweak(&mut simulation);
        config.device.simulation = Some(simulation.clone());

        let clock = Arc::new(ManualClock::new());
        let part = MockJointDriver::new(simulation, clock.clone()).unwrap();

        Self {
            config,
            clock,
            part,
            dir,
        }
    }

    /// Healthy part
    pub fn healthy() -> Self {
        Self::new(|_| {})
    }

    pub fn consistency(&self) -> ConsistencyCheck {
        ConsistencyCheck::setup(&self.config, Box::new(self.part.clone()), self.clock.clone())
            .unwrap()
    }

    pub fn sign_check(&self) -> SignCheck {
        SignCheck::setup(&self.config, Box::new(self.part.clone()), self.clock.clone()).unwrap()
    }

    /// Exported rows of a series, one `Vec` per line
    pub fn rows(&self, kind: SeriesKind) -> Vec<Vec<f64>> {
        let path = self.dir.path().join(kind.file_name("encConsis", PART));
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| {
                line.split_whitespace()
                    .map(|v| v.parse::<f64>().unwrap())
                    .collect()
            })
            .collect()
    }
}

/// Split an exported row into its two per-joint halves
pub fn halves(row: &[f64]) -> (&[f64], &[f64]) {
    row.split_at(row.len() / 2)
}

/// Largest `|left - right|` of joint `j` over all rows
pub fn max_mismatch(rows: &[Vec<f64>], j: usize) -> f64 {
    rows.iter()
        .map(|row| {
            let (left, right) = halves(row);
            (left[j] - right[j]).abs()
        })
        .fold(0.0, f64::max)
}
