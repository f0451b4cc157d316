//! Configuration for sandhi-check
//!
//! Loads the run description from a TOML file. The `[test]` and
//! `[sign_check]` tables are read leniently by serde and validated
//! explicitly afterwards, so a missing key is reported by name as
//! [`Error::Config`] before any hardware is touched.
//!
//! ```toml
//! [device]
//! type = "mock"
//! name = "left_arm simulator"
//!
//! [test]
//! robot = "icub"
//! part = "left_arm"
//! joints = [0, 1, 2]
//! home = [-30.0, 30.0, 10.0]
//! min = [-40.0, 20.0, 0.0]
//! max = [-20.0, 40.0, 20.0]
//! speed = [20.0, 20.0, 20.0]
//! tolerance = 1.0
//! matrix_size = 3
//! cycles = 10
//! ```

use crate::devices::mock::config::SimulationConfig;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub device: DeviceConfig,
    #[serde(default)]
    pub test: TestSection,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub sign_check: Option<SignCheckSection>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device selection
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Driver type ("mock")
    #[serde(rename = "type")]
    pub device_type: String,
    /// Human readable name
    #[serde(default)]
    pub name: String,
    /// Simulation parameters (mock device only)
    #[serde(default)]
    pub simulation: Option<SimulationConfig>,
}

/// Raw `[test]` table of the consistency check
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestSection {
    pub name: Option<String>,
    pub robot: Option<String>,
    pub part: Option<String>,
    pub joints: Option<Vec<usize>>,
    pub home: Option<Vec<f64>>,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
    pub speed: Option<Vec<f64>>,
    pub tolerance: Option<f64>,
    pub matrix_size: Option<usize>,
    pub cycles: Option<u32>,
    #[serde(default)]
    pub plot_enabled: bool,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Polling and pacing constants
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Delay after each per-joint mode request (ms)
    #[serde(default = "default_mode_settle_ms")]
    pub mode_settle_ms: u64,
    /// Interval between convergence polls (ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Polls before a mode or homing wait gives up
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    /// Budget for one sweep leg (s)
    #[serde(default = "default_leg_timeout_s")]
    pub leg_timeout_s: f64,
    /// Nominal control tick, also the finite-difference step (ms)
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
}

fn default_mode_settle_ms() -> u64 {
    10
}
fn default_poll_interval_ms() -> u64 {
    200
}
fn default_max_polls() -> u32 {
    100
}
fn default_leg_timeout_s() -> f64 {
    20.0
}
fn default_tick_period_ms() -> u64 {
    10
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            mode_settle_ms: default_mode_settle_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
            leg_timeout_s: default_leg_timeout_s(),
            tick_period_ms: default_tick_period_ms(),
        }
    }
}

impl TimingConfig {
    pub fn mode_settle(&self) -> Duration {
        Duration::from_millis(self.mode_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn leg_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.leg_timeout_s)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Reject values the run could not turn into durations
    pub fn validate(&self) -> Result<()> {
        if !self.leg_timeout_s.is_finite() || self.leg_timeout_s <= 0.0 {
            return Err(Error::Config(format!(
                "invalid leg_timeout_s {}: must be a finite number >0",
                self.leg_timeout_s
            )));
        }
        if self.tick_period_ms == 0 {
            return Err(Error::Config("tick_period_ms must be >0".to_string()));
        }
        Ok(())
    }
}

/// Where exported series and the analysis script live
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the series files
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    /// File name prefix
    #[serde(default = "default_output_prefix")]
    pub prefix: String,
    /// Search path for the plotting script
    #[serde(default = "default_script_dirs")]
    pub script_dirs: Vec<PathBuf>,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}
fn default_output_prefix() -> String {
    "encConsis".to_string()
}
fn default_script_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("scripts")]
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            prefix: default_output_prefix(),
            script_dirs: default_script_dirs(),
        }
    }
}

/// Raw `[sign_check]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignCheckSection {
    pub name: Option<String>,
    pub joints: Option<Vec<usize>>,
    pub home: Option<Vec<f64>>,
    pub speed: Option<Vec<f64>>,
    pub pwm_start: Option<Vec<f64>>,
    pub pwm_step: Option<Vec<f64>>,
    pub pwm_max: Option<Vec<f64>>,
    pub pos_threshold: Option<Vec<f64>>,
    pub command_delay: Option<Vec<f64>>,
    pub tolerance: Option<f64>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Validated parameters of a consistency run
#[derive(Debug, Clone)]
pub struct TestParams {
    pub name: String,
    pub robot: String,
    pub part: String,
    pub joints: Vec<usize>,
    pub home: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub speed: Vec<f64>,
    pub tolerance: f64,
    pub matrix_size: usize,
    pub cycles: u32,
    pub plot_enabled: bool,
    pub timing: TimingConfig,
}

impl TestParams {
    /// Validate the raw `[test]` table
    pub fn from_section(section: &TestSection) -> Result<Self> {
        let robot = require(&section.robot, "robot", "The robot name")?;
        let part = require(&section.part, "part", "The part name")?;
        let joints = require(&section.joints, "joints", "The joints list")?;
        let home = require(&section.home, "home", "The home position")?;
        let max = require(&section.max, "max", "The max position")?;
        let min = require(&section.min, "min", "The min position")?;
        let speed = require(
            &section.speed,
            "speed",
            "The positionMove reference speed",
        )?;
        let tolerance = require(
            &section.tolerance,
            "tolerance",
            "The tolerance of the control signal",
        )?;
        let matrix_size = require(&section.matrix_size, "matrix_size", "The matrix size")?;

        check_joint_list(&joints)?;
        for (key, values) in [("home", &home), ("min", &min), ("max", &max), ("speed", &speed)] {
            check_length(key, values.len(), joints.len())?;
        }
        if tolerance.is_nan() || tolerance < 0.0 {
            return Err(Error::Config(format!("invalid tolerance {}", tolerance)));
        }
        if matrix_size == 0 {
            return Err(Error::Config("invalid matrix_size: must be >0".to_string()));
        }
        if matrix_size != joints.len() {
            return Err(Error::Config(format!(
                "matrix_size {} does not match the {} tested joints",
                matrix_size,
                joints.len()
            )));
        }
        let cycles = section.cycles.unwrap_or(10);
        if cycles == 0 {
            return Err(Error::Config("cycles must be >0".to_string()));
        }
        section.timing.validate()?;

        Ok(Self {
            name: section
                .name
                .clone()
                .unwrap_or_else(|| "MotorEncodersConsistency".to_string()),
            robot,
            part,
            joints,
            home,
            min,
            max,
            speed,
            tolerance,
            matrix_size,
            cycles,
            plot_enabled: section.plot_enabled,
            timing: section.timing.clone(),
        })
    }
}

/// Validated parameters of the motor encoder sign check
#[derive(Debug, Clone)]
pub struct SignCheckParams {
    pub name: String,
    pub joints: Vec<usize>,
    pub home: Vec<f64>,
    pub speed: Vec<f64>,
    pub pwm_start: Vec<f64>,
    pub pwm_step: Vec<f64>,
    pub pwm_max: Vec<f64>,
    pub pos_threshold: Vec<f64>,
    pub command_delay: Vec<f64>,
    pub tolerance: f64,
}

impl SignCheckParams {
    /// Validate the raw `[sign_check]` table
    pub fn from_section(section: &SignCheckSection) -> Result<Self> {
        let joints = require(&section.joints, "joints", "The joints list")?;
        let home = require(&section.home, "home", "The home position")?;
        let speed = require(&section.speed, "speed", "The reference speed")?;
        let pwm_start = require(&section.pwm_start, "pwm_start", "The starting pwm")?;
        let pwm_step = require(&section.pwm_step, "pwm_step", "The pwm increment")?;
        let pwm_max = require(&section.pwm_max, "pwm_max", "The max pwm")?;

        check_joint_list(&joints)?;
        let n = joints.len();
        let pos_threshold = section.pos_threshold.clone().unwrap_or_else(|| vec![5.0; n]);
        let command_delay = section.command_delay.clone().unwrap_or_else(|| vec![0.1; n]);

        for (key, values) in [
            ("home", &home),
            ("speed", &speed),
            ("pwm_start", &pwm_start),
            ("pwm_step", &pwm_step),
            ("pwm_max", &pwm_max),
            ("pos_threshold", &pos_threshold),
            ("command_delay", &command_delay),
        ] {
            check_length(key, values.len(), n)?;
        }
        if let Some(i) = pwm_step.iter().position(|step| !step.is_finite() || *step <= 0.0) {
            return Err(Error::Config(format!(
                "pwm_step of joint {} must be >0",
                joints[i]
            )));
        }
        if let Some(i) = command_delay
            .iter()
            .position(|delay| !delay.is_finite() || *delay < 0.0)
        {
            return Err(Error::Config(format!(
                "command_delay of joint {} must be a finite number >=0",
                joints[i]
            )));
        }
        let tolerance = section.tolerance.unwrap_or(1.0);
        if tolerance.is_nan() || tolerance < 0.0 {
            return Err(Error::Config(format!("invalid tolerance {}", tolerance)));
        }

        Ok(Self {
            name: section
                .name
                .clone()
                .unwrap_or_else(|| "MotorEncodersSignCheck".to_string()),
            joints,
            home,
            speed,
            pwm_start,
            pwm_step,
            pwm_max,
            pos_threshold,
            command_delay,
            tolerance,
        })
    }
}

fn require<T: Clone>(value: &Option<T>, key: &str, what: &str) -> Result<T> {
    value.clone().ok_or_else(|| {
        Error::Config(format!(
            "{} must be given as the test parameter `{}`",
            what, key
        ))
    })
}

fn check_joint_list(joints: &[usize]) -> Result<()> {
    if joints.is_empty() {
        return Err(Error::Config("the joints list is empty".to_string()));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = joints.iter().find(|j| !seen.insert(**j)) {
        return Err(Error::Config(format!("joint {} listed twice", dup)));
    }
    Ok(())
}

fn check_length(key: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(Error::Config(format!(
            "parameter `{}` has {} entries, expected one per joint ({})",
            key, len, expected
        )));
    }
    Ok(())
}
