//! Mock part simulation configuration
//!
//! Every parameter has a default, so an empty `[device.simulation]` table
//! gives a healthy four-axis uncoupled part. Deliberate misconfiguration
//! (wrong sign, wrong reported gearbox or coupling) and hardware faults are
//! opt-in.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! SimulationConfig
//! ├── axes[]                    # One entry per physical axis
//! │   ├── min, max, initial_position
//! │   ├── gearbox_ratio, reported_gearbox
//! │   └── motor_sign, motor_offset
//! ├── coupling, reported_coupling   # Block description (row-major k*k)
//! ├── pwm_gain, random_seed
//! ├── EncoderConfig
//! │   └── EncoderNoiseConfig
//! └── FaultConfig
//! ```

use serde::Deserialize;

/// One simulated axis
#[derive(Debug, Clone, Deserialize)]
pub struct AxisConfig {
    /// Lower joint limit (deg)
    #[serde(default = "default_min")]
    pub min: f64,

    /// Upper joint limit (deg)
    #[serde(default = "default_max")]
    pub max: f64,

    /// Joint position at start-up (deg)
    #[serde(default)]
    pub initial_position: f64,

    /// True motor/joint reduction
    #[serde(default = "default_gearbox_ratio")]
    pub gearbox_ratio: f64,

    /// Ratio reported by the gearbox query when it differs from the truth
    #[serde(default)]
    pub reported_gearbox: Option<f64>,

    /// Motor encoder direction (-1.0 models a swapped encoder)
    #[serde(default = "default_motor_sign")]
    pub motor_sign: f64,

    /// Motor encoder reading at joint zero
    #[serde(default)]
    pub motor_offset: f64,
}

fn default_min() -> f64 {
    -180.0
}
fn default_max() -> f64 {
    180.0
}
fn default_gearbox_ratio() -> f64 {
    100.0
}
fn default_motor_sign() -> f64 {
    1.0
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            min: default_min(),
            max: default_max(),
            initial_position: 0.0,
            gearbox_ratio: default_gearbox_ratio(),
            reported_gearbox: None,
            motor_sign: default_motor_sign(),
            motor_offset: 0.0,
        }
    }
}

/// Encoder noise (standard deviations)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncoderNoiseConfig {
    /// Joint encoder position noise (deg)
    #[serde(default)]
    pub joint_stddev: f64,

    /// Motor encoder position noise (deg at the motor)
    #[serde(default)]
    pub motor_stddev: f64,
}

/// Encoder simulation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncoderConfig {
    #[serde(default)]
    pub noise: EncoderNoiseConfig,
}

/// Injected hardware faults
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaultConfig {
    /// Bulk encoder reads that succeed before every later one fails
    #[serde(default)]
    pub fail_bulk_reads_after: Option<usize>,

    /// Axes whose joints never move
    #[serde(default)]
    pub stuck_axes: Vec<usize>,

    /// Axes that ignore control mode requests
    #[serde(default)]
    pub reject_control_mode: Vec<usize>,
}

/// Simulated robot part
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_axes")]
    pub axes: Vec<AxisConfig>,

    /// True coupling blocks (empty = uncoupled)
    #[serde(default)]
    pub coupling: Vec<Vec<f64>>,

    /// Blocks published through the remote variable when they differ from the truth
    #[serde(default)]
    pub reported_coupling: Option<Vec<Vec<f64>>>,

    /// Joint speed per unit of open-loop duty cycle (deg/s)
    #[serde(default = "default_pwm_gain")]
    pub pwm_gain: f64,

    /// Noise seed (0 = random each run)
    #[serde(default)]
    pub random_seed: u64,

    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub faults: FaultConfig,
}

fn default_axes() -> Vec<AxisConfig> {
    vec![AxisConfig::default(); 4]
}
fn default_pwm_gain() -> f64 {
    2.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            axes: default_axes(),
            coupling: Vec::new(),
            reported_coupling: None,
            pwm_gain: default_pwm_gain(),
            random_seed: 0,
            encoder: EncoderConfig::default(),
            faults: FaultConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// `n` default axes, no coupling, no noise
    pub fn uncoupled(n: usize) -> Self {
        Self {
            axes: vec![AxisConfig::default(); n],
            ..Default::default()
        }
    }
}
