//! Core data types shared by drivers and the check engine.
//!
//! - [`ControlMode`] / [`InteractionMode`]: Per-axis modes a driver reports
//! - [`Kinematics`]: Position, velocity and acceleration of a joint selection

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis control modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Amplifier off
    Idle,
    /// Trajectory-generated position moves
    Position,
    /// Position setpoints streamed directly to the controller
    PositionDirect,
    /// Open-loop duty cycle
    Pwm,
}

impl ControlMode {
    /// Whether `position_move` drives the axis in this mode
    pub fn tracks_position(self) -> bool {
        matches!(self, ControlMode::Position | ControlMode::PositionDirect)
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlMode::Idle => "idle",
            ControlMode::Position => "position",
            ControlMode::PositionDirect => "position_direct",
            ControlMode::Pwm => "pwm",
        };
        f.write_str(name)
    }
}

/// Axis interaction modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    Stiff,
    Compliant,
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionMode::Stiff => f.write_str("stiff"),
            InteractionMode::Compliant => f.write_str("compliant"),
        }
    }
}

/// Position, velocity and acceleration of the tested joints, one entry per
/// joint in joint-list order
#[derive(Debug, Clone, PartialEq)]
pub struct Kinematics {
    pub position: DVector<f64>,
    pub velocity: DVector<f64>,
    pub acceleration: DVector<f64>,
}
