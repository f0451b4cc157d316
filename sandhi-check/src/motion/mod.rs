//! Motion state machine
//!
//! ```text
//! Idle -> Homing -> MovingToMin <-> MovingToMax -> Homing -> Done
//! ```
//!
//! Every phase is a blocking polling loop paced by the injected clock and
//! bounded by a timeout: a poll budget for mode activation and homing, a
//! wall-clock budget for each sweep leg.

mod machine;

pub use machine::MotionStateMachine;

use crate::joints::Extreme;
use std::time::Duration;

/// Phase of the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    /// Holding position, nothing commanded
    Idle,
    Homing,
    MovingToMin,
    MovingToMax,
    /// Sweep finished and joints back home
    Done,
}

impl SweepPhase {
    /// Phase moving towards `extreme`
    pub fn towards(extreme: Extreme) -> Self {
        match extreme {
            Extreme::Min => SweepPhase::MovingToMin,
            Extreme::Max => SweepPhase::MovingToMax,
        }
    }

    /// Extreme targeted by a sweep leg
    pub fn target(self) -> Option<Extreme> {
        match self {
            SweepPhase::MovingToMin => Some(Extreme::Min),
            SweepPhase::MovingToMax => Some(Extreme::Max),
            _ => None,
        }
    }
}

/// Mutable state of the sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SweepState {
    pub phase: SweepPhase,
    /// Legs completed
    pub cycle_count: u32,
    /// Clock time the current leg started
    pub leg_start: Duration,
}

impl Default for SweepState {
    fn default() -> Self {
        Self {
            phase: SweepPhase::Idle,
            cycle_count: 0,
            leg_start: Duration::ZERO,
        }
    }
}
