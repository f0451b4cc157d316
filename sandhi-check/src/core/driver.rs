//! JointDriver trait definition

use crate::core::types::{ControlMode, InteractionMode};
use crate::error::Result;

/// Remote variable holding the block-structured joint-to-motor coupling
pub const COUPLING_VARIABLE: &str = "kinematic_mj";

/// Device driver for one robot part (a chain of motorized joints).
///
/// Every call is synchronous and may fail; callers check each result and
/// abort the run on the first error. Bulk reads return one value per physical
/// axis of the part, indexed by axis number.
pub trait JointDriver: Send {
    /// Number of physical axes of the part
    fn axes(&mut self) -> Result<usize>;

    /// Joint-side encoder position of a single axis (deg)
    fn encoder(&mut self, axis: usize) -> Result<f64>;

    /// Joint-side encoder positions of all axes (deg)
    fn encoders(&mut self) -> Result<Vec<f64>>;

    /// Joint-side encoder speeds of all axes (deg/s)
    fn encoder_speeds(&mut self) -> Result<Vec<f64>>;

    /// Joint-side encoder accelerations of all axes (deg/s^2)
    fn encoder_accelerations(&mut self) -> Result<Vec<f64>>;

    /// Motor-side encoder position of a single axis (deg at the motor shaft)
    fn motor_encoder(&mut self, axis: usize) -> Result<f64>;

    /// Motor-side encoder positions of all axes
    fn motor_encoders(&mut self) -> Result<Vec<f64>>;

    /// Motor-side encoder speeds of all axes
    fn motor_encoder_speeds(&mut self) -> Result<Vec<f64>>;

    /// Motor-side encoder accelerations of all axes
    fn motor_encoder_accelerations(&mut self) -> Result<Vec<f64>>;

    /// Reference speed used by subsequent position moves (deg/s)
    fn set_ref_speed(&mut self, axis: usize, speed: f64) -> Result<()>;

    /// Start a position move towards `target` (deg)
    fn position_move(&mut self, axis: usize, target: f64) -> Result<()>;

    /// Request a control mode
    fn set_control_mode(&mut self, axis: usize, mode: ControlMode) -> Result<()>;

    /// Control mode currently reported by the axis
    fn control_mode(&mut self, axis: usize) -> Result<ControlMode>;

    /// Request an interaction mode
    fn set_interaction_mode(&mut self, axis: usize, mode: InteractionMode) -> Result<()>;

    /// Interaction mode currently reported by the axis
    fn interaction_mode(&mut self, axis: usize) -> Result<InteractionMode>;

    /// Gearbox reduction between motor shaft and joint
    fn gearbox_ratio(&mut self, axis: usize) -> Result<f64>;

    /// Open-loop duty cycle, only honoured in [`ControlMode::Pwm`]
    fn set_ref_duty_cycle(&mut self, axis: usize, duty: f64) -> Result<()>;

    /// Query a remote variable as a sequence of numeric blocks
    ///
    /// For [`COUPLING_VARIABLE`] each block is the row-major `k*k` coupling
    /// of one group of mechanically linked joints.
    fn remote_variable(&mut self, key: &str) -> Result<Vec<Vec<f64>>>;
}
