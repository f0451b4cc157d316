//! Encoder simulator for the mock part
//!
//! Produces joint-side and motor-side readings from the axis states. The
//! motor side sees the joints through the true coupling and gearbox:
//!
//! ```text
//! motor = sign .* gearbox .* (C * joint) + offset
//! ```

use super::config::AxisConfig;
use super::noise::{Channel, EncoderNoise};
use super::physics::AxisState;
use crate::coupling::CouplingMatrix;
use nalgebra::DVector;

/// Joint and motor encoder simulator
pub struct EncoderSimulator {
    noise: EncoderNoise,
    coupling: CouplingMatrix,
    /// sign .* gearbox, per axis
    motor_scale: DVector<f64>,
    motor_offset: DVector<f64>,
}

impl EncoderSimulator {
    pub fn new(axes: &[AxisConfig], coupling: CouplingMatrix, noise: EncoderNoise) -> Self {
        let n = axes.len();
        Self {
            noise,
            coupling,
            motor_scale: DVector::from_iterator(n, axes.iter().map(|a| a.motor_sign * a.gearbox_ratio)),
            motor_offset: DVector::from_iterator(n, axes.iter().map(|a| a.motor_offset)),
        }
    }

    fn joint_vector(axes: &[AxisState], value: impl Fn(&AxisState) -> f64) -> DVector<f64> {
        DVector::from_iterator(axes.len(), axes.iter().map(value))
    }

    fn to_motor(&self, joint: &DVector<f64>) -> DVector<f64> {
        (self.coupling.forward() * joint).component_mul(&self.motor_scale)
    }

    /// Joint encoder positions
    pub fn joint_positions(&mut self, axes: &[AxisState]) -> Vec<f64> {
        let mut positions: Vec<f64> = axes.iter().map(|a| a.position()).collect();
        self.noise.perturb(Channel::Joint, &mut positions);
        positions
    }

    pub fn joint_speeds(&self, axes: &[AxisState]) -> Vec<f64> {
        axes.iter().map(|a| a.velocity()).collect()
    }

    pub fn joint_accelerations(&self, axes: &[AxisState]) -> Vec<f64> {
        axes.iter().map(|a| a.acceleration()).collect()
    }

    /// Motor encoder positions
    pub fn motor_positions(&mut self, axes: &[AxisState]) -> Vec<f64> {
        let joint = Self::joint_vector(axes, AxisState::position);
        let motor = self.to_motor(&joint) + &self.motor_offset;
        let mut positions: Vec<f64> = motor.iter().copied().collect();
        self.noise.perturb(Channel::Motor, &mut positions);
        positions
    }

    pub fn motor_speeds(&self, axes: &[AxisState]) -> Vec<f64> {
        let joint = Self::joint_vector(axes, AxisState::velocity);
        self.to_motor(&joint).iter().copied().collect()
    }

    pub fn motor_accelerations(&self, axes: &[AxisState]) -> Vec<f64> {
        let joint = Self::joint_vector(axes, AxisState::acceleration);
        self.to_motor(&joint).iter().copied().collect()
    }
}
