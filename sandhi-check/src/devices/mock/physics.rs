//! Single-axis joint dynamics
//!
//! Position modes move the joint towards its target at the reference speed
//! (an ideal trapezoid without the ramps). PWM mode moves it at a speed
//! proportional to the duty cycle. The joint always stays within its limits.

use super::config::AxisConfig;
use crate::core::types::{ControlMode, InteractionMode};

/// Joint-side state of one simulated axis
#[derive(Debug, Clone)]
pub struct AxisState {
    position: f64,
    velocity: f64,
    acceleration: f64,
    target: f64,
    ref_speed: f64,
    duty: f64,
    min: f64,
    max: f64,
    stuck: bool,
    pub control_mode: ControlMode,
    pub interaction_mode: InteractionMode,
}

impl AxisState {
    pub fn new(config: &AxisConfig, stuck: bool) -> Self {
        let position = config.initial_position.clamp(config.min, config.max);
        Self {
            position,
            velocity: 0.0,
            acceleration: 0.0,
            target: position,
            ref_speed: 10.0,
            duty: 0.0,
            min: config.min,
            max: config.max,
            stuck,
            control_mode: ControlMode::Position,
            interaction_mode: InteractionMode::Stiff,
        }
    }

    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    #[inline]
    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target.clamp(self.min, self.max);
    }

    pub fn set_ref_speed(&mut self, speed: f64) {
        self.ref_speed = speed.abs();
    }

    pub fn set_duty(&mut self, duty: f64) {
        self.duty = duty;
    }

    /// Advance by `dt` seconds
    pub fn step(&mut self, dt: f64, pwm_gain: f64) {
        if dt <= 0.0 {
            return;
        }

        let next = if self.stuck {
            self.position
        } else {
            match self.control_mode {
                ControlMode::Position | ControlMode::PositionDirect => {
                    let error = self.target - self.position;
                    let max_step = self.ref_speed * dt;
                    self.position + error.clamp(-max_step, max_step)
                }
                ControlMode::Pwm => self.position + self.duty * pwm_gain * dt,
                ControlMode::Idle => self.position,
            }
        }
        .clamp(self.min, self.max);

        let velocity = (next - self.position) / dt;
        self.acceleration = (velocity - self.velocity) / dt;
        self.velocity = velocity;
        self.position = next;
    }
}
