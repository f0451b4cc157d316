//! Mock joint driver for hardware-free checks
//!
//! Simulates one robot part (a chain of motorized joints) with joint-side and
//! motor-side encoders, so the consistency engine and the sign check can run
//! end to end without a robot.
//!
//! # Overview
//!
//! | Component | Simulation Method |
//! |-----------|-------------------|
//! | Position control | Constant-speed move towards target at the reference speed |
//! | PWM control | Joint speed proportional to duty cycle |
//! | Joint encoders | Axis state + optional Gaussian noise |
//! | Motor encoders | `sign .* gearbox .* (C * joint) + offset` + optional noise |
//! | Coupling variable | `kinematic_mj` blocks (true or deliberately wrong) |
//!
//! # Time
//!
//! The simulation has no thread of its own. Every driver call first
//! integrates the axes up to the current time of the shared [`Clock`], so the
//! part moves exactly as far as the engine has slept. With a
//! [`ManualClock`](crate::core::clock::ManualClock) a whole run completes in
//! microseconds.
//!
//! # Configuration
//!
//! ```toml
//! [device]
//! type = "mock"
//! name = "Mock left arm"
//!
//! [device.simulation]
//! coupling = [[1.0, 0.0, 0.0, -1.0, 1.6455, 0.0, -1.0, 1.6455, 1.6455]]
//! random_seed = 42
//!
//! [[device.simulation.axes]]
//! gearbox_ratio = 100.0
//! ```
//!
//! # Module Structure
//!
//! - [`config`]: Simulation parameters and injected faults
//! - [`physics`]: Single-axis dynamics
//! - [`encoder_sim`]: Joint and motor encoder readouts
//! - [`noise`]: Seeded noise generator
//!
//! [`Clock`]: crate::core::clock::Clock

pub mod config;
pub mod encoder_sim;
pub mod noise;
pub mod physics;

use crate::core::clock::SharedClock;
use crate::core::driver::{COUPLING_VARIABLE, JointDriver};
use crate::core::types::{ControlMode, InteractionMode};
use crate::coupling::build_coupling_matrix;
use crate::error::{Error, Result};

use config::SimulationConfig;
use encoder_sim::EncoderSimulator;
use noise::EncoderNoise;
use physics::AxisState;

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct MockState {
    config: SimulationConfig,
    axes: Vec<AxisState>,
    encoders: EncoderSimulator,
    last_update: Duration,
    bulk_reads: usize,
}

impl MockState {
    fn advance(&mut self, now: Duration) {
        if now <= self.last_update {
            return;
        }
        let dt = (now - self.last_update).as_secs_f64();
        for axis in &mut self.axes {
            axis.step(dt, self.config.pwm_gain);
        }
        self.last_update = now;
    }

    fn axis_mut(&mut self, axis: usize) -> Result<&mut AxisState> {
        let n = self.axes.len();
        self.axes
            .get_mut(axis)
            .ok_or_else(|| Error::Driver(format!("axis {} out of range (part has {})", axis, n)))
    }

    fn axis_config(&self, axis: usize) -> Result<&config::AxisConfig> {
        self.config
            .axes
            .get(axis)
            .ok_or_else(|| Error::Driver(format!("axis {} out of range", axis)))
    }

    fn bulk_read(&mut self, reading: &'static str) -> Result<()> {
        if let Some(limit) = self.config.faults.fail_bulk_reads_after {
            if self.bulk_reads >= limit {
                return Err(Error::SensorRead {
                    reading,
                    reason: "simulated read failure".to_string(),
                });
            }
        }
        self.bulk_reads += 1;
        Ok(())
    }
}

/// Simulated robot part
///
/// Cloning yields another handle on the same simulated part, which lets tests
/// inspect the part while the engine owns the driver.
#[derive(Clone)]
pub struct MockJointDriver {
    state: Arc<Mutex<MockState>>,
    clock: SharedClock,
}

impl MockJointDriver {
    /// Create a simulated part
    pub fn new(config: SimulationConfig, clock: SharedClock) -> Result<Self> {
        if config.axes.is_empty() {
            return Err(Error::Config(
                "mock device requires at least one axis".to_string(),
            ));
        }
        let coupling = build_coupling_matrix(&config.coupling, config.axes.len())?;
        let axes = config
            .axes
            .iter()
            .enumerate()
            .map(|(i, a)| AxisState::new(a, config.faults.stuck_axes.contains(&i)))
            .collect();
        let noise = EncoderNoise::new(&config.encoder.noise, config.random_seed)?;
        let encoders = EncoderSimulator::new(&config.axes, coupling, noise);

        log::info!(
            "Mock part: {} axes, {} coupling blocks",
            config.axes.len(),
            config.coupling.len()
        );

        let last_update = clock.now();
        Ok(Self {
            state: Arc::new(Mutex::new(MockState {
                config,
                axes,
                encoders,
                last_update,
                bulk_reads: 0,
            })),
            clock,
        })
    }

    /// Lock the state after integrating up to now
    fn sync(&self) -> parking_lot::MutexGuard<'_, MockState> {
        let mut state = self.state.lock();
        state.advance(self.clock.now());
        state
    }

    /// Noise-free joint positions
    pub fn joint_positions(&self) -> Vec<f64> {
        self.sync().axes.iter().map(|a| a.position()).collect()
    }

    /// Current control modes
    pub fn control_modes(&self) -> Vec<ControlMode> {
        self.sync().axes.iter().map(|a| a.control_mode).collect()
    }

    /// Successful bulk reads so far
    pub fn bulk_reads(&self) -> usize {
        self.state.lock().bulk_reads
    }

    /// Make every bulk read after `count` more successful ones fail
    pub fn fail_bulk_reads_after(&self, count: usize) {
        let mut state = self.state.lock();
        let limit = state.bulk_reads + count;
        state.config.faults.fail_bulk_reads_after = Some(limit);
    }
}

impl JointDriver for MockJointDriver {
    fn axes(&mut self) -> Result<usize> {
        Ok(self.state.lock().axes.len())
    }

    fn encoder(&mut self, axis: usize) -> Result<f64> {
        let mut state = self.sync();
        state.axis_mut(axis)?;
        let MockState { axes, encoders, .. } = &mut *state;
        Ok(encoders.joint_positions(axes)[axis])
    }

    fn encoders(&mut self) -> Result<Vec<f64>> {
        let mut state = self.sync();
        state.bulk_read("getEncoders")?;
        let MockState { axes, encoders, .. } = &mut *state;
        Ok(encoders.joint_positions(axes))
    }

    fn encoder_speeds(&mut self) -> Result<Vec<f64>> {
        let mut state = self.sync();
        state.bulk_read("getEncoderSpeeds")?;
        Ok(state.encoders.joint_speeds(&state.axes))
    }

    fn encoder_accelerations(&mut self) -> Result<Vec<f64>> {
        let mut state = self.sync();
        state.bulk_read("getEncoderAccelerations")?;
        Ok(state.encoders.joint_accelerations(&state.axes))
    }

    fn motor_encoder(&mut self, axis: usize) -> Result<f64> {
        let mut state = self.sync();
        state.axis_mut(axis)?;
        let MockState { axes, encoders, .. } = &mut *state;
        Ok(encoders.motor_positions(axes)[axis])
    }

    fn motor_encoders(&mut self) -> Result<Vec<f64>> {
        let mut state = self.sync();
        state.bulk_read("getMotorEncoders")?;
        let MockState { axes, encoders, .. } = &mut *state;
        Ok(encoders.motor_positions(axes))
    }

    fn motor_encoder_speeds(&mut self) -> Result<Vec<f64>> {
        let mut state = self.sync();
        state.bulk_read("getMotorEncoderSpeeds")?;
        Ok(state.encoders.motor_speeds(&state.axes))
    }

    fn motor_encoder_accelerations(&mut self) -> Result<Vec<f64>> {
        let mut state = self.sync();
        state.bulk_read("getMotorEncoderAccelerations")?;
        Ok(state.encoders.motor_accelerations(&state.axes))
    }

    fn set_ref_speed(&mut self, axis: usize, speed: f64) -> Result<()> {
        self.sync().axis_mut(axis)?.set_ref_speed(speed);
        Ok(())
    }

    fn position_move(&mut self, axis: usize, target: f64) -> Result<()> {
        let mut state = self.sync();
        let a = state.axis_mut(axis)?;
        if !a.control_mode.tracks_position() {
            return Err(Error::Driver(format!(
                "axis {} is in {} mode, position move refused",
                axis, a.control_mode
            )));
        }
        a.set_target(target);
        log::trace!("Mock axis {}: position move to {:.3}", axis, target);
        Ok(())
    }

    fn set_control_mode(&mut self, axis: usize, mode: ControlMode) -> Result<()> {
        let mut state = self.sync();
        let rejected = state.config.faults.reject_control_mode.contains(&axis);
        let a = state.axis_mut(axis)?;
        if rejected {
            log::debug!("Mock axis {}: ignoring control mode {}", axis, mode);
            return Ok(());
        }
        if a.control_mode != mode {
            // A mode switch holds the current position
            let here = a.position();
            a.set_target(here);
            a.set_duty(0.0);
            a.control_mode = mode;
        }
        Ok(())
    }

    fn control_mode(&mut self, axis: usize) -> Result<ControlMode> {
        Ok(self.sync().axis_mut(axis)?.control_mode)
    }

    fn set_interaction_mode(&mut self, axis: usize, mode: InteractionMode) -> Result<()> {
        self.sync().axis_mut(axis)?.interaction_mode = mode;
        Ok(())
    }

    fn interaction_mode(&mut self, axis: usize) -> Result<InteractionMode> {
        Ok(self.sync().axis_mut(axis)?.interaction_mode)
    }

    fn gearbox_ratio(&mut self, axis: usize) -> Result<f64> {
        let state = self.state.lock();
        let a = state.axis_config(axis)?;
        Ok(a.reported_gearbox.unwrap_or(a.gearbox_ratio))
    }

    fn set_ref_duty_cycle(&mut self, axis: usize, duty: f64) -> Result<()> {
        let mut state = self.sync();
        let a = state.axis_mut(axis)?;
        if a.control_mode != ControlMode::Pwm {
            return Err(Error::Driver(format!(
                "axis {} is in {} mode, duty cycle refused",
                axis, a.control_mode
            )));
        }
        a.set_duty(duty);
        Ok(())
    }

    fn remote_variable(&mut self, key: &str) -> Result<Vec<Vec<f64>>> {
        if key != COUPLING_VARIABLE {
            return Err(Error::Driver(format!("unknown remote variable `{}`", key)));
        }
        let state = self.state.lock();
        Ok(state
            .config
            .reported_coupling
            .clone()
            .unwrap_or_else(|| state.config.coupling.clone()))
    }
}
