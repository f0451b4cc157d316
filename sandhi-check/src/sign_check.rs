//! Motor encoder sign check
//!
//! Verifies, joint by joint, that a positive open-loop duty cycle makes the
//! motor encoder count up. The duty cycle is ramped from `pwm_start` in
//! `pwm_step` increments until the motor encoder has moved by at least
//! `pos_threshold`:
//!
//! - moved up: sign correct
//! - moved down: encoder sign wrong
//! - ramp passed `pwm_max` without motion: joint stuck or threshold too high
//!
//! The other joints hold their home position in position control.

use crate::config::{Config, SignCheckParams, TimingConfig};
use crate::core::clock::{Clock, SharedClock};
use crate::core::driver::JointDriver;
use crate::core::types::ControlMode;
use crate::error::{Error, Result};
use crate::joints::JointSet;
use crate::motion::MotionStateMachine;
use std::time::Duration;

/// Outcome for one joint
#[derive(Debug, Clone, PartialEq)]
pub struct JointSignResult {
    pub joint: usize,
    /// Duty cycle at which the motion was detected
    pub pwm: f64,
    /// Motor encoder displacement at that duty cycle
    pub displacement: f64,
}

/// Per-joint ramp parameters
#[derive(Debug, Clone, Copy)]
struct Ramp {
    start: f64,
    step: f64,
    max: f64,
    threshold: f64,
    delay: Duration,
}

/// Sign check on one robot part
pub struct SignCheck {
    params: SignCheckParams,
    timing: TimingConfig,
    joints: JointSet,
    driver: Box<dyn JointDriver>,
    clock: SharedClock,
}

impl SignCheck {
    /// Validate the `[sign_check]` table and resolve the joints
    pub fn setup(config: &Config, mut driver: Box<dyn JointDriver>, clock: SharedClock) -> Result<Self> {
        let section = config
            .sign_check
            .as_ref()
            .ok_or_else(|| Error::Config("missing [sign_check] section".to_string()))?;
        let params = SignCheckParams::from_section(section)?;
        let joints = JointSet::resolve_sign_check(&params, driver.as_mut())?;

        log::info!("{}: joints {:?}", params.name, params.joints);

        Ok(Self {
            params,
            timing: config.test.timing.clone(),
            joints,
            driver,
            clock,
        })
    }

    fn ramp(&self, i: usize) -> Ramp {
        Ramp {
            start: self.params.pwm_start[i],
            step: self.params.pwm_step[i],
            max: self.params.pwm_max[i],
            threshold: self.params.pos_threshold[i],
            delay: Duration::from_secs_f64(self.params.command_delay[i]),
        }
    }

    /// Check every joint in turn, stopping at the first failure
    pub fn run(&mut self) -> Result<Vec<JointSignResult>> {
        let mut results = Vec::with_capacity(self.joints.len());
        for i in 0..self.joints.len() {
            let axis = self.params.joints[i];
            let ramp = self.ramp(i);
            let mut machine = MotionStateMachine::new(
                self.driver.as_mut(),
                self.clock.as_ref(),
                &self.joints,
                &self.timing,
            );

            let outcome = check_joint(&mut machine, self.clock.as_ref(), axis, ramp);
            restore(&mut machine, axis);

            match outcome {
                Ok(result) => {
                    log::info!(
                        "Joint {}: motor encoder sign ok (moved {:.2} at pwm {:.2})",
                        axis,
                        result.displacement,
                        result.pwm
                    );
                    results.push(result);
                }
                Err(e) => {
                    log::error!("Joint {}: {}", axis, e);
                    return Err(e);
                }
            }
        }
        Ok(results)
    }
}

fn check_joint(
    machine: &mut MotionStateMachine<'_>,
    clock: &dyn Clock,
    axis: usize,
    ramp: Ramp,
) -> Result<JointSignResult> {
    machine.activate_control_mode(ControlMode::Position)?;
    machine.go_home()?;
    machine.activate_joint_control_mode(axis, ControlMode::Pwm)?;

    let driver = machine.driver();
    let start = driver
        .motor_encoder(axis)
        .map_err(|e| Error::read("getMotorEncoder", e))?;

    let mut pwm = ramp.start;
    while pwm <= ramp.max {
        driver
            .set_ref_duty_cycle(axis, pwm)
            .map_err(|e| Error::command("setRefDutyCycle", axis, e))?;
        clock.sleep(ramp.delay);

        let displacement = driver
            .motor_encoder(axis)
            .map_err(|e| Error::read("getMotorEncoder", e))?
            - start;
        log::debug!("Joint {}: pwm {:.2}, motor moved {:.3}", axis, pwm, displacement);

        if displacement >= ramp.threshold {
            return Ok(JointSignResult {
                joint: axis,
                pwm,
                displacement,
            });
        }
        if displacement <= -ramp.threshold {
            return Err(Error::SignCheck {
                joint: axis,
                reason: format!(
                    "motor encoder decreases with positive pwm ({:.2} at pwm {:.2})",
                    displacement, pwm
                ),
            });
        }
        pwm += ramp.step;
    }

    Err(Error::SignCheck {
        joint: axis,
        reason: format!(
            "motor encoder moved less than {} up to pwm {}",
            ramp.threshold, ramp.max
        ),
    })
}

/// Zero the duty cycle, restore position control and home, logging failures
fn restore(machine: &mut MotionStateMachine<'_>, axis: usize) {
    if let Err(e) = machine.driver().set_ref_duty_cycle(axis, 0.0) {
        log::debug!("Joint {}: duty cycle reset: {}", axis, e);
    }
    if let Err(e) = machine.activate_control_mode(ControlMode::Position) {
        log::warn!("Joint {}: {}", axis, e);
    }
    if let Err(e) = machine.go_home() {
        log::warn!("Joint {}: {}", axis, e);
    }
}
