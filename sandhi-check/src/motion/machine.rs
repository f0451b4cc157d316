//! Blocking implementation of the sweep phases

use super::{SweepPhase, SweepState};
use crate::config::TimingConfig;
use crate::core::clock::Clock;
use crate::core::driver::JointDriver;
use crate::core::types::{ControlMode, InteractionMode};
use crate::error::{Error, Result};
use crate::joints::{Extreme, JointSet};
use crate::sampler::ConsistencySampler;
use crate::series::SeriesAccumulator;
use nalgebra::DVector;

/// Drives the tested joints through mode activation, homing and the sweep
pub struct MotionStateMachine<'a> {
    driver: &'a mut dyn JointDriver,
    clock: &'a dyn Clock,
    joints: &'a JointSet,
    timing: &'a TimingConfig,
    state: SweepState,
}

impl<'a> MotionStateMachine<'a> {
    pub fn new(
        driver: &'a mut dyn JointDriver,
        clock: &'a dyn Clock,
        joints: &'a JointSet,
        timing: &'a TimingConfig,
    ) -> Self {
        Self {
            driver,
            clock,
            joints,
            timing,
            state: SweepState::default(),
        }
    }

    pub fn state(&self) -> &SweepState {
        &self.state
    }

    /// Driver access for procedures layered on top (sign check)
    pub fn driver(&mut self) -> &mut dyn JointDriver {
        &mut *self.driver
    }

    /// Put every tested joint in `mode` (stiff interaction) and wait for it
    pub fn activate_control_mode(&mut self, mode: ControlMode) -> Result<()> {
        let axes = self.joints.indices();
        self.activate_axes(&axes, mode)
    }

    /// Put a single axis in `mode` (stiff interaction) and wait for it
    pub fn activate_joint_control_mode(&mut self, axis: usize, mode: ControlMode) -> Result<()> {
        self.activate_axes(&[axis], mode)
    }

    fn activate_axes(&mut self, axes: &[usize], mode: ControlMode) -> Result<()> {
        let interaction = InteractionMode::Stiff;

        for &axis in axes {
            self.driver
                .set_control_mode(axis, mode)
                .map_err(|e| Error::command("setControlMode", axis, e))?;
            self.driver
                .set_interaction_mode(axis, interaction)
                .map_err(|e| Error::command("setInteractionMode", axis, e))?;
            self.clock.sleep(self.timing.mode_settle());
        }

        let mut pending = axes.to_vec();
        for poll in 0..self.timing.max_polls {
            pending.clear();
            for &axis in axes {
                let cmode = self
                    .driver
                    .control_mode(axis)
                    .map_err(|e| Error::read("getControlMode", e))?;
                let imode = self
                    .driver
                    .interaction_mode(axis)
                    .map_err(|e| Error::read("getInteractionMode", e))?;
                if cmode != mode || imode != interaction {
                    pending.push(axis);
                }
            }
            if pending.is_empty() {
                log::debug!("Control mode {} active on {:?} after {} polls", mode, axes, poll);
                return Ok(());
            }
            self.clock.sleep(self.timing.poll_interval());
        }

        Err(Error::ControlMode {
            mode: mode.to_string(),
            interaction: interaction.to_string(),
            joints: pending,
        })
    }

    /// Joint encoder positions of the tested joints, read one by one
    fn joint_positions(&mut self) -> Result<DVector<f64>> {
        let mut positions = DVector::zeros(self.joints.len());
        for (i, joint) in self.joints.iter().enumerate() {
            positions[i] = self
                .driver
                .encoder(joint.index)
                .map_err(|e| Error::read("getEncoder", e))?;
        }
        Ok(positions)
    }

    /// Move every tested joint to home and wait until all are in tolerance
    pub fn go_home(&mut self) -> Result<()> {
        self.state.phase = SweepPhase::Homing;

        for joint in self.joints.iter() {
            self.driver
                .set_ref_speed(joint.index, joint.ref_speed)
                .map_err(|e| Error::command("setRefSpeed", joint.index, e))?;
            self.driver
                .position_move(joint.index, joint.home)
                .map_err(|e| Error::command("positionMove", joint.index, e))?;
        }

        let homes = self.joints.homes();
        let mut out = self.joints.indices();
        for poll in 0..self.timing.max_polls {
            let positions = self.joint_positions()?;
            out = self.joints.out_of_tolerance(&positions, &homes);
            if out.is_empty() {
                log::info!("Home position reached after {} polls", poll);
                self.state.phase = SweepPhase::Idle;
                return Ok(());
            }
            self.clock.sleep(self.timing.poll_interval());
        }

        Err(Error::HomingTimeout {
            polls: self.timing.max_polls,
            joints: out,
        })
    }

    fn command_leg(&mut self, extreme: Extreme) -> Result<()> {
        let targets = self.joints.targets(extreme);
        for (i, joint) in self.joints.iter().enumerate() {
            self.driver
                .position_move(joint.index, targets[i])
                .map_err(|e| Error::command("positionMove", joint.index, e))?;
        }
        self.state.phase = SweepPhase::towards(extreme);
        self.state.leg_start = self.clock.now();
        log::debug!("Moving towards {}", extreme.name());
        Ok(())
    }

    /// Sweep between the extremes for `cycles` legs, sampling every tick,
    /// then return home
    ///
    /// A leg is complete when every joint is within tolerance of its target.
    /// The first leg goes from the current position to the minimum.
    pub fn sweep(
        &mut self,
        cycles: u32,
        sampler: &mut ConsistencySampler,
        series: &mut SeriesAccumulator,
    ) -> Result<()> {
        self.state.cycle_count = 0;
        self.command_leg(Extreme::Min)?;
        let sweep_start = self.clock.now();

        loop {
            let now = self.clock.now();
            let frame = sampler.sample(&mut *self.driver, self.joints, now - sweep_start)?;

            if let Some(extreme) = self.state.phase.target() {
                let out = self
                    .joints
                    .out_of_tolerance(&frame.joint.position, &self.joints.targets(extreme));
                let elapsed = now - self.state.leg_start;

                if out.is_empty() {
                    self.state.cycle_count += 1;
                    log::info!("Test cycle {}/{}", self.state.cycle_count, cycles);
                    if self.state.cycle_count < cycles {
                        self.command_leg(extreme.opposite())?;
                    }
                } else if elapsed >= self.timing.leg_timeout() {
                    return Err(Error::MotionTimeout {
                        target: extreme.name(),
                        elapsed_s: elapsed.as_secs_f64(),
                        cycle: self.state.cycle_count,
                        joints: out,
                    });
                }
            }

            series.push(&frame);

            if self.state.cycle_count >= cycles {
                break;
            }
            self.clock.sleep(self.timing.tick_period());
        }

        self.go_home()?;
        self.state.phase = SweepPhase::Done;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::coupling::CouplingMatrix;
    use crate::devices::mock::MockJointDriver;
    use crate::devices::mock::config::SimulationConfig;
    use crate::joints::{Joint, test_joint_set};
    use crate::series::SeriesKind;
    use std::sync::Arc;
    use std::time::Duration;

    fn joint(index: usize, home: f64) -> Joint {
        Joint {
            index,
            min: -10.0,
            max: 10.0,
            home,
            ref_speed: 20.0,
            gearbox_ratio: 100.0,
        }
    }

    fn setup(config: SimulationConfig) -> (MockJointDriver, ManualClock) {
        let clock = ManualClock::new();
        let driver = MockJointDriver::new(config, Arc::new(clock.clone())).unwrap();
        (driver, clock)
    }

    fn sampler(joints: &JointSet, timing: &TimingConfig) -> ConsistencySampler {
        ConsistencySampler::new(
            CouplingMatrix::identity(joints.len()),
            joints.gearbox(),
            timing.tick_period(),
        )
    }

    #[test]
    fn test_homing_converges() {
        let (mut driver, clock) = setup(SimulationConfig::uncoupled(3));
        let joints = test_joint_set(vec![joint(0, 5.0), joint(2, -3.0)], 0.5, 3);
        let timing = TimingConfig::default();
        let inspect = driver.clone();

        let mut machine = MotionStateMachine::new(&mut driver, &clock, &joints, &timing);
        machine.go_home().unwrap();

        assert_eq!(machine.state().phase, SweepPhase::Idle);
        let positions = inspect.joint_positions();
        assert!((positions[0] - 5.0).abs() < 0.5);
        assert!((positions[2] + 3.0).abs() < 0.5);
        assert_eq!(positions[1], 0.0);
        assert!(clock.now() < Duration::from_secs(1));
    }

    #[test]
    fn test_homing_timeout_on_stuck_joint() {
        let mut config = SimulationConfig::uncoupled(2);
        config.faults.stuck_axes = vec![1];
        let (mut driver, clock) = setup(config);
        let joints = test_joint_set(vec![joint(0, 5.0), joint(1, 5.0)], 0.5, 2);
        let timing = TimingConfig::default();

        let mut machine = MotionStateMachine::new(&mut driver, &clock, &joints, &timing);
        let err = machine.go_home().unwrap_err();

        match err {
            Error::HomingTimeout { polls, joints } => {
                assert_eq!(polls, 100);
                assert_eq!(joints, vec![1]);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(clock.now(), Duration::from_secs(20));
    }

    #[test]
    fn test_control_mode_activation() {
        let (mut driver, clock) = setup(SimulationConfig::uncoupled(3));
        let joints = test_joint_set(vec![joint(0, 0.0), joint(2, 0.0)], 0.5, 3);
        let timing = TimingConfig::default();
        let inspect = driver.clone();

        let mut machine = MotionStateMachine::new(&mut driver, &clock, &joints, &timing);
        machine.activate_control_mode(ControlMode::PositionDirect).unwrap();

        assert_eq!(
            inspect.control_modes(),
            vec![ControlMode::PositionDirect, ControlMode::Position, ControlMode::PositionDirect]
        );
        assert_eq!(clock.now(), Duration::from_millis(20));
    }

    #[test]
    fn test_control_mode_rejected() {
        let mut config = SimulationConfig::uncoupled(3);
        config.faults.reject_control_mode = vec![2];
        let (mut driver, clock) = setup(config);
        let joints = test_joint_set(vec![joint(0, 0.0), joint(2, 0.0)], 0.5, 3);
        let timing = TimingConfig::default();

        let mut machine = MotionStateMachine::new(&mut driver, &clock, &joints, &timing);
        let err = machine.activate_control_mode(ControlMode::PositionDirect).unwrap_err();
        assert!(matches!(err, Error::ControlMode { ref joints, .. } if joints == &vec![2]));
    }

    /// Sampled positions of the first joint
    fn joint_track(series: &SeriesAccumulator) -> Vec<f64> {
        series
            .rows(SeriesKind::JointMotorPositionReversed)
            .iter()
            .map(|row| row.left[0])
            .collect()
    }

    /// Extremes visited in order, min first, each counted once per visit
    fn extremes_reached(track: &[f64], min: f64, max: f64, tolerance: f64) -> Vec<Extreme> {
        let mut reached = Vec::new();
        let mut next = Extreme::Min;
        for p in track {
            let target = match next {
                Extreme::Min => min,
                Extreme::Max => max,
            };
            if (p - target).abs() < tolerance {
                reached.push(next);
                next = next.opposite();
            }
        }
        reached
    }

    #[test]
    fn test_sweep_counts_legs() {
        for cycles in [1, 2, 3, 4] {
            let (mut driver, clock) = setup(SimulationConfig::uncoupled(1));
            let joints = test_joint_set(vec![joint(0, 0.0)], 0.5, 1);
            let timing = TimingConfig::default();
            let mut sampler = sampler(&joints, &timing);
            let mut series = SeriesAccumulator::new();

            let mut machine = MotionStateMachine::new(&mut driver, &clock, &joints, &timing);
            machine.sweep(cycles, &mut sampler, &mut series).unwrap();
            assert_eq!(machine.state().cycle_count, cycles);
            assert_eq!(machine.state().phase, SweepPhase::Done);

            let track = joint_track(&series);
            let reached = extremes_reached(&track, -10.0, 10.0, 0.5);
            assert_eq!(reached.len(), cycles as usize, "cycles = {}", cycles);

            // Sampling stops on the last turning point
            let last = *track.last().unwrap();
            let expected = if cycles % 2 == 1 { -10.0 } else { 10.0 };
            assert!((last - expected).abs() < 0.5, "cycles = {}, last = {}", cycles, last);
        }
    }

    #[test]
    fn test_sweep_leg_timeout() {
        let (mut driver, clock) = setup(SimulationConfig::uncoupled(1));
        let mut slow = joint(0, 0.0);
        slow.ref_speed = 0.1;
        let joints = test_joint_set(vec![slow], 0.5, 1);
        let timing = TimingConfig::default();
        let mut sampler = sampler(&joints, &timing);
        let mut series = SeriesAccumulator::new();

        let mut machine = MotionStateMachine::new(&mut driver, &clock, &joints, &timing);
        // Reference speed is only applied by homing
        machine.go_home().unwrap();
        let err = machine.sweep(2, &mut sampler, &mut series).unwrap_err();

        match err {
            Error::MotionTimeout {
                target,
                elapsed_s,
                cycle,
                joints,
            } => {
                assert_eq!(target, "min");
                assert!(elapsed_s >= 20.0);
                assert_eq!(cycle, 0);
                assert_eq!(joints, vec![0]);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(series.frames() > 1000);
    }

    #[test]
    fn test_sweep_read_failure_stops_sampling() {
        let (mut driver, clock) = setup(SimulationConfig::uncoupled(1));
        let joints = test_joint_set(vec![joint(0, 0.0)], 0.5, 1);
        let timing = TimingConfig::default();
        let mut sampler = sampler(&joints, &timing);
        let mut series = SeriesAccumulator::new();
        // Five frames of six bulk reads, then a failure inside the sixth frame
        driver.fail_bulk_reads_after(5 * 6 + 2);

        let mut machine = MotionStateMachine::new(&mut driver, &clock, &joints, &timing);
        let err = machine.sweep(2, &mut sampler, &mut series).unwrap_err();

        assert!(matches!(err, Error::SensorRead { reading: "getEncoderAccelerations", .. }));
        assert_eq!(series.frames(), 5);
    }
}
