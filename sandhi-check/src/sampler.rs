//! Per-tick consistency sampling
//!
//! Each tick reads both sensing chains of the tested joints and maps one onto
//! the other through the coupling matrix and the gearbox:
//!
//! ```text
//! joint -> motor:  (M * joint) .* gearbox
//! motor -> joint:  (M^-1 * (motor - motor_offset)) ./ gearbox
//! ```
//!
//! Position derivatives are finite differences over the nominal tick period,
//! to be compared with the velocities the driver reports.
//!
//! # Offsets
//!
//! The first frame of a run fixes the [`Offsets`]. The joint offset is taken
//! from the raw joint positions before anything else. The motor and
//! joint-to-motor offsets are taken after the first frame has been
//! transformed, so the motor-to-joint transform of that first frame still
//! sees a zero motor offset. Acceleration is read but not transformed.

use crate::core::driver::JointDriver;
use crate::core::types::Kinematics;
use crate::coupling::CouplingMatrix;
use crate::error::{Error, Result};
use crate::joints::JointSet;
use nalgebra::DVector;
use std::time::Duration;

/// Reference values captured from the first frame of a run
#[derive(Debug, Clone, PartialEq)]
pub struct Offsets {
    pub motor_position: DVector<f64>,
    pub joint_position: DVector<f64>,
    pub joint_to_motor: DVector<f64>,
}

/// Finite differences against the previous frame (per second)
#[derive(Debug, Clone, PartialEq)]
pub struct Derivatives {
    pub joint: DVector<f64>,
    pub motor: DVector<f64>,
    pub joint_to_motor: DVector<f64>,
}

/// Everything sampled and derived in one tick
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFrame {
    /// Time since the sweep started
    pub elapsed: Duration,
    pub joint: Kinematics,
    pub motor: Kinematics,
    /// Joint positions in motor units
    pub joint_to_motor: DVector<f64>,
    /// Joint velocities in motor units
    pub joint_to_motor_velocity: DVector<f64>,
    /// Motor positions in joint units, motor offset removed
    pub motor_to_joint: DVector<f64>,
    /// `None` on the first frame
    pub derivatives: Option<Derivatives>,
    /// Motor positions relative to the first frame
    pub motor_relative: DVector<f64>,
    /// Joint-to-motor positions relative to the first frame
    pub joint_to_motor_relative: DVector<f64>,
    /// Motor-to-joint positions with the joint offset added back
    pub motor_to_joint_absolute: DVector<f64>,
}

struct Previous {
    joint: DVector<f64>,
    motor: DVector<f64>,
    joint_to_motor: DVector<f64>,
}

/// Stateful sampler for one run
pub struct ConsistencySampler {
    coupling: CouplingMatrix,
    gearbox: DVector<f64>,
    tick_s: f64,
    offsets: Option<Offsets>,
    previous: Option<Previous>,
}

impl ConsistencySampler {
    pub fn new(coupling: CouplingMatrix, gearbox: DVector<f64>, tick_period: Duration) -> Self {
        Self {
            coupling,
            gearbox,
            tick_s: tick_period.as_secs_f64(),
            offsets: None,
            previous: None,
        }
    }

    /// Offsets, once the first frame has been taken
    pub fn offsets(&self) -> Option<&Offsets> {
        self.offsets.as_ref()
    }

    pub fn coupling(&self) -> &CouplingMatrix {
        &self.coupling
    }

    /// Read the six bulk signals and build a frame
    ///
    /// Any failed read aborts before the sampler state changes.
    pub fn sample(
        &mut self,
        driver: &mut dyn JointDriver,
        joints: &JointSet,
        elapsed: Duration,
    ) -> Result<SampleFrame> {
        let joint = Kinematics {
            position: read(joints, "getEncoders", driver.encoders())?,
            velocity: read(joints, "getEncoderSpeeds", driver.encoder_speeds())?,
            acceleration: read(
                joints,
                "getEncoderAccelerations",
                driver.encoder_accelerations(),
            )?,
        };
        let motor = Kinematics {
            position: read(joints, "getMotorEncoders", driver.motor_encoders())?,
            velocity: read(joints, "getMotorEncoderSpeeds", driver.motor_encoder_speeds())?,
            acceleration: read(
                joints,
                "getMotorEncoderAccelerations",
                driver.motor_encoder_accelerations(),
            )?,
        };
        Ok(self.process(elapsed, joint, motor))
    }

    /// Derive a frame from raw readings
    pub fn process(&mut self, elapsed: Duration, joint: Kinematics, motor: Kinematics) -> SampleFrame {
        let n = joint.position.len();
        let first = self.offsets.is_none();

        let (motor_offset, joint_offset) = match &self.offsets {
            Some(o) => (o.motor_position.clone(), o.joint_position.clone()),
            None => (DVector::zeros(n), joint.position.clone()),
        };

        let joint_to_motor = self.coupling.joint_to_motor(&joint.position, &self.gearbox);
        let joint_to_motor_velocity = self.coupling.joint_to_motor(&joint.velocity, &self.gearbox);
        let motor_to_joint = self
            .coupling
            .motor_to_joint(&(&motor.position - &motor_offset), &self.gearbox);

        let derivatives = self.previous.as_ref().map(|prev| Derivatives {
            joint: (&joint.position - &prev.joint) / self.tick_s,
            motor: (&motor.position - &prev.motor) / self.tick_s,
            joint_to_motor: (&joint_to_motor - &prev.joint_to_motor) / self.tick_s,
        });
        self.previous = Some(Previous {
            joint: joint.position.clone(),
            motor: motor.position.clone(),
            joint_to_motor: joint_to_motor.clone(),
        });

        let offsets = self.offsets.get_or_insert_with(|| Offsets {
            motor_position: motor.position.clone(),
            joint_position: joint_offset,
            joint_to_motor: joint_to_motor.clone(),
        });
        if first {
            log::debug!(
                "Offsets captured: motor {:?}, joint {:?}",
                offsets.motor_position.as_slice(),
                offsets.joint_position.as_slice()
            );
        }

        let motor_relative = &motor.position - &offsets.motor_position;
        let joint_to_motor_relative = &joint_to_motor - &offsets.joint_to_motor;
        let motor_to_joint_absolute = &motor_to_joint + &offsets.joint_position;

        log::trace!(
            "t={:.3}s joint {:?} motor {:?} j2m {:?}",
            elapsed.as_secs_f64(),
            joint.position.as_slice(),
            motor.position.as_slice(),
            joint_to_motor.as_slice()
        );

        SampleFrame {
            elapsed,
            joint,
            motor,
            joint_to_motor,
            joint_to_motor_velocity,
            motor_to_joint,
            derivatives,
            motor_relative,
            joint_to_motor_relative,
            motor_to_joint_absolute,
        }
    }
}

fn read(joints: &JointSet, reading: &'static str, values: Result<Vec<f64>>) -> Result<DVector<f64>> {
    let values = values.map_err(|e| Error::read(reading, e))?;
    joints.select(reading, &values)
}
