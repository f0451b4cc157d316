//! Tested joint set
//!
//! Static per-run description of the joints under test. Built once during
//! setup from validated parameters and the driver (axis count, gearbox
//! ratios), read-only afterwards.

use crate::config::{SignCheckParams, TestParams};
use crate::core::driver::JointDriver;
use crate::error::{Error, Result};
use nalgebra::DVector;

/// One tested joint
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    /// Axis index on the part
    pub index: usize,
    pub min: f64,
    pub max: f64,
    pub home: f64,
    /// Reference speed for position moves (deg/s)
    pub ref_speed: f64,
    /// Motor turns per joint turn, as reported by the driver
    pub gearbox_ratio: f64,
}

/// Joints under test, in configuration order
#[derive(Debug, Clone)]
pub struct JointSet {
    joints: Vec<Joint>,
    tolerance: f64,
    part_axes: usize,
}

/// Which extreme of the range a sweep leg heads for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Min,
    Max,
}

impl Extreme {
    pub fn name(self) -> &'static str {
        match self {
            Extreme::Min => "min",
            Extreme::Max => "max",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Extreme::Min => Extreme::Max,
            Extreme::Max => Extreme::Min,
        }
    }
}

impl JointSet {
    /// Resolve the consistency-run joints against the driver
    pub fn resolve(params: &TestParams, driver: &mut dyn JointDriver) -> Result<Self> {
        let specs = params
            .joints
            .iter()
            .enumerate()
            .map(|(i, &index)| (index, params.min[i], params.max[i], params.home[i], params.speed[i]));
        Self::build(specs, params.tolerance, driver)
    }

    /// Resolve the sign-check joints; the sweep range is unused there
    pub fn resolve_sign_check(
        params: &SignCheckParams,
        driver: &mut dyn JointDriver,
    ) -> Result<Self> {
        let specs = params
            .joints
            .iter()
            .enumerate()
            .map(|(i, &index)| (index, params.home[i], params.home[i], params.home[i], params.speed[i]));
        Self::build(specs, params.tolerance, driver)
    }

    fn build(
        specs: impl Iterator<Item = (usize, f64, f64, f64, f64)>,
        tolerance: f64,
        driver: &mut dyn JointDriver,
    ) -> Result<Self> {
        let part_axes = driver
            .axes()
            .map_err(|e| Error::Driver(format!("unable to get the number of joints of the part: {}", e)))?;

        let specs: Vec<_> = specs.collect();
        if specs.len() > part_axes {
            return Err(Error::Config(format!(
                "invalid number of joints {}, it must be <= number of part joints {}",
                specs.len(),
                part_axes
            )));
        }

        let mut joints = Vec::with_capacity(specs.len());
        for (index, min, max, home, ref_speed) in specs {
            if index >= part_axes {
                return Err(Error::Config(format!(
                    "joint {} does not exist, the part has {} joints",
                    index, part_axes
                )));
            }
            let gearbox_ratio = driver
                .gearbox_ratio(index)
                .map_err(|e| Error::command("getGearboxRatio", index, e))?;
            if gearbox_ratio == 0.0 || !gearbox_ratio.is_finite() {
                return Err(Error::Config(format!(
                    "joint {} reports invalid gearbox ratio {}",
                    index, gearbox_ratio
                )));
            }
            joints.push(Joint {
                index,
                min,
                max,
                home,
                ref_speed,
                gearbox_ratio,
            });
        }

        log::debug!(
            "Resolved {} joints on a {}-axis part, gearbox ratios {:?}",
            joints.len(),
            part_axes,
            joints.iter().map(|j| j.gearbox_ratio).collect::<Vec<_>>()
        );

        Ok(Self {
            joints,
            tolerance,
            part_axes,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter()
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Physical axes of the part
    pub fn part_axes(&self) -> usize {
        self.part_axes
    }

    pub fn indices(&self) -> Vec<usize> {
        self.joints.iter().map(|j| j.index).collect()
    }

    pub fn gearbox(&self) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.joints.iter().map(|j| j.gearbox_ratio))
    }

    /// Leg target of every joint
    pub fn targets(&self, extreme: Extreme) -> DVector<f64> {
        DVector::from_iterator(
            self.len(),
            self.joints.iter().map(|j| match extreme {
                Extreme::Min => j.min,
                Extreme::Max => j.max,
            }),
        )
    }

    pub fn homes(&self) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.joints.iter().map(|j| j.home))
    }

    /// Pick the tested joints out of a whole-part bulk read
    pub fn select(&self, reading: &'static str, values: &[f64]) -> Result<DVector<f64>> {
        if values.len() < self.part_axes {
            return Err(Error::SensorRead {
                reading,
                reason: format!(
                    "returned {} values for a {}-axis part",
                    values.len(),
                    self.part_axes
                ),
            });
        }
        Ok(DVector::from_iterator(
            self.len(),
            self.joints.iter().map(|j| values[j.index]),
        ))
    }

    /// Joints (by axis index) farther than `tolerance` from their target
    pub fn out_of_tolerance(&self, positions: &DVector<f64>, targets: &DVector<f64>) -> Vec<usize> {
        self.joints
            .iter()
            .enumerate()
            .filter(|(i, _)| (positions[*i] - targets[*i]).abs() >= self.tolerance)
            .map(|(_, j)| j.index)
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn test_joint_set(joints: Vec<Joint>, tolerance: f64, part_axes: usize) -> JointSet {
    JointSet {
        joints,
        tolerance,
        part_axes,
    }
}
