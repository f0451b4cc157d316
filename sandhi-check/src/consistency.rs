//! Joint/motor encoder consistency run
//!
//! Lifecycle:
//!
//! 1. [`ConsistencyCheck::setup`] validates the `[test]` parameters and
//!    resolves the joints (axis count, gearbox ratios) against the driver.
//! 2. [`ConsistencyCheck::run`] reads the coupling matrix, activates
//!    position-direct control, homes, sweeps while sampling, homes again,
//!    exports the series and triggers the analysis.
//! 3. [`ConsistencyCheck::tear_down`] restores position control and homes.
//!
//! A failed run tears down by itself, exports whatever was collected and
//! returns the original error. A failed export also tears down before
//! returning.

use crate::analysis::{self, AnalysisOutcome};
use crate::config::{Config, OutputConfig, TestParams};
use crate::core::clock::SharedClock;
use crate::core::driver::{COUPLING_VARIABLE, JointDriver};
use crate::core::types::ControlMode;
use crate::coupling::{CouplingMatrix, build_coupling_matrix};
use crate::error::{Error, Result};
use crate::joints::JointSet;
use crate::motion::MotionStateMachine;
use crate::sampler::ConsistencySampler;
use crate::series::SeriesAccumulator;
use std::path::PathBuf;

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub coupling: CouplingMatrix,
    /// Legs completed
    pub cycles: u32,
    /// Frames sampled
    pub frames: usize,
    /// Exported series files
    pub files: Vec<PathBuf>,
    pub analysis: AnalysisOutcome,
}

/// Encoder consistency check on one robot part
pub struct ConsistencyCheck {
    params: TestParams,
    output: OutputConfig,
    joints: JointSet,
    driver: Box<dyn JointDriver>,
    clock: SharedClock,
}

impl ConsistencyCheck {
    /// Validate parameters and resolve the joints
    pub fn setup(config: &Config, mut driver: Box<dyn JointDriver>, clock: SharedClock) -> Result<Self> {
        let params = TestParams::from_section(&config.test)?;
        let joints = JointSet::resolve(&params, driver.as_mut())?;

        log::info!(
            "{}: robot {}, part {}, joints {:?}, {} cycles",
            params.name,
            params.robot,
            params.part,
            params.joints,
            params.cycles
        );

        Ok(Self {
            params,
            output: config.output.clone(),
            joints,
            driver,
            clock,
        })
    }

    pub fn params(&self) -> &TestParams {
        &self.params
    }

    pub fn joints(&self) -> &JointSet {
        &self.joints
    }

    /// Run the check
    pub fn run(&mut self) -> Result<RunReport> {
        let mut series = SeriesAccumulator::new();

        let (coupling, cycles) = match self.collect(&mut series) {
            Ok(collected) => collected,
            Err(e) => {
                log::error!("{} aborted: {}", self.params.name, e);
                self.tear_down();
                if !series.is_empty() {
                    log::info!("Exporting {} frames collected before the failure", series.frames());
                    if let Err(export_err) = self.export(&series) {
                        log::warn!("Unable to export partial series: {}", export_err);
                    }
                }
                return Err(e);
            }
        };

        let files = match self.export(&series) {
            Ok(files) => files,
            Err(e) => {
                log::error!("{}: unable to export series: {}", self.params.name, e);
                self.tear_down();
                return Err(e);
            }
        };
        let analysis = analysis::trigger(
            &self.output.script_dirs,
            &self.output.directory,
            &self.params.part,
            self.joints.len(),
            self.params.plot_enabled,
        );

        Ok(RunReport {
            coupling,
            cycles,
            frames: series.frames(),
            files,
            analysis,
        })
    }

    fn collect(&mut self, series: &mut SeriesAccumulator) -> Result<(CouplingMatrix, u32)> {
        let coupling = self.read_coupling()?;
        let mut sampler = ConsistencySampler::new(
            coupling.clone(),
            self.joints.gearbox(),
            self.params.timing.tick_period(),
        );

        let mut machine = MotionStateMachine::new(
            self.driver.as_mut(),
            self.clock.as_ref(),
            &self.joints,
            &self.params.timing,
        );
        machine.activate_control_mode(ControlMode::PositionDirect)?;
        machine.go_home()?;
        machine.sweep(self.params.cycles, &mut sampler, series)?;

        Ok((coupling, machine.state().cycle_count))
    }

    fn read_coupling(&mut self) -> Result<CouplingMatrix> {
        let blocks = self.driver.remote_variable(COUPLING_VARIABLE).map_err(|e| {
            Error::Driver(format!("unable to read remote variable {}: {}", COUPLING_VARIABLE, e))
        })?;
        let coupling = build_coupling_matrix(&blocks, self.params.matrix_size)?;

        log::info!("Matrix:{}", coupling.forward());
        log::info!("Inv matrix:{}", coupling.inverse());
        Ok(coupling)
    }

    fn export(&self, series: &SeriesAccumulator) -> Result<Vec<PathBuf>> {
        series.export(&self.output.directory, &self.output.prefix, &self.params.part)
    }

    /// Restore position control and return home, logging any failure
    pub fn tear_down(&mut self) {
        let mut machine = MotionStateMachine::new(
            self.driver.as_mut(),
            self.clock.as_ref(),
            &self.joints,
            &self.params.timing,
        );
        if let Err(e) = machine.activate_control_mode(ControlMode::Position) {
            log::warn!("Tear down: {}", e);
        }
        if let Err(e) = machine.go_home() {
            log::error!("Tear down: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::devices::mock::MockJointDriver;
    use crate::devices::mock::config::SimulationConfig;
    use std::sync::Arc;

    fn config(dir: &std::path::Path) -> Config {
        let toml = format!(
            r#"
[device]
type = "mock"

[test]
robot = "sim"
part = "wrist"
joints = [0, 1]
home = [0.0, 0.0]
min = [-5.0, -5.0]
max = [5.0, 5.0]
speed = [10.0, 10.0]
tolerance = 0.5
matrix_size = 2
cycles = 2

[output]
directory = "{}"
script_dirs = []
"#,
            dir.display()
        );
        Config::parse(&toml).unwrap()
    }

    #[test]
    fn test_setup_rejects_too_many_joints() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new());
        let driver = MockJointDriver::new(SimulationConfig::uncoupled(1), clock.clone()).unwrap();
        let result = ConsistencyCheck::setup(&config(dir.path()), Box::new(driver), clock);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_singular_matrix_aborts_before_motion() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new());
        let mut sim = SimulationConfig::uncoupled(2);
        sim.reported_coupling = Some(vec![vec![1.0, 1.0, 1.0, 1.0]]);
        let driver = MockJointDriver::new(sim, clock.clone()).unwrap();
        let inspect = driver.clone();

        let mut check = ConsistencyCheck::setup(&config(dir.path()), Box::new(driver), clock).unwrap();
        let err = check.run().unwrap_err();

        assert!(matches!(err, Error::MatrixInversion { size: 2 }));
        assert_eq!(inspect.bulk_reads(), 0);
        assert_eq!(inspect.joint_positions(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_run_completes() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new());
        let driver = MockJointDriver::new(SimulationConfig::uncoupled(2), clock.clone()).unwrap();

        let mut check = ConsistencyCheck::setup(&config(dir.path()), Box::new(driver), clock).unwrap();
        let report = check.run().unwrap();
        check.tear_down();

        assert_eq!(report.cycles, 2);
        assert_eq!(report.files.len(), 5);
        assert!(report.frames > 0);
        assert_eq!(report.analysis, AnalysisOutcome::ScriptMissing);
        assert!(dir.path().join("encConsis_jointPos_MotorPos_wrist.txt").is_file());
    }
}
