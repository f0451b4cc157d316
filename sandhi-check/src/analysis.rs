//! Offline analysis trigger
//!
//! The exported series are judged by an Octave script,
//! `encoderConsistencyPlotAll.m`. After export the run either launches it or
//! logs the command line for manual use. Nothing here can fail the run.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Plotting script looked up in the script directories
pub const PLOT_SCRIPT: &str = "encoderConsistencyPlotAll.m";

const OCTAVE: &str = "octave";

/// Octave invocation for one part
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisCommand {
    script_dir: PathBuf,
    eval: String,
}

/// What the trigger did
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// No script directory holds the plotting script
    ScriptMissing,
    /// Plotting disabled, command logged
    Printed(String),
    /// Octave ran and exited
    Ran { success: bool },
    /// Octave could not be started
    SpawnFailed(String),
}

impl AnalysisCommand {
    pub fn new(script_dir: &Path, part: &str, joints: usize) -> Self {
        Self {
            script_dir: script_dir.to_path_buf(),
            eval: format!("encoderConsistencyPlotAll('{}',{})", part, joints),
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "--path".to_string(),
            self.script_dir.display().to_string(),
            "-q".to_string(),
            "--eval".to_string(),
            self.eval.clone(),
            "--persist".to_string(),
        ]
    }

    /// Shell form of the command
    pub fn command_line(&self) -> String {
        format!(
            "{} --path {} -q --eval \"{}\" --persist",
            OCTAVE,
            self.script_dir.display(),
            self.eval
        )
    }

    /// Run Octave in `working_dir` and wait for it
    pub fn run(&self, working_dir: &Path) -> std::io::Result<bool> {
        let status = Command::new(OCTAVE)
            .args(self.args())
            .current_dir(working_dir)
            .status()?;
        Ok(status.success())
    }
}

/// First directory containing the plotting script
pub fn find_script_dir(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter().find(|dir| dir.join(PLOT_SCRIPT).is_file()).cloned()
}

/// Launch or print the analysis of the series in `output_dir`
pub fn trigger(
    script_dirs: &[PathBuf],
    output_dir: &Path,
    part: &str,
    joints: usize,
    plot_enabled: bool,
) -> AnalysisOutcome {
    let Some(dir) = find_script_dir(script_dirs) else {
        log::error!("Cannot find file {} in {:?}", PLOT_SCRIPT, script_dirs);
        return AnalysisOutcome::ScriptMissing;
    };
    let command = AnalysisCommand::new(&dir, part, joints);

    if !plot_enabled {
        log::info!("Test has collected all data. Plot it to check whether the test passed:");
        log::info!("{}", command.command_line());
        log::info!("To exit from Octave type 'exit'.");
        return AnalysisOutcome::Printed(command.command_line());
    }

    log::info!("Running {}", command.command_line());
    match command.run(output_dir) {
        Ok(success) => {
            if !success {
                log::warn!("Octave exited with an error");
            }
            AnalysisOutcome::Ran { success }
        }
        Err(e) => {
            log::warn!("Unable to start {}: {}", OCTAVE, e);
            AnalysisOutcome::SpawnFailed(e.to_string())
        }
    }
}
