//! Error types for sandhi-check

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or running a joint check.
///
/// Every variant is fatal to the run; nothing in the engine retries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (config file, exported series)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing or malformed run parameter
    #[error("Configuration error: {0}")]
    Config(String),

    /// Coupling block whose length is not a perfect square
    #[error("Coupling block {block} has {len} values, which is not a perfect square")]
    MatrixShape {
        /// Index of the offending block
        block: usize,
        /// Number of values in the block
        len: usize,
    },

    /// Coupling matrix could not be inverted
    #[error("Coupling matrix ({size}x{size}) is singular")]
    MatrixInversion {
        /// Matrix dimension
        size: usize,
    },

    /// Joints did not report the requested control/interaction mode in time
    #[error("Unable to set control mode {mode} / interaction mode {interaction} on joints {joints:?}")]
    ControlMode {
        /// Requested control mode
        mode: String,
        /// Requested interaction mode
        interaction: String,
        /// Joints still reporting a different mode
        joints: Vec<usize>,
    },

    /// Joints did not reach home within the poll budget
    #[error("Timeout while reaching home position after {polls} polls (joints not in position: {joints:?})")]
    HomingTimeout {
        /// Number of polls performed
        polls: u32,
        /// Joints outside tolerance at the last poll
        joints: Vec<usize>,
    },

    /// A sweep leg exceeded its wall-clock budget
    #[error("Timeout while moving joints {joints:?} towards {target} ({elapsed_s:.2}s, cycle {cycle})")]
    MotionTimeout {
        /// Leg target ("min" or "max")
        target: &'static str,
        /// Seconds since the leg started
        elapsed_s: f64,
        /// Completed legs so far
        cycle: u32,
        /// Joints outside tolerance
        joints: Vec<usize>,
    },

    /// A driver read reported failure
    #[error("Sensor read failed ({reading}): {reason}")]
    SensorRead {
        /// Name of the read operation
        reading: &'static str,
        /// Driver-reported reason
        reason: String,
    },

    /// A driver command was rejected
    #[error("Command {command} failed on joint {joint}: {reason}")]
    Command {
        /// Name of the command
        command: &'static str,
        /// Joint index
        joint: usize,
        /// Driver-reported reason
        reason: String,
    },

    /// Generic driver failure
    #[error("Driver error: {0}")]
    Driver(String),

    /// Device type not known to this build
    #[error("Unknown device type: {0}")]
    UnknownDevice(String),

    /// Motor encoder sign check failed
    #[error("Motor encoder sign check failed on joint {joint}: {reason}")]
    SignCheck {
        /// Joint index
        joint: usize,
        /// What went wrong
        reason: String,
    },
}

impl Error {
    /// Wrap a failed driver read
    pub(crate) fn read(reading: &'static str, source: Error) -> Self {
        match source {
            Error::SensorRead { .. } => source,
            other => Error::SensorRead {
                reading,
                reason: other.to_string(),
            },
        }
    }

    /// Wrap a failed driver command on a joint
    pub(crate) fn command(command: &'static str, joint: usize, source: Error) -> Self {
        Error::Command {
            command,
            joint,
            reason: source.to_string(),
        }
    }
}
