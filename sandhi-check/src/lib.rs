//! Sandhi Check - Joint/motor encoder consistency checks for robot parts
//!
//! This library drives the motorized joints of one robot part through
//! repeated full-range sweeps and cross-checks the joint-side encoders
//! against the motor-side encoders through the coupling matrix and the
//! gearbox ratios. The collected series expose wiring/sign errors, wrong
//! gearbox ratios and wrong coupling configuration.
//!
//! ## Modules
//!
//! - [`coupling`]: Block-diagonal coupling matrix builder
//! - [`motion`]: Mode activation, homing and sweep state machine
//! - [`sampler`]: Per-tick transforms, derivatives and offsets
//! - [`series`]: Series accumulation and export
//! - [`consistency`]: Run lifecycle of the consistency check
//! - [`sign_check`]: Companion motor encoder sign check
//! - [`devices`]: Driver implementations (`mock`)

pub mod analysis;
pub mod config;
pub mod consistency;
pub mod core;
pub mod coupling;
pub mod devices;
pub mod error;
pub mod joints;
pub mod motion;
pub mod sampler;
pub mod series;
pub mod sign_check;

// Re-export commonly used types
pub use config::Config;
pub use consistency::{ConsistencyCheck, RunReport};
pub use crate::core::clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use crate::core::driver::JointDriver;
pub use error::{Error, Result};
pub use sign_check::SignCheck;
