//! Core abstractions for the joint check engine.
//!
//! - [`driver::JointDriver`]: Trait to implement for new hardware
//! - [`clock::Clock`]: Time source and pacing used by every waiting loop
//! - [`types`]: Control modes and per-tick kinematics

pub mod clock;
pub mod driver;
pub mod types;
