//! Seeded encoder noise
//!
//! Joint and motor encoders get independent zero-mean Gaussian noise drawn
//! from one seeded generator, so a fixed seed reproduces a whole run.

use super::config::EncoderNoiseConfig;
use crate::error::{Error, Result};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_distr::{Distribution, Normal};

/// Encoder chain receiving the noise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Joint,
    Motor,
}

/// Noise source for both encoder chains
#[derive(Clone)]
pub struct EncoderNoise {
    rng: SmallRng,
    joint: Option<Normal<f64>>,
    motor: Option<Normal<f64>>,
}

impl EncoderNoise {
    /// Seed 0 draws the seed from OS entropy
    pub fn new(config: &EncoderNoiseConfig, seed: u64) -> Result<Self> {
        let rng = match seed {
            0 => SmallRng::from_entropy(),
            s => SmallRng::seed_from_u64(s),
        };
        Ok(Self {
            rng,
            joint: distribution("joint_stddev", config.joint_stddev)?,
            motor: distribution("motor_stddev", config.motor_stddev)?,
        })
    }

    /// Add one noise sample to every value
    pub fn perturb(&mut self, channel: Channel, values: &mut [f64]) {
        let dist = match channel {
            Channel::Joint => self.joint,
            Channel::Motor => self.motor,
        };
        if let Some(dist) = dist {
            for v in values.iter_mut() {
                *v += dist.sample(&mut self.rng);
            }
        }
    }
}

fn distribution(key: &str, stddev: f64) -> Result<Option<Normal<f64>>> {
    if stddev == 0.0 {
        return Ok(None);
    }
    Normal::new(0.0, stddev)
        .map(Some)
        .map_err(|e| Error::Config(format!("invalid encoder noise {} = {}: {}", key, stddev, e)))
}
