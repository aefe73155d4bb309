//! Numerical parameters for an integration run
//!
//! `Parameters` holds runtime settings:
//! - requested step count and (initial) step size,
//! - conservation tolerance for symplectic updates,
//! - adaptive stepping constant, minimum step and iteration bound,
//! - whether conserved-quantity history is stored

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Iteration bound used by adaptive runs unless overridden
pub const DEFAULT_MAX_STEPS: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub steps: usize, // history length including the initial state
    pub delta: f64, // step size (initial step size when adaptive)
    pub tolerance: f64, // absolute conservation tolerance
    pub adaptive: bool, // recompute delta from the state every step
    pub adaptive_constant: f64, // scale of the adaptive delta
    pub delta_lim: f64, // smallest adaptive delta allowed
    pub store_properties: bool, // record energy/momentum/delta history
    pub max_steps: usize, // history bound for adaptive runs
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            steps: 1000,
            delta: 1e-3,
            tolerance: 1e-6,
            adaptive: false,
            adaptive_constant: 1.0,
            delta_lim: 1e-5,
            store_properties: false,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl Parameters {
    /// Fixed-step run of `steps` history entries with step size `delta`
    pub fn new(steps: usize, delta: f64) -> Self {
        Self {
            steps,
            delta,
            ..Default::default()
        }
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Enable adaptive stepping with the given constant and minimum delta
    pub fn adaptive(mut self, adaptive_constant: f64, delta_lim: f64) -> Self {
        self.adaptive = true;
        self.adaptive_constant = adaptive_constant;
        self.delta_lim = delta_lim;
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn store_properties(mut self, store: bool) -> Self {
        self.store_properties = store;
        self
    }

    /// Simulated time an adaptive run aims for: `steps * delta`
    pub fn target_time(&self) -> f64 {
        self.steps as f64 * self.delta
    }

    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            return Err(Error::invalid("steps must be >= 1"));
        }
        if !(self.delta.is_finite() && self.delta > 0.0) {
            return Err(Error::invalid(format!("delta must be finite and > 0, got {}", self.delta)));
        }
        if !(self.tolerance > 0.0) {
            return Err(Error::invalid(format!("tolerance must be > 0, got {}", self.tolerance)));
        }
        if self.adaptive {
            if !(self.adaptive_constant.is_finite() && self.adaptive_constant > 0.0) {
                return Err(Error::invalid(format!(
                    "adaptive_constant must be finite and > 0, got {}",
                    self.adaptive_constant
                )));
            }
            if self.max_steps == 0 {
                return Err(Error::invalid("max_steps must be >= 1"));
            }
        }
        Ok(())
    }
}
