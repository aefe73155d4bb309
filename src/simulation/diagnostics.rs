//! History of conserved quantities recorded alongside an orbit
//!
//! Filled only when `Parameters::store_properties` is set; one entry per
//! committed step, entry 0 being the initial state

use serde::Serialize;

use crate::simulation::math::{percent_change_series, percent_change_vec};
use crate::simulation::states::{NBody, NVec3};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub energy: Vec<f64>,
    pub kinetic_energy: Vec<f64>,
    pub potential_energy: Vec<f64>,
    pub angular_momentum: Vec<NVec3>, // total angular momentum
    pub delta: Option<Vec<f64>>, // adaptive runs only: delta for the next step
}

impl Diagnostics {
    pub(crate) fn with_capacity(capacity: usize, adaptive: bool) -> Self {
        Self {
            energy: Vec::with_capacity(capacity),
            kinetic_energy: Vec::with_capacity(capacity),
            potential_energy: Vec::with_capacity(capacity),
            angular_momentum: Vec::with_capacity(capacity),
            delta: adaptive.then(|| Vec::with_capacity(capacity)),
        }
    }

    pub(crate) fn record(&mut self, nbody: &NBody, delta: f64) {
        self.energy.push(nbody.energy());
        self.kinetic_energy.push(nbody.kinetic_energy());
        self.potential_energy.push(nbody.potential_energy());
        self.angular_momentum.push(nbody.total_angular_momentum());
        if let Some(deltas) = self.delta.as_mut() {
            deltas.push(delta);
        }
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.energy.shrink_to_fit();
        self.kinetic_energy.shrink_to_fit();
        self.potential_energy.shrink_to_fit();
        self.angular_momentum.shrink_to_fit();
        if let Some(deltas) = self.delta.as_mut() {
            deltas.shrink_to_fit();
        }
    }

    /// Number of recorded steps
    pub fn len(&self) -> usize {
        self.energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }

    /// Relative energy change of every step against step 0.
    /// `baseline` replaces a zero initial energy.
    pub fn energy_change(&self, baseline: f64) -> Vec<f64> {
        match self.energy.first() {
            Some(initial) => percent_change_series(*initial, &self.energy, baseline),
            None => Vec::new(),
        }
    }

    /// Componentwise relative angular momentum change against step 0
    pub fn angular_momentum_change(&self, baseline: f64) -> Vec<NVec3> {
        match self.angular_momentum.first() {
            Some(initial) => percent_change_vec(initial, &self.angular_momentum, baseline),
            None => Vec::new(),
        }
    }

    /// Largest absolute deviation of the total energy from step 0
    pub fn max_energy_error(&self) -> f64 {
        let Some(initial) = self.energy.first() else {
            return 0.0;
        };
        self.energy
            .iter()
            .map(|e| (e - initial).abs())
            .fold(0.0, f64::max)
    }
}
