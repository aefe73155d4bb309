//! Build ready-to-run simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime `Scenario`
//! containing:
//! - the integration scheme (`Scheme`)
//! - numerical parameters (`Parameters`)
//! - the validated physical state (`NBody`, already in the COM frame)

use crate::configuration::config::{BodyConfig, ScenarioConfig};
use crate::error::Result;
use crate::simulation::engine::Scheme;
use crate::simulation::forces::NewtonianGravity;
use crate::simulation::integrator::Integrator;
use crate::simulation::params::Parameters;
use crate::simulation::states::{rows_to_vectors, EscapeTolerance, NBody};

/// Runtime bundle constructed from a [`ScenarioConfig`]
#[derive(Debug, Clone)]
pub struct Scenario {
    pub scheme: Scheme,
    pub parameters: Parameters,
    pub nbody: NBody,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self> {
        // Bodies: split `BodyConfig` rows into positions, velocities and masses
        let xs: Vec<Vec<f64>> = cfg.bodies.iter().map(|bc: &BodyConfig| bc.x.clone()).collect();
        let vs: Vec<Vec<f64>> = cfg.bodies.iter().map(|bc: &BodyConfig| bc.v.clone()).collect();
        let masses: Vec<f64> = cfg.bodies.iter().map(|bc: &BodyConfig| bc.m).collect();

        let p_cfg = cfg.parameters;

        // Escape: an explicit distance wins, `disable_escape` turns the check off
        let escape_tolerance = match (p_cfg.disable_escape, p_cfg.escape_tolerance) {
            (true, _) => EscapeTolerance::Disabled,
            (false, Some(limit)) => EscapeTolerance::Limit(limit),
            (false, None) => EscapeTolerance::Auto,
        };

        // Initial state in the COM frame
        let nbody = NBody::with_gravity(
            rows_to_vectors(&xs, "position")?,
            rows_to_vectors(&vs, "velocity")?,
            masses,
            p_cfg.collision_tolerance,
            escape_tolerance,
            NewtonianGravity::new(p_cfg.G),
        )?;

        // Parameters (runtime) from ParametersConfig
        let defaults = Parameters::default();
        let parameters = Parameters {
            steps: p_cfg.steps,
            delta: p_cfg.delta,
            tolerance: p_cfg.tolerance.unwrap_or(defaults.tolerance),
            adaptive: p_cfg.adaptive,
            adaptive_constant: p_cfg.adaptive_constant.unwrap_or(defaults.adaptive_constant),
            delta_lim: p_cfg.delta_lim.unwrap_or(defaults.delta_lim),
            store_properties: p_cfg.store_properties,
            max_steps: p_cfg.max_steps.unwrap_or(defaults.max_steps),
        };
        parameters.validate()?;

        Ok(Self {
            scheme: cfg.engine.integrator,
            parameters,
            nbody,
        })
    }

    /// Integrator seeded with this scenario's state, ready to `run`
    pub fn into_integrator(self) -> Result<Integrator> {
        Integrator::new(self.scheme, self.nbody, self.parameters)
    }
}
