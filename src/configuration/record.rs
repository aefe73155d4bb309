//! Persisted layout of bodies and integration runs
//!
//! Records are plain serde structs written as JSON. Orbits are stored body
//! first, `[body][step][3]`, so a stored run can be resumed by appending
//! newly computed steps to every body's track.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::simulation::engine::Scheme;
use crate::simulation::forces::NewtonianGravity;
use crate::simulation::integrator::Integrator;
use crate::simulation::params::Parameters;
use crate::simulation::states::{EscapeTolerance, NBody, NVec3};

/// Stored initial state of a system
#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NBodyRecord {
    pub positions: Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
    pub masses: Vec<f64>,
    pub collision_tolerance: Option<f64>,
    pub escape_tolerance: Option<f64>, // resolved distance, None = not checked
    #[serde(default = "default_gravity")]
    pub G: f64, // gravitational constant
}

fn default_gravity() -> f64 {
    NewtonianGravity::default().G
}

impl NBodyRecord {
    pub fn from_nbody(nbody: &NBody) -> Self {
        Self {
            positions: to_rows(nbody.positions()),
            velocities: to_rows(nbody.velocities()),
            masses: nbody.masses().to_vec(),
            collision_tolerance: nbody.collision_tolerance(),
            escape_tolerance: nbody.escape_tolerance(),
            G: nbody.gravity().G,
        }
    }

    pub fn to_nbody(&self) -> Result<NBody> {
        self.nbody_at(from_rows(&self.positions), from_rows(&self.velocities))
    }

    /// This system's masses, tolerances and gravity at another state
    fn nbody_at(&self, positions: Vec<NVec3>, velocities: Vec<NVec3>) -> Result<NBody> {
        NBody::with_gravity(
            positions,
            velocities,
            self.masses.clone(),
            self.collision_tolerance,
            EscapeTolerance::from(self.escape_tolerance),
            NewtonianGravity::new(self.G),
        )
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Stored integration run: its settings and the orbits computed so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegratorRecord {
    pub name: String,
    pub steps: usize,
    pub delta: f64,
    pub tolerance: f64,
    pub adaptive: bool,
    pub adaptive_constant: f64,
    pub delta_lim: f64,
    pub position_orbits: Vec<Vec<[f64; 3]>>, // [body][step]
    pub velocity_orbits: Vec<Vec<[f64; 3]>>, // [body][step]
}

impl IntegratorRecord {
    /// A run that has not been integrated yet: every orbit holds only the initial state
    pub fn new(name: impl Into<String>, nbody: &NBody, params: &Parameters) -> Self {
        Self {
            name: name.into(),
            steps: params.steps,
            delta: params.delta,
            tolerance: params.tolerance,
            adaptive: params.adaptive,
            adaptive_constant: params.adaptive_constant,
            delta_lim: params.delta_lim,
            position_orbits: nbody.positions().iter().map(|x| vec![(*x).into()]).collect(),
            velocity_orbits: nbody.velocities().iter().map(|v| vec![(*v).into()]).collect(),
        }
    }

    /// Snapshot of an integrator's settings and full history
    pub fn from_integrator(name: impl Into<String>, integrator: &Integrator) -> Self {
        let params = integrator.parameters();
        Self {
            name: name.into(),
            steps: params.steps,
            delta: params.delta,
            tolerance: params.tolerance,
            adaptive: integrator.is_adaptive(),
            adaptive_constant: params.adaptive_constant,
            delta_lim: params.delta_lim,
            position_orbits: body_major(integrator.position_history(), integrator.nbody().n()),
            velocity_orbits: body_major(integrator.velocity_history(), integrator.nbody().n()),
        }
    }

    /// Run parameters as stored; fields not persisted take their defaults
    pub fn parameters(&self) -> Parameters {
        Parameters {
            steps: self.steps,
            delta: self.delta,
            tolerance: self.tolerance,
            adaptive: self.adaptive,
            adaptive_constant: self.adaptive_constant,
            delta_lim: self.delta_lim,
            ..Default::default()
        }
    }

    pub fn n(&self) -> usize {
        self.position_orbits.len()
    }

    /// Number of stored steps per body, including the initial state
    pub fn stored_steps(&self) -> usize {
        self.position_orbits.first().map_or(0, Vec::len)
    }

    /// Final stored positions and velocities, one row per body
    pub fn last_state(&self) -> Result<(Vec<NVec3>, Vec<NVec3>)> {
        let last = |orbits: &[Vec<[f64; 3]>]| -> Result<Vec<NVec3>> {
            orbits
                .iter()
                .enumerate()
                .map(|(body, track)| {
                    track
                        .last()
                        .map(|x| NVec3::from(*x))
                        .ok_or_else(|| Error::invalid(format!("orbit of body {body} is empty")))
                })
                .collect()
        };
        Ok((last(&self.position_orbits)?, last(&self.velocity_orbits)?))
    }

    /// Append the steps `1..` of `integrator`'s history to the stored orbits.
    /// Step 0 of the integrator is the state the stored orbits end with.
    pub fn append_run(&mut self, integrator: &Integrator) -> Result<()> {
        let n = integrator.nbody().n();
        if n != self.n() || self.velocity_orbits.len() != n {
            return Err(Error::invalid(format!(
                "cannot append a run of {n} bodies to a record of {} bodies",
                self.n()
            )));
        }

        for (step_positions, step_velocities) in integrator
            .position_history()
            .iter()
            .zip(integrator.velocity_history())
            .skip(1)
        {
            for body in 0..n {
                self.position_orbits[body].push(step_positions[body].into());
                self.velocity_orbits[body].push(step_velocities[body].into());
            }
        }
        debug!(
            name = %self.name,
            appended = integrator.position_history().len().saturating_sub(1),
            stored = self.stored_steps(),
            "appended run to record"
        );
        Ok(())
    }

    /// Continue the stored run from its last state with `scheme`, appending
    /// the new steps. `bodies` supplies the masses, tolerances and `G`.
    ///
    /// On a failed integration nothing is appended.
    pub fn resume(&mut self, scheme: Scheme, bodies: &NBodyRecord) -> Result<()> {
        let (positions, velocities) = self.last_state()?;
        let nbody = bodies.nbody_at(positions, velocities)?;

        let mut integrator = Integrator::new(scheme, nbody, self.parameters())?;
        integrator.run()?;
        self.append_run(&integrator)
    }

    /// Drop everything but the initial state of every orbit
    pub fn reset(&mut self) {
        for track in self.position_orbits.iter_mut().chain(self.velocity_orbits.iter_mut()) {
            track.truncate(1);
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn to_rows(vs: &[NVec3]) -> Vec<[f64; 3]> {
    vs.iter().map(|v| (*v).into()).collect()
}

fn from_rows(rows: &[[f64; 3]]) -> Vec<NVec3> {
    rows.iter().map(|r| NVec3::from(*r)).collect()
}

/// `[step][body]` history to `[body][step]` rows
fn body_major(history: &[Vec<NVec3>], n: usize) -> Vec<Vec<[f64; 3]>> {
    (0..n)
        .map(|body| history.iter().map(|step| step[body].into()).collect())
        .collect()
}
