//! Time integration of an `NBody` system
//!
//! One `Integrator` drives every scheme in [`Scheme`]: the stepping loop,
//! the reversible adaptive delta, the history buffers and the optional
//! diagnostics are shared, only the kinematic formula in
//! [`Integrator::integration_step`] differs per scheme.
//!
//! Lifecycle:
//! - `new` validates the parameters and seeds step 0 of the history,
//! - `run` steps until the step bound (or, when adaptive, the target time),
//! - a second `run` resets to the initial state and starts over.
//!
//! Any physical failure stops the run; history up to the last committed step
//! stays readable.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::simulation::diagnostics::Diagnostics;
use crate::simulation::engine::Scheme;
use crate::simulation::math::adaptive_delta;
use crate::simulation::params::Parameters;
use crate::simulation::states::{NBody, NVec3};

/// Euler-Cromer sub-steps used to seed the two-step leapfrog's half-step velocity
pub const HALF_STEP_SUBSTEPS: usize = 1000;

/// Candidate state produced by one scheme step, not yet committed
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub positions: Vec<NVec3>,
    pub velocities: Vec<NVec3>,
    pub acceleration: Option<Vec<NVec3>>, // acceleration at the new positions, for caching schemes
}

#[derive(Debug, Clone)]
pub struct Integrator {
    scheme: Scheme,
    params: Parameters,
    adaptive: bool, // effective: false when the scheme cannot adapt

    initial: NBody, // pristine copy for resets
    nbody: NBody,

    steps: usize, // history bound; truncated to the real length after an adaptive run
    delta: f64, // delta for the next step
    target_time: Option<f64>, // adaptive runs only

    times: Vec<f64>,
    position_orbit: Vec<Vec<NVec3>>, // [step][body]
    velocity_orbit: Vec<Vec<NVec3>>, // [step][body]
    diagnostics: Option<Diagnostics>,

    acc_t: Option<Vec<NVec3>>, // acceleration at the last committed positions
    current_step: usize,
    integrated: bool,
    full_run: bool,
}

impl Integrator {
    /// Set up an integrator with the history seeded at step 0.
    ///
    /// Adaptive stepping is switched off with a warning for
    /// [`Scheme::Leapfrog2Int`]. When adaptive, the initial delta is derived
    /// from the state and `params.delta` only sets the target time.
    pub fn new(scheme: Scheme, nbody: NBody, params: Parameters) -> Result<Self> {
        params.validate()?;

        let adaptive = params.adaptive && scheme.supports_adaptive();
        if params.adaptive && !adaptive {
            warn!(%scheme, "adaptive stepping is not supported by this scheme; using constant delta");
        }

        let mut integrator = Self {
            scheme,
            adaptive,
            steps: params.steps,
            delta: params.delta,
            target_time: None,
            params,
            initial: nbody.clone(),
            nbody,
            times: Vec::new(),
            position_orbit: Vec::new(),
            velocity_orbit: Vec::new(),
            diagnostics: None,
            acc_t: None,
            current_step: 1,
            integrated: false,
            full_run: false,
        };
        integrator.set_arrays()?;
        Ok(integrator)
    }

    /// Integrate until the step bound is reached or, for adaptive runs,
    /// the elapsed time reaches the target time.
    ///
    /// Not incremental: an integrator that has already stepped is reset to
    /// its initial state first.
    pub fn run(&mut self) -> Result<()> {
        if self.integrated || self.current_step > 1 {
            debug!(scheme = %self.scheme, "resetting integrator to initial state");
            self.set_arrays()?;
        }

        debug!(
            scheme = %self.scheme,
            n = self.nbody.n(),
            steps = self.steps,
            delta = self.delta,
            adaptive = self.adaptive,
            "starting integration"
        );

        match self.target_time {
            Some(target) => {
                let mut outcome = Ok(());
                while self.current_step < self.steps && self.elapsed_time() < target {
                    if let Err(e) = self.simulation_step(self.current_step) {
                        outcome = Err(e);
                        break;
                    }
                }
                self.full_run = self.current_step == self.steps;
                // a failed run keeps its committed history at its real length
                self.truncate();
                outcome?;
            }
            None => {
                while self.current_step < self.steps {
                    self.simulation_step(self.current_step)?;
                }
            }
        }

        self.integrated = true;
        debug!(
            scheme = %self.scheme,
            steps = self.current_step,
            time = self.elapsed_time(),
            hit_step_bound = self.full_run,
            "integration finished"
        );
        Ok(())
    }

    /// Compute, validate and commit step `t`.
    ///
    /// `t` must be the next step in sequence. On failure nothing is committed
    /// and the step can not be retried with a different outcome.
    pub fn simulation_step(&mut self, t: usize) -> Result<()> {
        if t != self.current_step {
            return Err(Error::Sequencing {
                requested: t,
                expected: self.current_step,
            });
        }
        if t >= self.steps {
            return Err(Error::invalid(format!(
                "step {t} is beyond the history bound of {} steps",
                self.steps
            )));
        }

        let mut step_delta = self.delta;
        let mut next_delta = self.delta;
        let mut output = self.integration_step(t, self.delta)?;

        if self.adaptive {
            // average with the delta at the trial state, then redo the step
            let trial = self.adaptive_delta_at(&output.positions, &output.velocities)?;
            step_delta = 0.5 * (self.delta + trial);
            output = self.integration_step(t, step_delta)?;
            next_delta = self.adaptive_delta_at(&output.positions, &output.velocities)?;
        }

        let StepOutput {
            positions,
            velocities,
            acceleration,
        } = output;
        self.nbody
            .update(positions, velocities, self.scheme.is_symplectic(), self.params.tolerance)?;

        let elapsed = self.elapsed_time() + step_delta;
        self.delta = next_delta;
        self.times.push(elapsed);
        self.position_orbit.push(self.nbody.positions().to_vec());
        self.velocity_orbit.push(self.nbody.velocities().to_vec());
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            diagnostics.record(&self.nbody, self.delta);
        }
        if acceleration.is_some() {
            self.acc_t = acceleration;
        }
        self.current_step = t + 1;
        Ok(())
    }

    /// Candidate state for step `t` from the state at `t - 1`, advanced by `delta`.
    /// Nothing is committed.
    pub fn integration_step(&self, t: usize, delta: f64) -> Result<StepOutput> {
        if t == 0 || t > self.position_orbit.len() {
            return Err(Error::Sequencing {
                requested: t,
                expected: self.current_step,
            });
        }
        let x = &self.position_orbit[t - 1];
        let v = &self.velocity_orbit[t - 1];

        let output = match self.scheme {
            Scheme::Euler => {
                let a = self.acceleration_at(t, x)?;

                // v_t = v_t-1 + a_t-1 dt, x_t = x_t-1 + v_t-1 dt
                StepOutput {
                    positions: axpy(x, v, delta),
                    velocities: axpy(v, &a, delta),
                    acceleration: None,
                }
            }
            Scheme::EulerCromer | Scheme::Leapfrog2 => {
                let a = self.acceleration_at(t, x)?;

                // v_t = v_t-1 + a_t-1 dt
                let velocities = axpy(v, &a, delta);
                // x_t = x_t-1 + v_t dt
                let positions = axpy(x, &velocities, delta);
                StepOutput {
                    positions,
                    velocities,
                    acceleration: None,
                }
            }
            Scheme::Leapfrog2Int => {
                let a_t = self.acceleration_at(t, x)?;

                // x_t = x_t-1 + v_t-1 dt + 1/2 a_t-1 dt^2
                let mut positions = axpy(x, v, delta);
                for (p, a) in positions.iter_mut().zip(a_t.iter()) {
                    *p += 0.5 * delta * delta * a;
                }

                // a_t at the new positions
                let a_tt = self.nbody.acceleration(Some(positions.as_slice()))?;

                // v_t = v_t-1 + 1/2 (a_t-1 + a_t) dt
                let velocities = v
                    .iter()
                    .zip(a_t.iter().zip(a_tt.iter()))
                    .map(|(v, (a0, a1))| v + 0.5 * delta * (a0 + a1))
                    .collect();

                StepOutput {
                    positions,
                    velocities,
                    acceleration: Some(a_tt),
                }
            }
            Scheme::Leapfrog3 => {
                let a_t = self.acceleration_at(t, x)?;

                // Kick: v_t-1/2 = v_t-1 + 1/2 a_t-1 dt
                let v_half = axpy(v, &a_t, 0.5 * delta);
                // Drift: x_t = x_t-1 + v_t-1/2 dt
                let positions = axpy(x, &v_half, delta);
                // a_t from x_t
                let a_tt = self.nbody.acceleration(Some(positions.as_slice()))?;
                // Kick: v_t = v_t-1/2 + 1/2 a_t dt
                let velocities = axpy(&v_half, &a_tt, 0.5 * delta);

                StepOutput {
                    positions,
                    velocities,
                    acceleration: Some(a_tt),
                }
            }
        };
        Ok(output)
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Whether the delta is recomputed every step
    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    /// Current state, the last committed step
    pub fn nbody(&self) -> &NBody {
        &self.nbody
    }

    /// State the integrator starts from on every run
    pub fn initial_nbody(&self) -> &NBody {
        &self.initial
    }

    /// Delta the next step will start from
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// History bound. After an adaptive run this is the real history length.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Next step to compute; also the number of committed history entries
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn target_time(&self) -> Option<f64> {
        self.target_time
    }

    /// Simulated time of every committed step, starting at 0
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn elapsed_time(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Positions indexed `[step][body]`
    pub fn position_history(&self) -> &[Vec<NVec3>] {
        &self.position_orbit
    }

    /// Velocities indexed `[step][body]`. For the two-step leapfrog these are
    /// the half-step velocities.
    pub fn velocity_history(&self) -> &[Vec<NVec3>] {
        &self.velocity_orbit
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.diagnostics.as_ref()
    }

    /// Acceleration carried into the next step by the caching schemes
    pub fn cached_acceleration(&self) -> Option<&[NVec3]> {
        self.acc_t.as_deref()
    }

    pub fn is_integrated(&self) -> bool {
        self.integrated
    }

    /// True when an adaptive run used up `max_steps` before reaching its target time
    pub fn hit_step_bound(&self) -> bool {
        self.full_run
    }

    // ===== setup =====

    /// Reset to the initial state and seed step 0
    fn set_arrays(&mut self) -> Result<()> {
        self.nbody = self.initial.clone();

        if self.adaptive {
            self.steps = self.params.max_steps;
            self.target_time = Some(self.params.target_time());
            self.delta = self.adaptive_delta_at(self.nbody.positions(), self.nbody.velocities())?;
        } else {
            self.steps = self.params.steps;
            self.target_time = None;
            self.delta = self.params.delta;
        }

        let first_velocities = match self.scheme {
            Scheme::Leapfrog2 => self.half_step_velocities()?,
            _ => self.nbody.velocities().to_vec(),
        };

        self.times = Vec::with_capacity(self.steps);
        self.times.push(0.0);
        self.position_orbit = Vec::with_capacity(self.steps);
        self.position_orbit.push(self.nbody.positions().to_vec());
        self.velocity_orbit = Vec::with_capacity(self.steps);
        self.velocity_orbit.push(first_velocities);

        self.diagnostics = self.params.store_properties.then(|| {
            let mut diagnostics = Diagnostics::with_capacity(self.steps, self.adaptive);
            diagnostics.record(&self.nbody, self.delta);
            diagnostics
        });

        self.acc_t = if self.scheme.caches_acceleration() {
            Some(self.nbody.acceleration(None)?)
        } else {
            None
        };

        self.current_step = 1;
        self.integrated = false;
        self.full_run = false;
        Ok(())
    }

    /// Velocity half a step ahead of the initial state, from a fine
    /// Euler-Cromer integration of a copy of the system
    fn half_step_velocities(&self) -> Result<Vec<NVec3>> {
        let sub_delta = self.delta / (2 * HALF_STEP_SUBSTEPS) as f64;
        let params =
            Parameters::new(HALF_STEP_SUBSTEPS + 1, sub_delta).tolerance(self.params.tolerance);

        let mut sub = Integrator::new(Scheme::EulerCromer, self.nbody.clone(), params)?;
        sub.run()?;
        Ok(sub.nbody().velocities().to_vec())
    }

    /// Drop unused capacity once an adaptive run knows its length
    fn truncate(&mut self) {
        self.steps = self.position_orbit.len();
        self.times.shrink_to_fit();
        self.position_orbit.shrink_to_fit();
        self.velocity_orbit.shrink_to_fit();
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            diagnostics.shrink_to_fit();
        }
    }

    fn adaptive_delta_at(&self, positions: &[NVec3], velocities: &[NVec3]) -> Result<f64> {
        adaptive_delta(
            positions,
            velocities,
            self.params.adaptive_constant,
            Some(self.params.delta_lim),
        )
    }

    /// Acceleration at `x`, the positions of step `t - 1`. For the next step
    /// these are the committed positions, so the cached acceleration or the
    /// state's distances are reused.
    fn acceleration_at(&self, t: usize, x: &[NVec3]) -> Result<Vec<NVec3>> {
        if t != self.current_step {
            return self.nbody.acceleration(Some(x));
        }
        match &self.acc_t {
            Some(a) => Ok(a.clone()),
            None => self.nbody.acceleration(None),
        }
    }
}

/// `x + s * y`, row by row
fn axpy(x: &[NVec3], y: &[NVec3], s: f64) -> Vec<NVec3> {
    x.iter().zip(y.iter()).map(|(x, y)| x + s * y).collect()
}
