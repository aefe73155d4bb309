//! Physical state of the n-body system.
//!
//! `NBody` owns positions, velocities and masses of every body, keeps the
//! pairwise displacement tensor and all derived quantities (momenta, energy,
//! centre of mass) in sync with them, and validates every update:
//! - collisions and escapes are rejected for any update,
//! - symplectic updates must also conserve COM, linear momentum, angular
//!   momentum and energy against the baseline captured at construction.
//!
//! The state is always expressed in the centre-of-mass frame.

use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::simulation::forces::{body_distances, Acceleration, Distances, NewtonianGravity};
use crate::simulation::math::{cross_rows, norm};

pub type NVec3 = Vector3<f64>;

/// How far from the centre of mass a body may travel before the run is
/// considered an escape.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapeTolerance {
    /// Never check for escapes
    Disabled,
    /// 10 times the largest initial distance from the centre of mass
    #[default]
    Auto,
    /// Explicit maximum distance
    Limit(f64),
}

impl From<Option<f64>> for EscapeTolerance {
    /// `None` disables the check, `Some(d)` is an explicit limit
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(limit) => Self::Limit(limit),
            None => Self::Disabled,
        }
    }
}

/// Multiplier applied to the largest initial distance for [`EscapeTolerance::Auto`]
pub const AUTO_ESCAPE_FACTOR: f64 = 10.0;

/// Default minimum pairwise distance.
pub const DEFAULT_COLLISION_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone)]
pub struct NBody {
    positions: Vec<NVec3>,  // COM frame
    velocities: Vec<NVec3>, // COM frame
    masses: Vec<f64>,
    total_mass: f64,
    gravity: NewtonianGravity,

    collision_tolerance: Option<f64>,
    escape_tolerance: Option<f64>, // resolved; None = disabled

    // frame shift applied at construction
    com_offset: NVec3,
    com_velocity: NVec3,

    distances: Distances,
    center_of_mass: NVec3,
    linear_momentum: Vec<NVec3>,
    total_linear_momentum: NVec3,
    angular_momentum: Vec<NVec3>,
    total_angular_momentum: NVec3,
    kinetic_energy: f64,
    potential_energy: f64,
    energy: f64,

    // baseline for conservation checks, never changes after construction
    first_energy: f64,
    first_linear_momentum: NVec3,
    first_angular_momentum: NVec3,
}

/// Derived quantities computed for a candidate state before it is committed
struct Derived {
    distances: Distances,
    center_of_mass: NVec3,
    linear_momentum: Vec<NVec3>,
    total_linear_momentum: NVec3,
    angular_momentum: Vec<NVec3>,
    total_angular_momentum: NVec3,
    kinetic_energy: f64,
    potential_energy: f64,
}

impl NBody {
    /// Build a system with `G = 1`.
    ///
    /// Positions and velocities are re-expressed in the centre-of-mass frame:
    /// the COM sits at the origin and the total linear momentum is zero.
    /// `collision_tolerance = None` disables the collision check.
    pub fn new(
        positions: Vec<NVec3>,
        velocities: Vec<NVec3>,
        masses: Vec<f64>,
        collision_tolerance: Option<f64>,
        escape_tolerance: EscapeTolerance,
    ) -> Result<Self> {
        Self::with_gravity(
            positions,
            velocities,
            masses,
            collision_tolerance,
            escape_tolerance,
            NewtonianGravity::default(),
        )
    }

    /// Build a system from untyped rows, rejecting anything that is not 3-D
    pub fn from_rows(
        positions: &[Vec<f64>],
        velocities: &[Vec<f64>],
        masses: &[f64],
        collision_tolerance: Option<f64>,
        escape_tolerance: EscapeTolerance,
    ) -> Result<Self> {
        Self::new(
            rows_to_vectors(positions, "position")?,
            rows_to_vectors(velocities, "velocity")?,
            masses.to_vec(),
            collision_tolerance,
            escape_tolerance,
        )
    }

    /// Build a system with an explicit gravitational constant
    pub fn with_gravity(
        positions: Vec<NVec3>,
        velocities: Vec<NVec3>,
        masses: Vec<f64>,
        collision_tolerance: Option<f64>,
        escape_tolerance: EscapeTolerance,
        gravity: NewtonianGravity,
    ) -> Result<Self> {
        let n = positions.len();
        if n == 0 {
            return Err(Error::invalid("at least one body is required"));
        }
        check_cardinality(n, n, velocities.len(), masses.len())?;

        if let Some((i, m)) = masses
            .iter()
            .enumerate()
            .find(|(_, m)| !(m.is_finite() && **m > 0.0))
        {
            return Err(Error::invalid(format!(
                "mass of body {i} must be finite and > 0, got {m}"
            )));
        }
        if positions
            .iter()
            .chain(velocities.iter())
            .any(|v| !v.iter().all(|c| c.is_finite()))
        {
            return Err(Error::invalid("positions and velocities must be finite"));
        }
        if let Some(tol) = collision_tolerance {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(Error::invalid(format!(
                    "collision tolerance must be finite and >= 0, got {tol}"
                )));
            }
        }

        let total_mass: f64 = masses.iter().sum();

        // COM and COM velocity of the system as given
        let com_offset = weighted_sum(&masses, &positions) / total_mass;
        let com_velocity = weighted_sum(&masses, &velocities) / total_mass;

        // change to COM coordinates
        let positions: Vec<NVec3> = positions.iter().map(|x| x - com_offset).collect();
        let velocities: Vec<NVec3> = velocities.iter().map(|v| v - com_velocity).collect();

        let escape_tolerance = match escape_tolerance {
            EscapeTolerance::Disabled => None,
            EscapeTolerance::Auto => {
                let furthest = positions.iter().map(|x| x.norm()).fold(0.0, f64::max);
                Some(furthest * AUTO_ESCAPE_FACTOR)
            }
            EscapeTolerance::Limit(limit) => Some(limit),
        };

        let derived = derive(&positions, &velocities, &masses, total_mass, collision_tolerance, &gravity)?;
        let energy = derived.kinetic_energy + derived.potential_energy;

        Ok(Self {
            positions,
            velocities,
            masses,
            total_mass,
            gravity,
            collision_tolerance,
            escape_tolerance,
            com_offset,
            com_velocity,
            first_energy: energy,
            first_linear_momentum: derived.total_linear_momentum,
            first_angular_momentum: derived.total_angular_momentum,
            distances: derived.distances,
            center_of_mass: derived.center_of_mass,
            linear_momentum: derived.linear_momentum,
            total_linear_momentum: derived.total_linear_momentum,
            angular_momentum: derived.angular_momentum,
            total_angular_momentum: derived.total_angular_momentum,
            kinetic_energy: derived.kinetic_energy,
            potential_energy: derived.potential_energy,
            energy,
        })
    }

    /// Acceleration of every body.
    ///
    /// With `positions = None` the cached displacement tensor of the current
    /// state is used. Otherwise the acceleration is evaluated at the supplied
    /// trial positions without touching the state (the collision check still
    /// applies to them).
    pub fn acceleration(&self, positions: Option<&[NVec3]>) -> Result<Vec<NVec3>> {
        let mut out = vec![NVec3::zeros(); self.n()];
        match positions {
            None => self.gravity.acceleration(&self.distances, &self.masses, &mut out),
            Some(positions) => {
                let distances = self.distances_for(positions)?;
                self.gravity.acceleration(&distances, &self.masses, &mut out);
            }
        }
        Ok(out)
    }

    /// Displacement tensor for trial positions, with the collision check
    pub fn distances_for(&self, positions: &[NVec3]) -> Result<Distances> {
        check_cardinality(self.n(), positions.len(), self.n(), self.n())?;
        body_distances(positions, self.collision_tolerance)
    }

    /// Replace positions and velocities.
    ///
    /// Escapes and collisions are always rejected. When `symplectic` is set,
    /// COM, total linear momentum, total angular momentum and total energy
    /// must also match the construction baseline within `tolerance`.
    /// Nothing is committed unless every check passes.
    pub fn update(
        &mut self,
        new_positions: Vec<NVec3>,
        new_velocities: Vec<NVec3>,
        symplectic: bool,
        tolerance: f64,
    ) -> Result<()> {
        check_cardinality(self.n(), new_positions.len(), new_velocities.len(), self.n())?;

        // no body beyond the escape distance from the COM
        if let Some(limit) = self.escape_tolerance {
            if let Some((body, distance)) = new_positions
                .iter()
                .map(|x| norm(x, false))
                .enumerate()
                .find(|(_, d)| *d > limit)
            {
                return Err(Error::BodyEscape {
                    body,
                    distance,
                    tolerance: limit,
                });
            }
        }

        let derived = derive(
            &new_positions,
            &new_velocities,
            &self.masses,
            self.total_mass,
            self.collision_tolerance,
            &self.gravity,
        )?;
        let new_energy = derived.kinetic_energy + derived.potential_energy;

        if symplectic {
            if !Self::conserved_quantity(derived.center_of_mass.as_slice(), &[0.0; 3], tolerance) {
                return Err(Error::ComNotConserved {
                    com: derived.center_of_mass.into(),
                });
            }
            if !Self::conserved_quantity(
                derived.total_linear_momentum.as_slice(),
                self.first_linear_momentum.as_slice(),
                tolerance,
            ) {
                return Err(Error::LinearMomentumNotConserved {
                    initial: self.first_linear_momentum.into(),
                    calculated: derived.total_linear_momentum.into(),
                });
            }
            if !Self::conserved_quantity(
                derived.total_angular_momentum.as_slice(),
                self.first_angular_momentum.as_slice(),
                tolerance,
            ) {
                return Err(Error::AngularMomentumNotConserved {
                    initial: self.first_angular_momentum.into(),
                    calculated: derived.total_angular_momentum.into(),
                });
            }
            if !Self::conserved_quantity(&[new_energy], &[self.first_energy], tolerance) {
                return Err(Error::EnergyNotConserved {
                    initial: self.first_energy,
                    calculated: new_energy,
                });
            }
        }

        self.positions = new_positions;
        self.velocities = new_velocities;
        self.distances = derived.distances;
        self.center_of_mass = derived.center_of_mass;
        self.linear_momentum = derived.linear_momentum;
        self.total_linear_momentum = derived.total_linear_momentum;
        self.angular_momentum = derived.angular_momentum;
        self.total_angular_momentum = derived.total_angular_momentum;
        self.kinetic_energy = derived.kinetic_energy;
        self.potential_energy = derived.potential_energy;
        self.energy = new_energy;

        Ok(())
    }

    /// True if every component of `new_value` is strictly within `tolerance` of `old_value`
    pub fn conserved_quantity(new_value: &[f64], old_value: &[f64], tolerance: f64) -> bool {
        new_value.len() == old_value.len()
            && new_value
                .iter()
                .zip(old_value)
                .all(|(new, old)| (new - old).abs() < tolerance)
    }

    /// Number of bodies
    pub fn n(&self) -> usize {
        self.masses.len()
    }

    pub fn positions(&self) -> &[NVec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[NVec3] {
        &self.velocities
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn total_mass(&self) -> f64 {
        self.total_mass
    }

    pub fn gravity(&self) -> NewtonianGravity {
        self.gravity
    }

    pub fn collision_tolerance(&self) -> Option<f64> {
        self.collision_tolerance
    }

    /// Resolved escape distance, `None` when escapes are not checked
    pub fn escape_tolerance(&self) -> Option<f64> {
        self.escape_tolerance
    }

    /// Centre of mass of the input coordinates, subtracted at construction
    pub fn com_offset(&self) -> NVec3 {
        self.com_offset
    }

    /// Velocity of the input centre of mass, subtracted at construction
    pub fn com_velocity(&self) -> NVec3 {
        self.com_velocity
    }

    /// Displacement tensor, `distances()[i][j] = x_j - x_i`
    pub fn distances(&self) -> &Distances {
        &self.distances
    }

    pub fn center_of_mass(&self) -> NVec3 {
        self.center_of_mass
    }

    pub fn linear_momentum(&self) -> &[NVec3] {
        &self.linear_momentum
    }

    pub fn total_linear_momentum(&self) -> NVec3 {
        self.total_linear_momentum
    }

    pub fn angular_momentum(&self) -> &[NVec3] {
        &self.angular_momentum
    }

    pub fn total_angular_momentum(&self) -> NVec3 {
        self.total_angular_momentum
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.kinetic_energy
    }

    pub fn potential_energy(&self) -> f64 {
        self.potential_energy
    }

    /// Total energy, kinetic plus potential
    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn first_energy(&self) -> f64 {
        self.first_energy
    }

    pub fn first_linear_momentum(&self) -> NVec3 {
        self.first_linear_momentum
    }

    pub fn first_angular_momentum(&self) -> NVec3 {
        self.first_angular_momentum
    }
}

impl fmt::Display for NBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bodies: {}", self.n())?;
        writeln!(f, "Total Mass: {}", self.total_mass)?;
        writeln!(f, "Centre of Mass: {:?}", self.center_of_mass.as_slice())?;
        writeln!(f, "Total Linear Momentum: {:?}", self.total_linear_momentum.as_slice())?;
        writeln!(f, "Total Angular Momentum: {:?}", self.total_angular_momentum.as_slice())?;
        writeln!(f, "Kinetic Energy: {}", self.kinetic_energy)?;
        writeln!(f, "Gravitational Potential Energy: {}", self.potential_energy)?;
        write!(f, "Total Energy: {}", self.energy)
    }
}

/// Every derived quantity for a candidate state
fn derive(
    positions: &[NVec3],
    velocities: &[NVec3],
    masses: &[f64],
    total_mass: f64,
    collision_tolerance: Option<f64>,
    gravity: &NewtonianGravity,
) -> Result<Derived> {
    let distances = body_distances(positions, collision_tolerance)?;

    let linear_momentum: Vec<NVec3> = masses
        .iter()
        .zip(velocities)
        .map(|(m, v)| *m * v)
        .collect();
    let total_linear_momentum: NVec3 = linear_momentum.iter().sum();

    let angular_momentum = cross_rows(positions, &linear_momentum);
    let total_angular_momentum: NVec3 = angular_momentum.iter().sum();

    // sum |p_i|^2 / (2 m_i)
    let kinetic_energy = linear_momentum
        .iter()
        .zip(masses)
        .map(|(p, m)| norm(p, true) / (2.0 * m))
        .sum();
    let potential_energy = gravity.potential_energy(&distances, masses);

    let center_of_mass = weighted_sum(masses, positions) / total_mass;

    Ok(Derived {
        distances,
        center_of_mass,
        linear_momentum,
        total_linear_momentum,
        angular_momentum,
        total_angular_momentum,
        kinetic_energy,
        potential_energy,
    })
}

fn weighted_sum(masses: &[f64], vectors: &[NVec3]) -> NVec3 {
    masses
        .iter()
        .zip(vectors)
        .fold(NVec3::zeros(), |acc, (m, v)| acc + *m * v)
}

/// Positions, velocities and masses must all describe the same `n` bodies
fn check_cardinality(n: usize, positions: usize, velocities: usize, masses: usize) -> Result<()> {
    if positions != n || velocities != n || masses != n {
        return Err(Error::invalid(format!(
            "{positions} positions given; {velocities} velocities given; {masses} masses given. \
             These quantities must be the same ({n} bodies)"
        )));
    }
    Ok(())
}

/// Convert untyped rows to 3-vectors
pub(crate) fn rows_to_vectors(rows: &[Vec<f64>], what: &str) -> Result<Vec<NVec3>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| match row.as_slice() {
            [x, y, z] => Ok(NVec3::new(*x, *y, *z)),
            _ => Err(Error::invalid(format!(
                "{what} of body {i} must have 3 components, got {}",
                row.len()
            ))),
        })
        .collect()
}
