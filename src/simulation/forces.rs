//! Pairwise geometry and gravitational acceleration for the n-body engine
//!
//! Defines the pairwise displacement tensor, the acceleration trait and
//! direct (unsoftened) Newtonian gravity summed over all pairs

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::simulation::states::NVec3;

/// n x n displacement tensor: `d[i][j] = x_j - x_i`
pub type Distances = Vec<Vec<NVec3>>;

/// Compute the displacement tensor for `positions`.
/// Only the strictly lower triangle is evaluated; the rest follows from
/// `d[j][i] = -d[i][j]` and a zero diagonal.
///
/// With a `collision_tolerance`, any pair closer than it fails with
/// [`Error::BodyCollision`].
pub fn body_distances(positions: &[NVec3], collision_tolerance: Option<f64>) -> Result<Distances> {
    let n = positions.len();
    let mut distances = vec![vec![NVec3::zeros(); n]; n];

    for i in 0..n {
        for j in 0..i {
            // displacement from body i to body j
            let d = positions[j] - positions[i];

            if let Some(tolerance) = collision_tolerance {
                let distance = d.norm();
                if distance < tolerance {
                    return Err(Error::BodyCollision {
                        i: j,
                        j: i,
                        distance,
                        tolerance,
                    });
                }
            }

            distances[i][j] = d;
            distances[j][i] = -d; // antisymmetric
        }
    }

    Ok(distances)
}

/// Acceleration sources acting on a set of point masses.
/// Implementations overwrite `out[i]` with the acceleration of body i.
pub trait Acceleration {
    fn acceleration(&self, distances: &Distances, masses: &[f64], out: &mut [NVec3]);
}

/// Direct Newtonian gravity, O(n^2), no softening
#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonianGravity {
    pub G: f64, // gravitational constant
}

impl Default for NewtonianGravity {
    /// Normalised units, `G = 1`
    fn default() -> Self {
        Self { G: 1.0 }
    }
}

impl NewtonianGravity {
    #[allow(non_snake_case)]
    pub fn new(G: f64) -> Self {
        Self { G }
    }

    /// Gravitational potential energy `-G * sum_{i<j} m_i m_j / |d_ij|`
    pub fn potential_energy(&self, distances: &Distances, masses: &[f64]) -> f64 {
        let n = masses.len();
        let mut gpe = 0.0;
        for i in 0..n {
            for j in 0..i {
                gpe += masses[i] * masses[j] / distances[i][j].norm();
            }
        }
        -self.G * gpe
    }
}

impl Acceleration for NewtonianGravity {
    fn acceleration(&self, distances: &Distances, masses: &[f64], out: &mut [NVec3]) {
        // Zero buffer
        for a in out.iter_mut() {
            *a = NVec3::zeros();
        }

        let n = masses.len();

        // Loop over each unordered pair (i, j) with j < i
        for i in 0..n {
            let mi = masses[i]; // mass of body i

            for j in 0..i {
                let mj = masses[j]; // mass of body j

                // r points from i to j: i is pulled along +r, j along -r
                let r = distances[i][j];

                let r2 = r.norm_squared();

                // coincident bodies contribute nothing (infinite denominator)
                if r2 == 0.0 {
                    continue;
                }

                // G / |r|^3
                let coef = self.G / (r2 * r2.sqrt());

                // a_i +=  G * m_j * r / |r|^3
                out[i] += coef * mj * r;

                // a_j += G * m_i * d[j][i] / |r|^3, with d[j][i] = -r
                out[j] -= coef * mi * r;
            }
        }
    }
}
