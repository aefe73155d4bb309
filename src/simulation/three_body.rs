//! Closed-form three-body initial conditions
//!
//! - Euler: collinear, a central body with two equal masses on either side
//! - Lagrange: three equal masses on an equilateral triangle
//! - Figure-8: the Chenciner-Montgomery choreography and a family of
//!   perturbations sharing its energy
//!
//! All configurations lie in the xy-plane.

use crate::error::{Error, Result};
use crate::simulation::forces::NewtonianGravity;
use crate::simulation::states::{EscapeTolerance, NBody, NVec3, DEFAULT_COLLISION_TOLERANCE};

/// Total energy of the figure-8 orbit with unit masses and `G = 1`
pub const FIGURE_8_ENERGY: f64 = -1.2871419917663258;

/// Side body position of the figure-8 orbit
pub const FIGURE_8_POSITION: [f64; 3] = [0.97000436, -0.24308753, 0.0];

/// Central body velocity of the figure-8 orbit
pub const FIGURE_8_VELOCITY: [f64; 3] = [-0.93240737, -0.86473146, 0.0];

/// Largest energy mismatch accepted for a perturbed figure-8
const FIGURE_8_ENERGY_TOLERANCE: f64 = 1e-6;

// ===== Euler =====

/// Collinear configuration: body 0 at the origin, bodies 1 and 2 at `r1`
/// and `-r1` on circular orbits around it.
///
/// `r1` must lie in the xy-plane with a non-zero y component, and the two
/// side masses must be equal. Escapes are not checked.
#[allow(non_snake_case)]
pub fn euler_configuration(r1: NVec3, masses: [f64; 3], G: f64) -> Result<NBody> {
    if r1.y == 0.0 || r1.z != 0.0 {
        return Err(Error::invalid(format!(
            "euler configuration needs r1 in the xy-plane with y != 0, got {:?}",
            r1.as_slice()
        )));
    }
    if masses[1] != masses[2] {
        return Err(Error::invalid(format!(
            "euler configuration needs equal side masses, got {} and {}",
            masses[1], masses[2]
        )));
    }

    let r = r1.norm();

    // centripetal balance on a side body: v^2 / r = G m0 / r^2 + G m2 / (2r)^2
    let speed = ((4.0 * G * masses[0] + G * masses[2]) / (4.0 * r)).sqrt();
    let v1 = speed * tangent(&r1);

    NBody::with_gravity(
        vec![NVec3::zeros(), r1, -r1],
        vec![NVec3::zeros(), v1, -v1],
        masses.to_vec(),
        Some(DEFAULT_COLLISION_TOLERANCE),
        EscapeTolerance::Disabled,
        NewtonianGravity::new(G),
    )
}

// ===== Lagrange =====

/// Rotation by `theta` about the z axis (clockwise in the xy-plane)
fn rotate(v: &NVec3, theta: f64) -> NVec3 {
    let (sin, cos) = theta.sin_cos();
    NVec3::new(cos * v.x + sin * v.y, -sin * v.x + cos * v.y, v.z)
}

/// Equilateral configuration of three bodies of mass `mass`, one at `r1` and
/// the others at `r1` rotated by 120 and 240 degrees, all on the same circular
/// orbit. Escapes are not checked.
#[allow(non_snake_case)]
pub fn lagrange_configuration(r1: NVec3, mass: f64, G: f64) -> Result<NBody> {
    if r1.z != 0.0 || r1.norm() == 0.0 {
        return Err(Error::invalid(format!(
            "lagrange configuration needs a non-zero r1 in the xy-plane, got {:?}",
            r1.as_slice()
        )));
    }

    let theta = 2.0 * std::f64::consts::PI / 3.0;
    let r2 = rotate(&r1, theta);
    let r3 = rotate(&r2, theta);

    // gravitational pull on body 1, pointing at the centre
    let d2 = r2 - r1;
    let d3 = r3 - r1;
    let force = G * mass * (d2 / d2.norm().powi(3) + d3 / d3.norm().powi(3));

    // v^2 / |r1| = |F|
    let speed = (-force.dot(&r1)).sqrt();
    let v1 = speed * tangent(&r1);
    let v2 = rotate(&v1, theta);
    let v3 = rotate(&v2, theta);

    NBody::with_gravity(
        vec![r1, r2, r3],
        vec![v1, v2, v3],
        vec![mass; 3],
        Some(DEFAULT_COLLISION_TOLERANCE),
        EscapeTolerance::Disabled,
        NewtonianGravity::new(G),
    )
}

// ===== Figure-8 =====

/// The unperturbed figure-8 with unit masses and `G = 1`.
/// Neither collisions nor escapes are checked.
pub fn figure_8() -> Result<NBody> {
    let r1 = NVec3::from(FIGURE_8_POSITION);
    let v3 = NVec3::from(FIGURE_8_VELOCITY);
    let v2 = -v3 / 2.0;

    NBody::new(
        vec![r1, -r1, NVec3::zeros()],
        vec![v2, v2, v3],
        vec![1.0; 3],
        None,
        EscapeTolerance::Disabled,
    )
}

/// Perturbation of the figure-8 with the same total energy and zero angular
/// momentum: side bodies at `(x, y1, 0)` and `(-x, -y1, 0)` both moving with
/// `v1`, the central body at rest at the origin moving with `-2 v1`.
///
/// `x` is solved from the energy condition. Fails with
/// [`Error::ConfigurationInfeasible`] when no real `x` exists.
pub fn perturbed_figure_8(
    v1: NVec3,
    y1: f64,
    collision_tolerance: Option<f64>,
    escape_tolerance: EscapeTolerance,
) -> Result<NBody> {
    if v1.z != 0.0 {
        return Err(Error::invalid(format!(
            "figure-8 velocity must lie in the xy-plane, got {:?}",
            v1.as_slice()
        )));
    }

    // E = 3|v1|^2 - 5 / (2|x1|)
    let squared_x = (5.0 / (2.0 * (3.0 * v1.norm_squared() - FIGURE_8_ENERGY))).powi(2) - y1 * y1;
    if !(squared_x >= 0.0) {
        return Err(Error::infeasible(format!(
            "attempted to root {squared_x} when initialising figure-8"
        )));
    }

    let x1 = NVec3::new(squared_x.sqrt(), y1, 0.0);
    let nbody = NBody::new(
        vec![x1, -x1, NVec3::zeros()],
        vec![v1, v1, -2.0 * v1],
        vec![1.0; 3],
        collision_tolerance,
        escape_tolerance,
    )?;

    if (nbody.energy() - FIGURE_8_ENERGY).abs() >= FIGURE_8_ENERGY_TOLERANCE {
        return Err(Error::infeasible(format!(
            "perturbed figure-8 has energy {}, expected {FIGURE_8_ENERGY}",
            nbody.energy()
        )));
    }
    Ok(nbody)
}

/// Unit vector in the xy-plane perpendicular to `r`, clockwise
fn tangent(r: &NVec3) -> NVec3 {
    NVec3::new(r.y, -r.x, 0.0) / r.norm()
}
