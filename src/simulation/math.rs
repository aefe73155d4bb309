//! Stateless numerical helpers
//!
//! - vector norms (plain or squared) and row-wise cross products
//! - absolute relative change against an initial value
//! - the adaptive timestep formula shared by every integration scheme

use tracing::warn;

use crate::error::{Error, Result};
use crate::simulation::states::NVec3;

/// Euclidean norm of `v`, or its square when `squared` is set
pub fn norm(v: &NVec3, squared: bool) -> f64 {
    if squared {
        v.norm_squared()
    } else {
        v.norm()
    }
}

/// Norm of every row of `vs`
pub fn norms(vs: &[NVec3], squared: bool) -> Vec<f64> {
    vs.iter().map(|v| norm(v, squared)).collect()
}

/// Cross product a × b
pub fn cross(a: &NVec3, b: &NVec3) -> NVec3 {
    NVec3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

/// Pairwise cross product of the rows of `a` and `b`
pub fn cross_rows(a: &[NVec3], b: &[NVec3]) -> Vec<NVec3> {
    a.iter().zip(b.iter()).map(|(x, y)| cross(x, y)).collect()
}

/// Absolute relative change `|value - initial| / |initial|`
///
/// A zero `initial` makes the ratio meaningless, so `baseline` is used in its
/// place and a warning is emitted.
pub fn percent_change(initial: f64, value: f64, baseline: f64) -> f64 {
    let initial = if initial == 0.0 {
        warn!(baseline, "initial quantity was 0, so percentage change is meaningless; comparing with baseline");
        baseline
    } else {
        initial
    };
    ((value - initial) / initial).abs()
}

/// [`percent_change`] over a series, warning at most once
pub fn percent_change_series(initial: f64, values: &[f64], baseline: f64) -> Vec<f64> {
    let initial = if initial == 0.0 {
        warn!(baseline, "initial quantity was 0, so percentage change is meaningless; comparing with baseline");
        baseline
    } else {
        initial
    };
    values
        .iter()
        .map(|v| ((v - initial) / initial).abs())
        .collect()
}

/// Componentwise [`percent_change`] for vector quantities
///
/// Every zero component of `initial` is replaced by `baseline`.
pub fn percent_change_vec(initial: &NVec3, values: &[NVec3], baseline: f64) -> Vec<NVec3> {
    let mut reference = *initial;
    if reference.iter().any(|c| *c == 0.0) {
        warn!(?initial, baseline, "initial vector has zero components; comparing them with baseline");
        reference.iter_mut().filter(|c| **c == 0.0).for_each(|c| *c = baseline);
    }
    values
        .iter()
        .map(|v| (v - reference).component_div(&reference).abs())
        .collect()
}

/// Timestep derived from the current dynamical state.
///
/// For a single body this is `adaptive_constant * |x| / |v|`. For several
/// bodies it is `adaptive_constant` times the smallest `|x_i - x_j| / |v_i - v_j|`
/// over all unordered pairs; pairs with no relative velocity are ignored.
///
/// Fails with [`Error::UndefinedAdaptiveDelta`] when nothing moves (the ratio
/// is infinite or NaN) and with [`Error::SmallAdaptiveDelta`] when the result
/// is not above `delta_lim`.
pub fn adaptive_delta(
    positions: &[NVec3],
    velocities: &[NVec3],
    adaptive_constant: f64,
    delta_lim: Option<f64>,
) -> Result<f64> {
    let n = positions.len();
    if n == 0 || n != velocities.len() {
        return Err(Error::invalid(format!(
            "adaptive delta needs matching, non-empty state: {} positions, {} velocities",
            n,
            velocities.len()
        )));
    }

    let min_ratio = if n == 1 {
        let delta_v = velocities[0].norm();
        if delta_v == 0.0 {
            return Err(Error::UndefinedAdaptiveDelta(
                "single body has zero velocity".to_string(),
            ));
        }
        positions[0].norm() / delta_v
    } else {
        let mut min_ratio = f64::INFINITY;
        for i in 0..n {
            for j in 0..i {
                let delta_v = (velocities[i] - velocities[j]).norm();
                // no relative motion between i and j: infinite ratio
                if delta_v == 0.0 {
                    continue;
                }
                let delta_x = (positions[i] - positions[j]).norm();
                min_ratio = min_ratio.min(delta_x / delta_v);
            }
        }
        min_ratio
    };

    let delta = adaptive_constant * min_ratio;
    if !delta.is_finite() {
        return Err(Error::UndefinedAdaptiveDelta(format!(
            "no pair of bodies has a relative velocity (got {delta})"
        )));
    }

    if let Some(delta_lim) = delta_lim {
        if delta <= delta_lim {
            return Err(Error::SmallAdaptiveDelta { delta, delta_lim });
        }
    }

    Ok(delta)
}
