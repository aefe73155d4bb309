//! Integration schemes understood by the engine
//!
//! Selects the per-step kinematic formula used by an `Integrator`;
//! the stepping loop, adaptive delta and history are shared by all of them

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which integration method drives the run.
/// Serialized as `integrator: "leapfrog3"` etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    #[serde(rename = "euler")] // explicit Euler, first order, not symplectic
    Euler,

    #[serde(rename = "euler_cromer")] // semi-implicit Euler, velocity first
    EulerCromer,

    #[serde(rename = "leapfrog2")] // two-step leapfrog on half-integer velocities
    Leapfrog2,

    #[serde(rename = "leapfrog2_int")] // integer-synchronised leapfrog, two force evaluations
    Leapfrog2Int,

    #[serde(rename = "leapfrog3")] // kick-drift-kick, one force evaluation
    Leapfrog3,
}

impl Scheme {
    pub const ALL: [Scheme; 5] = [
        Scheme::Euler,
        Scheme::EulerCromer,
        Scheme::Leapfrog2,
        Scheme::Leapfrog2Int,
        Scheme::Leapfrog3,
    ];

    /// Whether committed updates are checked for conservation
    pub fn is_symplectic(self) -> bool {
        !matches!(self, Scheme::Euler)
    }

    /// The synchronised leapfrog always runs with its constant delta
    pub fn supports_adaptive(self) -> bool {
        !matches!(self, Scheme::Leapfrog2Int)
    }

    /// Whether the scheme carries the acceleration of the last committed
    /// position into the next step
    pub fn caches_acceleration(self) -> bool {
        matches!(self, Scheme::Leapfrog2Int | Scheme::Leapfrog3)
    }

    pub fn name(self) -> &'static str {
        match self {
            Scheme::Euler => "euler",
            Scheme::EulerCromer => "euler_cromer",
            Scheme::Leapfrog2 => "leapfrog2",
            Scheme::Leapfrog2Int => "leapfrog2_int",
            Scheme::Leapfrog3 => "leapfrog3",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
