//! Error types shared by the physical state, the integrators and the
//! configuration layer.
//!
//! Physical failures (collision, escape, conservation breakdown, unusable
//! adaptive step) are terminal for a run but leave already committed history
//! readable. Batch drivers map them to numeric outcome codes through
//! [`Error::outcome_code`].

use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Every way an n-body construction, update or run can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// Mismatched cardinalities, non-3D vectors or non-physical parameters.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Two bodies came closer than the collision tolerance.
    #[error("bodies {i} and {j} collided: distance {distance} is below the collision tolerance {tolerance}")]
    BodyCollision {
        i: usize,
        j: usize,
        distance: f64,
        tolerance: f64,
    },

    /// A body moved further from the centre of mass than the escape tolerance.
    #[error("body {body} escaped: distance {distance} from the centre of mass exceeds {tolerance}")]
    BodyEscape {
        body: usize,
        distance: f64,
        tolerance: f64,
    },

    /// The centre of mass drifted away from the origin.
    #[error("centre of mass should stay at the origin, but is {com:?}")]
    ComNotConserved { com: [f64; 3] },

    #[error("total linear momentum was not conserved: initial {initial:?}, calculated {calculated:?}")]
    LinearMomentumNotConserved {
        initial: [f64; 3],
        calculated: [f64; 3],
    },

    #[error("total angular momentum was not conserved: initial {initial:?}, calculated {calculated:?}")]
    AngularMomentumNotConserved {
        initial: [f64; 3],
        calculated: [f64; 3],
    },

    #[error("total energy was not conserved: initial {initial}, calculated {calculated}")]
    EnergyNotConserved { initial: f64, calculated: f64 },

    /// The adaptive timestep shrank to (or below) the allowed minimum.
    #[error("adaptive delta was made too small ({delta}, limit {delta_lim}): orbit unfeasible")]
    SmallAdaptiveDelta { delta: f64, delta_lim: f64 },

    /// The adaptive timestep has no finite value (no relative motion).
    #[error("adaptive delta is undefined: {0}")]
    UndefinedAdaptiveDelta(String),

    /// An initial-condition generator cannot satisfy its closed-form constraints.
    #[error("configuration infeasible: {0}")]
    ConfigurationInfeasible(String),

    /// A step was requested out of order.
    #[error("discontinuous time step: requested step {requested}, expected step {expected}")]
    Sequencing { requested: usize, expected: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid input error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// Create an infeasible configuration error.
    pub fn infeasible(reason: impl Into<String>) -> Self {
        Self::ConfigurationInfeasible(reason.into())
    }

    /// Numeric code a stability sweep records for a physical outcome.
    ///
    /// `None` for programming, input and I/O errors, which are not outcomes
    /// of the orbit itself.
    pub fn outcome_code(&self) -> Option<u8> {
        match self {
            Self::SmallAdaptiveDelta { .. } | Self::UndefinedAdaptiveDelta(_) => Some(2),
            Self::ComNotConserved { .. } => Some(3),
            Self::BodyEscape { .. } => Some(4),
            Self::BodyCollision { .. } => Some(5),
            Self::ConfigurationInfeasible(_) => Some(6),
            Self::LinearMomentumNotConserved { .. } => Some(7),
            Self::AngularMomentumNotConserved { .. } => Some(8),
            Self::EnergyNotConserved { .. } => Some(9),
            _ => None,
        }
    }

    /// True when the error ends a run for physical reasons.
    pub fn is_terminal(&self) -> bool {
        self.outcome_code().is_some()
    }

    /// True for conservation-check failures of a symplectic update.
    pub fn is_conservation_failure(&self) -> bool {
        matches!(
            self,
            Self::ComNotConserved { .. }
                | Self::LinearMomentumNotConserved { .. }
                | Self::AngularMomentumNotConserved { .. }
                | Self::EnergyNotConserved { .. }
        )
    }
}
