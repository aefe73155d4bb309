pub mod error;
pub mod simulation;
pub mod configuration;

pub use error::{Error, Result};

pub use simulation::states::{NBody, NVec3, EscapeTolerance, AUTO_ESCAPE_FACTOR, DEFAULT_COLLISION_TOLERANCE};
pub use simulation::forces::{body_distances, Acceleration, Distances, NewtonianGravity};
pub use simulation::math::{adaptive_delta, cross, cross_rows, norm, norms, percent_change, percent_change_series, percent_change_vec};
pub use simulation::engine::Scheme;
pub use simulation::params::{Parameters, DEFAULT_MAX_STEPS};
pub use simulation::integrator::{Integrator, StepOutput, HALF_STEP_SUBSTEPS};
pub use simulation::diagnostics::Diagnostics;
pub use simulation::three_body::{euler_configuration, figure_8, lagrange_configuration, perturbed_figure_8, FIGURE_8_ENERGY};
pub use simulation::scenario::Scenario;

pub use configuration::config::{EngineConfig, ParametersConfig, BodyConfig, ScenarioConfig, scenarios_dir};
pub use configuration::record::{NBodyRecord, IntegratorRecord};
