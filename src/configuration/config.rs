//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – integration scheme
//! - [`ParametersConfig`] – step settings, tolerances and the gravitational constant
//! - [`BodyConfig`]       – initial state for each body
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! A two-body scenario matching these types:
//!
//! ```yaml
//! engine:
//!   integrator: "leapfrog3"   # euler | euler_cromer | leapfrog2 | leapfrog2_int | leapfrog3
//!
//! parameters:
//!   steps: 1000               # history length (target time steps * delta when adaptive)
//!   delta: 0.01               # step size
//!   tolerance: 1.0e-4         # conservation tolerance
//!   adaptive: false
//!   store_properties: true
//!   G: 1.0
//!   collision_tolerance: 1.0e-3   # null disables the check
//!   escape_tolerance: 100.0       # omitted: 10x the largest initial distance
//!
//! bodies:
//!   - x: [ 0.0,  1.0, 0.0 ]
//!     v: [ 0.4,  0.0, 0.0 ]
//!     m: 1.0
//!   - x: [ 0.0, -1.0, 0.0 ]
//!     v: [ -0.4, 0.0, 0.0 ]
//!     m: 1.0
//! ```
//!
//! `Scenario::build_scenario` maps this onto the runtime types.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::simulation::engine::Scheme;
use crate::simulation::states::DEFAULT_COLLISION_TOLERANCE;

/// High-level engine configuration
#[derive(Deserialize, Debug, Clone)]
pub struct EngineConfig {
    pub integrator: Scheme, // Time integrator used for advancing the system state
}

/// Numerical and physical parameters for a scenario.
/// Omitted optional fields fall back to the `Parameters` defaults.
#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    pub steps: usize, // requested history length
    pub delta: f64,   // time step size
    pub tolerance: Option<f64>, // absolute conservation tolerance
    #[serde(default)]
    pub adaptive: bool, // recompute delta from the state each step
    pub adaptive_constant: Option<f64>,
    pub delta_lim: Option<f64>, // smallest adaptive delta
    #[serde(default)]
    pub store_properties: bool, // keep energy/momentum history
    pub max_steps: Option<usize>, // adaptive iteration bound
    #[serde(default = "default_gravity")]
    pub G: f64, // gravitational constant
    #[serde(default = "default_collision_tolerance")]
    pub collision_tolerance: Option<f64>, // `null` disables collision checks
    pub escape_tolerance: Option<f64>, // explicit escape distance
    #[serde(default)]
    pub disable_escape: bool, // never check escapes
}

fn default_gravity() -> f64 {
    1.0
}

fn default_collision_tolerance() -> Option<f64> {
    Some(DEFAULT_COLLISION_TOLERANCE)
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub x: Vec<f64>, // Initial position, 3 components
    pub v: Vec<f64>, // Initial velocity, 3 components
    pub m: f64,      // Mass of the body
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub engine: EngineConfig, // Integration scheme
    pub parameters: ParametersConfig, // Global numerical and physical parameters
    pub bodies: Vec<BodyConfig>, // List of bodies that define the initial state of the system
}

impl ScenarioConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        Ok(serde_yaml::from_reader(reader)?)
    }

    /// Load `file_name` from the crate's `scenarios/` directory
    pub fn from_scenarios_dir(file_name: &str) -> Result<Self> {
        Self::from_path(scenarios_dir().join(file_name))
    }
}

/// Directory holding the bundled scenario files
pub fn scenarios_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}
