use approx::assert_relative_eq;

use nbodysim::{
    scenarios_dir, EscapeTolerance, Error, Integrator, IntegratorRecord, NBody, NBodyRecord,
    NVec3, NewtonianGravity, Parameters, Scenario, ScenarioConfig, Scheme,
    DEFAULT_COLLISION_TOLERANCE, DEFAULT_MAX_STEPS,
};

const TWO_BODY_YAML: &str = r#"
engine:
  integrator: "leapfrog3"

parameters:
  steps: 50
  delta: 0.01

bodies:
  - x: [ 0.0,  1.0, 0.0 ]
    v: [ 0.4,  0.0, 0.0 ]
    m: 1.0
  - x: [ 0.0, -1.0, 0.0 ]
    v: [ -0.4, 0.0, 0.0 ]
    m: 1.0
"#;

/// Two unit masses at (0, ±1, 0) moving with (±0.4, 0, 0), G = 1
pub fn scenario_a() -> NBody {
    NBody::new(
        vec![NVec3::new(0.0, 1.0, 0.0), NVec3::new(0.0, -1.0, 0.0)],
        vec![NVec3::new(0.4, 0.0, 0.0), NVec3::new(-0.4, 0.0, 0.0)],
        vec![1.0, 1.0],
        Some(1e-3),
        EscapeTolerance::Auto,
    )
    .unwrap()
}

/// Scenario A bodies under `G = 2`
pub fn scenario_a_strong() -> NBody {
    NBody::with_gravity(
        vec![NVec3::new(0.0, 1.0, 0.0), NVec3::new(0.0, -1.0, 0.0)],
        vec![NVec3::new(0.4, 0.0, 0.0), NVec3::new(-0.4, 0.0, 0.0)],
        vec![1.0, 1.0],
        Some(1e-3),
        EscapeTolerance::Auto,
        NewtonianGravity::new(2.0),
    )
    .unwrap()
}

/// Integrated leapfrog run of `steps` steps from scenario A
pub fn finished_run(steps: usize) -> Integrator {
    let params = Parameters::new(steps, 0.01).tolerance(1e-4);
    let mut integrator = Integrator::new(Scheme::Leapfrog3, scenario_a(), params).unwrap();
    integrator.run().unwrap();
    integrator
}

// ==================================================================================
// Configuration tests
// ==================================================================================

#[test]
fn yaml_fills_defaults() {
    let cfg = ScenarioConfig::from_yaml_str(TWO_BODY_YAML).unwrap();
    assert_eq!(cfg.engine.integrator, Scheme::Leapfrog3);
    assert_eq!(cfg.bodies.len(), 2);

    let scenario = Scenario::build_scenario(cfg).unwrap();
    let defaults = Parameters::default();

    assert_eq!(scenario.scheme, Scheme::Leapfrog3);
    assert_eq!(scenario.parameters.steps, 50);
    assert_eq!(scenario.parameters.delta, 0.01);
    assert_eq!(scenario.parameters.tolerance, defaults.tolerance);
    assert!(!scenario.parameters.adaptive);
    assert_eq!(scenario.parameters.delta_lim, defaults.delta_lim);
    assert_eq!(scenario.parameters.max_steps, DEFAULT_MAX_STEPS);

    assert_eq!(scenario.nbody.collision_tolerance(), Some(DEFAULT_COLLISION_TOLERANCE));
    assert_relative_eq!(scenario.nbody.escape_tolerance().unwrap(), 10.0, epsilon = 1e-12);
    assert_relative_eq!(scenario.nbody.energy(), -0.34, epsilon = 1e-12);
}

#[test]
fn yaml_tolerances_and_gravity() {
    let yaml = r#"
engine:
  integrator: "euler_cromer"
parameters:
  steps: 10
  delta: 0.1
  tolerance: 1.0e-2
  adaptive: true
  adaptive_constant: 0.5
  delta_lim: 1.0e-7
  max_steps: 300
  G: 0.5
  collision_tolerance: null
  disable_escape: true
bodies:
  - { x: [0.0, 1.0, 0.0], v: [0.4, 0.0, 0.0], m: 1.0 }
  - { x: [0.0, -1.0, 0.0], v: [-0.4, 0.0, 0.0], m: 1.0 }
"#;
    let scenario = Scenario::build_scenario(ScenarioConfig::from_yaml_str(yaml).unwrap()).unwrap();

    assert_eq!(scenario.scheme, Scheme::EulerCromer);
    assert!(scenario.parameters.adaptive);
    assert_eq!(scenario.parameters.adaptive_constant, 0.5);
    assert_eq!(scenario.parameters.max_steps, 300);
    assert_eq!(scenario.nbody.collision_tolerance(), None);
    assert_eq!(scenario.nbody.escape_tolerance(), None);
    assert_relative_eq!(scenario.nbody.gravity().G, 0.5);
    assert_relative_eq!(scenario.nbody.potential_energy(), -0.25, epsilon = 1e-12);

    let integrator = scenario.into_integrator().unwrap();
    assert!(integrator.is_adaptive());
    assert_eq!(integrator.steps(), 300);
}

#[test]
fn yaml_explicit_escape_tolerance() {
    let yaml = TWO_BODY_YAML.replace("delta: 0.01", "delta: 0.01\n  escape_tolerance: 4.0");
    let scenario = Scenario::build_scenario(ScenarioConfig::from_yaml_str(&yaml).unwrap()).unwrap();
    assert_eq!(scenario.nbody.escape_tolerance(), Some(4.0));
}

#[test]
fn yaml_rejects_unknown_scheme() {
    let yaml = TWO_BODY_YAML.replace("leapfrog3", "rk4");
    assert!(matches!(ScenarioConfig::from_yaml_str(&yaml), Err(Error::Yaml(_))));
}

#[test]
fn scenario_rejects_2d_bodies() {
    let yaml = TWO_BODY_YAML.replace("[ 0.0,  1.0, 0.0 ]", "[ 0.0, 1.0 ]");
    let cfg = ScenarioConfig::from_yaml_str(&yaml).unwrap();
    assert!(matches!(Scenario::build_scenario(cfg), Err(Error::InvalidInput(_))));
}

#[test]
fn scenario_rejects_bad_parameters() {
    let yaml = TWO_BODY_YAML.replace("steps: 50", "steps: 0");
    let cfg = ScenarioConfig::from_yaml_str(&yaml).unwrap();
    assert!(matches!(Scenario::build_scenario(cfg), Err(Error::InvalidInput(_))));
}

#[test]
fn scenario_runs() {
    let scenario = Scenario::build_scenario(ScenarioConfig::from_yaml_str(TWO_BODY_YAML).unwrap()).unwrap();
    let mut integrator = scenario.into_integrator().unwrap();
    integrator.run().unwrap();
    assert_eq!(integrator.position_history().len(), 50);
}

#[test]
fn bundled_scenarios_build() {
    for file in ["two_body.yaml", "figure_8.yaml", "figure_8_adaptive.yaml"] {
        let cfg = ScenarioConfig::from_scenarios_dir(file).unwrap();
        let scenario = Scenario::build_scenario(cfg).unwrap();
        assert!(scenario.into_integrator().is_ok(), "{file} did not set up");
    }
    assert!(scenarios_dir().join("two_body.yaml").exists());
}

#[test]
fn missing_scenario_file() {
    assert!(matches!(
        ScenarioConfig::from_scenarios_dir("does_not_exist.yaml"),
        Err(Error::Io(_))
    ));
}

// ==================================================================================
// Record tests
// ==================================================================================

#[test]
fn nbody_record_round_trip() {
    let nbody = scenario_a();
    let record = NBodyRecord::from_nbody(&nbody);

    assert_eq!(record.positions, vec![[0.0, 1.0, 0.0], [0.0, -1.0, 0.0]]);
    assert_eq!(record.collision_tolerance, Some(1e-3));

    let json = record.to_json().unwrap();
    let parsed = NBodyRecord::from_json(&json).unwrap();
    assert_eq!(parsed, record);

    let rebuilt = parsed.to_nbody().unwrap();
    assert_eq!(rebuilt.positions(), nbody.positions());
    assert_eq!(rebuilt.velocities(), nbody.velocities());
    assert_eq!(rebuilt.escape_tolerance(), nbody.escape_tolerance());
    assert_relative_eq!(rebuilt.energy(), nbody.energy());
}

#[test]
fn nbody_record_keeps_gravity() {
    let nbody = scenario_a_strong();
    let record = NBodyRecord::from_nbody(&nbody);
    assert_eq!(record.G, 2.0);

    let rebuilt = NBodyRecord::from_json(&record.to_json().unwrap()).unwrap().to_nbody().unwrap();
    assert_eq!(rebuilt.gravity().G, 2.0);
    assert_relative_eq!(rebuilt.energy(), -0.84, epsilon = 1e-12);
    assert_relative_eq!(rebuilt.energy(), nbody.energy());
}

#[test]
fn nbody_record_without_gravity_defaults_to_one() {
    let json = r#"{
        "positions": [[0.0, 1.0, 0.0], [0.0, -1.0, 0.0]],
        "velocities": [[0.4, 0.0, 0.0], [-0.4, 0.0, 0.0]],
        "masses": [1.0, 1.0],
        "collision_tolerance": 0.001,
        "escape_tolerance": null
    }"#;
    let record = NBodyRecord::from_json(json).unwrap();
    assert_eq!(record.G, 1.0);
    assert_relative_eq!(record.to_nbody().unwrap().energy(), -0.34, epsilon = 1e-12);
}

#[test]
fn integrator_record_is_body_major() {
    let integrator = finished_run(20);
    let record = IntegratorRecord::from_integrator("two body", &integrator);

    assert_eq!(record.name, "two body");
    assert_eq!(record.n(), 2);
    assert_eq!(record.stored_steps(), 20);
    assert_eq!(record.velocity_orbits[1].len(), 20);

    let step = 7;
    let expected: [f64; 3] = integrator.position_history()[step][1].into();
    assert_eq!(record.position_orbits[1][step], expected);

    assert_eq!(record.parameters().steps, 20);
    assert_eq!(record.parameters().tolerance, 1e-4);

    let parsed = IntegratorRecord::from_json(&record.to_json().unwrap()).unwrap();
    assert_eq!(parsed, record);
}

#[test]
fn new_record_holds_initial_state() {
    let nbody = scenario_a();
    let record = IntegratorRecord::new("fresh", &nbody, &Parameters::new(30, 0.01));

    assert_eq!(record.stored_steps(), 1);
    let (positions, velocities) = record.last_state().unwrap();
    assert_eq!(positions, nbody.positions().to_vec());
    assert_eq!(velocities, nbody.velocities().to_vec());
}

#[test]
fn append_concatenates_new_steps() {
    let first = finished_run(20);
    let mut record = IntegratorRecord::from_integrator("two body", &first);

    // continue from the last stored state
    let (positions, velocities) = record.last_state().unwrap();
    assert_eq!(positions, first.nbody().positions().to_vec());

    let nbody = NBody::new(positions, velocities, vec![1.0, 1.0], Some(1e-3), EscapeTolerance::Disabled).unwrap();
    let mut second = Integrator::new(Scheme::Leapfrog3, nbody, record.parameters()).unwrap();
    second.run().unwrap();

    record.append_run(&second).unwrap();
    assert_eq!(record.stored_steps(), 39);
    assert_eq!(record.velocity_orbits[0].len(), 39);

    let expected: [f64; 3] = second.position_history()[19][0].into();
    assert_eq!(record.position_orbits[0][38], expected);
}

#[test]
fn append_rejects_other_system() {
    let mut record = IntegratorRecord::from_integrator("two body", &finished_run(5));

    let three = NBody::new(
        vec![NVec3::new(1.0, 0.0, 0.0), NVec3::new(-1.0, 0.0, 0.0), NVec3::new(0.0, 3.0, 0.0)],
        vec![NVec3::new(0.0, 0.1, 0.0), NVec3::new(0.0, -0.1, 0.0), NVec3::zeros()],
        vec![1.0, 1.0, 1.0],
        None,
        EscapeTolerance::Disabled,
    )
    .unwrap();
    let integrator = Integrator::new(Scheme::Euler, three, Parameters::new(3, 0.01)).unwrap();

    assert!(matches!(record.append_run(&integrator), Err(Error::InvalidInput(_))));
    assert_eq!(record.stored_steps(), 5);
}

#[test]
fn resume_and_reset() {
    let mut record = IntegratorRecord::from_integrator("two body", &finished_run(20));
    let bodies = NBodyRecord::from_nbody(&scenario_a());

    record.resume(Scheme::Leapfrog3, &bodies).unwrap();
    assert_eq!(record.stored_steps(), 39);

    record.reset();
    assert_eq!(record.stored_steps(), 1);
    assert_eq!(record.position_orbits[0][0], [0.0, 1.0, 0.0]);
    assert_eq!(record.velocity_orbits[1][0], [-0.4, 0.0, 0.0]);
}

#[test]
fn resume_keeps_gravity() {
    let params = Parameters::new(20, 0.01).tolerance(1e-3);
    let mut first = Integrator::new(Scheme::Leapfrog3, scenario_a_strong(), params.clone()).unwrap();
    first.run().unwrap();
    let mut record = IntegratorRecord::from_integrator("strong", &first);

    let bodies = NBodyRecord::from_nbody(&scenario_a_strong());
    record.resume(Scheme::Leapfrog3, &bodies).unwrap();
    assert_eq!(record.stored_steps(), 39);

    let mut straight = Integrator::new(Scheme::Leapfrog3, scenario_a_strong(), Parameters::new(39, 0.01).tolerance(1e-3)).unwrap();
    straight.run().unwrap();

    let expected = straight.nbody().positions();
    for body in 0..2 {
        let stored = record.position_orbits[body][38];
        for k in 0..3 {
            assert_relative_eq!(stored[k], expected[body][k], epsilon = 1e-10);
        }
    }
}
