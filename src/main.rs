use nbodysim::{IntegratorRecord, Scenario, ScenarioConfig};

use clap::Parser;
use anyhow::{Context, Result};

use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file under `scenarios/`
    #[arg(short, default_value = "two_body.yaml")]
    file_name: String,

    /// Write the computed run as JSON to this path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let scenario_cfg = ScenarioConfig::from_scenarios_dir(&args.file_name)
        .with_context(|| format!("failed to load scenario {}", args.file_name))?;

    let scenario = Scenario::build_scenario(scenario_cfg)?;
    println!("{}", scenario.nbody);

    let mut integrator = scenario.into_integrator()?;

    // physical failures still leave the committed history, report and keep it
    match integrator.run() {
        Ok(()) => println!("Integrated {} steps to t = {}", integrator.current_step(), integrator.elapsed_time()),
        Err(e) => println!(
            "Stopped at step {} (t = {}): {e} [outcome {:?}]",
            integrator.current_step(),
            integrator.elapsed_time(),
            e.outcome_code()
        ),
    }

    if let Some(diagnostics) = integrator.diagnostics() {
        println!("Max energy error: {}", diagnostics.max_energy_error());
    }

    if let Some(path) = args.output {
        let name = args.file_name.trim_end_matches(".yaml");
        let record = IntegratorRecord::from_integrator(name, &integrator);
        fs::write(&path, record.to_json()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}
