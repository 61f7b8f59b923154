use anyhow::{Context, Result, bail};
use std::env;
use std::path::PathBuf;

use rune_animate::{Scenario, run_scenario};
use rune_config::RuneConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: rune <scenario.json> [--config <rune.toml>]";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let mut scenario_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 >= args.len() {
                    bail!("--config expects a path");
                }
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            other if other.starts_with("--") => bail!("unknown flag: {other}\n{USAGE}"),
            other => {
                if scenario_path.is_some() {
                    bail!("unexpected argument: {other}\n{USAGE}");
                }
                scenario_path = Some(PathBuf::from(other));
                i += 1;
            }
        }
    }

    let mut config = match &config_path {
        Some(path) => RuneConfig::load_from_file(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RuneConfig::load_or_default(),
    };
    config.merge_with_env();

    let Some(path) = scenario_path.or_else(|| config.demo.scenario.clone()) else {
        eprintln!("{USAGE}");
        bail!("missing <scenario.json>");
    };
    if !path.exists() {
        bail!("scenario file not found: {}", path.display());
    }

    let scenario = Scenario::load(&path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    info!(
        scenario = %path.display(),
        elements = scenario.elements.len(),
        steps = scenario.steps.len(),
        "running scenario"
    );

    let trace = run_scenario(&scenario, &config.animate)?;
    let json = if config.demo.pretty {
        serde_json::to_string_pretty(&trace)?
    } else {
        serde_json::to_string(&trace)?
    };
    println!("{json}");
    Ok(())
}
