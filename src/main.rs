use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use sbt_geothermal::sim::output::ProjectedSeries;
use sbt_geothermal::sim::reservoir::NativeSeries;
use sbt_geothermal::{SbtConfig, SbtReservoir};
use serde::Serialize;

#[derive(Serialize)]
struct Report<'a> {
    native: &'a NativeSeries,
    projected: &'a ProjectedSeries,
    initial_heat_content: f64,
}

/// Usage: `sbt-geothermal [config.json] [report.json]`
fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match args.first() {
        Some(path) => SbtConfig::from_json_file(Path::new(path))?,
        None => SbtConfig::default(),
    };

    let mut reservoir = SbtReservoir::new();
    let result = reservoir.simulate(&config).context("Simulation failed")?;

    println!("elements: {}", result.element_count);
    for w in &result.warnings {
        println!("warning: {w}");
    }
    println!("initial heat content: {:.1} kW", result.initial_heat_content / 1e3);
    println!("{:>8} {:>10}", "year", "T_prod [C]");
    let p = &result.projected;
    for (t, temp) in p.times.iter().zip(&p.produced_temperature) {
        println!("{t:>8.2} {temp:>10.2}");
    }

    if let Some(path) = args.get(1) {
        let file = File::create(path).with_context(|| format!("Failed to create file: {path}"))?;
        let report = Report {
            native: &result.native,
            projected: &result.projected,
            initial_heat_content: result.initial_heat_content,
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .with_context(|| format!("Failed to write report: {path}"))?;
    }
    Ok(())
}
