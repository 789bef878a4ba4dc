use anyhow::{Context, Result};
use clap::Parser;
use idea_flow::Simulation;
use idea_flow_common::{OutputConfig, SimulationConfig, Snapshot};
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Headless runner for the idea-flow simulation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config.toml file (built-in defaults are used if the default file is missing)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the number of days to simulate
    #[arg(long)]
    days: Option<u64>,

    /// Override the RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Idea Flow Simulation...");

    // --- Load Configuration ---
    let mut config = load_config(&args.config)?;
    if let Some(days) = args.days {
        config.timing.total_days = days;
    }
    if args.seed.is_some() {
        config.run.seed = args.seed;
    }

    // --- Initialize Simulation ---
    let mut sim = Simulation::new(config)?;
    info!(
        "Grid {}x{} initialized with ideas {:?}.",
        sim.params().grid_size,
        sim.params().grid_size,
        sim.grid().existing_ideas()
    );
    debug!("Simulation Parameters: {:#?}", sim.params());

    // --- Simulation Loop ---
    let total_days = sim.config().timing.total_days;
    let mut record_interval = sim.config().timing.record_interval_days;
    if record_interval == 0 {
        warn!("Record interval is 0 days. Recording every day.");
        record_interval = 1;
    }
    info!("Recording snapshot every {} days.", record_interval);

    info!("Starting simulation loop for {} days...", total_days);
    let start_time = Instant::now();

    // --- Initial Snapshot (day 0) ---
    sim.record_snapshot();

    for _ in 0..total_days {
        let step_start_time = Instant::now();
        sim.step();
        let step_duration = step_start_time.elapsed();

        let day = sim.day();
        let is_record_day = day % record_interval == 0;
        let is_last_day = day == total_days;

        if is_record_day || is_last_day {
            sim.record_snapshot();
            let latest = &sim.recorded_snapshots()[sim.recorded_snapshots().len() - 1];
            info!(
                "Day [{}/{}] | Ideas: {} | Dominant: {} | Undecided: {} | Elapsed: {:.2} s",
                day,
                total_days,
                latest.existing_ideas.len(),
                format_counts(&latest.dominant_counts),
                latest.undecided_cells,
                start_time.elapsed().as_secs_f64()
            );
        } else {
            trace!("Day [{}/{}] completed in {:.3} ms", day, total_days, step_duration.as_secs_f64() * 1000.0);
        }
    }

    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());

    // --- Save Recorded Data ---
    let output = &sim.config().output;
    if output.save_stats {
        if let Err(e) = save_snapshots(sim.recorded_snapshots(), output) {
            error!("Error saving snapshots: {:#}", e);
        }
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    if output.save_dominant_grid {
        let filename = format!("{}_final_grid.csv", output.base_filename);
        save_final_grid(&sim, &filename)?;
        info!("Final grid saved to {}", filename);
    } else {
        info!("Skipping saving final grid as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

fn load_config(path: &Path) -> Result<SimulationConfig> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        warn!("No {} found, using built-in defaults.", DEFAULT_CONFIG_PATH);
        return Ok(SimulationConfig::default());
    }
    SimulationConfig::load(path)
}

fn format_counts(counts: &[(char, u32)]) -> String {
    counts
        .iter()
        .map(|(label, n)| format!("{}={}", label, n))
        .collect::<Vec<_>>()
        .join(" ")
}

fn save_snapshots(snapshots: &[Snapshot], output: &OutputConfig) -> Result<()> {
    let output_format = output.format.as_deref().unwrap_or("json");
    match output_format {
        "json" => write_json(snapshots, &output.base_filename),
        "bincode" => {
            // Binary format (much more compact)
            let filename = format!("{}_snapshots.bin", output.base_filename);
            let file = File::create(&filename)
                .with_context(|| format!("Error creating snapshot file '{}'", filename))?;
            let mut writer = BufWriter::new(file);
            bincode::serialize_into(&mut writer, snapshots)
                .context("Error serializing snapshots to bincode")?;
            writer.flush().with_context(|| format!("Error writing snapshot file '{}'", filename))?;
            info!("All snapshots saved to {} (binary format)", filename);
            Ok(())
        }
        "messagepack" => {
            // MessagePack format (compact and cross-platform)
            let filename = format!("{}_snapshots.msgpack", output.base_filename);
            let file = File::create(&filename)
                .with_context(|| format!("Error creating snapshot file '{}'", filename))?;
            let mut writer = BufWriter::new(file);
            rmp_serde::encode::write(&mut writer, snapshots)
                .context("Error serializing snapshots to MessagePack")?;
            writer.flush().with_context(|| format!("Error writing snapshot file '{}'", filename))?;
            info!("All snapshots saved to {} (MessagePack format)", filename);
            Ok(())
        }
        other => {
            error!("Unknown output format: {}. Using JSON instead.", other);
            write_json(snapshots, &output.base_filename)
        }
    }
}

fn write_json<T: Serialize + ?Sized>(value: &T, base_filename: &str) -> Result<()> {
    let filename = format!("{}_snapshots.json", base_filename);
    let json_string = serde_json::to_string(value).context("Error serializing snapshots to JSON")?;
    let mut file = File::create(&filename)
        .with_context(|| format!("Error creating snapshot file '{}'", filename))?;
    file.write_all(json_string.as_bytes())
        .with_context(|| format!("Error writing snapshot JSON to file '{}'", filename))?;
    info!("All snapshots saved to {} ({} KB)", filename, json_string.len() / 1024);
    Ok(())
}

fn save_final_grid<S: idea_flow::RandomSource>(sim: &Simulation<S>, filename: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename)
        .with_context(|| format!("Error creating CSV file '{}'", filename))?;
    writer.write_record(["x", "y", "charisma", "dominant", "total_strength"])?;
    let grid = sim.grid();
    for (idx, cell) in grid.cells().iter().enumerate() {
        let (x, y) = grid.coords(idx);
        writer.write_record(&[
            x.to_string(),
            y.to_string(),
            format!("{:.4}", cell.charisma()),
            cell.dominant_belief().map(String::from).unwrap_or_default(),
            format!("{:.4}", cell.total_strength()),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
