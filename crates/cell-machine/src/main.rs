//! Headless host for the Cell Machine colony simulation.

mod renderer;
mod telemetry;

use anyhow::{Context, Result};
use cell_core::{EntityType, FieldLayout, PointDrop, SimulationConfig};
use cell_world::Simulator;
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cell-machine")]
#[command(version)]
#[command(about = "Colony of growing, dividing organisms on a toroidal resource grid")]
struct Cli {
    /// Field layout (JSON); a 40x40 field with one organism when omitted
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Delay between turns in milliseconds
    #[arg(long, default_value = "50")]
    turn_delay_ms: u64,

    /// Food each cell regains per turn
    #[arg(long, default_value = "1.0")]
    food_regen: f64,

    /// Stop after this many turns instead of waiting for Ctrl+C
    #[arg(short, long)]
    turns: Option<u64>,

    /// Draw every Nth received snapshot (0 disables drawing)
    #[arg(long, default_value = "20")]
    render_every: u64,

    /// OpenTelemetry endpoint
    #[arg(long)]
    otel_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_telemetry(cli.otel_endpoint.as_deref())?;

    info!("Starting Cell Machine {}", env!("CARGO_PKG_VERSION"));

    let layout = match &cli.layout {
        Some(path) => FieldLayout::from_file(path)
            .with_context(|| format!("failed to load layout {}", path.display()))?,
        None => default_layout(),
    };

    let config = SimulationConfig {
        turn_delay_ms: cli.turn_delay_ms,
        seed: cli.seed.unwrap_or_else(rand::random),
        food_regen_per_turn: cli.food_regen,
        ..Default::default()
    };
    info!(seed = config.seed, width = layout.width, height = layout.height, "Simulation configured");

    // The first snapshot is queued before the renderer starts reading
    let (mut simulator, receiver) = Simulator::from_layout(&config, &layout)?;
    let renderer = tokio::spawn(renderer::run(receiver, cli.render_every));

    simulator.start();

    match cli.turns {
        Some(limit) => {
            tokio::select! {
                _ = wait_for_turns(&simulator, limit) => info!(limit, "Turn limit reached"),
                _ = shutdown_signal() => {},
            }
        }
        None => shutdown_signal().await,
    }

    simulator.stop().await;

    let stats = simulator.statistics();
    info!(
        turns = stats.turns,
        mutations = stats.mutations,
        entities = simulator.entity_count(),
        snapshots_published = simulator.snapshots_published(),
        snapshots_dropped = simulator.snapshots_dropped(),
        "Simulation finished"
    );

    // Dropping the simulator closes the snapshot channel
    drop(simulator);
    match renderer.await {
        Ok(received) => info!(received, "Renderer finished"),
        Err(e) => warn!("Renderer task failed: {}", e),
    }

    telemetry::shutdown_telemetry();

    Ok(())
}

fn default_layout() -> FieldLayout {
    let preset = EntityType::default();
    let drop = PointDrop {
        type_name: preset.name.clone(),
        x: FieldLayout::DEFAULT_WIDTH / 2,
        y: FieldLayout::DEFAULT_HEIGHT / 2,
        r: 0,
    };

    FieldLayout {
        entity_types: vec![preset],
        entity_drops: vec![drop],
        ..Default::default()
    }
}

async fn wait_for_turns(simulator: &Simulator, limit: u64) {
    let mut poll = interval(Duration::from_millis(10));
    loop {
        poll.tick().await;
        if simulator.statistics().turns >= limit {
            return;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
