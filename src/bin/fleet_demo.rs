//! Scripted fleet session.
//!
//! Creates a few vehicles around a start point, assigns each a short route,
//! runs the autonomous loop for a while and optionally steers one vehicle
//! by hand. Positions go to an in-memory store, or to a REST backend when
//! `--store-url` is given.
//!
//! Usage:
//!   cargo run --bin fleet_demo -- [OPTIONS]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use globe_fleet::collaborators::{
    HttpPositionStore, MemoryEntityStore, PositionStore, RecordingRenderer, RenderEvent,
};
use globe_fleet::core::{logging, TokioClock};
use globe_fleet::{
    Directions, Fleet, GeoPosition, MotionArbiter, MotionParams, PositionSink, Result,
    Simulation, VehicleId,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Scripted globe fleet session", long_about = None)]
struct Args {
    /// Motion parameter file (JSON); defaults apply when omitted
    #[arg(long)]
    params: Option<PathBuf>,

    /// Fleet REST API base URL (e.g. http://localhost:3000)
    #[arg(long)]
    store_url: Option<String>,

    /// Number of vehicles
    #[arg(short = 'n', long, default_value_t = 3)]
    vehicles: u8,

    /// Session length (seconds)
    #[arg(long, default_value = "10", value_parser = parse_seconds)]
    seconds: Duration,

    /// Steer this vehicle (1-based) north-east by hand
    #[arg(long)]
    manual: Option<u8>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = logging::DEFAULT_FILTER)]
    log: String,
}

fn parse_seconds(arg: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = arg
        .parse()
        .map_err(|e| format!("`{arg}` is not a number: {e}"))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| format!("`{arg}` is not a finite, non-negative duration"))
}

/// Start of the first route (Paris)
const ORIGIN: GeoPosition = GeoPosition::new(48.8566, 2.3522);

fn populate(store: &MemoryEntityStore, count: u8) -> Result<Vec<VehicleId>> {
    let mut ids = Vec::with_capacity(count as usize);
    for i in 0..count {
        let offset = f64::from(i) * 0.05;
        let start = GeoPosition::new(ORIGIN.latitude + offset, ORIGIN.longitude);
        let id = store.create_vehicle(&format!("Rover {}", i + 1), start);

        for leg in 1..=3 {
            let d = f64::from(leg) * 0.01;
            let waypoint =
                store.create_waypoint(GeoPosition::new(start.latitude + d, start.longitude + d));
            store.assign_waypoint(&waypoint, Some(&id))?;
        }
        ids.push(id);
    }
    Ok(ids)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log);

    let params = match &args.params {
        Some(path) => MotionParams::from_json_file(path)?,
        None => MotionParams::default(),
    };

    let entities = Arc::new(MemoryEntityStore::default());
    let ids = populate(&entities, args.vehicles.max(1))?;

    let store: Arc<dyn PositionStore> = match &args.store_url {
        Some(url) => Arc::new(HttpPositionStore::new(url.as_str())?),
        None => entities.clone(),
    };
    let sink = PositionSink::spawn(store)?;
    let renderer = RecordingRenderer::new();

    let simulation = Simulation::new(Fleet::new(), params, TokioClock::new())
        .with_renderer(renderer.clone())
        .with_sink(sink.clone())
        .with_entity_source(entities.clone());
    let mut arbiter = MotionArbiter::new(simulation);

    arbiter.start_autonomous()?;

    if let Some(n) = args.manual {
        let index = usize::from(n.max(1) - 1);
        if let Some(id) = ids.get(index) {
            arbiter.select_for_manual_control(id)?;
            arbiter.key_down(Directions::UP | Directions::RIGHT);
        }
    }

    tokio::select! {
        _ = tokio::time::sleep(args.seconds) => {}
        _ = tokio::signal::ctrl_c() => {
            globe_fleet::log_info!("Interrupted");
        }
    }

    let fleet = arbiter.fleet();
    for vehicle in fleet.vehicles() {
        let assigned = fleet.assigned(&vehicle.id);
        let passed = assigned.iter().filter(|wp| wp.is_passed).count();
        println!(
            "{:<10} {:>10.5} {:>10.5}  waypoints {}/{}",
            vehicle.name,
            vehicle.position.latitude,
            vehicle.position.longitude,
            passed,
            assigned.len()
        );
    }

    arbiter.shutdown().await;

    let redraws = renderer
        .events()
        .iter()
        .filter(|e| matches!(e, RenderEvent::Redraw))
        .count();
    let stats = sink.stats();
    println!(
        "redraws {}, positions written {}, failed {}, coalesced {}",
        redraws, stats.written, stats.failed, stats.coalesced
    );
    Ok(())
}
