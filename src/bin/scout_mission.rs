use anyhow::{Context, Result};
use clap::Parser;
use scout_core::behaviors::CountdownTimer;
use scout_core::common::poll::CancelToken;
use scout_core::common::types::Pose;
use scout_core::config::ScoutConfig;
use scout_core::control::LogAnnunciator;
use scout_core::navigation::{DetourPlanner, ObstacleMap, RedZone, ZoneMap, ZoneNavigator};
use scout_core::perception::sensors::{
    sample_channel, BusDistanceSensor, BusLineDetector, BusMaterialClassifier, MaterialReading,
    SamplePublisher,
};
use scout_core::perception::{DistanceSensor, LineDetector, MaterialClassifier};
use scout_core::sim::{SimClock, SimObject, SimSettings, SimWorld};
use scout_core::{Hardware, ScoutCore};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Run a full localization and search mission in the simulated arena.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration; defaults apply when it is missing.
    #[arg(short, long, default_value = "config/scout.toml")]
    config: PathBuf,

    /// Time budget for the search, in seconds.
    #[arg(long, default_value_t = 240)]
    budget: u64,

    /// Sampler and physics period, in milliseconds.
    #[arg(long, default_value_t = 10)]
    period_ms: u64,
}

const OBJECT_RADIUS: f64 = 5.0;

/// Publish `read()` on the bus every `period` until cancelled
fn spawn_sampler<T, F>(
    name: &'static str,
    period: Duration,
    cancel: CancelToken,
    publisher: SamplePublisher<T>,
    mut read: F,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: FnMut() -> T + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        while !cancel.is_cancelled() {
            ticker.tick().await;
            publisher.publish(read());
        }
        log::debug!("{} sampler stopped", name);
    })
}

fn build_arena(config: &ScoutConfig) -> SimWorld {
    let settings = SimSettings {
        geometry: config.geometry,
        light_offset: -config.localizer.sensor_to_axle,
        ..SimSettings::default()
    };

    // Placed in the starting tile, believing it is at the origin
    SimWorld::new(settings, Pose::new(-15.0, -20.0, 0.0), Pose::default())
        .with_clock(SimClock::External)
        .with_object(SimObject::block(30.0, 30.0, OBJECT_RADIUS))
        .with_object(SimObject::obstacle(146.9, 25.0, OBJECT_RADIUS))
        .with_object(SimObject::block(270.0, 60.0, OBJECT_RADIUS))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        ScoutConfig::load(&cli.config)
            .with_context(|| format!("failed to load {}", cli.config.display()))?
    } else {
        log::warn!("{} not found, using defaults", cli.config.display());
        ScoutConfig::default()
    };

    let period = Duration::from_millis(cli.period_ms.max(1));
    let cancel = CancelToken::new();
    let world = Arc::new(build_arena(&config));

    // Physics
    let physics = {
        let world = Arc::clone(&world);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            while !cancel.is_cancelled() {
                ticker.tick().await;
                world.step(period.as_secs_f64());
            }
        })
    };

    // Samplers
    let max_age = period * 10;
    let (line_tx, line_rx) = sample_channel(false);
    let (distance_tx, distance_rx) = sample_channel(f64::INFINITY);
    let (material_tx, material_rx) = sample_channel(MaterialReading::default());

    let distance = BusDistanceSensor::new(distance_rx).with_max_age(max_age);
    let distance_enabled = distance.enabled_flag();

    let samplers = vec![
        spawn_sampler("light", period, cancel.clone(), line_tx, {
            let world = Arc::clone(&world);
            move || world.black_line()
        }),
        spawn_sampler("ultrasonic", period, cancel.clone(), distance_tx, {
            let world = Arc::clone(&world);
            move || {
                if distance_enabled.load(Ordering::SeqCst) {
                    world.distance()
                } else {
                    f64::INFINITY
                }
            }
        }),
        spawn_sampler("colour", period, cancel.clone(), material_tx, {
            let world = Arc::clone(&world);
            move || MaterialReading {
                object: world.is_object(),
                block: world.is_block(),
            }
        }),
    ];

    let pose = world.odometer();
    let hardware = Hardware {
        pose: pose.clone(),
        motion: world.clone(),
        line: Arc::new(BusLineDetector::new(line_rx).with_max_age(max_age)),
        distance: Arc::new(distance),
        classifier: Arc::new(BusMaterialClassifier::new(material_rx).with_max_age(max_age)),
        claw: world.clone(),
        signal: Arc::new(LogAnnunciator),
    };

    let navigator = ZoneNavigator::new(ZoneMap::default(), world.clone(), pose)
        .with_planner(DetourPlanner::new(config.search.cell_width, 6))
        .with_lookahead(config.search.approach_tolerance * 3.0)
        .with_object_reach(world.settings().classifier_reach + OBJECT_RADIUS);
    navigator.add_red_zone(RedZone::new(150.0, 60.0, 210.0, 120.0));
    navigator.add_red_zone(RedZone::new(-30.48, -30.48, -5.0, -5.0).temporary());

    let budget = Arc::new(CountdownTimer::new(Duration::from_secs(cli.budget)));
    let mut core = ScoutCore::new(
        &config,
        hardware,
        Arc::new(navigator),
        budget,
        cancel.clone(),
    )?;

    let mut mission = tokio::task::spawn_blocking(move || core.run_mission());

    let outcome = tokio::select! {
        joined = &mut mission => joined.context("control thread panicked")?,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted, cancelling mission");
            cancel.cancel();
            mission.await.context("control thread panicked")?
        }
    };

    cancel.cancel();
    for handle in samplers {
        handle.await.context("sampler task panicked")?;
    }
    physics.await.context("physics task panicked")?;

    if let Err(err) = &outcome {
        if err.is_stall() {
            log::error!("Mission stalled waiting on a sensor: {}", err);
        } else {
            log::error!("Mission failed: {}", err);
        }
    }
    let report = outcome.context("mission failed")?;
    let committed = report.localization.committed;
    log::info!(
        "Localized to ({:.2}, {:.2}) heading {:.2}",
        committed.x,
        committed.y,
        committed.heading
    );
    log::info!(
        "Visited waypoints {:?}, collected {}, mapped {} obstacles{}",
        report.search.waypoints_visited,
        report.search.collected(),
        report.search.obstacles(),
        if report.search.out_of_time { ", ran out of time" } else { "" }
    );
    log::info!("{} blocks delivered", world.delivered().len());

    Ok(())
}
