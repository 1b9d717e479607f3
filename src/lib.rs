pub mod behaviors;
pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod navigation;
pub mod perception;
pub mod sim;

pub use crate::error::{ScoutError, ScoutResult};

use std::sync::Arc;

use crate::behaviors::{ObjectSearch, SearchReport, TimeBudget};
use crate::common::poll::CancelToken;
use crate::config::ScoutConfig;
use crate::control::{Annunciator, Claw, Motion};
use crate::navigation::ObstacleMap;
use crate::perception::{
    DistanceSensor, LightLocalizer, LineDetector, LocalizationReport, MaterialClassifier,
    PoseStore,
};

/// Everything the core drives or reads, shared with the samplers
#[derive(Clone)]
pub struct Hardware {
    pub pose: Arc<dyn PoseStore>,
    pub motion: Arc<dyn Motion>,
    pub line: Arc<dyn LineDetector>,
    pub distance: Arc<dyn DistanceSensor>,
    pub classifier: Arc<dyn MaterialClassifier>,
    pub claw: Arc<dyn Claw>,
    pub signal: Arc<dyn Annunciator>,
}

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct MissionReport {
    pub localization: LocalizationReport,
    pub search: SearchReport,
}

/// Core functionality for the Scout robot: localize once, then search
pub struct ScoutCore {
    localizer: LightLocalizer,
    search: ObjectSearch,
    signal: Arc<dyn Annunciator>,
}

impl ScoutCore {
    /// Wire the localizer and the search controller to the hardware
    pub fn new(
        config: &ScoutConfig,
        hardware: Hardware,
        zones: Arc<dyn ObstacleMap>,
        budget: Arc<dyn TimeBudget>,
        cancel: CancelToken,
    ) -> ScoutResult<Self> {
        config.validate()?;
        let poller = config.poll.poller(cancel);

        let localizer = LightLocalizer::new(
            config.localizer.clone(),
            Arc::clone(&hardware.pose),
            Arc::clone(&hardware.motion),
            Arc::clone(&hardware.line),
            Arc::clone(&hardware.signal),
            poller.clone(),
        );

        let search = ObjectSearch::new(
            config.search.clone(),
            Arc::clone(&hardware.pose),
            Arc::clone(&hardware.motion),
            zones,
            Arc::clone(&hardware.distance),
            Arc::clone(&hardware.classifier),
            Arc::clone(&hardware.claw),
            budget,
            Arc::clone(&hardware.signal),
            poller,
        )?
        .with_sweep_timeout(config.poll.sweep_timeout());

        Ok(ScoutCore {
            localizer,
            search,
            signal: hardware.signal,
        })
    }

    /// Localize against the floor grid, search the arena and return home
    pub fn run_mission(&mut self) -> ScoutResult<MissionReport> {
        log::info!("Starting localization");
        let localization = self.localizer.localize()?;

        log::info!("Starting object search");
        let search = self.search.do_search()?;

        log::info!(
            "Mission complete: {} collected, {} obstacles mapped",
            search.collected(),
            search.obstacles()
        );
        self.signal.beep_sequence_up();

        Ok(MissionReport {
            localization,
            search,
        })
    }
}
