//! Runtime configuration.
//!
//! Every calibration constant the controllers use lives here under a name.
//! Values load from TOML (`config/scout.toml`) and any missing key falls back
//! to the defaults below, which are the values tuned on the competition
//! robot. Individual sections can also be adjusted at runtime through
//! `configure`, which takes the same flat `name -> f64` map the path
//! followers use.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::common::poll::{CancelToken, Poller};
use crate::common::types::Point2D;
use crate::control::kinematics::DriveGeometry;
use crate::error::{ScoutError, ScoutResult};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub localizer: LocalizerConfig,
    pub search: SearchConfig,
    pub poll: PollConfig,
    pub geometry: DriveGeometry,
}

impl ScoutConfig {
    pub fn from_toml_str(text: &str) -> ScoutResult<Self> {
        let config: ScoutConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ScoutResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ScoutResult<()> {
        self.localizer.validate()?;
        self.search.validate()?;
        self.poll.validate()?;
        self.geometry.validate()
    }
}

/// Light localization parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// Heading the robot turns to before driving onto the grid (degrees)
    pub approach_heading: f64,
    /// Wheel speed for the approach and the rotation scan (deg/s)
    pub speed: f64,
    /// Distance from the light sensor to the wheel axle
    pub sensor_to_axle: f64,
    /// Settle time after the first line crossing
    pub approach_debounce_ms: u64,
    /// Angular offset between the line grid frame and the scan start (degrees)
    pub heading_calibration: f64,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        LocalizerConfig {
            approach_heading: 45.0,
            speed: 250.0,
            sensor_to_axle: 7.5,
            approach_debounce_ms: 500,
            heading_calibration: 115.0,
        }
    }
}

impl LocalizerConfig {
    pub fn approach_debounce(&self) -> Duration {
        Duration::from_millis(self.approach_debounce_ms)
    }

    /// Apply runtime overrides
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> ScoutResult<()> {
        if let Some(&heading) = params.get("approach_heading") {
            self.approach_heading = heading;
        }

        if let Some(&speed) = params.get("speed") {
            self.speed = speed;
        }

        if let Some(&distance) = params.get("sensor_to_axle") {
            self.sensor_to_axle = distance;
        }

        if let Some(&millis) = params.get("approach_debounce_ms") {
            if millis < 0.0 {
                return Err(ScoutError::Config(
                    "approach_debounce_ms must be non-negative".to_string(),
                ));
            }
            self.approach_debounce_ms = millis as u64;
        }

        if let Some(&calibration) = params.get("heading_calibration") {
            self.heading_calibration = calibration;
        }

        self.validate()
    }

    fn validate(&self) -> ScoutResult<()> {
        if self.speed <= 0.0 {
            return Err(ScoutError::Config("localizer speed must be positive".to_string()));
        }
        if self.sensor_to_axle <= 0.0 {
            return Err(ScoutError::Config(
                "sensor_to_axle must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the robot drives after dropping an object in the endzone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnLeg {
    /// Re-target the endzone centre; the caller restores position afterwards.
    #[default]
    Endzone,
    /// Drive straight back to the pose captured before transport.
    Snapshot,
}

/// Claw actuation parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClawConfig {
    pub speed: u32,
    pub acceleration: u32,
    pub grasp_angle: i32,
    pub release_angle: i32,
}

impl Default for ClawConfig {
    fn default() -> Self {
        ClawConfig {
            speed: 200,
            acceleration: 3000,
            grasp_angle: -200,
            release_angle: 0,
        }
    }
}

/// Object search parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Wheel speed while sweeping and approaching objects (deg/s)
    pub sweep_speed: f64,
    /// The sweep continues while heading < sweep_angle or > sweep_angle + 180
    pub sweep_angle: f64,
    /// Distance reading at or below which an object counts as detected
    pub detection_threshold: f64,
    /// Extra approach distance allowed past the threshold
    pub approach_tolerance: f64,
    /// Turn applied before approaching so the classifier faces the object (degrees)
    pub adjustment_angle: f64,
    /// Lateral offset used for the same-object angle limit
    pub same_object_offset: f64,
    /// How close to the pre-inspection position backing off must get
    pub home_tolerance: f64,
    /// Pause after the distance sensor clears an object
    pub clear_pause_ms: u64,
    /// Width of one floor tile
    pub cell_width: f64,
    /// Tiles covered by one horizontal waypoint step
    pub cells_per_step: f64,
    /// Drop zone centre
    pub endzone: Point2D,
    pub return_leg: ReturnLeg,
    pub claw: ClawConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            sweep_speed: 150.0,
            sweep_angle: 90.0,
            detection_threshold: 60.0,
            approach_tolerance: 5.0,
            adjustment_angle: 21.0,
            same_object_offset: 22.5,
            home_tolerance: 0.5,
            clear_pause_ms: 100,
            cell_width: 30.48,
            cells_per_step: 4.0,
            endzone: Point2D::new(60.96, 60.96),
            return_leg: ReturnLeg::Endzone,
            claw: ClawConfig::default(),
        }
    }
}

impl SearchConfig {
    pub fn clear_pause(&self) -> Duration {
        Duration::from_millis(self.clear_pause_ms)
    }

    /// Furthest an inspection approach may travel before giving up
    pub fn max_approach(&self) -> f64 {
        self.detection_threshold + self.approach_tolerance
    }

    /// Apply runtime overrides
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> ScoutResult<()> {
        if let Some(&speed) = params.get("sweep_speed") {
            self.sweep_speed = speed;
        }

        if let Some(&angle) = params.get("sweep_angle") {
            self.sweep_angle = angle;
        }

        if let Some(&threshold) = params.get("detection_threshold") {
            self.detection_threshold = threshold;
        }

        if let Some(&tolerance) = params.get("approach_tolerance") {
            self.approach_tolerance = tolerance;
        }

        if let Some(&angle) = params.get("adjustment_angle") {
            self.adjustment_angle = angle;
        }

        if let Some(&offset) = params.get("same_object_offset") {
            self.same_object_offset = offset;
        }

        if let Some(&tolerance) = params.get("home_tolerance") {
            self.home_tolerance = tolerance;
        }

        if let Some(&width) = params.get("cell_width") {
            self.cell_width = width;
        }

        if let Some(&cells) = params.get("cells_per_step") {
            self.cells_per_step = cells;
        }

        if let Some(&x) = params.get("endzone_x") {
            self.endzone.x = x;
        }

        if let Some(&y) = params.get("endzone_y") {
            self.endzone.y = y;
        }

        self.validate()
    }

    fn validate(&self) -> ScoutResult<()> {
        if self.sweep_speed <= 0.0 {
            return Err(ScoutError::Config("sweep_speed must be positive".to_string()));
        }
        if self.detection_threshold <= 0.0 {
            return Err(ScoutError::Config(
                "detection_threshold must be positive".to_string(),
            ));
        }
        if self.approach_tolerance < 0.0 || self.home_tolerance < 0.0 {
            return Err(ScoutError::Config(
                "tolerances must be non-negative".to_string(),
            ));
        }
        if self.cell_width <= 0.0 || self.cells_per_step <= 0.0 {
            return Err(ScoutError::Config(
                "cell_width and cells_per_step must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Polling cadence and deadlines for sensor-driven waits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    /// Deadline for a single wait (line crossing, approach, backing off)
    pub timeout_ms: u64,
    /// Deadline for a whole sweep arc
    pub sweep_timeout_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval_ms: 5,
            timeout_ms: 30_000,
            sweep_timeout_ms: 60_000,
        }
    }
}

impl PollConfig {
    pub fn poller(&self, cancel: CancelToken) -> Poller {
        Poller::new(
            Duration::from_millis(self.interval_ms),
            Duration::from_millis(self.timeout_ms),
            cancel,
        )
    }

    pub fn sweep_timeout(&self) -> Duration {
        Duration::from_millis(self.sweep_timeout_ms)
    }

    fn validate(&self) -> ScoutResult<()> {
        if self.timeout_ms == 0 || self.sweep_timeout_ms == 0 {
            return Err(ScoutError::Config("poll timeouts must be non-zero".to_string()));
        }
        Ok(())
    }
}
