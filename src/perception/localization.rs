//! Light-sensor localization against the floor grid.
//!
//! The robot starts somewhere in the tile diagonally below-left of the grid
//! origin with a rough dead-reckoning pose. It drives onto the grid, backs up
//! so its axle sits near the line intersection, and spins once while the
//! light sensor sweeps a circle of radius `sensor_to_axle`. That circle cuts
//! the two lines through the intersection at four headings; half the angle
//! between each pair gives the axle's offset from that line.
//!
//! Sample layout (counter-clockwise spin): 0 and 2 straddle the line fixing
//! y, 1 and 3 straddle the line fixing x.

use std::sync::Arc;
use std::thread;

use crate::common::poll::Poller;
use crate::common::signed_delta_degrees;
use crate::common::types::{AxisMask, Pose};
use crate::config::LocalizerConfig;
use crate::control::{Annunciator, Motion};
use crate::error::ScoutResult;
use crate::perception::filters::{EdgeDebouncer, Filter};
use crate::perception::odometry::PoseStore;
use crate::perception::sensors::LineDetector;

/// Number of line crossings sampled during the rotation scan
pub const LINE_SAMPLES: usize = 4;

/// Rigid-body correction computed from one set of line-crossing headings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    /// Absolute x of the rotation axis
    pub x: f64,
    /// Absolute y of the rotation axis
    pub y: f64,
    /// Degrees to add to the current heading estimate
    pub heading_offset: f64,
}

/// Compute the pose correction from four line-crossing headings (degrees).
pub fn compute_correction(
    samples: &[f64; LINE_SAMPLES],
    sensor_to_axle: f64,
    heading_calibration: f64,
) -> Correction {
    let x = -sensor_to_axle * ((samples[1] - samples[3]).abs() / 2.0).to_radians().cos();
    let y = -sensor_to_axle * ((samples[0] - samples[2]).abs() / 2.0).to_radians().cos();
    let heading_offset = ((samples[3] - samples[1]) / 2.0).abs() - samples[1] + heading_calibration;

    Correction {
        x,
        y,
        heading_offset,
    }
}

/// Outcome of a completed localization run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalizationReport {
    /// Headings at which the four lines were crossed, in detection order
    pub samples: [f64; LINE_SAMPLES],
    pub correction: Correction,
    /// Pose written to the pose store
    pub committed: Pose,
}

/// Localizer driving the approach, scan, and correction sequence
pub struct LightLocalizer {
    config: LocalizerConfig,
    pose: Arc<dyn PoseStore>,
    motion: Arc<dyn Motion>,
    line: Arc<dyn LineDetector>,
    signal: Arc<dyn Annunciator>,
    poller: Poller,
}

impl LightLocalizer {
    pub fn new(
        config: LocalizerConfig,
        pose: Arc<dyn PoseStore>,
        motion: Arc<dyn Motion>,
        line: Arc<dyn LineDetector>,
        signal: Arc<dyn Annunciator>,
        poller: Poller,
    ) -> Self {
        LightLocalizer {
            config,
            pose,
            motion,
            line,
            signal,
            poller,
        }
    }

    /// Run the full localization sequence and return to the origin.
    ///
    /// On failure the wheels are stopped before the error is returned.
    pub fn localize(&self) -> ScoutResult<LocalizationReport> {
        let result = self.run();
        if let Err(err) = &result {
            log::warn!("Localization aborted: {}", err);
            if let Err(stop_err) = self.motion.stop() {
                log::warn!("Failed to stop after aborted localization: {}", stop_err);
            }
        }
        result
    }

    fn run(&self) -> ScoutResult<LocalizationReport> {
        self.approach()?;
        self.back_off()?;
        let samples = self.scan_lines()?;
        let report = self.commit(samples);
        self.return_to_origin()?;
        Ok(report)
    }

    /// Drive diagonally until the light sensor reaches the first line
    fn approach(&self) -> ScoutResult<()> {
        log::info!(
            "Approaching grid at {:.0} degrees",
            self.config.approach_heading
        );
        self.motion.turn_to(self.config.approach_heading)?;
        self.motion.set_speeds(self.config.speed, self.config.speed)?;

        self.poller
            .wait_until("line approach", || self.line.black_line())?;

        self.motion.stop()?;
        thread::sleep(self.config.approach_debounce());
        Ok(())
    }

    /// Put the rotation axis where the sensor crossed the line
    fn back_off(&self) -> ScoutResult<()> {
        log::debug!("Backing off {:.1}", self.config.sensor_to_axle);
        self.motion.go_backward(self.config.sensor_to_axle)
    }

    /// Spin in place and record the heading at each of four line crossings
    fn scan_lines(&self) -> ScoutResult<[f64; LINE_SAMPLES]> {
        let mut samples = [0.0; LINE_SAMPLES];
        let mut debouncer = EdgeDebouncer::new();

        self.motion.set_speeds(-self.config.speed, self.config.speed)?;
        self.poller.wait_until("line scan", || {
            if debouncer.filter(self.line.black_line()) {
                let heading = self.pose.pose().heading;
                samples[debouncer.edges() - 1] = heading;
                log::debug!("Line {} crossed at {:.2} degrees", debouncer.edges(), heading);
            }
            debouncer.edges() == LINE_SAMPLES
        })?;
        self.motion.stop()?;

        check_sample_spacing(&samples);
        Ok(samples)
    }

    /// Overwrite the whole pose with the corrected estimate
    fn commit(&self, samples: [f64; LINE_SAMPLES]) -> LocalizationReport {
        let correction = compute_correction(
            &samples,
            self.config.sensor_to_axle,
            self.config.heading_calibration,
        );
        let current = self.pose.pose();
        let committed = Pose::new(
            correction.x,
            correction.y,
            current.heading + correction.heading_offset,
        );
        self.pose.set_position(committed, AxisMask::ALL);

        log::info!(
            "Localized at ({:.2}, {:.2}) heading {:.2} (offset {:+.2})",
            committed.x,
            committed.y,
            committed.heading,
            correction.heading_offset
        );

        LocalizationReport {
            samples,
            correction,
            committed,
        }
    }

    fn return_to_origin(&self) -> ScoutResult<()> {
        self.motion.travel_to(0.0, 0.0)?;
        self.motion.stop()?;
        self.motion.turn_to(0.0)?;
        self.signal.beep();
        Ok(())
    }
}

/// Warn when two consecutive crossings are suspiciously close; the
/// correction is still computed from them.
fn check_sample_spacing(samples: &[f64; LINE_SAMPLES]) {
    for pair in samples.windows(2) {
        if signed_delta_degrees(pair[0], pair[1]).abs() < 1.0 {
            log::warn!(
                "Line crossings at {:.2} and {:.2} are less than a degree apart",
                pair[0],
                pair[1]
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_offsets_follow_half_angle_cosine() {
        let samples = [30.0, 110.0, 200.0, 290.0];
        let d = 7.5;
        let correction = compute_correction(&samples, d, 115.0);

        assert_relative_eq!(correction.x, -d * (90f64).to_radians().cos(), epsilon = 1e-12);
        assert_relative_eq!(correction.y, -d * (85f64).to_radians().cos(), epsilon = 1e-12);
    }

    #[test]
    fn test_heading_offset_formula() {
        let samples = [30.0, 110.0, 200.0, 290.0];
        let correction = compute_correction(&samples, 7.5, 115.0);
        // |290 - 110| / 2 - 110 + 115
        assert_relative_eq!(correction.heading_offset, 95.0);
    }

    #[test]
    fn test_sample_order_of_pair_does_not_matter() {
        let a = compute_correction(&[10.0, 100.0, 170.0, 260.0], 7.5, 115.0);
        let b = compute_correction(&[170.0, 100.0, 10.0, 260.0], 7.5, 115.0);
        assert_relative_eq!(a.x, b.x);
        assert_relative_eq!(a.y, b.y);
    }

    #[test]
    fn test_centred_axle_gives_zero_offset() {
        // Crossings exactly opposite each other mean the axle is on both lines
        let correction = compute_correction(&[0.0, 90.0, 180.0, 270.0], 7.5, 115.0);
        assert_relative_eq!(correction.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(correction.y, 0.0, epsilon = 1e-12);
    }
}
