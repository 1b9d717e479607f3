//! Object search: sweep, inspect, collect, move on.
//!
//! At each waypoint the robot spins in place while watching the distance
//! sensor. Anything inside the detection threshold is inspected: the robot
//! turns so the colour sensor faces it, drives up to it, and either carries
//! it to the endzone (collectible block) or maps it and backs off (anything
//! else). The run ends when the time budget expires or the last waypoint
//! has been swept, and the robot drives home.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::behaviors::waypoints::{waypoint_target, WaypointStep, FIRST_WAYPOINT, HOME_WAYPOINT};
use crate::behaviors::TimeBudget;
use crate::common::poll::Poller;
use crate::common::{normalize_degrees, signed_delta_degrees};
use crate::common::types::Point2D;
use crate::config::{ReturnLeg, SearchConfig};
use crate::control::{Annunciator, Claw, Motion};
use crate::error::{ScoutError, ScoutResult};
use crate::navigation::{ObstacleMap, ObstacleRecord};
use crate::perception::odometry::PoseStore;
use crate::perception::sensors::{DistanceSensor, MaterialClassifier};

/// Mutable state of a search run
#[derive(Debug, Clone)]
pub struct SearchSession {
    /// Next waypoint to travel to
    pub waypoint: u32,
    /// Headings of the detections made during the sweep in progress
    pub detections: Vec<f64>,
    /// The distance sensor is still on the object inspected last
    pub same_object: bool,
    /// Last measured distance to an object, for the same-object limit
    pub last_distance: f64,
    /// Position the current sweep pivots about
    pub sweep_origin: Point2D,
}

impl SearchSession {
    fn new() -> Self {
        SearchSession {
            waypoint: FIRST_WAYPOINT,
            detections: Vec::new(),
            same_object: false,
            last_distance: 0.0,
            sweep_origin: Point2D::default(),
        }
    }
}

/// Why an inspection approach stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproachEnd {
    /// The classifier reports an object in front of the claw
    Reached,
    /// A red zone lies ahead
    RedZone,
    /// Travelled further than threshold + tolerance without reaching anything
    TooFar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approach {
    pub end: ApproachEnd,
    pub travelled: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InspectionOutcome {
    /// Carried to the endzone
    Collected,
    /// Recorded in the obstacle map
    Obstacle(ObstacleRecord),
}

/// One inspected detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inspection {
    /// Heading at which the distance sensor first saw the object
    pub detected_at: f64,
    pub approach: Approach,
    pub outcome: InspectionOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub origin: Point2D,
    pub inspections: Vec<Inspection>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchReport {
    /// Waypoints reached, in order
    pub waypoints_visited: Vec<u32>,
    /// Waypoints whose target had no path, usually because it lies in a red zone
    pub waypoints_skipped: Vec<u32>,
    pub sweeps: Vec<SweepReport>,
    /// The loop ended because the time budget ran out
    pub out_of_time: bool,
}

impl SearchReport {
    pub fn collected(&self) -> usize {
        self.count(|outcome| matches!(outcome, InspectionOutcome::Collected))
    }

    pub fn obstacles(&self) -> usize {
        self.count(|outcome| matches!(outcome, InspectionOutcome::Obstacle(_)))
    }

    fn count(&self, pred: impl Fn(&InspectionOutcome) -> bool) -> usize {
        self.sweeps
            .iter()
            .flat_map(|sweep| sweep.inspections.iter())
            .filter(|inspection| pred(&inspection.outcome))
            .count()
    }
}

/// What the sweep loop woke up for
enum SweepEvent {
    ArcComplete,
    Detected { heading: f64, distance: f64 },
}

/// The search controller
pub struct ObjectSearch {
    config: SearchConfig,
    pose: Arc<dyn PoseStore>,
    motion: Arc<dyn Motion>,
    zones: Arc<dyn ObstacleMap>,
    distance: Arc<dyn DistanceSensor>,
    classifier: Arc<dyn MaterialClassifier>,
    claw: Arc<dyn Claw>,
    budget: Arc<dyn TimeBudget>,
    signal: Arc<dyn Annunciator>,
    poller: Poller,
    sweep_timeout: Duration,
    session: SearchSession,
}

impl ObjectSearch {
    /// Create the controller and configure the claw motor
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SearchConfig,
        pose: Arc<dyn PoseStore>,
        motion: Arc<dyn Motion>,
        zones: Arc<dyn ObstacleMap>,
        distance: Arc<dyn DistanceSensor>,
        classifier: Arc<dyn MaterialClassifier>,
        claw: Arc<dyn Claw>,
        budget: Arc<dyn TimeBudget>,
        signal: Arc<dyn Annunciator>,
        poller: Poller,
    ) -> ScoutResult<Self> {
        claw.configure(config.claw.speed, config.claw.acceleration)?;
        let sweep_timeout = poller.timeout();

        Ok(ObjectSearch {
            config,
            pose,
            motion,
            zones,
            distance,
            classifier,
            claw,
            budget,
            signal,
            poller,
            sweep_timeout,
            session: SearchSession::new(),
        })
    }

    /// Deadline for a sweep to make progress (reach an object or finish the arc)
    pub fn with_sweep_timeout(mut self, timeout: Duration) -> Self {
        self.sweep_timeout = timeout;
        self
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    /// Sweep every waypoint until the budget runs out, then drive home.
    ///
    /// The budget is only checked between waypoints; a sweep that is under
    /// way when time expires runs to completion. On error the wheels are
    /// stopped and the distance sensor re-enabled before returning.
    pub fn do_search(&mut self) -> ScoutResult<SearchReport> {
        self.session = SearchSession::new();
        let mut report = SearchReport::default();

        let result = self.search_loop(&mut report);
        if let Err(err) = &result {
            log::warn!("Search aborted: {}", err);
            self.distance.set_enabled(true);
            if let Err(stop_err) = self.motion.stop() {
                log::warn!("Failed to stop after aborted search: {}", stop_err);
            }
        }
        result.map(|_| report)
    }

    fn search_loop(&mut self, report: &mut SearchReport) -> ScoutResult<()> {
        while !self.budget.is_time_up() && self.session.waypoint < HOME_WAYPOINT {
            let sweep = self.sweep()?;
            report.sweeps.push(sweep);
            self.signal.beep();

            let waypoint = self.session.waypoint;
            match self.travel_to_waypoint(waypoint) {
                Ok(()) => report.waypoints_visited.push(waypoint),
                Err(err @ ScoutError::NoPath { .. }) => {
                    log::warn!("Skipping waypoint {}: {}", waypoint, err);
                    report.waypoints_skipped.push(waypoint);
                }
                Err(err) => return Err(err),
            }
            self.motion.turn_to(0.0)?;
            self.session.waypoint += 1;
        }

        report.out_of_time = self.session.waypoint < HOME_WAYPOINT;
        log::info!(
            "Search finished after {} waypoints{}, returning home",
            report.waypoints_visited.len(),
            if report.out_of_time { " (out of time)" } else { "" }
        );

        self.zones.clear_temporary_zones();
        self.zones.travel(0.0, 0.0)?;
        self.motion.turn_to(0.0)?;
        Ok(())
    }

    /// Move to the start of the next area to sweep
    pub fn travel_to_waypoint(&self, waypoint: u32) -> ScoutResult<()> {
        let pose = self.pose.pose();
        match waypoint_target(
            waypoint,
            &pose,
            self.config.cell_width,
            self.config.cells_per_step,
        ) {
            Some(WaypointStep::Move(target)) => {
                log::info!(
                    "Waypoint {}: ({:.2}, {:.2})",
                    waypoint,
                    target.x,
                    target.y
                );
                self.zones.travel(target.x, target.y)
            }
            Some(WaypointStep::Home) => {
                self.zones.travel(0.0, 0.0)?;
                self.motion.turn_to(0.0)
            }
            None => {
                log::warn!("Ignoring unknown waypoint {}", waypoint);
                Ok(())
            }
        }
    }

    /// Rotate about the current position and inspect everything in range.
    pub fn sweep(&mut self) -> ScoutResult<SweepReport> {
        let origin = self.pose.pose().position();
        self.session.sweep_origin = origin;
        self.session.detections.clear();
        self.session.same_object = false;

        let mut report = SweepReport {
            origin,
            inspections: Vec::new(),
        };
        let sweep_poller = self.poller.with_timeout(self.sweep_timeout);

        self.rotate()?;
        loop {
            let event = sweep_poller.poll("sweep", || {
                let heading = self.pose.pose().heading;
                if !self.in_sweep_arc(heading) {
                    return Some(SweepEvent::ArcComplete);
                }
                let distance = self.distance.distance();
                if distance <= self.config.detection_threshold {
                    return Some(SweepEvent::Detected { heading, distance });
                }
                None
            })?;

            match event {
                SweepEvent::ArcComplete => break,
                SweepEvent::Detected { heading, distance } => {
                    log::info!("Object at {:.1} heading {:.1}", distance, heading);
                    self.signal.beep();
                    self.session.detections.push(heading);
                    self.session.last_distance = distance;

                    let inspection = self.inspect(heading)?;
                    report.inspections.push(inspection);

                    self.rotate()?;
                    self.skip_same_object(heading)?;
                }
            }
        }

        self.motion.stop()?;
        Ok(report)
    }

    /// The sweep keeps turning while the heading is inside the arc
    fn in_sweep_arc(&self, heading: f64) -> bool {
        heading < self.config.sweep_angle || heading > self.config.sweep_angle + 180.0
    }

    fn rotate(&self) -> ScoutResult<()> {
        self.motion
            .set_speeds(-self.config.sweep_speed, self.config.sweep_speed)
    }

    /// Largest rotation past the detection heading still treated as the same object (degrees)
    pub fn same_object_limit(&self) -> f64 {
        if self.session.last_distance <= 0.0 {
            return 90.0;
        }
        (self.config.same_object_offset / self.session.last_distance)
            .atan()
            .to_degrees()
    }

    /// Keep turning while the sensor stays on the object just inspected.
    ///
    /// Re-arms detection once the robot has turned past the same-object
    /// limit; pauses briefly if the sensor clears first.
    fn skip_same_object(&mut self, detected_at: f64) -> ScoutResult<()> {
        let limit = self.same_object_limit();
        self.session.same_object = true;

        let cleared = self.poller.poll("object tracking", || {
            if self.distance.distance() > self.config.detection_threshold {
                return Some(true);
            }
            let turned = signed_delta_degrees(detected_at, self.pose.pose().heading);
            if turned > limit {
                return Some(false);
            }
            None
        })?;
        self.session.same_object = false;

        if cleared {
            self.motion.stop()?;
            thread::sleep(self.config.clear_pause());
            self.rotate()?;
        } else {
            log::debug!("Turned {:.1} degrees past detection, re-arming", limit);
        }
        Ok(())
    }

    /// Approach a detected object, classify it and deal with it.
    fn inspect(&mut self, detected_at: f64) -> ScoutResult<Inspection> {
        let approach_heading =
            normalize_degrees(self.pose.pose().heading + self.config.adjustment_angle);
        self.motion.turn_to(approach_heading)?;

        let approach = self.approach()?;
        let reached = self.pose.pose();

        let outcome = if self.classifier.is_block() {
            log::info!("Block found, collecting");
            self.collect(approach_heading)?;
            InspectionOutcome::Collected
        } else {
            let record = ObstacleRecord {
                x: reached.x,
                y: reached.y,
                heading: reached.heading,
            };
            self.back_off()?;
            self.zones.save_obstacle(record);
            self.session.last_distance = reached.position().distance_to(&self.session.sweep_origin);
            InspectionOutcome::Obstacle(record)
        };

        Ok(Inspection {
            detected_at,
            approach,
            outcome,
        })
    }

    /// Drive forward until the classifier sees the object, a red zone is
    /// ahead, or the robot has gone too far.
    fn approach(&self) -> ScoutResult<Approach> {
        let start = self.pose.pose().position();
        let max_approach = self.config.max_approach();

        self.motion
            .set_speeds(self.config.sweep_speed, self.config.sweep_speed)?;
        let end = self.poller.poll("inspection approach", || {
            if self.classifier.is_object() {
                return Some(ApproachEnd::Reached);
            }
            if self.zones.red_ahead() {
                return Some(ApproachEnd::RedZone);
            }
            if self.pose.pose().position().distance_to(&start) > max_approach {
                return Some(ApproachEnd::TooFar);
            }
            None
        })?;
        self.motion.stop()?;

        let travelled = self.pose.pose().position().distance_to(&start);
        log::debug!("Approach ended ({:?}) after {:.1}", end, travelled);
        Ok(Approach { end, travelled })
    }

    /// Reverse until back at the sweep origin
    fn back_off(&self) -> ScoutResult<()> {
        let origin = self.session.sweep_origin;
        let tolerance = self.config.home_tolerance;

        self.motion
            .set_speeds(-self.config.sweep_speed, -self.config.sweep_speed)?;
        self.poller.wait_until("backing off", || {
            self.pose.pose().position().distance_to(&origin) <= tolerance
        })?;
        self.motion.stop()
    }

    /// Grab the block, deliver it and come back to the sweep origin facing
    /// the way the approach started
    fn collect(&self, resume_heading: f64) -> ScoutResult<()> {
        self.distance.set_enabled(false);
        self.signal.beep();

        let delivered = self
            .claw
            .rotate_to(self.config.claw.grasp_angle)
            .and_then(|_| self.bring_to_endzone());
        self.distance.set_enabled(true);
        delivered?;

        let origin = self.session.sweep_origin;
        self.zones.travel(origin.x, origin.y)?;
        self.motion.turn_to(resume_heading)
    }

    /// Carry the held block to the endzone, drop it and restore the heading.
    pub fn bring_to_endzone(&self) -> ScoutResult<()> {
        let snapshot = self.pose.pose();
        let endzone = self.config.endzone;
        log::info!("Carrying block to endzone ({:.1}, {:.1})", endzone.x, endzone.y);

        self.zones.travel(endzone.x, endzone.y)?;
        self.claw.rotate_to(self.config.claw.release_angle)?;

        match self.config.return_leg {
            ReturnLeg::Endzone => self.zones.travel(endzone.x, endzone.y)?,
            ReturnLeg::Snapshot => self.zones.travel(snapshot.x, snapshot.y)?,
        }
        self.motion.turn_to(snapshot.heading)
    }
}
