//! Navigation module for the Scout robot
pub mod costmap;
pub mod planner;

pub use self::costmap::{ObstacleRecord, RedZone, ZoneMap};
pub use self::planner::{DetourPlanner, PathPlanner};

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::types::Point2D;
use crate::control::Motion;
use crate::error::ScoutResult;
use crate::perception::odometry::PoseStore;

/// Obstacle and forbidden-zone bookkeeping plus travel that respects it
pub trait ObstacleMap: Send + Sync {
    /// Travel to a point, routing around known obstacles and red zones
    fn travel(&self, x: f64, y: f64) -> ScoutResult<()>;

    /// Append an obstacle; records are never modified or removed
    fn save_obstacle(&self, record: ObstacleRecord);

    fn add_red_zone(&self, zone: RedZone);

    /// Check whether the robot is about to drive into a red zone
    fn red_ahead(&self) -> bool;

    /// Lift the temporary zones placed for the duration of the search
    fn clear_temporary_zones(&self);

    fn obstacles(&self) -> Vec<ObstacleRecord>;
}

/// `ObstacleMap` backed by a `ZoneMap`, a planner and the motion primitives
pub struct ZoneNavigator {
    map: RwLock<ZoneMap>,
    planner: Box<dyn PathPlanner>,
    motion: Arc<dyn Motion>,
    pose: Arc<dyn PoseStore>,
    /// How far ahead `red_ahead` looks
    lookahead: f64,
    /// Distance from the robot to an object it has just reached
    object_reach: f64,
}

impl ZoneNavigator {
    pub fn new(map: ZoneMap, motion: Arc<dyn Motion>, pose: Arc<dyn PoseStore>) -> Self {
        ZoneNavigator {
            map: RwLock::new(map),
            planner: Box::new(DetourPlanner::default()),
            motion,
            pose,
            lookahead: 15.0,
            object_reach: 10.0,
        }
    }

    /// Replace the path planner
    pub fn with_planner<T: PathPlanner + 'static>(mut self, planner: T) -> Self {
        self.planner = Box::new(planner);
        self
    }

    pub fn with_lookahead(mut self, lookahead: f64) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn with_object_reach(mut self, reach: f64) -> Self {
        self.object_reach = reach;
        self
    }

    /// Snapshot of the current map
    pub fn map(&self) -> ZoneMap {
        self.read_map().clone()
    }

    /// Plan a path from the current position without moving
    pub fn plan_to(&self, goal: Point2D) -> ScoutResult<Vec<Point2D>> {
        let start = self.pose.pose().position();
        let map = self.read_map();
        self.planner.plan_path(start, goal, &map)
    }

    fn read_map(&self) -> RwLockReadGuard<'_, ZoneMap> {
        self.map.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, ZoneMap> {
        self.map.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ObstacleMap for ZoneNavigator {
    fn travel(&self, x: f64, y: f64) -> ScoutResult<()> {
        let path = self.plan_to(Point2D::new(x, y))?;
        log::debug!("Travelling to ({:.1}, {:.1}) via {} points", x, y, path.len());

        for point in path.iter().skip(1) {
            self.motion.travel_to(point.x, point.y)?;
        }
        Ok(())
    }

    fn save_obstacle(&self, record: ObstacleRecord) {
        log::info!(
            "Obstacle saved at ({:.1}, {:.1}) heading {:.1}",
            record.x,
            record.y,
            record.heading
        );
        self.write_map().save_obstacle(record, self.object_reach);
    }

    fn add_red_zone(&self, zone: RedZone) {
        self.write_map().add_red_zone(zone);
    }

    fn red_ahead(&self) -> bool {
        let pose = self.pose.pose();
        self.read_map().red_ahead(&pose, self.lookahead)
    }

    fn clear_temporary_zones(&self) {
        let removed = self.write_map().clear_temporary_zones();
        log::debug!("Cleared {} temporary red zones", removed);
    }

    fn obstacles(&self) -> Vec<ObstacleRecord> {
        self.read_map().obstacles().to_vec()
    }
}
