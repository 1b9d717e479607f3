//! Path planning module

use nalgebra::Vector2;

use super::costmap::ZoneMap;
use crate::common::types::Point2D;
use crate::error::{ScoutError, ScoutResult};

/// Trait for path planning algorithms
pub trait PathPlanner: Send + Sync {
    /// Plan a path from start to goal; the first point is `start`.
    fn plan_path(&self, start: Point2D, goal: Point2D, map: &ZoneMap) -> ScoutResult<Vec<Point2D>>;
}

/// Planner that goes straight when it can and dog-legs around blocked
/// segments otherwise.
///
/// Detour points are placed on the perpendicular bisector of the direct
/// segment, alternating sides at growing offsets.
#[derive(Debug, Clone)]
pub struct DetourPlanner {
    /// Offset added per detour attempt
    detour_step: f64,
    max_attempts: usize,
}

impl Default for DetourPlanner {
    fn default() -> Self {
        DetourPlanner::new(30.48, 4)
    }
}

impl DetourPlanner {
    pub fn new(detour_step: f64, max_attempts: usize) -> Self {
        DetourPlanner {
            detour_step,
            max_attempts,
        }
    }

    fn detour_candidates(&self, start: Point2D, goal: Point2D) -> Vec<Vec<Point2D>> {
        let from = Vector2::new(start.x, start.y);
        let direction = Vector2::new(goal.x, goal.y) - from;
        let length = direction.norm();
        if length < f64::EPSILON {
            return Vec::new();
        }

        let normal = Vector2::new(-direction.y, direction.x) / length;
        let mid = from + direction / 2.0;

        let mut candidates = Vec::with_capacity(self.max_attempts * 2);
        for attempt in 1..=self.max_attempts {
            let offset = attempt as f64 * self.detour_step;
            for side in [1.0, -1.0] {
                let via = mid + normal * (side * offset);
                candidates.push(vec![start, Point2D::new(via.x, via.y), goal]);
            }
        }
        candidates
    }
}

impl PathPlanner for DetourPlanner {
    fn plan_path(&self, start: Point2D, goal: Point2D, map: &ZoneMap) -> ScoutResult<Vec<Point2D>> {
        if map.in_red_zone(&goal) {
            return Err(ScoutError::NoPath {
                from_x: start.x,
                from_y: start.y,
                to_x: goal.x,
                to_y: goal.y,
            });
        }

        let direct = vec![start, goal];
        if map.is_path_valid(&direct) {
            return Ok(direct);
        }

        log::debug!("Direct path has obstacles, trying detours");
        if let Some(path) = self
            .detour_candidates(start, goal)
            .into_iter()
            .find(|path| map.is_path_valid(path))
        {
            return Ok(path);
        }

        log::warn!(
            "No clear path from ({:.1}, {:.1}) to ({:.1}, {:.1}), going direct",
            start.x,
            start.y,
            goal.x,
            goal.y
        );
        Ok(direct)
    }
}
