//! Costmap of the arena.
//!
//! Obstacles found during the search are rasterised into a grid and
//! inflated by the robot's clearance radius. Red zones are kept as
//! rectangles so temporary ones can be lifted again without re-rasterising.

use serde::{Deserialize, Serialize};

use crate::common::types::{Point2D, Pose};

/// Cost values for different types of cells
pub mod cost_values {
    pub const LETHAL_OBSTACLE: u8 = 254;
    pub const INSCRIBED_INFLATED_OBSTACLE: u8 = 253;
    pub const NO_COST: u8 = 0;
    pub const UNKNOWN_COST: u8 = 255;
}

/// Cell coordinate in the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapPoint {
    pub x: i32,
    pub y: i32,
}

/// An object classified as an obstacle, as seen from the robot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleRecord {
    /// Robot position when the object was reached
    pub x: f64,
    pub y: f64,
    /// Robot heading when the object was reached
    pub heading: f64,
}

/// Axis-aligned forbidden rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedZone {
    pub min: Point2D,
    pub max: Point2D,
    /// Lifted by `clear_temporary_zones` at the end of the search
    pub temporary: bool,
}

impl RedZone {
    /// Zone spanning two corners given in any order
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        RedZone {
            min: Point2D::new(x1.min(x2), y1.min(y2)),
            max: Point2D::new(x1.max(x2), y1.max(y2)),
            temporary: false,
        }
    }

    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn contains(&self, point: &Point2D) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

/// Grid of obstacle costs plus the red zones of the arena
#[derive(Debug, Clone)]
pub struct ZoneMap {
    pub width: usize,
    pub height: usize,
    pub resolution: f64,
    pub origin_x: f64,
    pub origin_y: f64,
    pub data: Vec<u8>,
    /// Clearance kept around obstacles
    pub inflation_radius: f64,
    obstacles: Vec<ObstacleRecord>,
    red_zones: Vec<RedZone>,
}

impl Default for ZoneMap {
    /// A 12 x 12 tile arena with one tile of margin around it
    fn default() -> Self {
        let tile = 30.48;
        ZoneMap::new(-tile, -tile, 14.0 * tile, 14.0 * tile, 2.54)
    }
}

impl ZoneMap {
    /// Create an empty map covering `[origin, origin + size]`
    pub fn new(origin_x: f64, origin_y: f64, size_x: f64, size_y: f64, resolution: f64) -> Self {
        let width = (size_x / resolution).ceil().max(1.0) as usize;
        let height = (size_y / resolution).ceil().max(1.0) as usize;
        ZoneMap {
            width,
            height,
            resolution,
            origin_x,
            origin_y,
            data: vec![cost_values::NO_COST; width * height],
            inflation_radius: 12.0,
            obstacles: Vec::new(),
            red_zones: Vec::new(),
        }
    }

    pub fn with_inflation_radius(mut self, radius: f64) -> Self {
        self.inflation_radius = radius.max(0.0);
        self
    }

    /// Get the cost at a specific position in world coordinates
    pub fn get_cost(&self, x: f64, y: f64) -> u8 {
        let cell = self.world_to_map(x, y);
        self.cell_cost(cell)
    }

    fn cell_cost(&self, cell: MapPoint) -> u8 {
        match self.index(cell) {
            Some(index) => self.data[index],
            None => cost_values::UNKNOWN_COST,
        }
    }

    /// Convert world coordinates to map coordinates
    pub fn world_to_map(&self, x: f64, y: f64) -> MapPoint {
        MapPoint {
            x: ((x - self.origin_x) / self.resolution).floor() as i32,
            y: ((y - self.origin_y) / self.resolution).floor() as i32,
        }
    }

    fn index(&self, cell: MapPoint) -> Option<usize> {
        if cell.x >= 0 && cell.x < self.width as i32 && cell.y >= 0 && cell.y < self.height as i32 {
            Some(cell.y as usize * self.width + cell.x as usize)
        } else {
            None
        }
    }

    /// Record an obstacle and mark the object `reach` ahead of the robot
    pub fn save_obstacle(&mut self, record: ObstacleRecord, reach: f64) {
        let object = Pose::new(record.x, record.y, record.heading).project(reach);
        self.mark_obstacle(object);
        self.obstacles.push(record);
    }

    pub fn obstacles(&self) -> &[ObstacleRecord] {
        &self.obstacles
    }

    /// Mark a lethal cell and inflate the cells around it
    fn mark_obstacle(&mut self, point: Point2D) {
        let center = self.world_to_map(point.x, point.y);
        let Some(center_index) = self.index(center) else {
            log::warn!(
                "Obstacle at ({:.1}, {:.1}) is outside the map",
                point.x,
                point.y
            );
            return;
        };
        self.data[center_index] = cost_values::LETHAL_OBSTACLE;

        let cells = (self.inflation_radius / self.resolution).ceil() as i32;
        for dy in -cells..=cells {
            for dx in -cells..=cells {
                let neighbour = MapPoint {
                    x: center.x + dx,
                    y: center.y + dy,
                };
                let Some(index) = self.index(neighbour) else {
                    continue;
                };
                let distance = ((dx * dx + dy * dy) as f64).sqrt() * self.resolution;
                if distance <= self.inflation_radius
                    && self.data[index] < cost_values::INSCRIBED_INFLATED_OBSTACLE
                {
                    self.data[index] = cost_values::INSCRIBED_INFLATED_OBSTACLE;
                }
            }
        }
    }

    pub fn add_red_zone(&mut self, zone: RedZone) {
        self.red_zones.push(zone);
    }

    /// Remove every temporary red zone, returning how many were removed
    pub fn clear_temporary_zones(&mut self) -> usize {
        let before = self.red_zones.len();
        self.red_zones.retain(|zone| !zone.temporary);
        before - self.red_zones.len()
    }

    pub fn red_zones(&self) -> &[RedZone] {
        &self.red_zones
    }

    pub fn in_red_zone(&self, point: &Point2D) -> bool {
        self.red_zones.iter().any(|zone| zone.contains(point))
    }

    /// Check whether the point `lookahead` ahead of the pose is forbidden
    pub fn red_ahead(&self, pose: &Pose, lookahead: f64) -> bool {
        self.in_red_zone(&pose.project(lookahead))
    }

    /// Check if a point is blocked by an obstacle or a red zone
    pub fn is_blocked(&self, point: &Point2D) -> bool {
        let cost = self.get_cost(point.x, point.y);
        matches!(
            cost,
            cost_values::INSCRIBED_INFLATED_OBSTACLE | cost_values::LETHAL_OBSTACLE
        ) || self.in_red_zone(point)
    }

    /// Check a straight segment, ignoring the part within the inflation
    /// radius of `from` so a robot standing next to an obstacle can leave.
    pub fn segment_clear(&self, from: &Point2D, to: &Point2D) -> bool {
        let distance = from.distance_to(to);
        let steps = (distance / (self.resolution * 0.5)).ceil() as i32;

        for i in 0..=steps {
            let t = if steps > 0 { i as f64 / steps as f64 } else { 0.0 };
            let point = Point2D::new(from.x + t * (to.x - from.x), from.y + t * (to.y - from.y));
            if point.distance_to(from) <= self.inflation_radius {
                continue;
            }
            if self.is_blocked(&point) {
                return false;
            }
        }

        true
    }

    /// Check if a path is collision-free
    pub fn is_path_valid(&self, path: &[Point2D]) -> bool {
        path.windows(2)
            .all(|segment| self.segment_clear(&segment[0], &segment[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_to_map_floors_into_cells() {
        let map = ZoneMap::new(-10.0, -10.0, 100.0, 100.0, 2.0);
        assert_eq!(map.world_to_map(-10.0, -10.0), MapPoint { x: 0, y: 0 });
        assert_eq!(map.world_to_map(-8.5, -7.9), MapPoint { x: 0, y: 1 });
        assert_eq!(map.world_to_map(-11.0, 0.0), MapPoint { x: -1, y: 5 });
    }

    #[test]
    fn test_out_of_bounds_is_unknown() {
        let map = ZoneMap::default();
        assert_eq!(map.get_cost(-500.0, 0.0), cost_values::UNKNOWN_COST);
    }

    #[test]
    fn test_saved_obstacle_is_inflated_ahead_of_robot() {
        let mut map = ZoneMap::default().with_inflation_radius(5.0);
        map.save_obstacle(
            ObstacleRecord {
                x: 100.0,
                y: 100.0,
                heading: 0.0,
            },
            10.0,
        );

        assert_eq!(map.get_cost(110.0, 100.0), cost_values::LETHAL_OBSTACLE);
        assert!(map.is_blocked(&Point2D::new(113.0, 100.0)));
        assert!(!map.is_blocked(&Point2D::new(100.0, 100.0)));
        assert_eq!(map.obstacles().len(), 1);
    }

    #[test]
    fn test_temporary_zones_are_cleared() {
        let mut map = ZoneMap::default();
        map.add_red_zone(RedZone::new(30.0, 60.0, 120.0, 120.0));
        map.add_red_zone(RedZone::new(-30.0, -30.0, 0.0, 0.0).temporary());

        assert!(map.in_red_zone(&Point2D::new(-10.0, -10.0)));
        assert_eq!(map.clear_temporary_zones(), 1);
        assert!(!map.in_red_zone(&Point2D::new(-10.0, -10.0)));
        assert!(map.in_red_zone(&Point2D::new(50.0, 90.0)));
    }

    #[test]
    fn test_red_ahead_projects_along_heading() {
        let mut map = ZoneMap::default();
        map.add_red_zone(RedZone::new(20.0, -5.0, 40.0, 5.0));
        assert!(map.red_ahead(&Pose::new(0.0, 0.0, 0.0), 25.0));
        assert!(!map.red_ahead(&Pose::new(0.0, 0.0, 90.0), 25.0));
    }

    #[test]
    fn test_segment_through_red_zone_is_not_clear() {
        let mut map = ZoneMap::default();
        map.add_red_zone(RedZone::new(30.0, 60.0, 120.0, 120.0));
        assert!(!map.segment_clear(&Point2D::new(0.0, 0.0), &Point2D::new(170.0, 170.0)));
        assert!(map.segment_clear(&Point2D::new(0.0, 0.0), &Point2D::new(170.0, 0.0)));
    }
}
