//! Serpentine waypoint sequence over the search area.
//!
//! Waypoints 1..=8 move the robot relative to where it stands: two long
//! steps right, one tile up, two long steps left, one tile up, two long
//! steps right. Waypoint 9 sends it home.

use crate::common::types::{Point2D, Pose};

pub const FIRST_WAYPOINT: u32 = 1;

/// Index that ends the sequence by returning to the origin
pub const HOME_WAYPOINT: u32 = 9;

/// Where a waypoint sends the robot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaypointStep {
    /// Travel to this absolute point
    Move(Point2D),
    /// Travel to the origin and face heading 0
    Home,
}

/// Resolve a waypoint index against the current pose.
///
/// `cell_width` is one tile; a long step covers `cells_per_step` tiles.
pub fn waypoint_target(
    index: u32,
    pose: &Pose,
    cell_width: f64,
    cells_per_step: f64,
) -> Option<WaypointStep> {
    let long_step = cells_per_step * cell_width;
    let step = match index {
        1 | 2 | 7 | 8 => WaypointStep::Move(Point2D::new(pose.x + long_step, pose.y)),
        3 | 6 => WaypointStep::Move(Point2D::new(pose.x, pose.y + cell_width)),
        4 | 5 => WaypointStep::Move(Point2D::new(pose.x - long_step, pose.y)),
        HOME_WAYPOINT => WaypointStep::Home,
        _ => return None,
    };
    Some(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn target(index: u32, pose: Pose) -> Point2D {
        match waypoint_target(index, &pose, 30.48, 4.0) {
            Some(WaypointStep::Move(point)) => point,
            other => panic!("waypoint {} gave {:?}", index, other),
        }
    }

    #[test]
    fn test_waypoint_three_moves_up_one_tile() {
        let point = target(3, Pose::new(50.0, 20.0, 0.0));
        assert_relative_eq!(point.x, 50.0);
        assert_relative_eq!(point.y, 50.48);
    }

    #[test]
    fn test_long_steps_cover_four_tiles() {
        let point = target(1, Pose::new(0.0, 0.0, 0.0));
        assert_relative_eq!(point.x, 121.92);
        let point = target(4, Pose::new(243.84, 30.48, 0.0));
        assert_relative_eq!(point.x, 121.92);
        assert_relative_eq!(point.y, 30.48);
    }

    #[test]
    fn test_serpentine_returns_to_start_column() {
        let mut pose = Pose::new(0.0, 0.0, 0.0);
        for index in FIRST_WAYPOINT..HOME_WAYPOINT {
            let point = target(index, pose);
            pose = Pose::new(point.x, point.y, 0.0);
        }
        assert_relative_eq!(pose.x, 243.84, epsilon = 1e-9);
        assert_relative_eq!(pose.y, 60.96, epsilon = 1e-9);
    }

    #[test]
    fn test_home_and_unknown_indices() {
        let pose = Pose::new(10.0, 10.0, 0.0);
        assert_eq!(waypoint_target(9, &pose, 30.48, 4.0), Some(WaypointStep::Home));
        assert_eq!(waypoint_target(0, &pose, 30.48, 4.0), None);
        assert_eq!(waypoint_target(10, &pose, 30.48, 4.0), None);
    }
}
