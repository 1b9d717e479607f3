//! Differential drive kinematics

use serde::Deserialize;

use crate::error::{ScoutError, ScoutResult};

/// Wheel geometry of a differential drive robot
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriveGeometry {
    pub wheel_radius: f64,
    /// Distance between the wheel contact points
    pub track: f64,
}

impl Default for DriveGeometry {
    fn default() -> Self {
        DriveGeometry {
            wheel_radius: 2.15,
            track: 15.6,
        }
    }
}

impl DriveGeometry {
    pub fn new(wheel_radius: f64, track: f64) -> Self {
        DriveGeometry {
            wheel_radius,
            track,
        }
    }

    pub(crate) fn validate(&self) -> ScoutResult<()> {
        if self.wheel_radius <= 0.0 || self.track <= 0.0 {
            return Err(ScoutError::Config(
                "wheel_radius and track must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Wheel rotation (degrees) needed to roll `distance`
    pub fn convert_distance(&self, distance: f64) -> f64 {
        (180.0 * distance) / (std::f64::consts::PI * self.wheel_radius)
    }

    /// Wheel rotation (degrees) for each wheel to turn the body by `angle` degrees in place
    pub fn convert_angle(&self, angle: f64) -> f64 {
        self.convert_distance(std::f64::consts::PI * self.track * angle / 360.0)
    }

    /// Body velocity from wheel speeds in deg/s.
    ///
    /// Returns (linear speed, angular speed in deg/s), positive angular
    /// speed turning counter-clockwise.
    pub fn body_velocity(&self, left: f64, right: f64) -> (f64, f64) {
        let v_left = left.to_radians() * self.wheel_radius;
        let v_right = right.to_radians() * self.wheel_radius;

        let linear = (v_left + v_right) / 2.0;
        let angular = ((v_right - v_left) / self.track).to_degrees();
        (linear, angular)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_convert_distance_one_revolution() {
        let geometry = DriveGeometry::new(2.0, 10.0);
        let circumference = 2.0 * std::f64::consts::PI * 2.0;
        assert_relative_eq!(geometry.convert_distance(circumference), 360.0, epsilon = 1e-9);
    }

    #[test]
    fn test_convert_angle_full_turn() {
        let geometry = DriveGeometry::new(2.0, 10.0);
        // A full turn in place rolls each wheel around a circle of diameter `track`
        let wheel = geometry.convert_angle(360.0);
        assert_relative_eq!(wheel, geometry.convert_distance(std::f64::consts::PI * 10.0));
    }

    #[test]
    fn test_opposite_speeds_rotate_counter_clockwise() {
        let geometry = DriveGeometry::default();
        let (linear, angular) = geometry.body_velocity(-150.0, 150.0);
        assert_relative_eq!(linear, 0.0);
        assert!(angular > 0.0);
    }

    #[test]
    fn test_equal_speeds_drive_straight() {
        let geometry = DriveGeometry::default();
        let (linear, angular) = geometry.body_velocity(250.0, 250.0);
        assert_relative_eq!(linear, 250f64.to_radians() * 2.15);
        assert_relative_eq!(angular, 0.0);
    }
}
