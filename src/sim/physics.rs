//! Kinematics for the simulated differential drive base

use crate::common::normalize_degrees;
use crate::common::types::Pose;
use crate::control::kinematics::DriveGeometry;

/// Body-frame motion over one step: distance rolled, then degrees turned
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Increment {
    pub distance: f64,
    pub turn: f64,
}

impl Increment {
    pub fn turn(turn: f64) -> Self {
        Increment {
            distance: 0.0,
            turn,
        }
    }

    pub fn forward(distance: f64) -> Self {
        Increment {
            distance,
            turn: 0.0,
        }
    }

    /// The increment as seen by a pose in another frame, in the
    /// `(dx, dy, dheading)` form the odometer integrates
    pub fn delta_from(&self, pose: &Pose) -> (f64, f64, f64) {
        let moved = self.apply_to(pose);
        (moved.x - pose.x, moved.y - pose.y, self.turn)
    }

    /// Degrees each wheel rolls for this increment, as (left, right)
    pub fn wheel_rotation(&self, geometry: &DriveGeometry) -> (f64, f64) {
        let rolled = geometry.convert_distance(self.distance);
        let spun = geometry.convert_angle(self.turn);
        (rolled - spun, rolled + spun)
    }

    /// Move along the mean heading of the step, then turn
    pub fn apply_to(&self, pose: &Pose) -> Pose {
        let mid = (pose.heading + self.turn / 2.0).to_radians();
        Pose {
            x: pose.x + self.distance * mid.cos(),
            y: pose.y + self.distance * mid.sin(),
            heading: normalize_degrees(pose.heading + self.turn),
        }
    }
}

/// Ground-truth state of the simulated robot
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub truth: Pose,
    /// Commanded wheel speeds (deg/s)
    pub wheels: (f64, f64),
}

impl Body {
    pub fn new(truth: Pose) -> Self {
        Body {
            truth,
            wheels: (0.0, 0.0),
        }
    }

    pub fn is_moving(&self) -> bool {
        self.wheels.0 != 0.0 || self.wheels.1 != 0.0
    }

    /// Integrate the commanded wheel speeds over `dt` seconds
    pub fn update(&mut self, dt: f64, geometry: &DriveGeometry) -> Increment {
        if !self.is_moving() {
            return Increment::default();
        }
        let (linear, angular) = geometry.body_velocity(self.wheels.0, self.wheels.1);
        let increment = Increment {
            distance: linear * dt,
            turn: angular * dt,
        };
        self.apply(increment);
        increment
    }

    pub fn apply(&mut self, increment: Increment) {
        self.truth = increment.apply_to(&self.truth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_equal_wheels_drive_straight() {
        let geometry = DriveGeometry::default();
        let mut body = Body::new(Pose::new(0.0, 0.0, 90.0));
        body.wheels = (180.0, 180.0);
        let increment = body.update(1.0, &geometry);

        // 180 deg/s is half a wheel turn per second
        assert_relative_eq!(increment.distance, std::f64::consts::PI * 2.15, epsilon = 1e-9);
        assert_relative_eq!(body.truth.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(body.truth.y, std::f64::consts::PI * 2.15, epsilon = 1e-9);
        assert_relative_eq!(body.truth.heading, 90.0);
    }

    #[test]
    fn test_delta_is_taken_in_the_estimate_frame() {
        let estimate = Pose::new(0.0, 0.0, 90.0);
        let (dx, dy, dh) = Increment::forward(5.0).delta_from(&estimate);
        assert_relative_eq!(dx, 0.0, epsilon = 1e-9);
        assert_relative_eq!(dy, 5.0, epsilon = 1e-9);
        assert_relative_eq!(dh, 0.0);
    }

    #[test]
    fn test_spin_turns_counter_clockwise() {
        let geometry = DriveGeometry::default();
        let mut body = Body::new(Pose::default());
        body.wheels = (-150.0, 150.0);
        body.update(0.1, &geometry);

        assert!(body.truth.heading > 0.0 && body.truth.heading < 10.0);
        assert_relative_eq!(body.truth.x, 0.0, epsilon = 1e-12);
    }
}
