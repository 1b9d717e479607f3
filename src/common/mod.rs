//! Common utilities and types for the Scout robot
pub mod poll;

/// Common types used across the codebase
pub mod types {
    use serde::{Deserialize, Serialize};

    /// A 2D point in arena units (centimetres)
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Point2D {
        pub x: f64,
        pub y: f64,
    }

    impl Point2D {
        pub fn new(x: f64, y: f64) -> Self {
            Point2D { x, y }
        }

        /// Euclidean distance to another point
        pub fn distance_to(&self, other: &Point2D) -> f64 {
            (self.x - other.x).hypot(self.y - other.y)
        }
    }

    /// A robot pose: position plus heading in degrees.
    ///
    /// Heading is kept in [0, 360) by every constructor.
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Pose {
        pub x: f64,
        pub y: f64,
        pub heading: f64,
    }

    impl Pose {
        pub fn new(x: f64, y: f64, heading: f64) -> Self {
            Pose {
                x,
                y,
                heading: super::normalize_degrees(heading),
            }
        }

        pub fn position(&self) -> Point2D {
            Point2D::new(self.x, self.y)
        }

        /// Point `distance` ahead of the pose along its heading
        pub fn project(&self, distance: f64) -> Point2D {
            let rad = self.heading.to_radians();
            Point2D::new(self.x + distance * rad.cos(), self.y + distance * rad.sin())
        }
    }

    /// Selects which pose axes an absolute write overwrites
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AxisMask {
        pub x: bool,
        pub y: bool,
        pub heading: bool,
    }

    impl AxisMask {
        pub const ALL: AxisMask = AxisMask {
            x: true,
            y: true,
            heading: true,
        };

        pub const POSITION: AxisMask = AxisMask {
            x: true,
            y: true,
            heading: false,
        };
    }
}

/// Wrap an angle in degrees to [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed difference `to - from` wrapped to [-180, 180)
pub fn signed_delta_degrees(from: f64, to: f64) -> f64 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}
