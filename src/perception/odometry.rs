//! Pose store shared between the odometry integrator and the controllers

use std::sync::{PoisonError, RwLock};

use crate::common::normalize_degrees;
use crate::common::types::{AxisMask, Pose};

/// Holder of the current pose estimate.
///
/// Reads never block on the integrator for longer than a copy; writes replace
/// the selected axes in one step.
pub trait PoseStore: Send + Sync {
    /// Latest pose estimate
    fn pose(&self) -> Pose;

    /// Overwrite the axes selected by `mask` with the values from `pose`
    fn set_position(&self, pose: Pose, mask: AxisMask);
}

/// Dead-reckoning pose fed by an external odometry integrator
#[derive(Debug, Default)]
pub struct Odometer {
    pose: RwLock<Pose>,
}

impl Odometer {
    /// Create an odometer seeded with an initial estimate
    pub fn new(initial: Pose) -> Self {
        Odometer {
            pose: RwLock::new(initial),
        }
    }

    /// Integrate an odometry increment (dx, dy, dheading in degrees)
    pub fn apply_delta(&self, delta: (f64, f64, f64)) {
        let mut pose = self.pose.write().unwrap_or_else(PoisonError::into_inner);
        pose.x += delta.0;
        pose.y += delta.1;
        pose.heading = normalize_degrees(pose.heading + delta.2);
    }
}

impl PoseStore for Odometer {
    fn pose(&self) -> Pose {
        *self.pose.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_position(&self, update: Pose, mask: AxisMask) {
        let mut pose = self.pose.write().unwrap_or_else(PoisonError::into_inner);
        if mask.x {
            pose.x = update.x;
        }
        if mask.y {
            pose.y = update.y;
        }
        if mask.heading {
            pose.heading = normalize_degrees(update.heading);
        }
    }
}
