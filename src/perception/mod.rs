//! Perception module for the Scout robot
pub mod filters;
pub mod localization;
pub mod odometry;
pub mod sensors;

pub use self::localization::{compute_correction, Correction, LightLocalizer, LocalizationReport};
pub use self::odometry::{Odometer, PoseStore};
pub use self::sensors::{DistanceSensor, LineDetector, MaterialClassifier};
