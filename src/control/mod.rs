//! Control module: the actuator interfaces the controllers drive.
//!
//! Wheel and claw commands are owned by whichever phase currently holds the
//! control thread, so implementations only need interior mutability, not
//! arbitration between callers.
pub mod kinematics;

use crate::error::ScoutResult;

/// Motion primitives of the differential drive base.
///
/// Headings are absolute degrees in the odometry frame; distances are in
/// arena units.
pub trait Motion: Send + Sync {
    /// Rotate in place to an absolute heading, returning once it is reached
    fn turn_to(&self, heading: f64) -> ScoutResult<()>;

    /// Translate along the current heading; a negative distance reverses
    fn go_forward(&self, distance: f64) -> ScoutResult<()>;

    fn go_backward(&self, distance: f64) -> ScoutResult<()> {
        self.go_forward(-distance)
    }

    /// Set signed wheel speeds (deg/s) and return immediately
    fn set_speeds(&self, left: f64, right: f64) -> ScoutResult<()>;

    fn stop(&self) -> ScoutResult<()> {
        self.set_speeds(0.0, 0.0)
    }

    /// Point-to-point travel that ignores the obstacle map
    fn travel_to(&self, x: f64, y: f64) -> ScoutResult<()>;
}

/// Claw actuator used to carry collectible objects
pub trait Claw: Send + Sync {
    fn configure(&self, speed: u32, acceleration: u32) -> ScoutResult<()>;

    /// Rotate the claw motor to an absolute angle (degrees), blocking until done
    fn rotate_to(&self, angle: i32) -> ScoutResult<()>;
}

/// Audible or visual signals for the operator
pub trait Annunciator: Send + Sync {
    fn beep(&self);

    /// Ascending tone sequence played when the run is over
    fn beep_sequence_up(&self);
}

/// Annunciator that only writes to the log
#[derive(Debug, Default)]
pub struct LogAnnunciator;

impl Annunciator for LogAnnunciator {
    fn beep(&self) {
        log::info!("beep");
    }

    fn beep_sequence_up(&self) {
        log::info!("beep sequence up");
    }
}
