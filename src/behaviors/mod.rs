//! Behaviors module for the Scout robot
pub mod search;
pub mod waypoints;

pub use self::search::{
    Approach, ApproachEnd, Inspection, InspectionOutcome, ObjectSearch, SearchReport,
    SearchSession, SweepReport,
};
pub use self::waypoints::{waypoint_target, WaypointStep, FIRST_WAYPOINT, HOME_WAYPOINT};

use std::time::{Duration, Instant};

/// Source of the run's time limit
pub trait TimeBudget: Send + Sync {
    /// True once the run must wrap up
    fn is_time_up(&self) -> bool;
}

/// Wall-clock countdown started at construction
#[derive(Debug, Clone, Copy)]
pub struct CountdownTimer {
    deadline: Instant,
}

impl CountdownTimer {
    pub fn new(budget: Duration) -> Self {
        CountdownTimer {
            deadline: Instant::now() + budget,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

impl TimeBudget for CountdownTimer {
    fn is_time_up(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_up_immediately() {
        let timer = CountdownTimer::new(Duration::ZERO);
        assert!(timer.is_time_up());
        assert_eq!(timer.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_long_budget_is_not_up() {
        let timer = CountdownTimer::new(Duration::from_secs(240));
        assert!(!timer.is_time_up());
        assert!(timer.remaining() > Duration::from_secs(200));
    }
}
