//! Simulated arena and robot.
//!
//! `SimWorld` stands in for every piece of hardware the controllers talk
//! to: it implements the motion, claw, signal, pose and sensor interfaces
//! over one shared world state. The robot's real pose is kept apart from
//! the odometer's estimate so localization has something to correct.
//!
//! Two clocks are supported. In lockstep mode every sensor or pose read
//! advances the world by one step, which makes test runs deterministic and
//! independent of wall-clock speed. In external mode the world only moves
//! when `step` is called, e.g. from a physics task.
pub mod physics;
pub mod sensors;

pub use self::physics::{Body, Increment};
pub use self::sensors::{FloorGrid, ObjectKind, SimObject};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::common::signed_delta_degrees;
use crate::common::types::{AxisMask, Point2D, Pose};
use crate::control::kinematics::DriveGeometry;
use crate::control::{Annunciator, Claw, Motion};
use crate::error::ScoutResult;
use crate::perception::odometry::{Odometer, PoseStore};
use crate::perception::sensors::{DistanceSensor, LineDetector, MaterialClassifier};

/// Hardware layout and arena parameters of the simulation
#[derive(Debug, Clone, Copy)]
pub struct SimSettings {
    pub geometry: DriveGeometry,
    /// Physics step (seconds)
    pub dt: f64,
    /// Floor lines, if the arena has any
    pub grid: Option<FloorGrid>,
    /// Light sensor position along the heading; negative is behind the axle
    pub light_offset: f64,
    /// Distance sensor direction relative to the heading (degrees)
    pub distance_bearing: f64,
    /// Readings beyond this are reported as nothing in range
    pub distance_range: f64,
    /// Colour sensor position ahead of the axle
    pub classifier_reach: f64,
    /// How far from the axle the claw can grab an object
    pub claw_reach: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        SimSettings {
            geometry: DriveGeometry::default(),
            dt: 0.01,
            grid: Some(FloorGrid {
                spacing: 30.48,
                half_width: 0.4,
            }),
            light_offset: -7.5,
            distance_bearing: 15.0,
            distance_range: 200.0,
            classifier_reach: 8.0,
            claw_reach: 15.0,
        }
    }
}

/// How simulated time advances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimClock {
    /// One step per observation
    Lockstep,
    /// Only through `SimWorld::step`
    External,
}

/// Commands received by the simulated hardware, in order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    TurnTo(f64),
    GoForward(f64),
    SetSpeeds(f64, f64),
    TravelTo(Point2D),
    SetPosition(Pose),
    Claw(i32),
    Beep,
}

#[derive(Debug)]
struct WorldState {
    body: Body,
    objects: Vec<SimObject>,
    carried: Option<SimObject>,
    delivered: Vec<SimObject>,
    claw_angle: i32,
    claw_motor: Option<(u32, u32)>,
    /// Accumulated wheel rotation in degrees, (left, right)
    tachometers: (f64, f64),
    melodies: usize,
    events: Vec<SimEvent>,
    elapsed: f64,
}

/// The simulated robot in its arena
pub struct SimWorld {
    settings: SimSettings,
    clock: SimClock,
    odometer: Arc<Odometer>,
    distance_enabled: AtomicBool,
    state: Mutex<WorldState>,
}

impl SimWorld {
    /// Robot at `truth` whose odometer believes it is at `estimate`
    pub fn new(settings: SimSettings, truth: Pose, estimate: Pose) -> Self {
        SimWorld {
            settings,
            clock: SimClock::Lockstep,
            odometer: Arc::new(Odometer::new(estimate)),
            distance_enabled: AtomicBool::new(true),
            state: Mutex::new(WorldState {
                body: Body::new(truth),
                objects: Vec::new(),
                carried: None,
                delivered: Vec::new(),
                claw_angle: 0,
                claw_motor: None,
                tachometers: (0.0, 0.0),
                melodies: 0,
                events: Vec::new(),
                elapsed: 0.0,
            }),
        }
    }

    pub fn with_clock(mut self, clock: SimClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_object(self, object: SimObject) -> Self {
        self.lock().objects.push(object);
        self
    }

    /// The odometer the world feeds; shared with whoever needs the estimate
    pub fn odometer(&self) -> Arc<Odometer> {
        Arc::clone(&self.odometer)
    }

    /// Advance the world by `dt` seconds
    pub fn step(&self, dt: f64) {
        let mut state = self.lock();
        self.advance(&mut state, dt);
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    pub fn truth(&self) -> Pose {
        self.lock().body.truth
    }

    pub fn wheel_speeds(&self) -> (f64, f64) {
        self.lock().body.wheels
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.lock().events.clone()
    }

    /// Objects still lying in the arena
    pub fn objects(&self) -> Vec<SimObject> {
        self.lock().objects.clone()
    }

    pub fn carried(&self) -> Option<SimObject> {
        self.lock().carried
    }

    pub fn delivered(&self) -> Vec<SimObject> {
        self.lock().delivered.clone()
    }

    pub fn distance_enabled(&self) -> bool {
        self.distance_enabled.load(Ordering::SeqCst)
    }

    pub fn claw_angle(&self) -> i32 {
        self.lock().claw_angle
    }

    pub fn claw_motor(&self) -> Option<(u32, u32)> {
        self.lock().claw_motor
    }

    /// Wheel rotation since the start, in degrees
    pub fn tachometers(&self) -> (f64, f64) {
        self.lock().tachometers
    }

    pub fn beeps(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|event| matches!(event, SimEvent::Beep))
            .count()
    }

    pub fn melodies(&self) -> usize {
        self.lock().melodies
    }

    /// Simulated seconds elapsed
    pub fn elapsed(&self) -> f64 {
        self.lock().elapsed
    }

    fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the world for a read, stepping it first in lockstep mode
    fn observe(&self) -> MutexGuard<'_, WorldState> {
        let mut state = self.lock();
        if self.clock == SimClock::Lockstep {
            self.advance(&mut state, self.settings.dt);
        }
        state
    }

    fn advance(&self, state: &mut WorldState, dt: f64) {
        let increment = state.body.update(dt, &self.settings.geometry);
        self.count_wheels(state, increment);
        self.feed_odometer(increment);
        state.elapsed += dt;
    }

    /// Apply a body-frame move to both the real pose and the odometer
    fn displace(&self, state: &mut WorldState, increment: Increment) {
        state.body.apply(increment);
        self.count_wheels(state, increment);
        self.feed_odometer(increment);
    }

    fn count_wheels(&self, state: &mut WorldState, increment: Increment) {
        let (left, right) = increment.wheel_rotation(&self.settings.geometry);
        state.tachometers.0 += left;
        state.tachometers.1 += right;
    }

    fn feed_odometer(&self, increment: Increment) {
        if increment == Increment::default() {
            return;
        }
        let estimate = self.odometer.pose();
        self.odometer.apply_delta(increment.delta_from(&estimate));
    }

    fn object_under_classifier(&self, state: &WorldState) -> Option<SimObject> {
        let probe = state.body.truth.project(self.settings.classifier_reach);
        state
            .objects
            .iter()
            .find(|object| object.contains(&probe))
            .copied()
    }
}

impl Motion for SimWorld {
    fn turn_to(&self, heading: f64) -> ScoutResult<()> {
        let mut state = self.lock();
        state.events.push(SimEvent::TurnTo(heading));
        state.body.wheels = (0.0, 0.0);

        let turn = signed_delta_degrees(self.odometer.pose().heading, heading);
        self.displace(&mut state, Increment::turn(turn));
        Ok(())
    }

    fn go_forward(&self, distance: f64) -> ScoutResult<()> {
        let mut state = self.lock();
        state.events.push(SimEvent::GoForward(distance));
        state.body.wheels = (0.0, 0.0);
        self.displace(&mut state, Increment::forward(distance));
        Ok(())
    }

    fn set_speeds(&self, left: f64, right: f64) -> ScoutResult<()> {
        let mut state = self.lock();
        state.events.push(SimEvent::SetSpeeds(left, right));
        state.body.wheels = (left, right);
        Ok(())
    }

    fn travel_to(&self, x: f64, y: f64) -> ScoutResult<()> {
        let mut state = self.lock();
        state.events.push(SimEvent::TravelTo(Point2D::new(x, y)));
        state.body.wheels = (0.0, 0.0);

        let estimate = self.odometer.pose();
        let dx = x - estimate.x;
        let dy = y - estimate.y;
        let distance = dx.hypot(dy);
        if distance < 1e-9 {
            return Ok(());
        }

        let bearing = dy.atan2(dx).to_degrees();
        self.displace(
            &mut state,
            Increment::turn(signed_delta_degrees(estimate.heading, bearing)),
        );
        self.displace(&mut state, Increment::forward(distance));
        Ok(())
    }
}

impl Claw for SimWorld {
    fn configure(&self, speed: u32, acceleration: u32) -> ScoutResult<()> {
        self.lock().claw_motor = Some((speed, acceleration));
        Ok(())
    }

    /// Negative angles close the claw, anything else opens it
    fn rotate_to(&self, angle: i32) -> ScoutResult<()> {
        let mut state = self.lock();
        state.events.push(SimEvent::Claw(angle));
        state.claw_angle = angle;

        let position = state.body.truth.position();
        if angle < 0 {
            if state.carried.is_some() {
                return Ok(());
            }
            let reach = self.settings.claw_reach;
            if let Some(index) = state
                .objects
                .iter()
                .position(|object| object.center.distance_to(&position) <= reach + object.radius)
            {
                let object = state.objects.remove(index);
                state.carried = Some(object);
            }
        } else if let Some(mut object) = state.carried.take() {
            object.center = state.body.truth.project(self.settings.claw_reach);
            state.delivered.push(object);
        }
        Ok(())
    }
}

impl Annunciator for SimWorld {
    fn beep(&self) {
        self.lock().events.push(SimEvent::Beep);
    }

    fn beep_sequence_up(&self) {
        self.lock().melodies += 1;
    }
}

impl PoseStore for SimWorld {
    fn pose(&self) -> Pose {
        let _state = self.observe();
        self.odometer.pose()
    }

    fn set_position(&self, pose: Pose, mask: AxisMask) {
        let mut state = self.lock();
        state.events.push(SimEvent::SetPosition(pose));
        self.odometer.set_position(pose, mask);
    }
}

impl LineDetector for SimWorld {
    fn black_line(&self) -> bool {
        let state = self.observe();
        let Some(grid) = self.settings.grid else {
            return false;
        };
        grid.on_line(&state.body.truth.project(self.settings.light_offset))
    }
}

impl DistanceSensor for SimWorld {
    fn distance(&self) -> f64 {
        let state = self.observe();
        if !self.distance_enabled.load(Ordering::SeqCst) {
            return f64::INFINITY;
        }

        let truth = state.body.truth;
        let bearing = truth.heading + self.settings.distance_bearing;
        state
            .objects
            .iter()
            .filter_map(|object| object.ray_hit(&truth.position(), bearing))
            .filter(|&distance| distance <= self.settings.distance_range)
            .fold(f64::INFINITY, f64::min)
    }

    fn set_enabled(&self, enabled: bool) {
        self.distance_enabled.store(enabled, Ordering::SeqCst);
    }
}

impl MaterialClassifier for SimWorld {
    fn is_object(&self) -> bool {
        let state = self.observe();
        self.object_under_classifier(&state).is_some()
    }

    fn is_block(&self) -> bool {
        let state = self.observe();
        matches!(
            self.object_under_classifier(&state),
            Some(SimObject {
                kind: ObjectKind::Block,
                ..
            })
        )
    }
}
