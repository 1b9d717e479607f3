//! Object search runs in the simulated arena

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use scout_core::behaviors::{
    ApproachEnd, CountdownTimer, InspectionOutcome, ObjectSearch, TimeBudget,
};
use scout_core::common::poll::{CancelToken, Poller};
use scout_core::common::signed_delta_degrees;
use scout_core::common::types::{Point2D, Pose};
use scout_core::config::{ReturnLeg, SearchConfig};
use scout_core::navigation::{ObstacleMap, RedZone, ZoneMap, ZoneNavigator};
use scout_core::perception::PoseStore;
use scout_core::sim::{SimEvent, SimObject, SimSettings, SimWorld};
use scout_core::ScoutError;

/// Budget that allows a fixed number of loop iterations
struct Iterations {
    remaining: AtomicUsize,
}

impl Iterations {
    fn new(count: usize) -> Self {
        Iterations {
            remaining: AtomicUsize::new(count),
        }
    }
}

impl TimeBudget for Iterations {
    fn is_time_up(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }
}

struct Rig {
    world: Arc<SimWorld>,
    zones: Arc<ZoneNavigator>,
}

impl Rig {
    fn new(objects: &[SimObject]) -> Self {
        Rig::starting_at(Pose::default(), objects)
    }

    fn starting_at(start: Pose, objects: &[SimObject]) -> Self {
        let world = objects.iter().fold(
            SimWorld::new(SimSettings::default(), start, start),
            |world, object| world.with_object(*object),
        );
        let world = Arc::new(world);
        let zones = Arc::new(ZoneNavigator::new(
            ZoneMap::default(),
            world.clone(),
            world.clone(),
        ));
        Rig { world, zones }
    }

    fn search_with(
        &self,
        config: SearchConfig,
        budget: Arc<dyn TimeBudget>,
        poller: Poller,
    ) -> ObjectSearch {
        ObjectSearch::new(
            config,
            self.world.clone(),
            self.world.clone(),
            self.zones.clone(),
            self.world.clone(),
            self.world.clone(),
            self.world.clone(),
            budget,
            self.world.clone(),
            poller,
        )
        .unwrap()
    }

    fn search(&self, budget: Arc<dyn TimeBudget>) -> ObjectSearch {
        self.search_with(search_config(), budget, poller(CancelToken::new()))
    }

    fn travel_targets(&self) -> Vec<Point2D> {
        self.world
            .events()
            .iter()
            .filter_map(|event| match event {
                SimEvent::TravelTo(target) => Some(*target),
                _ => None,
            })
            .collect()
    }
}

fn search_config() -> SearchConfig {
    SearchConfig {
        clear_pause_ms: 0,
        ..SearchConfig::default()
    }
}

fn poller(cancel: CancelToken) -> Poller {
    Poller::new(Duration::ZERO, Duration::from_secs(5), cancel)
}

fn unlimited() -> Arc<dyn TimeBudget> {
    Arc::new(CountdownTimer::new(Duration::from_secs(600)))
}

fn assert_home(world: &SimWorld) {
    let pose = world.odometer().pose();
    assert_relative_eq!(pose.x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(pose.y, 0.0, epsilon = 1e-6);
    assert!(signed_delta_degrees(0.0, pose.heading).abs() < 1e-6);
}

/// Object centred `distance` away from the origin along `bearing` degrees
fn at_bearing(bearing: f64, distance: f64) -> Point2D {
    let rad = bearing.to_radians();
    Point2D::new(distance * rad.cos(), distance * rad.sin())
}

#[test]
fn test_full_search_collects_block_and_maps_obstacle() {
    let rig = Rig::new(&[
        SimObject::block(30.0, 30.0, 5.0),
        SimObject::obstacle(146.92, 25.0, 5.0),
    ]);
    let report = rig.search(unlimited()).do_search().unwrap();

    assert_eq!(report.waypoints_visited, (1..=8).collect::<Vec<u32>>());
    assert_eq!(report.sweeps.len(), 8);
    assert!(!report.out_of_time);
    assert_eq!(report.collected(), 1);
    assert_eq!(report.obstacles(), 1);

    let first = &report.sweeps[0].inspections[0];
    assert_eq!(first.approach.end, ApproachEnd::Reached);
    assert_eq!(first.outcome, InspectionOutcome::Collected);

    assert_eq!(rig.world.delivered().len(), 1);
    assert!(rig.world.carried().is_none());
    assert_eq!(rig.world.objects().len(), 1);
    assert_eq!(rig.zones.obstacles().len(), 1);
    assert_eq!(rig.world.claw_motor(), Some((200, 3000)));
    assert_home(&rig.world);
}

#[test]
fn test_waypoints_follow_serpentine_from_origin() {
    let rig = Rig::new(&[]);
    rig.search(unlimited()).do_search().unwrap();

    let cell = 30.48;
    let expected = vec![
        Point2D::new(4.0 * cell, 0.0),
        Point2D::new(8.0 * cell, 0.0),
        Point2D::new(8.0 * cell, cell),
        Point2D::new(4.0 * cell, cell),
        Point2D::new(0.0, cell),
        Point2D::new(0.0, 2.0 * cell),
        Point2D::new(4.0 * cell, 2.0 * cell),
        Point2D::new(8.0 * cell, 2.0 * cell),
        Point2D::new(0.0, 0.0),
    ];
    let targets = rig.travel_targets();
    assert_eq!(targets.len(), expected.len());
    for (target, want) in targets.iter().zip(&expected) {
        assert_relative_eq!(target.x, want.x, epsilon = 1e-6);
        assert_relative_eq!(target.y, want.y, epsilon = 1e-6);
    }
    assert_home(&rig.world);
}

#[test]
fn test_budget_is_checked_once_per_waypoint() {
    let rig = Rig::new(&[]);
    let report = rig.search(Arc::new(Iterations::new(2))).do_search().unwrap();

    assert_eq!(report.waypoints_visited, vec![1, 2]);
    assert_eq!(report.sweeps.len(), 2);
    assert!(report.out_of_time);
    assert_home(&rig.world);
}

#[test]
fn test_waypoint_inside_red_zone_is_skipped() {
    let rig = Rig::new(&[]);
    rig.zones.add_red_zone(RedZone::new(230.0, -10.0, 260.0, 10.0));
    let report = rig.search(unlimited()).do_search().unwrap();

    assert_eq!(report.waypoints_skipped, vec![2]);
    assert_eq!(report.waypoints_visited, vec![1, 3, 4, 5, 6, 7, 8]);
    assert_eq!(report.sweeps.len(), 8);
    assert!(!report.out_of_time);
    assert!(!rig
        .travel_targets()
        .iter()
        .any(|target| target.distance_to(&Point2D::new(243.84, 0.0)) < 1e-6));
    assert_home(&rig.world);
}

#[test]
fn test_expired_budget_goes_straight_home() {
    let rig = Rig::starting_at(Pose::new(40.0, 20.0, 90.0), &[]);
    let report = rig
        .search(Arc::new(CountdownTimer::new(Duration::ZERO)))
        .do_search()
        .unwrap();

    assert!(report.waypoints_visited.is_empty());
    assert!(report.sweeps.is_empty());
    assert_eq!(rig.travel_targets(), vec![Point2D::new(0.0, 0.0)]);
    assert_home(&rig.world);
}

#[test]
fn test_wide_object_is_inspected_once_per_sweep() {
    let center = at_bearing(45.0, 45.0);
    let rig = Rig::new(&[SimObject::obstacle(center.x, center.y, 12.0)]);
    let sweep = rig.search(unlimited()).sweep().unwrap();

    assert_eq!(sweep.inspections.len(), 1);
    assert!(matches!(
        sweep.inspections[0].outcome,
        InspectionOutcome::Obstacle(_)
    ));
}

#[test]
fn test_close_wide_object_rearms_past_same_object_limit() {
    let rig = Rig::new(&[SimObject::obstacle(40.0, 60.0, 25.0)]);
    let sweep = rig.search(unlimited()).sweep().unwrap();

    assert_eq!(sweep.inspections.len(), 2);
    let first = &sweep.inspections[0];
    let second = &sweep.inspections[1];

    // Still on the same object, but turned further than the limit allows
    let offset = SearchConfig::default().same_object_offset;
    let limit = (offset / first.approach.travelled).atan().to_degrees();
    let turned = signed_delta_degrees(first.detected_at, second.detected_at);
    assert!(turned > limit, "re-armed after {} with limit {}", turned, limit);
    assert!(matches!(second.outcome, InspectionOutcome::Obstacle(_)));
}

#[test]
fn test_unreachable_object_aborts_past_threshold_plus_tolerance() {
    let center = at_bearing(45.0, 57.0);
    let rig = Rig::new(&[SimObject::obstacle(center.x, center.y, 2.0)]);
    let mut search = rig.search(unlimited());
    let sweep = search.sweep().unwrap();

    assert_eq!(sweep.inspections.len(), 1);
    let approach = sweep.inspections[0].approach;
    assert_eq!(approach.end, ApproachEnd::TooFar);
    assert!(approach.travelled > 65.0, "stopped early at {}", approach.travelled);
    assert!(approach.travelled < 65.5, "overshot to {}", approach.travelled);

    // Falls through to the obstacle branch and backs off to the sweep origin
    assert!(matches!(
        sweep.inspections[0].outcome,
        InspectionOutcome::Obstacle(_)
    ));
    let pose = rig.world.odometer().pose();
    assert!(pose.position().distance_to(&Point2D::new(0.0, 0.0)) <= 0.5 + 0.1);
    assert_relative_eq!(
        search.session().last_distance,
        approach.travelled,
        epsilon = 0.1
    );
}

#[test]
fn test_red_zone_stops_approach() {
    let rig = Rig::new(&[SimObject::block(30.0, 30.0, 5.0)]);
    rig.zones.add_red_zone(RedZone::new(20.0, 20.0, 45.0, 45.0));
    let sweep = rig.search(unlimited()).sweep().unwrap();

    assert_eq!(sweep.inspections[0].approach.end, ApproachEnd::RedZone);
    assert!(matches!(
        sweep.inspections[0].outcome,
        InspectionOutcome::Obstacle(_)
    ));
    assert!(rig.world.delivered().is_empty());
    assert_eq!(rig.world.objects().len(), 1);
}

#[test]
fn test_collection_restores_distance_sensor_and_position() {
    let rig = Rig::new(&[SimObject::block(30.0, 30.0, 5.0)]);
    let sweep = rig.search(unlimited()).sweep().unwrap();

    assert_eq!(sweep.inspections[0].outcome, InspectionOutcome::Collected);
    assert!(rig.world.distance_enabled());
    let targets = rig.travel_targets();
    let endzone = SearchConfig::default().endzone;
    assert_eq!(targets[0], endzone);
    assert_eq!(targets.last(), Some(&Point2D::new(0.0, 0.0)));
}

#[test]
fn test_approach_heading_wraps_past_north() {
    let center = at_bearing(5.0, 30.0);
    let rig = Rig::starting_at(
        Pose::new(0.0, 0.0, 350.0),
        &[SimObject::block(center.x, center.y, 5.0)],
    );
    let sweep = rig.search(unlimited()).sweep().unwrap();

    assert_eq!(sweep.inspections[0].outcome, InspectionOutcome::Collected);
    let headings: Vec<f64> = rig
        .world
        .events()
        .iter()
        .filter_map(|event| match event {
            SimEvent::TurnTo(heading) => Some(*heading),
            _ => None,
        })
        .collect();
    assert!(headings.iter().all(|h| (0.0..360.0).contains(h)), "{:?}", headings);
    assert!(headings[0] > 10.0 && headings[0] < 13.0, "{:?}", headings);
}

#[test]
fn test_temporary_zones_are_lifted_before_going_home() {
    let rig = Rig::new(&[]);
    rig.zones.add_red_zone(RedZone::new(150.0, 60.0, 210.0, 120.0));
    rig.zones
        .add_red_zone(RedZone::new(-30.48, -30.48, -5.0, -5.0).temporary());

    rig.search(Arc::new(CountdownTimer::new(Duration::ZERO)))
        .do_search()
        .unwrap();

    let zones = rig.zones.map();
    assert_eq!(zones.red_zones().len(), 1);
    assert!(!zones.red_zones()[0].temporary);
}

#[test]
fn test_endzone_return_leg_retargets_endzone() {
    let rig = Rig::starting_at(Pose::new(10.0, 0.0, 30.0), &[]);
    rig.search(unlimited()).bring_to_endzone().unwrap();

    let endzone = SearchConfig::default().endzone;
    assert_eq!(rig.travel_targets(), vec![endzone, endzone]);
    assert_eq!(rig.world.events().last(), Some(&SimEvent::TurnTo(30.0)));
    assert_eq!(rig.world.claw_angle(), 0);
}

#[test]
fn test_snapshot_return_leg_drives_back() {
    let rig = Rig::starting_at(Pose::new(10.0, 0.0, 30.0), &[]);
    let config = SearchConfig {
        return_leg: ReturnLeg::Snapshot,
        ..search_config()
    };
    rig.search_with(config, unlimited(), poller(CancelToken::new()))
        .bring_to_endzone()
        .unwrap();

    let endzone = SearchConfig::default().endzone;
    assert_eq!(
        rig.travel_targets(),
        vec![endzone, Point2D::new(10.0, 0.0)]
    );
    let pose = rig.world.odometer().pose();
    assert_relative_eq!(pose.x, 10.0, epsilon = 1e-6);
    assert_relative_eq!(pose.heading, 30.0, epsilon = 1e-6);
}

#[test]
fn test_cancelled_search_stops_wheels() {
    let rig = Rig::new(&[]);
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = rig
        .search_with(search_config(), unlimited(), poller(cancel))
        .do_search();

    assert!(matches!(result, Err(ScoutError::Cancelled { phase: "sweep" })));
    assert_eq!(rig.world.wheel_speeds(), (0.0, 0.0));
}
