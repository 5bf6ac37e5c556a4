//! Property-based tests for the dispatch algorithms.
//!
//! # Invariants tested
//!
//! - **Symmetry:** haversine distance does not depend on direction.
//! - **Permutation:** nearest-neighbour routes visit every stop exactly once
//!   with contiguous sequence numbers.
//! - **Accounting:** a batch assigns or fails every pending order.
//! - **Capacity:** no courier ends a batch above its daily limit.
//! - **Score range:** optimization scores stay within `[0, 100]`.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use dispatch_core::{
    AssignmentEngine, Depot, DistanceMatrixProvider, DistributorId, HaversineMatrix, OrderId,
    OrderStatus, RouteStop, WaypointKind, distance_km, optimization_score,
    plan_nearest_neighbor, test_support::MemoryStore,
};
use geo::Coord;
use proptest::prelude::*;

const DISTRIBUTOR: DistributorId = DistributorId(5);

fn latitude() -> impl Strategy<Value = f64> {
    -89.0_f64..89.0
}

fn longitude() -> impl Strategy<Value = f64> {
    -179.0_f64..179.0
}

/// Points scattered around Cairo, close enough to stay realistic.
fn city_points(max: usize) -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((29.8_f64..30.3, 31.0_f64..31.5), 1..=max)
}

fn stops_from(points: &[(f64, f64)]) -> Vec<RouteStop> {
    points
        .iter()
        .zip(1_i64..)
        .map(|(&(lat, lon), id)| RouteStop {
            order_id: OrderId(id),
            location: Coord { x: lon, y: lat },
            address: format!("Stop {id}"),
            status: OrderStatus::Accepted,
            created_at: Utc::now(),
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: distance from A to B equals distance from B to A.
    #[test]
    fn haversine_is_symmetric(
        lat1 in latitude(),
        lon1 in longitude(),
        lat2 in latitude(),
        lon2 in longitude(),
    ) {
        let there = distance_km(lat1, lon1, lat2, lon2);
        let back = distance_km(lat2, lon2, lat1, lon1);
        prop_assert!((there - back).abs() < 1e-9, "{there} vs {back}");
        prop_assert!(there >= 0.0);
    }

    /// Property: every stop appears exactly once after the depot, and
    /// sequence numbers run from zero without gaps.
    #[test]
    fn nearest_neighbour_is_a_permutation(points in city_points(12)) {
        let depot = Depot::default();
        let stops = stops_from(&points);
        let mut coords = vec![depot.location];
        coords.extend(stops.iter().map(|s| s.location));
        let legs = HaversineMatrix.matrix(&coords).expect("matrix");

        let plan = plan_nearest_neighbor(&depot, &stops, &legs);

        prop_assert_eq!(plan.waypoints.len(), stops.len() + 1);
        prop_assert_eq!(plan.waypoints[0].kind, WaypointKind::Depot);
        for (expected, waypoint) in (0_u32..).zip(&plan.waypoints) {
            prop_assert_eq!(waypoint.sequence, expected);
        }
        let visited: HashSet<OrderId> = plan.waypoints.iter().filter_map(|w| w.order_id).collect();
        let all: HashSet<OrderId> = stops.iter().map(|s| s.order_id).collect();
        prop_assert_eq!(visited, all);
        prop_assert!((0.0..=100.0).contains(&plan.optimization_score));
    }

    /// Property: scores are clamped regardless of route size.
    #[test]
    fn optimization_score_is_bounded(
        stops in 0_usize..200,
        distance in 0.0_f64..5_000.0,
        minutes in 0_u32..10_000,
    ) {
        let score = optimization_score(stops, distance, minutes);
        prop_assert!((0.0..=100.0).contains(&score), "score {score}");
    }

    /// Property: assigned plus failed orders equal the orders considered,
    /// and no courier exceeds its daily capacity.
    #[test]
    fn batches_account_for_every_order_within_capacity(
        orders in city_points(15),
        couriers in prop::collection::vec(((29.8_f64..30.3, 31.0_f64..31.5), 1_u32..4), 1..4),
    ) {
        let mut store = MemoryStore::default();
        let mut limits = HashMap::new();
        for (n, (depot, max)) in couriers.iter().enumerate() {
            let id = store.add_courier(&format!("Courier {n}"), Some(*depot), *max);
            limits.insert(id, *max);
        }
        let ids: Vec<OrderId> = orders
            .iter()
            .map(|&point| store.add_pending_order(DISTRIBUTOR, point, 1))
            .collect();

        let outcome = AssignmentEngine::new()
            .run_batch(&mut store, DISTRIBUTOR)
            .expect("batch");

        let stats = &outcome.statistics;
        prop_assert_eq!(stats.total_orders as usize, ids.len());
        prop_assert_eq!(stats.assigned_orders + stats.failed_assignments, stats.total_orders);
        prop_assert_eq!(outcome.assignments.len() + outcome.failed_assignments.len(), ids.len());

        let mut loads: HashMap<_, u32> = HashMap::new();
        for assignment in &outcome.assignments {
            *loads.entry(assignment.courier_id).or_default() += 1;
        }
        for (courier, load) in loads {
            prop_assert!(load <= limits[&courier], "courier {courier} took {load}");
        }
        for assignment in &outcome.assignments {
            prop_assert_eq!(store.order_status(assignment.order_id), Some(OrderStatus::Accepted));
        }
    }
}
