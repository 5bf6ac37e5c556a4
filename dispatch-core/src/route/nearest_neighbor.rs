//! Greedy nearest-neighbour route construction.

use std::time::Instant;

use super::{
    Depot, RouteAlgorithm, RoutePlan, RouteStop, Waypoint, WaypointKind, fuel_cost,
    optimization_score, round2,
};
use crate::{DistanceMatrix, HaversineMatrix, Leg};

/// Sequence `stops` starting from `depot`.
///
/// `legs` must be the matrix over `[depot, stops...]` in that order. The
/// stop closest to the current position is always visited next; only a
/// strictly shorter leg displaces the current best, so ties keep the earlier
/// stop. A row without any comparable distance falls back to the first
/// unvisited stop, which keeps the loop total over malformed input.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use geo::Coord;
/// use dispatch_core::{
///     Depot, DistanceMatrixProvider, HaversineMatrix, OrderId, OrderStatus, RouteStop,
///     plan_nearest_neighbor,
/// };
///
/// let depot = Depot::default();
/// let stop = RouteStop {
///     order_id: OrderId(1),
///     location: Coord { x: 31.25, y: 30.05 },
///     address: "Downtown".into(),
///     status: OrderStatus::Accepted,
///     created_at: Utc::now(),
/// };
/// let legs = HaversineMatrix.matrix(&[depot.location, stop.location])?;
/// let plan = plan_nearest_neighbor(&depot, &[stop], &legs);
/// assert_eq!(plan.waypoints.len(), 2);
/// # Ok::<(), dispatch_core::DistanceMatrixError>(())
/// ```
#[must_use]
pub fn plan_nearest_neighbor(
    depot: &Depot,
    stops: &[RouteStop],
    legs: &DistanceMatrix,
) -> RoutePlan {
    let started = Instant::now();
    let mut waypoints = Vec::with_capacity(stops.len() + 1);
    waypoints.push(Waypoint {
        sequence: 0,
        latitude: depot.location.y,
        longitude: depot.location.x,
        address: Some(depot.address.clone()),
        kind: WaypointKind::Depot,
        order_id: None,
        distance_from_previous_km: 0.0,
        duration_from_previous_minutes: 0,
    });

    let leg_between = |from: usize, to: usize| -> Leg {
        legs.get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or_else(|| {
                HaversineMatrix::leg(point(depot, stops, from), point(depot, stops, to))
            })
    };

    // Matrix indices: 0 is the depot, stop `i` sits at `i + 1`.
    let mut unvisited: Vec<(usize, &RouteStop)> =
        stops.iter().enumerate().map(|(i, stop)| (i + 1, stop)).collect();
    let mut current = 0;
    let mut total_distance = 0.0;
    let mut total_duration: u32 = 0;

    while let Some(&(first, _)) = unvisited.first() {
        let mut best: Option<(usize, Leg)> = None;
        let mut nearest = f64::INFINITY;
        for (position, &(candidate, _)) in unvisited.iter().enumerate() {
            let leg = leg_between(current, candidate);
            if leg.distance_km < nearest {
                nearest = leg.distance_km;
                best = Some((position, leg));
            }
        }
        let (position, leg) = best.unwrap_or_else(|| (0, leg_between(current, first)));
        let (next, stop) = unvisited.remove(position);

        let sequence = u32::try_from(waypoints.len()).unwrap_or(u32::MAX);
        waypoints.push(Waypoint {
            sequence,
            latitude: stop.location.y,
            longitude: stop.location.x,
            address: Some(stop.address.clone()),
            kind: WaypointKind::Delivery,
            order_id: Some(stop.order_id),
            distance_from_previous_km: leg.distance_km,
            duration_from_previous_minutes: leg.duration_minutes,
        });
        total_distance += leg.distance_km;
        total_duration = total_duration.saturating_add(leg.duration_minutes);
        current = next;
    }

    RoutePlan {
        algorithm: RouteAlgorithm::NearestNeighbor,
        waypoints,
        total_distance_km: round2(total_distance),
        total_duration_minutes: total_duration,
        fuel_cost: fuel_cost(total_distance),
        optimization_score: optimization_score(stops.len(), total_distance, total_duration),
        execution_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}

fn point(depot: &Depot, stops: &[RouteStop], index: usize) -> geo::Coord<f64> {
    index
        .checked_sub(1)
        .and_then(|i| stops.get(i))
        .map_or(depot.location, |stop| stop.location)
}
