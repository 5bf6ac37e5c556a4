//! Courier route sequencing.
//!
//! A route starts at the courier's depot and visits every open stop once.
//! [`RouteOptimizer`] loads the stops for an optimization session, orders
//! them with the nearest-neighbour heuristic, derives distance, duration,
//! fuel and score totals, and persists the result through a
//! [`SessionStore`](crate::SessionStore).

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{OrderId, OrderStatus, SessionId};

mod map_link;
mod metrics;
mod nearest_neighbor;
mod optimizer;

pub use map_link::{MAX_INTERMEDIATE_WAYPOINTS, directions_url};
pub use metrics::{
    FUEL_LITRES_PER_KM, FUEL_PRICE_PER_LITRE, fuel_cost, optimization_score, round2,
};
pub use nearest_neighbor::plan_nearest_neighbor;
pub use optimizer::{OptimizeError, OptimizeRequest, RouteOptimizer};

/// Latitude of the fallback depot used when a courier has none configured.
pub const DEFAULT_DEPOT_LATITUDE: f64 = 30.0444;
/// Longitude of the fallback depot used when a courier has none configured.
pub const DEFAULT_DEPOT_LONGITUDE: f64 = 31.2357;
/// Address of the fallback depot.
pub const DEFAULT_DEPOT_ADDRESS: &str = "Cairo, Egypt";

/// Route construction strategies.
///
/// Parsing an unrecognised name fails with [`UnknownAlgorithm`] rather than
/// falling back to [`RouteAlgorithm::NearestNeighbor`], so a typo in a
/// session request is reported instead of silently running the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAlgorithm {
    /// Greedy construction that always moves to the closest unvisited stop.
    #[default]
    NearestNeighbor,
}

impl RouteAlgorithm {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NearestNeighbor => "nearest_neighbor",
        }
    }
}

impl fmt::Display for RouteAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised for an unrecognised algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown route algorithm {0:?}")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for RouteAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nearest_neighbor" => Ok(Self::NearestNeighbor),
            other => Err(UnknownAlgorithm(other.to_owned())),
        }
    }
}

/// Role of a waypoint in a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    /// The courier's starting point.
    Depot,
    /// A drop-off for one order.
    Delivery,
}

impl WaypointKind {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Depot => "depot",
            Self::Delivery => "delivery",
        }
    }
}

impl FromStr for WaypointKind {
    type Err = UnknownWaypointKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "depot" => Ok(Self::Depot),
            "delivery" => Ok(Self::Delivery),
            other => Err(UnknownWaypointKind(other.to_owned())),
        }
    }
}

/// Error raised for an unrecognised waypoint kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown waypoint kind {0:?}")]
pub struct UnknownWaypointKind(pub String);

/// A courier's starting point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depot {
    /// Coordinates (`x = longitude`, `y = latitude`).
    pub location: Coord<f64>,
    /// Human-readable address.
    pub address: String,
}

impl Default for Depot {
    fn default() -> Self {
        Self {
            location: Coord {
                x: DEFAULT_DEPOT_LONGITUDE,
                y: DEFAULT_DEPOT_LATITUDE,
            },
            address: DEFAULT_DEPOT_ADDRESS.to_owned(),
        }
    }
}

/// Courier record as needed for routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourierBase {
    /// Whether the courier may be routed.
    pub is_active: bool,
    /// Configured depot, if any.
    pub depot: Option<Depot>,
}

/// An open order the courier still has to drop off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    /// Order being delivered.
    pub order_id: OrderId,
    /// Drop-off coordinates.
    pub location: Coord<f64>,
    /// Drop-off address.
    pub address: String,
    /// Current order status; either accepted or assigned.
    pub status: OrderStatus,
    /// Checkout time, used to order stops before sequencing.
    pub created_at: DateTime<Utc>,
}

/// One position in an optimized route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position in the route; `0` is always the depot.
    pub sequence: u32,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Address, when known.
    pub address: Option<String>,
    /// Depot or delivery.
    pub kind: WaypointKind,
    /// Delivered order; `None` for the depot.
    pub order_id: Option<OrderId>,
    /// Leg distance from the previous waypoint.
    pub distance_from_previous_km: f64,
    /// Leg duration from the previous waypoint.
    pub duration_from_previous_minutes: u32,
}

impl Waypoint {
    /// Coordinates as a `geo` coordinate.
    #[must_use]
    pub const fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

/// A sequenced route with its totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    /// Strategy that produced the sequence.
    pub algorithm: RouteAlgorithm,
    /// Depot followed by every stop exactly once.
    pub waypoints: Vec<Waypoint>,
    /// Total distance rounded to two decimals.
    pub total_distance_km: f64,
    /// Sum of per-leg durations.
    pub total_duration_minutes: u32,
    /// Estimated fuel spend.
    pub fuel_cost: f64,
    /// Efficiency score in `[0, 100]`.
    pub optimization_score: f64,
    /// Time spent sequencing.
    pub execution_time_ms: u64,
}

impl RoutePlan {
    /// Number of delivery stops in the route.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.waypoints
            .iter()
            .filter(|w| w.kind == WaypointKind::Delivery)
            .count()
    }
}

/// Outcome of [`RouteOptimizer::optimize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Session the plan was saved under.
    pub session_id: SessionId,
    /// The computed route.
    pub plan: RoutePlan,
    /// Map deep link for turn-by-turn navigation.
    pub map_url: Option<String>,
}
