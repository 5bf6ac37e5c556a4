//! Couriers and their workload snapshot.

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::CourierId;

/// A delivery person and the settings that govern dispatch to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Courier {
    /// Courier key.
    pub id: CourierId,
    /// Account record owned by the external user directory.
    pub account_id: i64,
    /// Display name; used as a tie-break when ordering candidates.
    pub name: String,
    /// Base location (`x = longitude`, `y = latitude`), if configured.
    pub depot: Option<Coord<f64>>,
    /// Human-readable depot address, if configured.
    pub depot_address: Option<String>,
    /// Daily capacity.
    pub max_daily_orders: u32,
    /// Whether the courier is employed and dispatchable.
    pub is_active: bool,
    /// Whether the courier's app currently reports them as online.
    pub is_online: bool,
    /// Rolling counters maintained outside the engine.
    pub stats: CourierStats,
}

/// Rolling performance counters for a courier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourierStats {
    /// Deliveries completed over the courier's lifetime.
    pub total_deliveries: u32,
    /// Mean buyer rating, if any ratings exist.
    pub rating: Option<f64>,
}

/// A dispatchable courier annotated with today's open workload.
///
/// Only couriers with a depot, marked active and online, and with spare
/// capacity are represented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableCourier {
    /// Courier key.
    pub id: CourierId,
    /// Display name.
    pub name: String,
    /// Base location.
    pub depot: Coord<f64>,
    /// Daily capacity.
    pub max_daily_orders: u32,
    /// Open assignments created today.
    pub current_assignments: u32,
}

impl AvailableCourier {
    /// Whether a live workload counter leaves room for another order.
    #[must_use]
    pub const fn has_capacity_for(&self, load: u32) -> bool {
        load < self.max_daily_orders
    }
}
