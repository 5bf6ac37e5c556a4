//! Customer orders awaiting dispatch.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BuyerId, DistributorId, OrderId};

/// Lifecycle state of an order.
///
/// `Delivered` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Ready for dispatch and not yet assigned.
    Pending,
    /// Matched to a courier by an assignment batch.
    Accepted,
    /// Assigned manually by an operator.
    Assigned,
    /// Collected by the courier.
    PickedUp,
    /// On the way to the buyer.
    InTransit,
    /// Handed over to the buyer.
    Delivered,
    /// Delivery abandoned.
    Failed,
}

impl OrderStatus {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Assigned => "assigned",
            Self::PickedUp => "picked_up",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }

    /// Whether the order has left the dispatch lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }

    /// Whether a courier can still put the order on a route.
    #[must_use]
    pub const fn is_routeable(self) -> bool {
        matches!(self, Self::Accepted | Self::Assigned)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} status {value:?}")]
pub struct ParseStatusError {
    /// Which status family was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "assigned" => Ok(Self::Assigned),
            "picked_up" => Ok(Self::PickedUp),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            other => Err(ParseStatusError {
                kind: "order",
                value: other.to_owned(),
            }),
        }
    }
}

/// An order as seen by the dispatch engine.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order key.
    pub id: OrderId,
    /// Distributor fulfilling the order.
    pub distributor_id: DistributorId,
    /// Buyer who placed the order.
    pub buyer_id: BuyerId,
    /// Drop-off location.
    pub delivery: Coord<f64>,
    /// Human-readable drop-off address.
    pub delivery_address: String,
    /// Urgency; higher values are dispatched first.
    pub priority_level: i32,
    /// Current lifecycle state.
    pub status: OrderStatus,
    /// Checkout time.
    pub created_at: DateTime<Utc>,
}
