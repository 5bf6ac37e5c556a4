//! Assignment records and the batch audit trail.
//!
//! An [`Assignment`] links one order to one courier. Each run of the
//! assignment engine writes one [`AssignmentBatch`] summary plus a
//! [`BatchDetail`] per successful assignment, recording the candidates that
//! were passed over so dispatch decisions can be explained later.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AssignmentId, BatchId, CourierId, DistributorId, OrderId, ParseStatusError};

/// Name recorded on every batch produced by the assignment engine.
pub const PROXIMITY_BALANCED: &str = "proximity_balanced";

/// Minutes of travel budgeted per kilometre in delivery estimates.
pub const ETA_MINUTES_PER_KM: f64 = 3.0;

/// Fixed handling minutes added to every delivery estimate.
pub const ETA_HANDLING_MINUTES: f64 = 15.0;

/// Estimated delivery time in whole minutes for a depot-to-drop distance.
///
/// Computed as `ceil(distance_km * 3 + 15)`.
///
/// # Examples
/// ```
/// use dispatch_core::estimated_delivery_minutes;
///
/// assert_eq!(estimated_delivery_minutes(10.0), 45);
/// assert_eq!(estimated_delivery_minutes(0.1), 16);
/// ```
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "float-to-int `as` saturates and maps NaN to zero"
)]
pub fn estimated_delivery_minutes(distance_km: f64) -> u32 {
    let minutes = (distance_km * ETA_MINUTES_PER_KM + ETA_HANDLING_MINUTES).ceil();
    minutes as u32
}

/// Lifecycle state of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Created by the engine; the courier has not acted yet.
    Assigned,
    /// Acknowledged by the courier.
    Accepted,
    /// Parcel collected.
    PickedUp,
    /// En route to the buyer.
    InTransit,
    /// Completed.
    Delivered,
    /// Abandoned.
    Failed,
}

impl AssignmentStatus {
    /// Statuses that still count against a courier's daily capacity.
    pub const OPEN: [Self; 4] = [Self::Assigned, Self::Accepted, Self::PickedUp, Self::InTransit];

    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Accepted => "accepted",
            Self::PickedUp => "picked_up",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }

    /// Whether the assignment no longer occupies the courier.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(Self::Assigned),
            "accepted" => Ok(Self::Accepted),
            "picked_up" => Ok(Self::PickedUp),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            other => Err(ParseStatusError {
                kind: "assignment",
                value: other.to_owned(),
            }),
        }
    }
}

/// A persisted order-to-courier link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assignment key.
    pub id: AssignmentId,
    /// Assigned order.
    pub order_id: OrderId,
    /// Courier carrying the order.
    pub courier_id: CourierId,
    /// Distributor that triggered the assignment.
    pub assigned_by: DistributorId,
    /// Depot-to-drop distance at assignment time.
    pub distance_km: f64,
    /// Estimate from [`estimated_delivery_minutes`].
    pub estimated_delivery_minutes: u32,
    /// Current lifecycle state.
    pub status: AssignmentStatus,
    /// Creation time.
    pub assigned_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

/// Values for an assignment about to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssignment {
    /// Order being assigned.
    pub order_id: OrderId,
    /// Chosen courier.
    pub courier_id: CourierId,
    /// Distributor running the batch.
    pub assigned_by: DistributorId,
    /// Depot-to-drop distance.
    pub distance_km: f64,
    /// Estimate from [`estimated_delivery_minutes`].
    pub estimated_delivery_minutes: u32,
}

/// A courier that was considered for an order but not chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    /// Candidate courier.
    pub courier_id: CourierId,
    /// Candidate display name.
    pub name: String,
    /// Depot-to-drop distance for the candidate.
    pub distance_km: f64,
    /// Candidate's live workload when the decision was made.
    pub current_assignments: u32,
}

/// Explainability row written for every successful assignment in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDetail {
    /// Owning batch.
    pub batch_id: BatchId,
    /// Assignment produced for the order.
    pub assignment_id: AssignmentId,
    /// 1-based position of the order in the intake sequence.
    pub rank: u32,
    /// Up to three runner-up couriers.
    pub alternatives: Vec<CandidateSummary>,
}

/// Aggregate counters for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    /// Orders considered.
    pub total_orders: u32,
    /// Orders that received an assignment.
    pub assigned_orders: u32,
    /// Orders recorded as failed.
    pub failed_assignments: u32,
    /// Distinct couriers that received at least one order.
    pub couriers_used: u32,
    /// Mean depot-to-drop distance over successful assignments.
    pub avg_distance_km: f64,
    /// Shortest depot-to-drop distance over successful assignments.
    pub min_distance_km: f64,
    /// Longest depot-to-drop distance over successful assignments.
    pub max_distance_km: f64,
    /// Wall-clock run time.
    pub execution_time_ms: u64,
}

impl BatchStatistics {
    /// Statistics for a run that assigned nothing.
    #[must_use]
    pub const fn unassigned(total_orders: u32, execution_time_ms: u64) -> Self {
        Self {
            total_orders,
            assigned_orders: 0,
            failed_assignments: total_orders,
            couriers_used: 0,
            avg_distance_km: 0.0,
            min_distance_km: 0.0,
            max_distance_km: 0.0,
            execution_time_ms,
        }
    }
}

/// A persisted batch summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentBatch {
    /// Batch key.
    pub id: BatchId,
    /// Distributor that ran the batch.
    pub distributor_id: DistributorId,
    /// Algorithm label, currently always [`PROXIMITY_BALANCED`].
    pub algorithm: String,
    /// Final counters.
    pub statistics: BatchStatistics,
    /// Start time of the run.
    pub created_at: DateTime<Utc>,
}

/// One successful assignment reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedOrder {
    /// Persisted assignment.
    pub assignment_id: AssignmentId,
    /// Assigned order.
    pub order_id: OrderId,
    /// Chosen courier.
    pub courier_id: CourierId,
    /// Chosen courier's display name.
    pub courier_name: String,
    /// Depot-to-drop distance.
    pub distance_km: f64,
    /// Delivery estimate in minutes.
    pub estimated_delivery_minutes: u32,
    /// Human-readable explanation of the choice.
    pub reasoning: String,
}

/// An order the batch could not place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAssignment {
    /// Order left pending.
    pub order_id: OrderId,
    /// Why it was not assigned.
    pub reason: String,
}

/// Result of [`AssignmentEngine::run_batch`](crate::AssignmentEngine::run_batch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// False only when orders were waiting but no courier was available.
    pub success: bool,
    /// Operator-facing summary.
    pub message: String,
    /// Persisted batch, absent when nothing was written.
    pub batch_id: Option<BatchId>,
    /// Orders placed in this run.
    pub assignments: Vec<AssignedOrder>,
    /// Orders that could not be placed.
    pub failed_assignments: Vec<FailedAssignment>,
    /// Aggregate counters.
    pub statistics: BatchStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10.0, 45)]
    #[case(0.0, 15)]
    #[case(1.01, 19)]
    #[case(2.5, 23)]
    fn eta_rounds_up(#[case] km: f64, #[case] minutes: u32) {
        assert_eq!(estimated_delivery_minutes(km), minutes);
    }

    #[rstest]
    fn open_statuses_are_not_terminal() {
        assert!(AssignmentStatus::OPEN.iter().all(|s| !s.is_terminal()));
        assert!(AssignmentStatus::Delivered.is_terminal());
    }

    #[rstest]
    fn assignment_status_parses_back() {
        for status in AssignmentStatus::OPEN {
            assert_eq!(status.as_str().parse::<AssignmentStatus>(), Ok(status));
        }
        assert!("cancelled".parse::<AssignmentStatus>().is_err());
    }

    #[rstest]
    fn unassigned_statistics_balance() {
        let stats = BatchStatistics::unassigned(4, 3);
        assert_eq!(stats.assigned_orders + stats.failed_assignments, 4);
    }
}
