//! Dashboard aggregates over batches and sessions.

use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    BatchAnalyticsRow, DispatchReporting, DistributorId, OptimizationSession, SessionFilter,
    SessionStatus, SessionStore, StoreError,
};

/// Default look-back window for assignment analytics.
pub const DEFAULT_ASSIGNMENT_WINDOW_DAYS: u32 = 7;

/// Default look-back window for optimization analytics.
pub const DEFAULT_OPTIMIZATION_WINDOW_DAYS: u32 = 30;

/// Sessions listed in [`OptimizationAnalytics::recent_sessions`].
pub const RECENT_SESSION_LIMIT: usize = 5;

/// Start of the UTC day `days` before `now`.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use dispatch_core::window_start;
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
/// assert_eq!(window_start(now, 7), Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap());
/// ```
#[must_use]
pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    let today = now.date_naive();
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(today)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Batch performance over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSummary {
    /// Batches in the window.
    pub total_batches: u32,
    /// Orders considered across those batches.
    pub total_orders: u32,
    /// Orders assigned across those batches.
    pub total_assigned: u32,
    /// `total_assigned / total_orders`, `0` when no orders.
    pub assignment_rate: f64,
    /// Mean per-batch share of linked assignments already delivered.
    pub avg_success_rate: f64,
    /// Mean of per-batch average distances.
    pub avg_distance_km: f64,
}

/// Per-batch rows plus their summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentAnalytics {
    /// Aggregate figures.
    pub summary: AssignmentSummary,
    /// Batches in the window, newest first.
    pub batches: Vec<BatchAnalyticsRow>,
}

impl AssignmentAnalytics {
    /// Summarise `batches`.
    #[must_use]
    pub fn from_rows(batches: Vec<BatchAnalyticsRow>) -> Self {
        let total_orders: u32 = batches.iter().map(|b| b.batch.statistics.total_orders).sum();
        let total_assigned: u32 = batches
            .iter()
            .map(|b| b.batch.statistics.assigned_orders)
            .sum();
        let summary = AssignmentSummary {
            total_batches: u32::try_from(batches.len()).unwrap_or(u32::MAX),
            total_orders,
            total_assigned,
            assignment_rate: ratio(f64::from(total_assigned), f64::from(total_orders)),
            avg_success_rate: mean(batches.iter().map(success_rate)),
            avg_distance_km: mean(batches.iter().map(|b| b.batch.statistics.avg_distance_km)),
        };
        Self { summary, batches }
    }
}

fn success_rate(row: &BatchAnalyticsRow) -> f64 {
    ratio(
        f64::from(row.delivered_assignments),
        f64::from(row.linked_assignments),
    )
}

/// Assignment analytics for the last `days` days.
///
/// # Errors
///
/// Propagates store failures.
pub fn assignment_analytics<S: DispatchReporting + ?Sized>(
    store: &S,
    distributor_id: DistributorId,
    days: u32,
) -> Result<AssignmentAnalytics, StoreError> {
    let since = window_start(Utc::now(), days);
    Ok(AssignmentAnalytics::from_rows(
        store.batches_since(distributor_id, since)?,
    ))
}

/// Route optimization performance over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationAnalytics {
    /// Sessions in the window.
    pub total_sessions: u32,
    /// Sessions that completed.
    pub completed_sessions: u32,
    /// Sessions that failed.
    pub failed_sessions: u32,
    /// Mean distance over sessions with saved totals.
    pub avg_distance_km: f64,
    /// Mean duration over sessions with saved totals.
    pub avg_duration_minutes: f64,
    /// Mean fuel cost over sessions with saved totals.
    pub avg_fuel_cost: f64,
    /// Mean score over sessions with saved totals.
    pub avg_score: f64,
    /// Newest sessions in the window.
    pub recent_sessions: Vec<OptimizationSession>,
}

impl OptimizationAnalytics {
    /// Summarise `sessions`, which must be ordered newest first.
    #[must_use]
    pub fn from_sessions(sessions: &[OptimizationSession]) -> Self {
        let with_status = |status: SessionStatus| {
            let n = sessions.iter().filter(|s| s.status == status).count();
            u32::try_from(n).unwrap_or(u32::MAX)
        };
        Self {
            total_sessions: u32::try_from(sessions.len()).unwrap_or(u32::MAX),
            completed_sessions: with_status(SessionStatus::Completed),
            failed_sessions: with_status(SessionStatus::Failed),
            avg_distance_km: mean(sessions.iter().filter_map(|s| s.total_distance_km)),
            avg_duration_minutes: mean(
                sessions
                    .iter()
                    .filter_map(|s| s.total_duration_minutes.map(f64::from)),
            ),
            avg_fuel_cost: mean(sessions.iter().filter_map(|s| s.fuel_cost)),
            avg_score: mean(sessions.iter().filter_map(|s| s.optimization_score)),
            recent_sessions: sessions.iter().take(RECENT_SESSION_LIMIT).cloned().collect(),
        }
    }
}

/// Optimization analytics for sessions matching `filter` over the last
/// `days` days.
///
/// # Errors
///
/// Propagates store failures.
pub fn optimization_analytics<S: SessionStore + ?Sized>(
    store: &S,
    filter: &SessionFilter,
    days: u32,
) -> Result<OptimizationAnalytics, StoreError> {
    let since = window_start(Utc::now(), days);
    let sessions = store.sessions_since(filter, since)?;
    Ok(OptimizationAnalytics::from_sessions(&sessions))
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0_u32), |(sum, n), v| (sum + v, n + 1));
    ratio(sum, f64::from(n))
}
