//! Route totals: fuel, score and display rounding.

/// Litres of fuel burned per kilometre.
pub const FUEL_LITRES_PER_KM: f64 = 0.08;

/// Price of one litre of fuel in local currency.
pub const FUEL_PRICE_PER_LITRE: f64 = 25.0;

const BASE_SCORE: f64 = 100.0;
const DISTANCE_PENALTY_PER_KM: f64 = 0.5;
const MAX_DISTANCE_PENALTY: f64 = 30.0;
const TIME_PENALTY_PER_MINUTE: f64 = 0.1;
const MAX_TIME_PENALTY: f64 = 20.0;
const BONUS_PER_STOP: f64 = 2.0;
const MAX_STOP_BONUS: f64 = 10.0;

/// Round to two decimal places.
///
/// # Examples
/// ```
/// use dispatch_core::round2;
///
/// assert_eq!(round2(12.345_6), 12.35);
/// ```
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fuel spend for `distance_km`, rounded to two decimals.
///
/// # Examples
/// ```
/// use dispatch_core::fuel_cost;
///
/// assert_eq!(fuel_cost(100.0), 200.0);
/// ```
#[must_use]
pub fn fuel_cost(distance_km: f64) -> f64 {
    round2(distance_km * FUEL_LITRES_PER_KM * FUEL_PRICE_PER_LITRE)
}

/// Efficiency score in `[0, 100]`.
///
/// Long and slow routes are penalised, with each penalty capped; routes
/// serving more stops earn a small capped bonus.
#[must_use]
pub fn optimization_score(stop_count: usize, distance_km: f64, duration_minutes: u32) -> f64 {
    let distance_penalty = (distance_km * DISTANCE_PENALTY_PER_KM).min(MAX_DISTANCE_PENALTY);
    let time_penalty =
        (f64::from(duration_minutes) * TIME_PENALTY_PER_MINUTE).min(MAX_TIME_PENALTY);
    let stops = u32::try_from(stop_count).unwrap_or(u32::MAX);
    let bonus = (f64::from(stops) * BONUS_PER_STOP).min(MAX_STOP_BONUS);
    (BASE_SCORE - distance_penalty - time_penalty + bonus).clamp(0.0, 100.0)
}
