//! Proximity-with-workload-balance courier selection.

use geo::Coord;

use crate::{AvailableCourier, CandidateSummary, geo_math::distance_between};

/// The courier picked for one order.
#[derive(Debug, Clone, PartialEq)]
pub struct CourierChoice<'a> {
    /// Index of the chosen courier in the directory slice.
    pub index: usize,
    /// The chosen courier.
    pub courier: &'a AvailableCourier,
    /// Depot-to-drop distance of the chosen courier.
    pub distance_km: f64,
    /// Live workload of the chosen courier before this order.
    pub load: u32,
    /// Next closest candidates, excluding the chosen courier.
    pub alternatives: Vec<CandidateSummary>,
}

struct Candidate<'a> {
    index: usize,
    courier: &'a AvailableCourier,
    distance_km: f64,
    load: u32,
}

/// Pick a courier for a drop-off at `delivery`.
///
/// `loads[i]` is the live workload of `couriers[i]`. Couriers already at
/// capacity are skipped. The rest are ranked by distance, keeping directory
/// order on ties. Only candidates whose load is within `workload_threshold`
/// of the lightest candidate stay eligible, and the closest of those wins.
/// Returns `None` when every courier is full.
///
/// Alternatives are the closest remaining candidates with the chosen courier
/// left out. When a nearer courier loses on workload it is still listed, so
/// the audit trail never records the winner as its own alternative. This
/// differs from taking the second to fourth entries of the distance ranking.
#[must_use]
pub fn select_courier<'a>(
    couriers: &'a [AvailableCourier],
    loads: &[u32],
    delivery: Coord<f64>,
    workload_threshold: u32,
    max_alternatives: usize,
) -> Option<CourierChoice<'a>> {
    let mut candidates: Vec<Candidate<'a>> = couriers
        .iter()
        .zip(loads)
        .enumerate()
        .filter(|(_, (courier, load))| courier.has_capacity_for(**load))
        .map(|(index, (courier, &load))| Candidate {
            index,
            courier,
            distance_km: distance_between(courier.depot, delivery),
            load,
        })
        .collect();
    // `sort_by` is stable, so equal distances keep directory order.
    candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    let min_load = candidates.iter().map(|c| c.load).min()?;
    let ceiling = min_load.saturating_add(workload_threshold);
    let chosen = candidates.iter().find(|c| c.load <= ceiling)?;

    let alternatives = candidates
        .iter()
        .filter(|c| c.index != chosen.index)
        .take(max_alternatives)
        .map(|c| CandidateSummary {
            courier_id: c.courier.id,
            name: c.courier.name.clone(),
            distance_km: c.distance_km,
            current_assignments: c.load,
        })
        .collect();

    Some(CourierChoice {
        index: chosen.index,
        courier: chosen.courier,
        distance_km: chosen.distance_km,
        load: chosen.load,
        alternatives,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CourierId;
    use rstest::rstest;

    fn courier(id: i64, lat: f64, max: u32) -> AvailableCourier {
        AvailableCourier {
            id: CourierId(id),
            name: format!("Courier {id}"),
            depot: Coord { x: 31.0, y: lat },
            max_daily_orders: max,
            current_assignments: 0,
        }
    }

    const DROP: Coord<f64> = Coord { x: 31.0, y: 30.0 };

    #[rstest]
    fn closest_wins_inside_the_window() {
        let couriers = [courier(1, 30.2, 10), courier(2, 30.1, 10)];
        let choice = select_courier(&couriers, &[1, 2], DROP, 2, 3).expect("choice");
        assert_eq!(choice.index, 1);
        assert_eq!(choice.alternatives.len(), 1);
        assert_eq!(choice.alternatives[0].courier_id, CourierId(1));
    }

    #[rstest]
    fn overloaded_closer_courier_is_skipped() {
        // Courier 2 is closer but carries 3 more orders than courier 1.
        let couriers = [courier(1, 30.2, 10), courier(2, 30.1, 10)];
        let choice = select_courier(&couriers, &[0, 3], DROP, 2, 3).expect("choice");
        assert_eq!(choice.index, 0);
        // The closer courier still shows up as the first alternative.
        assert_eq!(choice.alternatives[0].courier_id, CourierId(2));
    }

    #[rstest]
    fn full_couriers_are_not_candidates() {
        let couriers = [courier(1, 30.1, 2), courier(2, 30.5, 5)];
        let choice = select_courier(&couriers, &[2, 0], DROP, 2, 3).expect("choice");
        assert_eq!(choice.index, 1);
        assert!(choice.alternatives.is_empty());
    }

    #[rstest]
    fn everyone_full_yields_none() {
        let couriers = [courier(1, 30.1, 1)];
        assert!(select_courier(&couriers, &[1], DROP, 2, 3).is_none());
    }

    #[rstest]
    fn equal_distances_keep_directory_order() {
        let couriers = [courier(5, 30.1, 10), courier(4, 30.1, 10)];
        let choice = select_courier(&couriers, &[0, 0], DROP, 2, 3).expect("choice");
        assert_eq!(choice.index, 0);
    }

    #[rstest]
    fn winner_beyond_the_closest_lists_the_closer_courier() {
        // Courier 1 sits on the drop but is three orders ahead of the others.
        let couriers = [courier(1, 30.0, 10), courier(2, 30.1, 10), courier(3, 30.2, 10)];
        let choice = select_courier(&couriers, &[3, 0, 0], DROP, 2, 3).expect("choice");
        assert_eq!(choice.courier.id, CourierId(2));
        let ids: Vec<_> = choice.alternatives.iter().map(|a| a.courier_id.get()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[rstest]
    fn alternatives_are_capped() {
        let couriers: Vec<_> = (1..=6_i32)
            .map(|i| courier(i64::from(i), 30.0 + f64::from(i) / 10.0, 10))
            .collect();
        let loads = vec![0; couriers.len()];
        let choice = select_courier(&couriers, &loads, DROP, 2, 3).expect("choice");
        assert_eq!(choice.index, 0);
        let ids: Vec<_> = choice.alternatives.iter().map(|a| a.courier_id.get()).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }
}
