//! Turn-by-turn map deep links.

use url::Url;

use super::Waypoint;

const DIRECTIONS_ENDPOINT: &str = "https://www.google.com/maps/dir/";

/// Most intermediate waypoints a directions link may carry.
pub const MAX_INTERMEDIATE_WAYPOINTS: usize = 23;

/// Build a driving-directions link through `waypoints` in order.
///
/// The first waypoint is the origin and the last the destination. Waypoints
/// between them become intermediates, silently truncated to
/// [`MAX_INTERMEDIATE_WAYPOINTS`]. Fewer than two waypoints yields `None`.
#[must_use]
pub fn directions_url(waypoints: &[Waypoint]) -> Option<String> {
    let (origin, rest) = waypoints.split_first()?;
    let (destination, intermediates) = rest.split_last()?;

    let mut params = vec![
        ("api", "1".to_owned()),
        ("origin", lat_lng(origin)),
        ("destination", lat_lng(destination)),
    ];
    if !intermediates.is_empty() {
        let joined = intermediates
            .iter()
            .take(MAX_INTERMEDIATE_WAYPOINTS)
            .map(lat_lng)
            .collect::<Vec<_>>()
            .join("|");
        params.push(("waypoints", joined));
    }
    params.push(("travelmode", "driving".to_owned()));

    Url::parse_with_params(DIRECTIONS_ENDPOINT, &params)
        .ok()
        .map(String::from)
}

fn lat_lng(waypoint: &Waypoint) -> String {
    format!("{},{}", waypoint.latitude, waypoint.longitude)
}
