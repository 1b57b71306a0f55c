//! Canned OSRM responses for tests
//!
//! Leg `i` lasts `60 * (i + 1)` seconds and spans `1000 * (i + 1) + 500` meters,
//! and is made of two steps meeting at the midpoint of its endpoints.

use serde_json::{json, Value};

pub fn leg_duration(i: usize) -> f64 {
    60.0 * (i as f64 + 1.0)
}

pub fn leg_distance(i: usize) -> f64 {
    1000.0 * (i as f64 + 1.0) + 500.0
}

fn midpoint(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0]
}

/// Path through `points` in the given order
fn path(points: &[[f64; 2]]) -> Value {
    let legs: Vec<Value> = points
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let mid = midpoint(pair[0], pair[1]);
            json!({
                "duration": leg_duration(i),
                "distance": leg_distance(i),
                "summary": "",
                "weight": leg_duration(i),
                "steps": [
                    {"geometry": {"type": "LineString", "coordinates": [pair[0], mid]}, "mode": "driving"},
                    {"geometry": {"type": "LineString", "coordinates": [mid, pair[1]]}, "mode": "driving"}
                ]
            })
        })
        .collect();
    let n_legs = legs.len();
    json!({
        "duration": (0..n_legs).map(leg_duration).sum::<f64>(),
        "distance": (0..n_legs).map(leg_distance).sum::<f64>(),
        "weight_name": "routability",
        "geometry": {"type": "LineString", "coordinates": points},
        "legs": legs
    })
}

fn waypoint(point: [f64; 2]) -> Value {
    json!({
        "hint": "hint",
        "distance": 2.5,
        "name": "Road",
        "location": [point[0] + 0.0001, point[1] + 0.0001]
    })
}

/// `/route` response visiting `points` in input order
pub fn route_response(points: &[[f64; 2]]) -> Value {
    json!({
        "code": "Ok",
        "waypoints": points.iter().map(|p| waypoint(*p)).collect::<Vec<_>>(),
        "routes": [path(points)]
    })
}

/// `/trip` response; `order[k]` is the visit position of input point `k`
pub fn trip_response(points: &[[f64; 2]], order: &[usize]) -> Value {
    let mut visited: Vec<(usize, [f64; 2])> = order.iter().copied().zip(points.iter().copied()).collect();
    visited.sort_by_key(|(position, _)| *position);
    let visited: Vec<[f64; 2]> = visited.into_iter().map(|(_, point)| point).collect();

    let waypoints: Vec<Value> = points
        .iter()
        .zip(order)
        .map(|(point, position)| {
            let mut value = waypoint(*point);
            value["waypoint_index"] = json!(position);
            value["trips_index"] = json!(0);
            value
        })
        .collect();

    json!({
        "code": "Ok",
        "waypoints": waypoints,
        "trips": [path(&visited)]
    })
}
