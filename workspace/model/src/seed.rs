use common::LatLng;

/// Regions a dashboard starts with when nothing has been drawn yet.
pub fn default_regions() -> Vec<(&'static str, Vec<LatLng>)> {
    vec![
        ("India", rectangle(8.0, 68.0, 37.0, 97.0)),
        ("USA", rectangle(40.0, -79.0, 45.0, -71.0)),
        ("Tokyo", rectangle(32.0, 135.0, 38.0, 142.0)),
        ("Russia", rectangle(51.0, 90.0, 82.0, 170.0)),
    ]
}

/// Axis-aligned rectangle, clockwise from the south-west corner.
pub fn rectangle(south: f64, west: f64, north: f64, east: f64) -> Vec<LatLng> {
    vec![
        LatLng::new(south, west),
        LatLng::new(north, west),
        LatLng::new(north, east),
        LatLng::new(south, east),
    ]
}
