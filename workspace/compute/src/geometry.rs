use common::LatLng;

/// Sampling point of a region: the unweighted mean of its vertices.
///
/// This is not the area centroid. It is fine for small convex regions and
/// drifts toward densely digitized edges on large or concave ones. Returns
/// `(0, 0)` for an empty vertex list.
pub fn centroid(vertices: &[LatLng]) -> LatLng {
    if vertices.is_empty() {
        return LatLng::new(0.0, 0.0);
    }
    let n = vertices.len() as f64;
    let (lat, lng) = vertices
        .iter()
        .fold((0.0, 0.0), |(lat, lng), v| (lat + v.lat, lng + v.lng));
    LatLng::new(lat / n, lng / n)
}
