use common::{Dataset, LatLng, Operator};
use compute::geometry::centroid;
use compute::rules::priority_order;
use model::{PolygonStore, Region};
use tracing::{debug, warn};

use super::{RowCache, RowChange, format_value};

/// Toolbar actions of the drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    /// A polygon was drawn; `layer_id` becomes the region id.
    Created { layer_id: String, vertices: Vec<LatLng> },
    /// One or more polygons were reshaped.
    Edited(Vec<(String, Vec<LatLng>)>),
    Deleted(Vec<String>),
}

/// Regions as tooltip lines plus a color legend.
pub struct MapView {
    rows: RowCache,
}

impl MapView {
    pub fn attach(store: &mut PolygonStore) -> Self {
        Self {
            rows: RowCache::attach(store, tooltip),
        }
    }

    /// Applies a toolbar action to the store.
    pub fn handle_draw(&self, store: &mut PolygonStore, event: DrawEvent) {
        match event {
            DrawEvent::Created { layer_id, vertices } => {
                debug!("Drawn region '{}' with {} vertices", layer_id, vertices.len());
                store.add_region(&layer_id, vertices);
                warn_if_degenerate(store, &layer_id);
            }
            DrawEvent::Edited(layers) => {
                for (id, vertices) in layers {
                    store.update_shape(&id, vertices);
                    warn_if_degenerate(store, &id);
                }
            }
            DrawEvent::Deleted(ids) => {
                for id in ids {
                    store.remove_region(&id);
                }
            }
        }
    }

    pub fn take_dirty(&mut self, store: &PolygonStore) -> Vec<RowChange> {
        self.rows.take_dirty(store)
    }

    /// Full map: one tooltip per region, then the legend.
    pub fn render(&mut self, store: &PolygonStore) -> String {
        self.rows.take_dirty(store);

        let mut out = String::from("Map\n");
        for row in self.rows.rows() {
            out.push_str("  ");
            out.push_str(row);
            out.push('\n');
        }
        out.push_str("Legend\n");
        for (label, color) in legend(store.dataset()) {
            out.push_str(&format!("  {} {}\n", color, label));
        }
        out
    }
}

/// Shapes are stored as given; a degenerate one still gets a centroid.
fn warn_if_degenerate(store: &PolygonStore, id: &str) {
    if let Some(region) = store.region(id) {
        if !region.is_valid_polygon() {
            warn!("Region '{}' has {} vertices and encloses no area", id, region.vertices.len());
        }
    }
}

/// `Region name [color] status @ lat,lng`, where the status is the loading
/// marker, the fetched value or `No data`.
pub fn tooltip(region: &Region, dataset: Dataset) -> String {
    let status = if region.is_loading {
        "Loading...".to_string()
    } else {
        match region.fetched_value {
            Some(value) => format_value(value, dataset),
            None => "No data".to_string(),
        }
    };
    let center = centroid(&region.vertices);
    format!(
        "{} [{}] {} @ {:.2},{:.2}",
        region.name, region.color, status, center.lat, center.lng
    )
}

/// Legend entries `(label, color)` for the dataset's default rules, lowest
/// band first.
///
/// A lower bound that is followed by a higher one reads as a band, e.g.
/// `10-25°C`.
pub fn legend(dataset: Dataset) -> Vec<(String, String)> {
    let rules = dataset.default_rules();
    let ordered = priority_order(&rules);
    let unit = dataset.unit();

    let mut entries: Vec<(String, String)> = Vec::new();
    // Upper-bound rules cover the bottom of the scale
    for rule in ordered.iter().filter(|r| !r.operator.is_lower_bound()) {
        entries.push((format!("{} {}{}", rule.operator, rule.value, unit), rule.color.clone()));
    }

    let mut lower: Vec<_> = ordered.iter().filter(|r| r.operator.is_lower_bound()).collect();
    // stable: `=` stays ahead of `>` at the same threshold
    lower.sort_by(|a, b| a.value.total_cmp(&b.value));
    for (i, rule) in lower.iter().enumerate() {
        let next = lower[i + 1..]
            .iter()
            .find(|r| r.value > rule.value && r.operator != Operator::Eq);
        let label = match (rule.operator, next) {
            (Operator::Eq, _) | (_, None) => format!("{} {}{}", rule.operator, rule.value, unit),
            (_, Some(next)) => format!("{}-{}{}", rule.value, next.value, unit),
        };
        entries.push((label, rule.color.clone()));
    }
    entries
}
