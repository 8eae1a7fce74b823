use chrono::{DateTime, NaiveDate, Utc};
use common::Dataset;
use model::{PolygonStore, Region, RulePatch, TimeRange, history_start};
use tracing::debug;

use super::{RowCache, RowChange, format_value};

const DAY_SECONDS: i64 = 24 * 3600;

/// Dual-handle slider over `[now - max_days, now]`, moving in whole days
/// counted from the lower bound.
#[derive(Debug, Clone, Copy)]
pub struct RangeSlider {
    now: DateTime<Utc>,
    max_days: u32,
}

impl RangeSlider {
    pub fn new(now: DateTime<Utc>, max_days: u32) -> Self {
        Self { now, max_days }
    }

    pub fn min(&self) -> i64 {
        history_start(self.now, self.max_days)
    }

    pub fn max(&self) -> i64 {
        self.now.timestamp()
    }

    fn round_to_step(&self, value: i64) -> i64 {
        let min = self.min();
        let steps = (value - min + DAY_SECONDS / 2).div_euclid(DAY_SECONDS);
        min + steps * DAY_SECONDS
    }

    /// Range for two handle positions in any order: clamped into bounds,
    /// ordered and snapped to the step grid.
    pub fn select(&self, a: i64, b: i64) -> TimeRange {
        let clamped = TimeRange::new(a, b).clamped(self.now, self.max_days);
        TimeRange::new(
            self.round_to_step(clamped.start()),
            self.round_to_step(clamped.end()),
        )
    }

    /// Range for two calendar days. Each day maps to its grid position.
    pub fn select_dates(&self, start: NaiveDate, end: NaiveDate) -> TimeRange {
        let at = |date: NaiveDate| date.and_time(self.now.time()).and_utc().timestamp();
        self.select(at(start), at(end))
    }
}

/// Inputs of the dashboard panel.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardControl {
    SelectRange { start: NaiveDate, end: NaiveDate },
    Rename { id: String, name: String },
    Delete { id: String },
    AddRule { id: String },
    UpdateRule { id: String, rule_id: String, patch: RulePatch },
    RemoveRule { id: String, rule_id: String },
}

/// Time range header plus one panel per region.
pub struct DashboardView {
    rows: RowCache,
    max_days: u32,
}

impl DashboardView {
    pub fn attach(store: &mut PolygonStore, max_days: u32) -> Self {
        Self {
            rows: RowCache::attach(store, panel),
            max_days,
        }
    }

    pub fn slider(&self, now: DateTime<Utc>) -> RangeSlider {
        RangeSlider::new(now, self.max_days)
    }

    /// Applies a panel input to the store. Returns the id of a newly added
    /// rule.
    pub fn apply(&self, store: &mut PolygonStore, control: DashboardControl, now: DateTime<Utc>) -> Option<String> {
        match control {
            DashboardControl::SelectRange { start, end } => {
                let range = self.slider(now).select_dates(start, end);
                debug!("Range {}..{} selected as {}..{}", start, end, range.start_date(), range.end_date());
                store.set_time_range(range);
                None
            }
            DashboardControl::Rename { id, name } => {
                store.rename_region(&id, &name);
                None
            }
            DashboardControl::Delete { id } => {
                store.remove_region(&id);
                None
            }
            DashboardControl::AddRule { id } => store.add_rule(&id),
            DashboardControl::UpdateRule { id, rule_id, patch } => {
                store.update_rule(&id, &rule_id, patch);
                None
            }
            DashboardControl::RemoveRule { id, rule_id } => {
                store.remove_rule(&id, &rule_id);
                None
            }
        }
    }

    pub fn take_dirty(&mut self, store: &PolygonStore) -> Vec<RowChange> {
        self.rows.take_dirty(store)
    }

    pub fn render(&mut self, store: &PolygonStore) -> String {
        self.rows.take_dirty(store);

        let mut out = header(store.dataset(), store.time_range());
        out.push('\n');
        for row in self.rows.rows() {
            out.push_str(row);
        }
        out
    }
}

/// `Temperature | Select Time Range: Jun 14 - Jun 15`
pub fn header(dataset: Dataset, range: TimeRange) -> String {
    format!(
        "{} | Select Time Range: {} - {}",
        dataset.label(),
        range.start_date().format("%b %-d"),
        range.end_date().format("%b %-d")
    )
}

/// Panel of one region: name, average, color and the rule list.
pub fn panel(region: &Region, dataset: Dataset) -> String {
    let average = if region.is_loading {
        "Loading...".to_string()
    } else {
        region
            .fetched_value
            .map(|v| format_value(v, dataset))
            .unwrap_or_else(|| "N/A".to_string())
    };

    let mut out = format!("{} ({}) [{}]\n", region.name, region.id, region.color);
    out.push_str(&format!("  Avg. {}: {}\n", dataset.label(), average));
    out.push_str("  Rules:\n");
    for rule in &region.rules {
        out.push_str(&format!(
            "    {}: {} {}{} -> {}\n",
            rule.id,
            rule.operator,
            rule.value,
            dataset.unit(),
            rule.color
        ));
    }
    out
}
