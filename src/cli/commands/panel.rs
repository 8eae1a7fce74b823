use anyhow::{Result, bail};
use chrono::{NaiveDate, Utc};
use common::Operator;
use model::RulePatch;
use tracing::{debug, info};

use crate::app::App;
use crate::views::DashboardControl;

fn ensure_region(app: &App, id: &str) -> Result<()> {
    if app.store.region(id).is_none() {
        bail!("Unknown region '{}'", id);
    }
    Ok(())
}

/// Accepts `ef4444` as well as `#ef4444`, since a bare `#` starts a shell comment.
fn normalize_color(color: String) -> String {
    if color.starts_with('#') {
        color
    } else {
        format!("#{}", color)
    }
}

pub fn rename(app: &mut App, id: String, name: String) -> Result<()> {
    ensure_region(app, &id)?;
    app.dashboard
        .apply(&mut app.store, DashboardControl::Rename { id, name }, Utc::now());
    Ok(())
}

pub fn add_rule(app: &mut App, region: String) -> Result<()> {
    ensure_region(app, &region)?;
    if let Some(rule_id) = app
        .dashboard
        .apply(&mut app.store, DashboardControl::AddRule { id: region.clone() }, Utc::now())
    {
        info!("Added rule '{}' to region '{}'", rule_id, region);
        println!("Added rule {}", rule_id);
    }
    Ok(())
}

pub fn update_rule(
    app: &mut App,
    region: String,
    rule: String,
    operator: Option<Operator>,
    value: Option<f64>,
    color: Option<String>,
) -> Result<()> {
    ensure_region(app, &region)?;
    if app.store.region(&region).and_then(|r| r.rule(&rule)).is_none() {
        bail!("Region '{}' has no rule '{}'", region, rule);
    }

    let patch = RulePatch {
        operator,
        value,
        color: color.map(normalize_color),
    };
    if patch.is_empty() {
        bail!("Nothing to update: pass --op, --value or --color");
    }
    debug!("Updating rule '{}' of '{}': {:?}", rule, region, patch);
    app.dashboard.apply(
        &mut app.store,
        DashboardControl::UpdateRule {
            id: region,
            rule_id: rule,
            patch,
        },
        Utc::now(),
    );
    Ok(())
}

pub fn remove_rule(app: &mut App, region: String, rule: String) -> Result<()> {
    ensure_region(app, &region)?;
    app.dashboard.apply(
        &mut app.store,
        DashboardControl::RemoveRule {
            id: region,
            rule_id: rule,
        },
        Utc::now(),
    );
    Ok(())
}

pub fn select_range(app: &mut App, start: NaiveDate, end: NaiveDate) -> Result<()> {
    app.dashboard
        .apply(&mut app.store, DashboardControl::SelectRange { start, end }, Utc::now());
    let range = app.store.time_range();
    debug!("Selected {} day(s)", range.days());
    if range.start_date() != start.min(end) || range.end_date() != start.max(end) {
        info!(
            "Range clamped to {} .. {}",
            range.start_date(),
            range.end_date()
        );
    }
    Ok(())
}
