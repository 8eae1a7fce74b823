use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::app::App;

/// Marks every region loading so all of them are fetched again.
pub fn refresh(app: &mut App) -> Result<()> {
    info!("Refreshing {} regions", app.store.state().polygons.len());
    app.store.invalidate_all();
    Ok(())
}

pub fn reset(app: &mut App) -> Result<()> {
    app.store.reset(Utc::now());
    Ok(())
}
