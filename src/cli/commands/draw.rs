use anyhow::{Result, bail};
use common::LatLng;
use tracing::{info, warn};

use crate::app::App;
use crate::views::DrawEvent;

pub fn draw(app: &mut App, id: String, vertices: Vec<LatLng>) -> Result<()> {
    if app.store.region(&id).is_some() {
        info!("Replacing region '{}'", id);
    }
    app.map.handle_draw(
        &mut app.store,
        DrawEvent::Created {
            layer_id: id,
            vertices,
        },
    );
    Ok(())
}

pub fn edit(app: &mut App, id: String, vertices: Vec<LatLng>) -> Result<()> {
    if app.store.region(&id).is_none() {
        bail!("Unknown region '{}'", id);
    }
    app.map.handle_draw(&mut app.store, DrawEvent::Edited(vec![(id, vertices)]));
    Ok(())
}

pub fn delete(app: &mut App, ids: Vec<String>) -> Result<()> {
    for id in ids.iter().filter(|id| app.store.region(id).is_none()) {
        warn!("Region '{}' does not exist", id);
    }
    app.map.handle_draw(&mut app.store, DrawEvent::Deleted(ids));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{idle_app, square};

    #[tokio::test]
    async fn test_edit_unknown_region_fails() {
        let mut app = idle_app();
        assert!(edit(&mut app, "nope".to_string(), square(0.0, 0.0)).is_err());
    }

    #[tokio::test]
    async fn test_draw_and_delete() {
        let mut app = idle_app();
        draw(&mut app, "lake".to_string(), square(46.0, 6.0)).unwrap();
        assert!(app.store.region("lake").unwrap().is_loading);

        delete(&mut app, vec!["lake".to_string(), "missing".to_string()]).unwrap();
        assert!(app.store.region("lake").is_none());
    }
}
