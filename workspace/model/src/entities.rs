//! Root of the dashboard data model.
//! A region is a user-drawn polygon with its rules and the last fetched value;
//! the app state bundles all regions with the selected time range.

pub mod app_state;
pub mod region;
pub mod time_range;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::app_state::AppState;
    pub use super::region::{Region, RulePatch};
    pub use super::time_range::TimeRange;
}
