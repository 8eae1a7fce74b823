pub mod draw;
pub mod panel;
pub mod refresh;
pub mod session;
