//! User Interface layer
//!
//! Theme definitions, reusable widgets (popups, toasts, status bar) and the
//! per-tab table views.

pub mod theme;
pub mod render;
pub mod widgets;

pub use theme::Theme;
pub use render::render;
