//! Rendering of the navigation pane

pub mod nav_pane;

pub use nav_pane::NavPaneRenderer;
