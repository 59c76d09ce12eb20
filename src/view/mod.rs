//! View and UI layer
//!
//! Navigation tree state and its terminal rendering.

pub mod nav_tree;
pub mod ui;
