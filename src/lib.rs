// Navigation tree library - exposes all core modules for embedding and testing

pub mod app;
pub mod config;
pub mod model;
pub mod services;
pub mod view;
