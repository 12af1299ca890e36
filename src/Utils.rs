//! different utility modules used throughout the project
/// logger set-up: terminal plus timestamped file
pub mod logger;
/// number formatting for labels and the grid step
pub mod format;
/// save and restore application state as TOML
pub mod persistence;
/// headless PNG snapshot of a scene
pub mod plots;
