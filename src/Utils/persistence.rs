//! Saved application state, stored as a TOML document.
//!
//! ```toml
//! panel_percentage = 0.2
//! precision = 10000
//! view = [800.0, 600.0]
//! framerate = 120
//!
//! [[variables]]
//! name = "a"
//! value = 1.0
//!
//! [[expressions]]
//! expr = "y = a*x^2"
//! color = [200, 180, 255]
//! ```
use crate::errors::PlotError;
use crate::plot::variables::Variable;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_STATE_PATH: &str = "appdata/data.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredExpression {
    pub expr: String,
    pub color: [u8; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub panel_percentage: f64,
    pub precision: usize,
    pub view: [f64; 2],
    pub framerate: u32,
    pub variables: Vec<Variable>,
    pub expressions: Vec<StoredExpression>,
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            panel_percentage: 0.2,
            precision: 10000,
            view: [800.0, 600.0],
            framerate: 120,
            variables: Vec::new(),
            expressions: Vec::new(),
        }
    }
}

impl AppState {
    /// Reads the state file; a missing file gives the defaults.
    pub fn load(path: &Path) -> Result<AppState, PlotError> {
        if !path.exists() {
            info!("no state file at {}, using defaults", path.display());
            return Ok(AppState::default());
        }
        let text = fs::read_to_string(path)?;
        let state: AppState = toml::from_str(&text)?;
        info!(
            "state loaded from {}: {} expression(s), {} variable(s)",
            path.display(),
            state.expressions.len(),
            state.variables.len()
        );
        Ok(state)
    }

    /// Writes the state file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), PlotError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        info!("state saved to {}", path.display());
        Ok(())
    }
}
