//! # Scene
//!
//! Owner of the camera, the variables and the expressions. It drives the per-frame loop:
//! background results are applied, debounced edits are dispatched and, when the replot
//! flag is raised, every expression is sampled again.
//!
//! ## Example
//! ```rust, ignore
//! let mut scene = Scene::new(Vector2::new(800.0, 600.0), 0)?;
//! scene.add_expression("y = x^2");
//! scene.wait_for_computes(Duration::from_secs(5));
//! scene.update(Instant::now());
//! println!("{}", scene.statistics_table());
//! ```
use crate::Utils::persistence::{AppState, StoredExpression};
use crate::errors::PlotError;
use crate::plot::compute::{ComputeEvent, ComputePool, ExprId, ReplotFlag};
use crate::plot::coordinates::Camera;
use crate::plot::expression::Expression;
use crate::plot::hover::{self, HoverPoint, Tangent, screen_x_span};
use crate::plot::variables::{VariableChange, VariableSet};
use log::{debug, info, warn};
use nalgebra::Vector2;
use rand::Rng;
use std::path::Path;
use std::time::{Duration, Instant};
use tabled::builder::Builder;
use tabled::settings::Style;

pub const PRECISION_STEPS: [f64; 7] = [100.0, 500.0, 1000.0, 3000.0, 10000.0, 20000.0, 50000.0];
pub const FPS_STEPS: [f64; 7] = [30.0, 45.0, 60.0, 90.0, 120.0, 244.0, 360.0];

/// piecewise-linear interpolation over ascending `xp`, clamped at both ends
fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    for i in 1..n {
        if x <= xp[i] {
            let t = (x - xp[i - 1]) / (xp[i] - xp[i - 1]);
            return fp[i - 1] + t * (fp[i] - fp[i - 1]);
        }
    }
    fp[n - 1]
}

fn slider_positions(n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
}

/// Maps a slider position in `[0, 1]` onto `steps`, logarithmically between neighbours.
pub fn slider_to_value(position: f64, steps: &[f64]) -> f64 {
    let log_steps: Vec<f64> = steps.iter().map(|s| s.ln()).collect();
    interp(position, &slider_positions(steps.len()), &log_steps).exp()
}

/// Inverse of [`slider_to_value`].
pub fn value_to_slider(value: f64, steps: &[f64]) -> f64 {
    let log_steps: Vec<f64> = steps.iter().map(|s| s.ln()).collect();
    interp(value.ln(), &log_steps, &slider_positions(steps.len()))
}

/// a light color, every channel in `150..=255`
pub fn random_color() -> [u8; 3] {
    let mut rng = rand::rng();
    [
        rng.random_range(150..=255),
        rng.random_range(150..=255),
        rng.random_range(150..=255),
    ]
}

/// Display settings kept across sessions
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// samples per visible axis length
    pub precision: usize,
    pub framerate: u32,
    /// width share of the side panel, used by front ends
    pub panel_percentage: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            precision: 10000,
            framerate: 120,
            panel_percentage: 0.2,
        }
    }
}

pub struct Scene {
    pub camera: Camera,
    pub settings: Settings,
    variables: VariableSet,
    expressions: Vec<Expression>,
    next_id: ExprId,
    pool: ComputePool,
    replot: ReplotFlag,
    /// number of finished replots
    pub replots: usize,
}

impl Scene {
    /// Creates an empty scene with a compute pool of `threads` workers (0: rayon default).
    pub fn new(view: Vector2<f64>, threads: usize) -> Result<Self, PlotError> {
        let replot = ReplotFlag::new(true);
        let pool = ComputePool::new(threads, replot.clone())?;
        Ok(Scene {
            camera: Camera::new(view),
            settings: Settings::default(),
            variables: VariableSet::new(),
            expressions: Vec::new(),
            next_id: 0,
            pool,
            replot,
            replots: 0,
        })
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn expression(&self, id: ExprId) -> Option<&Expression> {
        self.expressions.iter().find(|e| e.id == id)
    }

    fn expression_mut(&mut self, id: ExprId) -> Option<&mut Expression> {
        self.expressions.iter_mut().find(|e| e.id == id)
    }

    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    pub fn needs_replot(&self) -> bool {
        self.replot.is_set()
    }

    pub fn request_replot(&self) {
        self.replot.set();
    }

    /// true while any expression waits for a background result
    pub fn is_computing(&self) -> bool {
        self.expressions.iter().any(|e| e.computing)
    }

    //___________________________________EXPRESSIONS____________________________________

    /// Adds an expression with a random color; non-empty text is computed right away.
    pub fn add_expression(&mut self, text: &str) -> ExprId {
        self.add_expression_with_color(text, random_color())
    }

    pub fn add_expression_with_color(&mut self, text: &str, color: [u8; 3]) -> ExprId {
        let id = self.next_id;
        self.next_id += 1;
        let mut expr = Expression::new(id, text, color);
        if !text.trim().is_empty() {
            let job = expr.begin_compute(&self.variables.names());
            self.pool.dispatch(job);
        }
        info!("expression {} added: '{}'", id, text);
        self.expressions.push(expr);
        self.replot.set();
        id
    }

    pub fn remove_expression(&mut self, id: ExprId) -> bool {
        let before = self.expressions.len();
        self.expressions.retain(|e| e.id != id);
        let removed = self.expressions.len() != before;
        if removed {
            info!("expression {} removed", id);
            self.replot.set();
        }
        removed
    }

    /// Records typed text; the compute is dispatched by [`Self::update`] after the debounce.
    pub fn edit_expression(&mut self, id: ExprId, text: &str, now: Instant) {
        if let Some(expr) = self.expression_mut(id) {
            expr.edit(text, now);
        }
    }

    pub fn set_hidden(&mut self, id: ExprId, hidden: bool) {
        if let Some(expr) = self.expression_mut(id) {
            expr.hidden = hidden;
            self.replot.set();
        }
    }

    pub fn set_collapsed(&mut self, id: ExprId, collapsed: bool) {
        if let Some(expr) = self.expression_mut(id) {
            expr.collapsed = collapsed;
        }
    }

    pub fn set_show_area(&mut self, id: ExprId, on: bool) {
        if let Some(expr) = self.expression_mut(id) {
            expr.show_area = on;
            self.replot.set();
        }
    }

    pub fn set_show_derivative(&mut self, id: ExprId, on: bool) {
        let names = self.variables.names();
        if let Some(expr) = self.expressions.iter_mut().find(|e| e.id == id) {
            expr.set_show_derivative(on, &names);
            if let Some(reason) = &expr.derivatives.error {
                warn!("expression {}: {}", id, reason);
            }
            self.replot.set();
        }
    }

    //___________________________________VARIABLES____________________________________

    fn variables_changed(&mut self, change: VariableChange) {
        match change {
            VariableChange::Values => self.replot.set(),
            VariableChange::Names => self.recompute_all(),
        }
    }

    /// Re-dispatches every expression; running ones get a pending request instead.
    pub fn recompute_all(&mut self) {
        let names = self.variables.names();
        for expr in self.expressions.iter_mut() {
            if expr.raw.trim().is_empty() {
                continue;
            }
            if expr.request_recompute() {
                let job = expr.begin_compute(&names);
                self.pool.dispatch(job);
            }
        }
        self.replot.set();
    }

    pub fn add_variable(&mut self, name: &str, value: f64) -> Result<(), PlotError> {
        let change = self.variables.add(name, value)?;
        self.variables_changed(change);
        Ok(())
    }

    pub fn set_variable(&mut self, name: &str, value: f64) -> Result<(), PlotError> {
        let change = self.variables.set_value(name, value)?;
        self.variables_changed(change);
        Ok(())
    }

    pub fn set_variable_range(&mut self, name: &str, range: [f64; 2]) -> Result<(), PlotError> {
        self.variables.set_range(name, range)
    }

    pub fn rename_variable(&mut self, old: &str, new: &str) -> Result<(), PlotError> {
        let change = self.variables.rename(old, new)?;
        self.variables_changed(change);
        Ok(())
    }

    pub fn remove_variable(&mut self, name: &str) {
        if let Some(change) = self.variables.remove(name) {
            self.variables_changed(change);
        }
    }

    //___________________________________SETTINGS____________________________________

    pub fn set_precision(&mut self, precision: usize) {
        let precision = precision.max(1);
        if precision != self.settings.precision {
            self.settings.precision = precision;
            self.replot.set();
        }
    }

    pub fn set_precision_slider(&mut self, position: f64) {
        self.set_precision(slider_to_value(position, &PRECISION_STEPS).round() as usize);
    }

    pub fn precision_slider(&self) -> f64 {
        value_to_slider(self.settings.precision as f64, &PRECISION_STEPS)
    }

    pub fn set_framerate_slider(&mut self, position: f64) {
        self.settings.framerate = slider_to_value(position, &FPS_STEPS).round() as u32;
    }

    pub fn framerate_slider(&self) -> f64 {
        value_to_slider(self.settings.framerate as f64, &FPS_STEPS)
    }

    //___________________________________CAMERA____________________________________

    pub fn pan(&mut self, rel: Vector2<f64>) {
        self.camera.pan(rel);
        self.replot.set();
    }

    pub fn zoom_at(&mut self, mouse: Vector2<f64>, wheel: f64) {
        self.camera.zoom_at(mouse, wheel);
        self.replot.set();
    }

    pub fn resize(&mut self, view: Vector2<f64>) {
        self.camera.resize(view);
        self.replot.set();
    }

    pub fn reset_camera(&mut self) {
        self.camera.reset();
        self.replot.set();
    }

    //___________________________________FRAME LOOP____________________________________

    fn apply_event(&mut self, event: ComputeEvent) {
        let names = self.variables.names();
        let Some(expr) = self.expressions.iter_mut().find(|e| e.id == event.id) else {
            debug!("result for removed expression {} dropped", event.id);
            return;
        };
        if expr.apply(event.outcome) {
            let job = expr.begin_compute(&names);
            self.pool.dispatch(job);
        }
        if expr.error {
            info!("expression {}: {}", expr.id, expr.error_reason);
        }
        self.replot.set();
    }

    /// One frame: apply finished computes, dispatch debounced edits, replot if needed.
    ///
    /// # Returns
    /// `true` if the geometry was recomputed this frame.
    pub fn update(&mut self, now: Instant) -> bool {
        for event in self.pool.drain() {
            self.apply_event(event);
        }
        let names = self.variables.names();
        for expr in self.expressions.iter_mut() {
            if !expr.check_edit(now) {
                continue;
            }
            if expr.raw.trim().is_empty() {
                expr.clear_solution();
                self.replot.set();
                continue;
            }
            let job = expr.begin_compute(&names);
            self.pool.dispatch(job);
        }
        if self.replot.take() {
            self.plot();
            return true;
        }
        false
    }

    /// Blocks until no expression is computing or `timeout` has passed.
    ///
    /// # Returns
    /// `true` if every compute finished in time.
    pub fn wait_for_computes(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_computing() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                warn!("{} compute(s) still running", self.pool.in_flight());
                return false;
            }
            if let Some(event) = self.pool.wait(left) {
                self.apply_event(event);
            }
        }
        true
    }

    /// Samples every expression over the current view.
    pub fn plot(&mut self) {
        let begin = Instant::now();
        let precision = self.settings.precision;
        let x_window = self.camera.x_window(precision);
        let y_window = self.camera.y_window(precision);
        let values = self.variables.values();
        for expr in self.expressions.iter_mut() {
            expr.plot(&x_window, &y_window, &self.camera, &values);
        }
        self.replots += 1;
        debug!(
            "replot {} done in {:?} \n \n CALC STATISTICS \n \n {}",
            self.replots,
            begin.elapsed(),
            self.statistics_table()
        );
    }

    /// Table with one row per expression: id, text, kind, branches, points, status.
    pub fn statistics_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["id", "expression", "kind", "branches", "points", "screen x", "status"]);
        for expr in &self.expressions {
            let status = if expr.error {
                expr.error_reason.clone()
            } else if expr.computing {
                "computing".to_string()
            } else if expr.hidden {
                "hidden".to_string()
            } else {
                "ok".to_string()
            };
            let span = screen_x_span(expr)
                .map(|(lo, hi)| format!("{:.0}..{:.0}", lo, hi))
                .unwrap_or_default();
            builder.push_record([
                expr.id.to_string(),
                expr.raw.clone(),
                expr.kind.to_string(),
                expr.branches.len().to_string(),
                expr.point_count().to_string(),
                span,
                status,
            ]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }

    //___________________________________POINTER____________________________________

    pub fn closest_point(&self, mouse: Vector2<f64>) -> Option<HoverPoint> {
        hover::closest_point(&self.expressions, mouse, &self.camera, &self.variables.values())
    }

    pub fn tangents(&self, mouse: Vector2<f64>) -> Vec<Tangent> {
        hover::tangents(&self.expressions, mouse, &self.camera, &self.variables.values())
    }

    pub fn mouse_readout(&self, mouse: Vector2<f64>) -> String {
        hover::mouse_readout(mouse, &self.camera)
    }

    //___________________________________STATE____________________________________

    pub fn to_state(&self) -> AppState {
        AppState {
            panel_percentage: self.settings.panel_percentage,
            precision: self.settings.precision,
            view: [self.camera.view.x, self.camera.view.y],
            framerate: self.settings.framerate,
            variables: self.variables.records().to_vec(),
            expressions: self
                .expressions
                .iter()
                .map(|e| StoredExpression {
                    expr: e.raw.clone(),
                    color: e.color,
                })
                .collect(),
        }
    }

    /// Builds a scene from saved state; every stored expression is dispatched for compute.
    pub fn from_state(state: AppState, threads: usize) -> Result<Self, PlotError> {
        let mut scene = Scene::new(Vector2::new(state.view[0], state.view[1]), threads)?;
        scene.settings = Settings {
            precision: state.precision.max(1),
            framerate: state.framerate,
            panel_percentage: state.panel_percentage,
        };
        scene.variables = VariableSet::from_records(state.variables);
        for stored in state.expressions {
            scene.add_expression_with_color(&stored.expr, stored.color);
        }
        Ok(scene)
    }

    pub fn load(path: &Path, threads: usize) -> Result<Self, PlotError> {
        Scene::from_state(AppState::load(path)?, threads)
    }

    pub fn save(&self, path: &Path) -> Result<(), PlotError> {
        self.to_state().save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    const WAIT: Duration = Duration::from_secs(10);

    fn scene() -> Scene {
        let mut s = Scene::new(Vector2::new(800.0, 600.0), 2).unwrap();
        s.set_precision(500);
        s
    }

    #[test]
    fn test_slider_round_trip() {
        for v in [100.0, 750.0, 10000.0, 33333.0, 50000.0] {
            let back = slider_to_value(value_to_slider(v, &PRECISION_STEPS), &PRECISION_STEPS);
            assert_relative_eq!(back, v, max_relative = 1e-9);
        }
        assert_relative_eq!(slider_to_value(0.0, &FPS_STEPS), 30.0, max_relative = 1e-12);
        assert_relative_eq!(slider_to_value(1.0, &FPS_STEPS), 360.0, max_relative = 1e-12);
        assert_relative_eq!(value_to_slider(120.0, &FPS_STEPS), 4.0 / 6.0, max_relative = 1e-12);
    }

    #[test]
    fn test_random_color_is_light() {
        for _ in 0..50 {
            assert!(random_color().iter().all(|&c| c >= 150));
        }
    }

    #[test]
    fn test_parabola_is_plotted() {
        let mut s = scene();
        let id = s.add_expression("y = x^2");
        assert!(s.wait_for_computes(WAIT));
        assert!(s.update(Instant::now()));
        let e = s.expression(id).unwrap();
        assert!(!e.error);
        assert_eq!(e.functions.len(), 1);
        assert_eq!(e.plots.len(), 1);
        assert_eq!(e.plots[0].nrows(), 500);
        assert!(!s.update(Instant::now()));
    }

    #[test]
    fn test_circle_gives_two_sequences() {
        let mut s = scene();
        let id = s.add_expression("x^2 + y^2 = 25");
        assert!(s.wait_for_computes(WAIT));
        s.zoom_at(Vector2::new(400.0, 300.0), -5.0);
        s.update(Instant::now());
        let e = s.expression(id).unwrap();
        assert!(e.plots.len() >= 2);
        assert!(e.plots.iter().all(|p| p.nrows() > 0));
    }

    #[test]
    fn test_debounced_edit_dispatches_final_text() {
        let mut s = scene();
        let id = s.add_expression("");
        let t0 = Instant::now();
        s.edit_expression(id, "y = x", t0);
        s.update(t0 + Duration::from_millis(100));
        s.edit_expression(id, "y = 2*x", t0 + Duration::from_millis(200));
        s.update(t0 + Duration::from_millis(400));
        assert!(!s.is_computing());
        s.update(t0 + Duration::from_millis(800));
        assert!(s.is_computing());
        assert!(s.wait_for_computes(WAIT));
        let e = s.expression(id).unwrap();
        assert_eq!(e.raw, "y = 2*x");
        assert_eq!(e.functions[0].eval(3.0, &[]).unwrap(), 6.0);
    }

    #[test]
    fn test_cleared_text_is_not_an_error() {
        let mut s = scene();
        let id = s.add_expression("y = x");
        assert!(s.wait_for_computes(WAIT));
        s.update(Instant::now());
        let t0 = Instant::now();
        s.edit_expression(id, "  ", t0);
        assert!(s.update(t0 + Duration::from_millis(600)));
        assert!(!s.is_computing());
        assert!(s.wait_for_computes(WAIT));
        let e = s.expression(id).unwrap();
        assert!(!e.error, "{}", e.error_reason);
        assert!(e.functions.is_empty());
        assert!(e.plots.is_empty());
    }

    #[test]
    fn test_derivative_toggled_mid_compute_gives_tangent() {
        let mut s = scene();
        let id = s.add_expression("y = x^2");
        assert!(s.expression(id).unwrap().computing);
        s.set_show_derivative(id, true);
        assert!(s.wait_for_computes(WAIT));
        s.update(Instant::now());
        let e = s.expression(id).unwrap();
        assert!(e.show_derivative);
        assert_eq!(e.derivatives.slots.len(), 1);
        assert!(!e.should_skip_derivative());
        let mouse = s.camera.world_to_screen(Vector2::new(1.0, 1.0));
        let tangents = s.tangents(mouse);
        assert_eq!(tangents.len(), 1);
        assert!(tangents[0].label.starts_with("m: 2"));
    }

    #[test]
    fn test_variable_rename_recompiles() {
        let mut s = scene();
        s.add_variable("a", 2.0).unwrap();
        let id = s.add_expression("y = b*x");
        assert!(s.wait_for_computes(WAIT));
        assert_eq!(
            s.expression(id).unwrap().error_reason,
            "Expression uses undefined variables!"
        );
        s.rename_variable("a", "b").unwrap();
        assert!(s.wait_for_computes(WAIT));
        s.update(Instant::now());
        let e = s.expression(id).unwrap();
        assert!(!e.error);
        assert_eq!(e.functions[0].eval(1.5, &s.variables().values()).unwrap(), 3.0);
    }

    #[test]
    fn test_value_change_only_replots() {
        let mut s = scene();
        s.add_variable("k", 1.0).unwrap();
        let id = s.add_expression("y = k");
        assert!(s.wait_for_computes(WAIT));
        s.update(Instant::now());
        let before = s.expression(id).unwrap().plots[0][[0, 1]];
        s.set_variable("k", 2.0).unwrap();
        assert!(!s.is_computing());
        assert!(s.update(Instant::now()));
        let after = s.expression(id).unwrap().plots[0][[0, 1]];
        assert_relative_eq!(before - after, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_removed_expression_result_dropped() {
        let mut s = scene();
        let id = s.add_expression("y = x");
        assert!(s.remove_expression(id));
        std::thread::sleep(Duration::from_millis(200));
        s.update(Instant::now());
        assert!(s.expressions().is_empty());
    }

    #[test]
    fn test_state_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.toml");
        let mut s = scene();
        s.settings.panel_percentage = 0.35;
        s.add_variable("a", 1.5).unwrap();
        s.add_expression_with_color("y = a*x", [151, 152, 153]);
        s.add_expression_with_color("x = y^2", [200, 201, 202]);
        s.save(&path).unwrap();

        let mut loaded = Scene::load(&path, 2).unwrap();
        assert!(loaded.wait_for_computes(WAIT));
        assert_eq!(loaded.to_state(), s.to_state());
        assert_eq!(loaded.settings.precision, 500);
        assert_eq!(loaded.variables().get("a"), Some(1.5));
        let texts: Vec<&str> = loaded.expressions().iter().map(|e| e.raw.as_str()).collect();
        assert_eq!(texts, vec!["y = a*x", "x = y^2"]);
        assert!(loaded.expressions().iter().all(|e| !e.error));
    }

    #[test]
    fn test_statistics_table_lists_expressions() {
        let mut s = scene();
        s.add_expression("y = sin(x)");
        assert!(s.wait_for_computes(WAIT));
        s.update(Instant::now());
        let table = s.statistics_table();
        assert!(table.contains("y = sin(x)"));
        assert!(table.contains("ok"));
    }
}
