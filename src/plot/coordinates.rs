//! Camera state and the affine map between world space (the math plane) and screen
//! space (viewport pixels, y growing downwards).
//!
//! ```text
//!  sx =  (wx - cx) * zoom * unit + w / 2
//!  sy = -(wy - cy) * zoom * unit + h / 2
//! ```
use nalgebra::Vector2;
use ndarray::{Array1, Array2, Axis, stack};

/// pixels per world unit at zoom 1
pub const UNIT: f64 = 100.0;
pub const MIN_ZOOM: f64 = 1e-9;
pub const MAX_ZOOM: f64 = 1e8;
/// fraction of the zoom added per wheel step
pub const ZOOM_SPEED: f64 = 0.1;

/// start/stop/step of the dense sample array along one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleWindow {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl SampleWindow {
    /// `start, start + step, ...` strictly below `stop`
    pub fn samples(&self) -> Array1<f64> {
        arange(self.start, self.stop, self.step)
    }
}

/// numpy-style `arange`: half-open, empty for a zero, non-finite or wrong-signed step
pub fn arange(start: f64, stop: f64, step: f64) -> Array1<f64> {
    if step == 0.0 || !step.is_finite() || !start.is_finite() || !stop.is_finite() {
        return Array1::zeros(0);
    }
    // the relative shave keeps round-off from adding a sample at `stop`
    let n = ((stop - start) / step * (1.0 - 1e-12)).ceil();
    if n <= 0.0 {
        return Array1::zeros(0);
    }
    Array1::from_iter((0..n as usize).map(|i| start + i as f64 * step))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// world point shown at the center of the viewport
    pub position: Vector2<f64>,
    pub zoom: f64,
    pub unit: f64,
    /// viewport size in pixels
    pub view: Vector2<f64>,
}

impl Default for Camera {
    fn default() -> Self {
        Camera::new(Vector2::new(800.0, 600.0))
    }
}

impl Camera {
    pub fn new(view: Vector2<f64>) -> Self {
        Camera {
            position: Vector2::zeros(),
            zoom: 1.0,
            unit: UNIT,
            view,
        }
    }

    /// pixels per world unit at the current zoom
    pub fn scale(&self) -> f64 {
        self.zoom * self.unit
    }

    pub fn world_to_screen(&self, world: Vector2<f64>) -> Vector2<f64> {
        let s = self.scale();
        Vector2::new(
            (world.x - self.position.x) * s + self.view.x / 2.0,
            -(world.y - self.position.y) * s + self.view.y / 2.0,
        )
    }

    pub fn screen_to_world(&self, screen: Vector2<f64>) -> Vector2<f64> {
        let s = self.scale();
        Vector2::new(
            (screen.x - self.view.x / 2.0) / s + self.position.x,
            -(screen.y - self.view.y / 2.0) / s + self.position.y,
        )
    }

    /// Maps whole columns of world coordinates into an `n x 2` array of screen points.
    pub fn world_to_screen_arrays(&self, xs: &Array1<f64>, ys: &Array1<f64>) -> Array2<f64> {
        let s = self.scale();
        let sx = xs.mapv(|x| (x - self.position.x) * s + self.view.x / 2.0);
        let sy = ys.mapv(|y| -(y - self.position.y) * s + self.view.y / 2.0);
        stack(Axis(1), &[sx.view(), sy.view()]).unwrap_or_else(|_| Array2::zeros((0, 2)))
    }

    /// Moves the camera by a screen-space drag delta so the content follows the pointer.
    pub fn pan(&mut self, rel: Vector2<f64>) {
        let mut delta = rel / self.scale();
        delta.y *= -1.0;
        self.position -= delta;
    }

    /// Zooms by `wheel` steps keeping the world point under `mouse` fixed on screen.
    pub fn zoom_at(&mut self, mouse: Vector2<f64>, wheel: f64) {
        let before = self.screen_to_world(mouse);
        self.zoom += wheel * self.zoom * ZOOM_SPEED;
        self.zoom = self.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let after = self.screen_to_world(mouse);
        self.position -= after - before;
    }

    pub fn reset(&mut self) {
        self.position = Vector2::zeros();
        self.zoom = 1.0;
    }

    pub fn resize(&mut self, view: Vector2<f64>) {
        self.view = view;
    }

    /// visible world size
    pub fn world_extent(&self) -> Vector2<f64> {
        self.view / self.scale()
    }

    /// Sample window along x covering the viewport.
    pub fn x_window(&self, precision: usize) -> SampleWindow {
        let half = self.world_extent().x / 2.0;
        let (start, stop) = (self.position.x - half, self.position.x + half);
        SampleWindow {
            start,
            stop,
            step: (stop - start) / precision.max(1) as f64,
        }
    }

    /// Sample window along y covering the viewport, ascending.
    pub fn y_window(&self, precision: usize) -> SampleWindow {
        let half = self.world_extent().y / 2.0;
        let (start, stop) = (self.position.y - half, self.position.y + half);
        SampleWindow {
            start,
            stop,
            step: (stop - start) / precision.max(1) as f64,
        }
    }

    /// true if the screen point lies inside the viewport rectangle
    pub fn contains_screen(&self, p: Vector2<f64>) -> bool {
        p.x >= 0.0 && p.x <= self.view.x && p.y >= 0.0 && p.y <= self.view.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn camera() -> Camera {
        let mut cam = Camera::new(Vector2::new(1000.0, 700.0));
        cam.position = Vector2::new(1.5, -2.0);
        cam.zoom = 2.5;
        cam
    }

    #[test]
    fn test_origin_is_view_center() {
        let cam = Camera::new(Vector2::new(800.0, 600.0));
        let p = cam.world_to_screen(Vector2::new(0.0, 0.0));
        assert_eq!(p, Vector2::new(400.0, 300.0));
        let q = cam.world_to_screen(Vector2::new(1.0, 1.0));
        assert_eq!(q, Vector2::new(500.0, 200.0));
    }

    #[test]
    fn test_round_trip() {
        let cam = camera();
        for p in [
            Vector2::new(0.0, 0.0),
            Vector2::new(123.4, 567.8),
            Vector2::new(-40.0, 999.0),
        ] {
            let back = cam.world_to_screen(cam.screen_to_world(p));
            assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
            assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zoom_keeps_point_under_cursor() {
        let mut cam = camera();
        let mouse = Vector2::new(321.0, 123.0);
        let before = cam.screen_to_world(mouse);
        cam.zoom_at(mouse, 3.0);
        let after = cam.screen_to_world(mouse);
        assert_relative_eq!(before.x, after.x, epsilon = 1e-9);
        assert_relative_eq!(before.y, after.y, epsilon = 1e-9);
        cam.zoom_at(mouse, -2.0);
        let again = cam.screen_to_world(mouse);
        assert_relative_eq!(before.x, again.x, epsilon = 1e-9);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut cam = camera();
        cam.zoom = MAX_ZOOM;
        cam.zoom_at(Vector2::new(0.0, 0.0), 5.0);
        assert_eq!(cam.zoom, MAX_ZOOM);
        cam.zoom = MIN_ZOOM;
        cam.zoom_at(Vector2::new(0.0, 0.0), -20.0);
        assert_eq!(cam.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_pan_follows_pointer() {
        let mut cam = Camera::new(Vector2::new(800.0, 600.0));
        let grabbed = cam.screen_to_world(Vector2::new(100.0, 100.0));
        cam.pan(Vector2::new(50.0, -20.0));
        let now_under = cam.world_to_screen(grabbed);
        assert_relative_eq!(now_under.x, 150.0, epsilon = 1e-9);
        assert_relative_eq!(now_under.y, 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_windows_cover_view() {
        let cam = Camera::new(Vector2::new(800.0, 600.0));
        let xw = cam.x_window(100);
        assert_relative_eq!(xw.start, -4.0);
        assert_relative_eq!(xw.stop, 4.0);
        assert_relative_eq!(xw.step, 0.08);
        let yw = cam.y_window(100);
        assert!(yw.start < yw.stop);
        assert_relative_eq!(yw.start, -3.0);
        assert_eq!(xw.samples().len(), 100);
    }

    #[test]
    fn test_arange() {
        assert_eq!(arange(0.0, 1.0, 0.25), array![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(arange(0.0, 1.0, 0.0).len(), 0);
        assert_eq!(arange(1.0, 0.0, 0.5).len(), 0);
    }

    #[test]
    fn test_vectorized_matches_scalar() {
        let cam = camera();
        let pts = cam.world_to_screen_arrays(&array![0.0, 1.0], &array![2.0, -3.0]);
        assert_eq!(pts.shape(), &[2, 2]);
        let p = cam.world_to_screen(Vector2::new(1.0, -3.0));
        assert_relative_eq!(pts[[1, 0]], p.x);
        assert_relative_eq!(pts[[1, 1]], p.y);
    }
}
