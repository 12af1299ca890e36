//! Pointer queries over the plotted scene: nearest curve point, tangent lines and the
//! mouse coordinate readout. Every query returns `None` (or skips a slot) on failure.
use crate::Utils::format::format_number;
use crate::plot::coordinates::Camera;
use crate::plot::expression::Expression;
use crate::symbolic::symbolic_solver::Kind;
use itertools::Itertools;
use nalgebra::Vector2;
use ndarray::Axis;

/// pixels; points farther from the mouse are never reported
pub const HOVER_MAX_DIST: f64 = 15.0;
/// tangent segment coordinates are clamped to this magnitude
pub const TANGENT_CLAMP: f64 = 1e20;

#[derive(Debug, Clone, PartialEq)]
pub struct HoverPoint {
    pub screen: Vector2<f64>,
    pub world: Vector2<f64>,
    pub color: [u8; 3],
    /// `"(x, y)"` in world coordinates
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tangent {
    /// segment end points in screen space
    pub segment: [(f64, f64); 2],
    /// touching point in screen space
    pub point: Vector2<f64>,
    pub color: [u8; 3],
    pub label: String,
}

/// Running best candidate: only a strictly closer point replaces it
struct Closest {
    dist2: f64,
    found: Option<(Vector2<f64>, [u8; 3])>,
}

impl Closest {
    fn new() -> Self {
        Closest {
            dist2: HOVER_MAX_DIST * HOVER_MAX_DIST,
            found: None,
        }
    }

    fn offer(&mut self, point: Vector2<f64>, mouse: Vector2<f64>, color: [u8; 3]) {
        let d2 = (point - mouse).norm_squared();
        if d2.is_finite() && d2 <= self.dist2 && (self.found.is_none() || d2 < self.dist2) {
            self.dist2 = d2;
            self.found = Some((point, color));
        }
    }
}

fn hover_point(screen: Vector2<f64>, color: [u8; 3], camera: &Camera) -> HoverPoint {
    let world = camera.screen_to_world(screen);
    HoverPoint {
        screen,
        world,
        color,
        label: format!("({}, {})", format_number(world.x), format_number(world.y)),
    }
}

/// Nearest plotted point within [`HOVER_MAX_DIST`] pixels of `mouse`.
///
/// Expressions are scanned newest first. When no plotted point qualifies, each visible
/// branch is evaluated exactly at the mouse position along its parameter axis.
pub fn closest_point(
    expressions: &[Expression],
    mouse: Vector2<f64>,
    camera: &Camera,
    values: &[f64],
) -> Option<HoverPoint> {
    let mut best = Closest::new();
    for expr in expressions.iter().rev().filter(|e| !e.should_skip()) {
        for points in &expr.plots {
            let nearest = points
                .axis_iter(Axis(0))
                .filter(|row| row.iter().all(|v| v.is_finite()))
                .map(|row| Vector2::new(row[0], row[1]))
                .min_by(|a, b| {
                    (a - mouse)
                        .norm_squared()
                        .total_cmp(&(b - mouse).norm_squared())
                });
            if let Some(p) = nearest {
                best.offer(p, mouse, expr.color);
            }
        }
    }
    if best.found.is_none() {
        best = backup_point(expressions, mouse, camera, values);
    }
    best.found.map(|(p, color)| hover_point(p, color, camera))
}

fn backup_point(
    expressions: &[Expression],
    mouse: Vector2<f64>,
    camera: &Camera,
    values: &[f64],
) -> Closest {
    let world_mouse = camera.screen_to_world(mouse);
    let mut best = Closest::new();
    for expr in expressions.iter().rev().filter(|e| !e.should_skip()) {
        let param = match expr.kind {
            Kind::X => world_mouse.x,
            Kind::Y => world_mouse.y,
        };
        for func in &expr.functions {
            let Ok(value) = func.eval(param, values) else {
                continue;
            };
            let world = match expr.kind {
                Kind::X => Vector2::new(param, value),
                Kind::Y => Vector2::new(value, param),
            };
            best.offer(camera.world_to_screen(world), mouse, expr.color);
        }
    }
    best
}

/// Tangent lines at the mouse position for every expression showing its derivative.
pub fn tangents(
    expressions: &[Expression],
    mouse: Vector2<f64>,
    camera: &Camera,
    values: &[f64],
) -> Vec<Tangent> {
    let world_mouse = camera.screen_to_world(mouse);
    let half = camera.world_extent() / 2.0;
    let (xs, xe) = (camera.position.x - half.x, camera.position.x + half.x);
    let (ys, ye) = (camera.position.y - half.y, camera.position.y + half.y);
    let clamp = |v: f64| v.clamp(-TANGENT_CLAMP, TANGENT_CLAMP);

    let mut res = Vec::new();
    for expr in expressions.iter().filter(|e| !e.should_skip_derivative()) {
        let (m, span, value_name) = match expr.kind {
            Kind::X => (world_mouse.x, [xs, xe], "y0"),
            Kind::Y => (world_mouse.y, [ys, ye], "x0"),
        };
        for (slot, func) in expr.derivatives.slots.iter().zip(&expr.functions) {
            let Some(derivative) = slot else {
                continue;
            };
            let (Ok(slope), Ok(v0)) = (derivative.slope(m, values), func.eval(m, values)) else {
                continue;
            };
            if !slope.is_finite() || !v0.is_finite() {
                continue;
            }
            let ends = span.map(|p| {
                let v = slope * (p - m) + v0;
                let world = match expr.kind {
                    Kind::X => Vector2::new(p, v),
                    Kind::Y => Vector2::new(v, p),
                };
                let s = camera.world_to_screen(world);
                (clamp(s.x), clamp(s.y))
            });
            let touch = match expr.kind {
                Kind::X => Vector2::new(m, v0),
                Kind::Y => Vector2::new(v0, m),
            };
            res.push(Tangent {
                segment: ends,
                point: camera.world_to_screen(touch).map(clamp),
                color: expr.color,
                label: format!(
                    "m: {}\n{}: {}",
                    format_number(slope),
                    value_name,
                    format_number(v0)
                ),
            });
        }
    }
    res
}

/// `"Mouse: {x} X, {y} Y"` in world coordinates
pub fn mouse_readout(mouse: Vector2<f64>, camera: &Camera) -> String {
    let w = camera.screen_to_world(mouse);
    format!("Mouse: {} X, {} Y", format_number(w.x), format_number(w.y))
}

/// smallest and largest finite screen x over all plotted points, used for statistics
pub fn screen_x_span(expr: &Expression) -> Option<(f64, f64)> {
    expr.plots
        .iter()
        .flat_map(|p| p.column(0).to_vec())
        .filter(|v| v.is_finite())
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option()
}
