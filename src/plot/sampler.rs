//! Numeric sampling of compiled branches and the post-processing of the resulting
//! screen-space point arrays.
//!
//! Point arrays are `n x 2` (`[sx, sy]` per row). Non-finite values are kept in the
//! arrays and turned into gaps by [`polylines`].
use crate::errors::PlotError;
use crate::plot::coordinates::Camera;
use crate::symbolic::symbolic_lambdify::CompiledFunction;
use crate::symbolic::symbolic_solver::Kind;
use nalgebra::Vector2;
use ndarray::{Array1, Array2, Axis};

/// Evaluates `func` at every sample; a constant result is broadcast to the full length.
pub fn evaluate(
    func: &CompiledFunction,
    samples: &Array1<f64>,
    values: &[f64],
) -> Result<Array1<f64>, PlotError> {
    if func.is_constant() {
        let value = func.eval(0.0, values)?;
        return Ok(Array1::from_elem(samples.len(), value));
    }
    func.eval_array(samples, values)
}

/// Maps parameter samples and function values to screen points, swapping the axes for
/// kind y where the parameter runs along the vertical axis.
pub fn to_screen(
    camera: &Camera,
    kind: Kind,
    params: &Array1<f64>,
    values: &Array1<f64>,
) -> Array2<f64> {
    match kind {
        Kind::X => camera.world_to_screen_arrays(params, values),
        Kind::Y => camera.world_to_screen_arrays(values, params),
    }
}

fn finite_row(row: &[f64]) -> bool {
    row.iter().all(|v| v.is_finite())
}

/// keeps the rows selected by `keep`, preserving their order
fn select_rows(points: &Array2<f64>, keep: impl Fn(&[f64]) -> bool) -> Array2<f64> {
    let indices: Vec<usize> = points
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, row)| keep(&[row[0], row[1]]))
        .map(|(i, _)| i)
        .collect();
    points.select(Axis(0), &indices)
}

/// Drops points outside `[0, view_w] x [0, view_h]`; used when several branches share a
/// plot so that each branch keeps only its visible part.
pub fn clip_to_view(points: &Array2<f64>, view: Vector2<f64>) -> Array2<f64> {
    select_rows(points, |row| {
        row[0] >= 0.0 && row[0] <= view.x && row[1] >= 0.0 && row[1] <= view.y
    })
}

/// Area-fill variant of a point array: NaN rows dropped and screen y clamped into the view.
pub fn area_fill(points: &Array2<f64>, view_h: f64) -> Array2<f64> {
    let mut res = select_rows(points, |row| !row.iter().any(|v| v.is_nan()));
    res.column_mut(1).mapv_inplace(|y| y.clamp(0.0, view_h));
    res
}

/// Closed polygon for an area fill: the points plus two vertices dropped onto the world
/// y = 0 line at both ends.
pub fn area_polygon(points: &Array2<f64>, camera: &Camera) -> Vec<(f64, f64)> {
    let n = points.nrows();
    if n == 0 {
        return Vec::new();
    }
    let origin = camera.world_to_screen(Vector2::zeros());
    let mut polygon = Vec::with_capacity(n + 2);
    polygon.push((points[[0, 0]], origin.y));
    polygon.extend(points.axis_iter(Axis(0)).map(|row| (row[0], row[1])));
    polygon.push((points[[n - 1, 0]], origin.y));
    polygon
}

/// Splits a point array into runs of finite points; a NaN or infinite value ends a run.
/// Runs with fewer than two points cannot be drawn and are dropped.
pub fn polylines(points: &Array2<f64>) -> Vec<Vec<(f64, f64)>> {
    let mut lines = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for row in points.axis_iter(Axis(0)) {
        if finite_row(&[row[0], row[1]]) {
            current.push((row[0], row[1]));
        } else if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.retain(|line| line.len() > 1);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::symbolic_engine::Expr;
    use crate::symbolic::symbolic_solver::solve_expression;
    use ndarray::array;

    #[test]
    fn test_constant_is_broadcast() {
        let f = CompiledFunction::new(&Expr::Const(3.0), "x", &[]).unwrap();
        let ys = evaluate(&f, &array![1.0, 2.0, 3.0, 4.0], &[]).unwrap();
        assert_eq!(ys, array![3.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_reciprocal_across_zero() {
        let sol = solve_expression("y = 1/x", &[]).unwrap();
        let xs = array![-1.0, -0.5, 0.0, 0.5, 1.0];
        let ys = evaluate(&sol.functions[0], &xs, &[]).unwrap();
        assert!(!ys[2].is_finite());
        let cam = Camera::new(Vector2::new(800.0, 600.0));
        let pts = to_screen(&cam, Kind::X, &xs, &ys);
        let lines = polylines(&pts);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 2);
        assert_eq!(lines[1].len(), 2);
    }

    #[test]
    fn test_kind_y_swaps_axes() {
        let cam = Camera::new(Vector2::new(800.0, 600.0));
        let pts = to_screen(&cam, Kind::Y, &array![1.0], &array![2.0]);
        // parameter (y = 1) on the vertical axis, value (x = 2) on the horizontal one
        assert_eq!(pts[[0, 0]], 600.0);
        assert_eq!(pts[[0, 1]], 200.0);
    }

    #[test]
    fn test_clip_to_view() {
        let pts = array![[10.0, 10.0], [-5.0, 10.0], [10.0, 700.0], [f64::NAN, 1.0], [799.0, 599.0]];
        let clipped = clip_to_view(&pts, Vector2::new(800.0, 600.0));
        assert_eq!(clipped, array![[10.0, 10.0], [799.0, 599.0]]);
    }

    #[test]
    fn test_area_fill_drops_nan_and_clamps() {
        let pts = array![[0.0, -50.0], [1.0, f64::NAN], [2.0, 900.0], [3.0, 20.0]];
        let area = area_fill(&pts, 600.0);
        assert_eq!(area, array![[0.0, 0.0], [2.0, 600.0], [3.0, 20.0]]);
    }

    #[test]
    fn test_area_polygon_closes_on_zero_line() {
        let cam = Camera::new(Vector2::new(800.0, 600.0));
        let pts = array![[100.0, 50.0], [200.0, 60.0]];
        let poly = area_polygon(&pts, &cam);
        assert_eq!(poly.first(), Some(&(100.0, 300.0)));
        assert_eq!(poly.last(), Some(&(200.0, 300.0)));
        assert_eq!(poly.len(), 4);
        // a y-solved branch closes onto the same line
        let xs = array![-1.0, 0.0, 1.0];
        let ys = array![2.0, 2.5, 3.0];
        let vertical = to_screen(&cam, Kind::Y, &xs, &ys);
        let poly = area_polygon(&vertical, &cam);
        assert_eq!(poly.first(), Some(&(vertical[[0, 0]], 300.0)));
        assert_eq!(poly.last(), Some(&(vertical[[2, 0]], 300.0)));
    }

    #[test]
    fn test_undefined_variable_value_missing() {
        let vars = vec!["a".to_string()];
        let f = CompiledFunction::new(&(Expr::var("a") * Expr::var("x")), "x", &vars).unwrap();
        assert!(matches!(
            evaluate(&f, &array![1.0], &[]),
            Err(PlotError::UndefinedVariable(_))
        ));
    }
}
