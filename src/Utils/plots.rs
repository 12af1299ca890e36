//! Headless snapshot of a scene drawn with plotters into a PNG file.
use crate::Utils::format::{format_number, grid_step};
use crate::errors::PlotError;
use crate::plot::sampler::{area_polygon, polylines};
use crate::plot::scene::Scene;
use nalgebra::Vector2;
use plotters::prelude::*;
use std::path::Path;

const BACKGROUND: RGBColor = RGBColor(20, 20, 24);
const GRID: RGBColor = RGBColor(60, 60, 66);
const AXIS: RGBColor = RGBColor(170, 170, 170);
/// screen coordinates are clamped to this range before the cast to pixels
const PIXEL_LIMIT: f64 = 1e6;

#[derive(Debug, Clone, Default)]
pub struct SnapshotOptions {
    /// draw grid numbers, tangent labels and the hover label (needs system fonts)
    pub labels: bool,
    /// pointer position for the hover point and the tangents
    pub mouse: Option<Vector2<f64>>,
}

fn px(x: f64, y: f64) -> (i32, i32) {
    (
        x.clamp(-PIXEL_LIMIT, PIXEL_LIMIT) as i32,
        y.clamp(-PIXEL_LIMIT, PIXEL_LIMIT) as i32,
    )
}

fn draw_err<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Io(format!("cannot draw snapshot: {}", e))
}

/// Renders grid, axes, area fills, curves and pointer overlays of `scene` into `path`.
///
/// # Arguments
/// * `scene` - replotted scene; its camera view gives the image size
/// * `path` - output PNG file
/// * `options` - overlays to draw
pub fn render_snapshot(
    scene: &Scene,
    path: &Path,
    options: &SnapshotOptions,
) -> Result<(), PlotError> {
    let camera = &scene.camera;
    let (w, h) = (camera.view.x.max(1.0) as u32, camera.view.y.max(1.0) as u32);
    let root = BitMapBackend::new(path, (w, h)).into_drawing_area();
    root.fill(&BACKGROUND).map_err(draw_err)?;

    // grid
    let half = camera.world_extent() / 2.0;
    let (xs, xe) = (camera.position.x - half.x, camera.position.x + half.x);
    let (ys, ye) = (camera.position.y - half.y, camera.position.y + half.y);
    let step = grid_step(xe - xs);
    let font = ("sans-serif", 13).into_font().color(&AXIS);
    let mut gx = (xs / step).floor() * step;
    while gx <= xe {
        let s = camera.world_to_screen(Vector2::new(gx, 0.0));
        root.draw(&PathElement::new(vec![px(s.x, 0.0), px(s.x, h as f64)], &GRID))
            .map_err(draw_err)?;
        if options.labels {
            root.draw(&Text::new(format_number(gx), px(s.x + 3.0, s.y + 3.0), font.clone()))
                .map_err(draw_err)?;
        }
        gx += step;
    }
    let mut gy = (ys / step).floor() * step;
    while gy <= ye {
        let s = camera.world_to_screen(Vector2::new(0.0, gy));
        root.draw(&PathElement::new(vec![px(0.0, s.y), px(w as f64, s.y)], &GRID))
            .map_err(draw_err)?;
        if options.labels && gy.abs() > step / 2.0 {
            root.draw(&Text::new(format_number(gy), px(s.x + 3.0, s.y + 3.0), font.clone()))
                .map_err(draw_err)?;
        }
        gy += step;
    }
    let origin = camera.world_to_screen(Vector2::zeros());
    root.draw(&PathElement::new(vec![px(origin.x, 0.0), px(origin.x, h as f64)], &AXIS))
        .map_err(draw_err)?;
    root.draw(&PathElement::new(vec![px(0.0, origin.y), px(w as f64, origin.y)], &AXIS))
        .map_err(draw_err)?;

    // curves
    for expr in scene.expressions().iter().filter(|e| !e.should_skip()) {
        let [r, g, b] = expr.color;
        let color = RGBColor(r, g, b);
        for area in &expr.area_plots {
            let polygon: Vec<(i32, i32)> = area_polygon(area, camera)
                .into_iter()
                .map(|(x, y)| px(x, y))
                .collect();
            if polygon.len() > 2 {
                root.draw(&Polygon::new(polygon, color.mix(0.25).filled()))
                    .map_err(draw_err)?;
            }
        }
        for points in &expr.plots {
            for line in polylines(points) {
                let line: Vec<(i32, i32)> = line.into_iter().map(|(x, y)| px(x, y)).collect();
                root.draw(&PathElement::new(line, color.stroke_width(2)))
                    .map_err(draw_err)?;
            }
        }
    }

    // pointer overlays
    if let Some(mouse) = options.mouse {
        for tangent in scene.tangents(mouse) {
            let [r, g, b] = tangent.color;
            let color = RGBColor(r, g, b);
            let [a, z] = tangent.segment;
            root.draw(&PathElement::new(vec![px(a.0, a.1), px(z.0, z.1)], &color.mix(0.7)))
                .map_err(draw_err)?;
            let p = px(tangent.point.x, tangent.point.y);
            root.draw(&Circle::new(p, 4, color.filled())).map_err(draw_err)?;
            if options.labels {
                for (i, line) in tangent.label.lines().enumerate() {
                    let at = (p.0 + 8, p.1 + 8 + 15 * i as i32);
                    root.draw(&Text::new(line.to_string(), at, font.clone()))
                        .map_err(draw_err)?;
                }
            }
        }
        if let Some(hit) = scene.closest_point(mouse) {
            let [r, g, b] = hit.color;
            let p = px(hit.screen.x, hit.screen.y);
            root.draw(&Circle::new(p, 5, RGBColor(r, g, b).filled()))
                .map_err(draw_err)?;
            if options.labels {
                root.draw(&Text::new(hit.label, (p.0 + 8, p.1 - 18), font.clone()))
                    .map_err(draw_err)?;
            }
        }
    }
    root.present().map_err(draw_err)?;
    Ok(())
}
