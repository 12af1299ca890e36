#![allow(non_snake_case)]
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{error, info};
use nalgebra::Vector2;

use RustedGrapher::Utils::logger::{init_logger, parse_loglevel};
use RustedGrapher::Utils::persistence::DEFAULT_STATE_PATH;
use RustedGrapher::Utils::plots::{SnapshotOptions, render_snapshot};
use RustedGrapher::errors::PlotError;
use RustedGrapher::plot::scene::Scene;

/// Solve and plot relations such as `y = x^2` or `x^2 + y^2 = 25`
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Load variables, expressions and settings from a state file
    #[clap(long)]
    state: Option<PathBuf>,

    /// Expression to plot (repeatable)
    #[clap(short, long = "expr")]
    exprs: Vec<String>,

    /// Variable as `name=value` (repeatable)
    #[clap(long = "var", value_parser = parse_var)]
    vars: Vec<(String, f64)>,

    /// Viewport width in pixels
    #[clap(long, default_value_t = 800)]
    width: u32,

    /// Viewport height in pixels
    #[clap(long, default_value_t = 600)]
    height: u32,

    /// Samples across the visible axis
    #[clap(long)]
    precision: Option<usize>,

    /// Show derivatives of every expression
    #[clap(long)]
    derivative: bool,

    /// Fill the area under every expression
    #[clap(long)]
    area: bool,

    /// Pointer position `sx,sy` for the hover and tangent readouts
    #[clap(long, value_parser = parse_point)]
    mouse: Option<(f64, f64)>,

    /// Write a PNG snapshot
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Draw text labels in the snapshot
    #[clap(long)]
    labels: bool,

    /// Save the resulting state (to --state, or the default location)
    #[clap(long)]
    save: bool,

    /// debug, info, warn, error or off
    #[clap(long)]
    loglevel: Option<String>,

    /// Also write the log to a timestamped file
    #[clap(long)]
    log_file: bool,

    /// Compute threads, 0 for one per core
    #[clap(long, default_value_t = 0)]
    threads: usize,

    /// Seconds to wait for background computes
    #[clap(long, default_value_t = 30)]
    timeout: u64,
}

fn parse_var(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("bad value for {}: {}", name, e))?;
    Ok((name.trim().to_string(), value))
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected sx,sy, got '{}'", s))?;
    let x = x.trim().parse().map_err(|e| format!("{}", e))?;
    let y = y.trim().parse().map_err(|e| format!("{}", e))?;
    Ok((x, y))
}

fn run(args: Args) -> Result<(), PlotError> {
    let view = Vector2::new(args.width as f64, args.height as f64);
    let mut scene = match &args.state {
        Some(path) => {
            let mut scene = Scene::load(path, args.threads)?;
            scene.resize(view);
            scene
        }
        None => Scene::new(view, args.threads)?,
    };
    if let Some(precision) = args.precision {
        scene.set_precision(precision);
    }
    for (name, value) in &args.vars {
        match scene.variables().get(name) {
            Some(_) => scene.set_variable(name, *value)?,
            None => scene.add_variable(name, *value)?,
        }
    }
    for text in &args.exprs {
        scene.add_expression(text);
    }

    let begin = Instant::now();
    if !scene.wait_for_computes(Duration::from_secs(args.timeout)) {
        error!("gave up waiting for background computes");
    }
    info!("computes finished in {:?}", begin.elapsed());

    let ids: Vec<_> = scene.expressions().iter().map(|e| e.id).collect();
    for id in ids {
        if args.derivative {
            scene.set_show_derivative(id, true);
        }
        if args.area {
            scene.set_show_area(id, true);
        }
    }
    scene.update(Instant::now());

    println!("{}", scene.statistics_table());
    for expr in scene.expressions() {
        if expr.error {
            println!("[{}] {}: {}", expr.id, expr.raw, expr.error_reason);
        } else if expr.show_derivative {
            match &expr.derivatives.error {
                Some(reason) => println!("[{}] d/d{}: {}", expr.id, expr.kind, reason),
                None => println!(
                    "[{}] d/d{}: {}",
                    expr.id,
                    expr.kind,
                    expr.derivatives.texts().join(" ; ")
                ),
            }
        }
    }

    let mouse = args.mouse.map(|(x, y)| Vector2::new(x, y));
    if let Some(mouse) = mouse {
        println!("{}", scene.mouse_readout(mouse));
        if let Some(hit) = scene.closest_point(mouse) {
            println!("closest point {}", hit.label);
        }
        for tangent in scene.tangents(mouse) {
            println!("tangent {}", tangent.label.replace('\n', ", "));
        }
    }

    if let Some(output) = &args.output {
        let options = SnapshotOptions {
            labels: args.labels,
            mouse,
        };
        render_snapshot(&scene, output, &options)?;
        info!("snapshot written to {}", output.display());
    }

    if args.save {
        let path = args
            .state
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH));
        scene.save(&path)?;
    }
    Ok(())
}

fn main() -> Result<(), PlotError> {
    let args = Args::parse();
    let level = parse_loglevel(args.loglevel.as_deref())?;
    init_logger(level, args.log_file)?;
    let res = run(args);
    if let Err(e) = &res {
        error!("{}", e);
    }
    res
}
