//! One user-authored relation: text editing with debounce, solved state and plotted points.
//!
//! ```text
//! idle -> editing -> (500 ms quiet) commit -> computing -> ready | error
//! ```
//! Time is passed in by the caller so the debounce is deterministic.
use crate::errors::PlotError;
use crate::plot::compute::{ComputeJob, Computed, ExprId};
use crate::plot::coordinates::{Camera, SampleWindow};
use crate::plot::derivative::DerivativeSet;
use crate::plot::sampler::{area_fill, clip_to_view, evaluate, to_screen};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_lambdify::CompiledFunction;
use crate::symbolic::symbolic_solver::Kind;
use log::{debug, warn};
use ndarray::Array2;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// quiet period after the last keystroke before the text is committed
pub const DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct Expression {
    pub id: ExprId,
    /// committed text, the input of the solver
    pub raw: String,
    /// text as currently typed
    pub buffer: String,
    pub edit_time: Option<Instant>,
    pub editing: bool,
    pub color: [u8; 3],
    pub hidden: bool,
    pub collapsed: bool,
    pub kind: Kind,
    pub error: bool,
    pub error_reason: String,
    pub computing: bool,
    /// a recompute was asked for while a job was running
    pub recompute_requested: bool,
    pub branches: Vec<Expr>,
    pub functions: Vec<CompiledFunction>,
    pub show_derivative: bool,
    pub derivatives: DerivativeSet,
    pub show_area: bool,
    /// screen-space points, one array per branch
    pub plots: Vec<Array2<f64>>,
    pub area_plots: Vec<Array2<f64>>,
}

impl Expression {
    pub fn new(id: ExprId, text: &str, color: [u8; 3]) -> Self {
        Expression {
            id,
            raw: text.to_string(),
            buffer: text.to_string(),
            edit_time: None,
            editing: false,
            color,
            hidden: false,
            collapsed: false,
            kind: Kind::X,
            error: false,
            error_reason: String::new(),
            computing: false,
            recompute_requested: false,
            branches: Vec::new(),
            functions: Vec::new(),
            show_derivative: false,
            derivatives: DerivativeSet::default(),
            show_area: false,
            plots: Vec::new(),
            area_plots: Vec::new(),
        }
    }

    /// Records a keystroke; the timer restarts only when the text actually changed.
    pub fn edit(&mut self, text: &str, now: Instant) {
        if text == self.buffer {
            return;
        }
        self.buffer = text.to_string();
        self.edit_time = Some(now);
        self.editing = true;
    }

    /// Commits the buffer once the input has been quiet for [`DEBOUNCE`].
    ///
    /// # Returns
    /// `true` when the caller must dispatch a compute for the committed text.
    pub fn check_edit(&mut self, now: Instant) -> bool {
        if self.computing || !self.editing {
            return false;
        }
        let quiet = self
            .edit_time
            .is_none_or(|t| now.saturating_duration_since(t) >= DEBOUNCE);
        if !quiet {
            return false;
        }
        self.editing = false;
        self.raw = self.buffer.clone();
        debug!("expression {} committed '{}'", self.id, self.raw);
        true
    }

    /// Marks the expression as computing and builds the job for the pool.
    pub fn begin_compute(&mut self, variables: &[String]) -> ComputeJob {
        self.computing = true;
        self.recompute_requested = false;
        ComputeJob {
            id: self.id,
            text: self.raw.clone(),
            variables: variables.to_vec(),
            derivative: self.show_derivative,
        }
    }

    /// Asks for a recompute with the current text.
    ///
    /// # Returns
    /// `true` if the caller may dispatch now, `false` if the request was folded into the
    /// pending flag of a running job.
    pub fn request_recompute(&mut self) -> bool {
        if self.computing {
            self.recompute_requested = true;
            return false;
        }
        true
    }

    /// Applies a finished job.
    ///
    /// # Returns
    /// `true` if a recompute was requested while the job ran and must be dispatched now.
    pub fn apply(&mut self, outcome: Result<Computed, PlotError>) -> bool {
        self.computing = false;
        match outcome {
            Ok(computed) => {
                self.kind = computed.kind;
                self.branches = computed.branches;
                self.functions = computed.functions;
                self.error = false;
                self.error_reason.clear();
                // display may have been toggled while the job ran
                self.derivatives = match (self.show_derivative, computed.derivatives) {
                    (false, _) => DerivativeSet::default(),
                    (true, Some(derivatives)) => derivatives,
                    (true, None) => DerivativeSet::build(
                        &self.branches,
                        self.kind.parameter(),
                        &computed.variables,
                    ),
                };
            }
            Err(e) => self.set_error(e.to_string()),
        }
        std::mem::take(&mut self.recompute_requested)
    }

    /// Drops the solved state of an empty text; an empty slot is not an error.
    pub fn clear_solution(&mut self) {
        self.error = false;
        self.error_reason.clear();
        self.branches.clear();
        self.functions.clear();
        self.derivatives = DerivativeSet::default();
        self.plots.clear();
        self.area_plots.clear();
    }

    fn set_error(&mut self, reason: String) {
        self.error = true;
        self.error_reason = reason;
        self.branches.clear();
        self.functions.clear();
        self.derivatives = DerivativeSet::default();
        self.plots.clear();
        self.area_plots.clear();
    }

    /// Turns derivative display on or off; derivatives are built from the current branches.
    pub fn set_show_derivative(&mut self, on: bool, variables: &[String]) {
        self.show_derivative = on;
        if on && !self.error {
            self.derivatives = DerivativeSet::build(&self.branches, self.kind.parameter(), variables);
        } else if !on {
            self.derivatives = DerivativeSet::default();
        }
    }

    pub fn should_skip(&self) -> bool {
        self.hidden || self.error
    }

    pub fn should_skip_derivative(&self) -> bool {
        self.should_skip() || self.derivatives.is_error() || !self.show_derivative
    }

    /// number of plotted points over all branches
    pub fn point_count(&self) -> usize {
        self.plots.iter().map(|p| p.nrows()).sum()
    }

    /// Samples every branch over the window matching the kind and maps the points to screen
    /// space. An evaluation failure turns the expression into an error.
    pub fn plot(
        &mut self,
        x_window: &SampleWindow,
        y_window: &SampleWindow,
        camera: &Camera,
        values: &[f64],
    ) {
        if self.error || self.functions.is_empty() {
            self.plots.clear();
            self.area_plots.clear();
            return;
        }
        let params = match self.kind {
            Kind::X => x_window.samples(),
            Kind::Y => y_window.samples(),
        };
        let kind = self.kind;
        let sampled: Result<Vec<Array2<f64>>, PlotError> = self
            .functions
            .par_iter()
            .map(|func| {
                let ys = evaluate(func, &params, values)?;
                Ok(to_screen(camera, kind, &params, &ys))
            })
            .collect();
        let mut plots = match sampled {
            Ok(plots) => plots,
            Err(e) => {
                warn!("expression {} cannot be sampled: {}", self.id, e);
                self.set_error(e.to_string());
                return;
            }
        };
        if self.show_area {
            self.area_plots = plots.iter().map(|p| area_fill(p, camera.view.y)).collect();
        } else {
            self.area_plots.clear();
            if plots.len() > 1 {
                plots = plots.iter().map(|p| clip_to_view(p, camera.view)).collect();
            }
        }
        self.plots = plots;
    }
}
