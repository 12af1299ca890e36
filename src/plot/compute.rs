//! Background solve-and-compile jobs.
//!
//! Jobs run on a bounded rayon pool and report back over a crossbeam channel; the render
//! thread drains the channel once per frame. Every finished job raises the shared replot
//! flag.
use crate::errors::PlotError;
use crate::plot::derivative::DerivativeSet;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_lambdify::CompiledFunction;
use crate::symbolic::symbolic_solver::{Kind, solve_expression};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, error, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// stable key of an expression inside a scene
pub type ExprId = u64;

/// Shared "geometry is stale" signal, set from any thread and consumed on the render thread.
#[derive(Debug, Clone, Default)]
pub struct ReplotFlag(Arc<AtomicBool>);

impl ReplotFlag {
    pub fn new(initial: bool) -> Self {
        ReplotFlag(Arc::new(AtomicBool::new(initial)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// returns the flag and clears it
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Input of one background job
#[derive(Debug, Clone)]
pub struct ComputeJob {
    pub id: ExprId,
    pub text: String,
    /// ordered variable names at dispatch time
    pub variables: Vec<String>,
    pub derivative: bool,
}

/// Solved and compiled state of one expression
#[derive(Debug, Clone)]
pub struct Computed {
    pub kind: Kind,
    pub branches: Vec<Expr>,
    pub functions: Vec<CompiledFunction>,
    /// present when the job was asked for derivatives
    pub derivatives: Option<DerivativeSet>,
    /// variable names the functions were compiled against
    pub variables: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ComputeEvent {
    pub id: ExprId,
    pub outcome: Result<Computed, PlotError>,
}

/// Solves, compiles and optionally differentiates the committed text of an expression.
pub fn run_job(job: &ComputeJob) -> Result<Computed, PlotError> {
    let solution = solve_expression(&job.text, &job.variables)?;
    let derivatives = job.derivative.then(|| {
        DerivativeSet::build(
            &solution.branches,
            solution.kind.parameter(),
            &job.variables,
        )
    });
    Ok(Computed {
        kind: solution.kind,
        branches: solution.branches,
        functions: solution.functions,
        derivatives,
        variables: job.variables.clone(),
    })
}

pub struct ComputePool {
    pool: ThreadPool,
    sender: Sender<ComputeEvent>,
    receiver: Receiver<ComputeEvent>,
    in_flight: Arc<AtomicUsize>,
    replot: ReplotFlag,
}

impl ComputePool {
    /// Starts a pool of `threads` workers (0 lets rayon choose).
    pub fn new(threads: usize, replot: ReplotFlag) -> Result<Self, PlotError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("compute-{}", i))
            .build()
            .map_err(|e| PlotError::Pool(e.to_string()))?;
        info!("compute pool started with {} threads", pool.current_num_threads());
        let (sender, receiver) = unbounded();
        Ok(ComputePool {
            pool,
            sender,
            receiver,
            in_flight: Arc::new(AtomicUsize::new(0)),
            replot,
        })
    }

    /// Queues a job; the outcome arrives through [`Self::drain`] or [`Self::wait`].
    pub fn dispatch(&self, job: ComputeJob) {
        debug!("dispatching compute for expression {}: '{}'", job.id, job.text);
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let sender = self.sender.clone();
        let in_flight = self.in_flight.clone();
        let replot = self.replot.clone();
        self.pool.spawn(move || {
            let begin = Instant::now();
            let outcome = run_job(&job);
            match &outcome {
                Ok(c) => debug!(
                    "expression {} computed in {:?}: {} branch(es)",
                    job.id,
                    begin.elapsed(),
                    c.branches.len()
                ),
                Err(e) => info!("expression {} failed: {}", job.id, e),
            }
            let id = job.id;
            in_flight.fetch_sub(1, Ordering::AcqRel);
            replot.set();
            if sender.send(ComputeEvent { id, outcome }).is_err() {
                error!("scene dropped before expression {} finished", id);
            }
        });
    }

    /// number of dispatched jobs whose result has not been sent yet
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// all results available right now, without blocking
    pub fn drain(&self) -> Vec<ComputeEvent> {
        self.receiver.try_iter().collect()
    }

    /// Blocks up to `timeout` for the next result.
    pub fn wait(&self, timeout: Duration) -> Option<ComputeEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: ExprId, text: &str) -> ComputeJob {
        ComputeJob {
            id,
            text: text.to_string(),
            variables: Vec::new(),
            derivative: false,
        }
    }

    #[test]
    fn test_run_job_parabola() {
        let computed = run_job(&job(1, "y = x^2")).unwrap();
        assert_eq!(computed.kind, Kind::X);
        assert_eq!(computed.functions.len(), 1);
        assert!(computed.derivatives.is_none());
    }

    #[test]
    fn test_run_job_with_derivative() {
        let mut j = job(1, "y = abs(x)");
        j.derivative = true;
        let computed = run_job(&j).unwrap();
        let set = computed.derivatives.unwrap();
        assert_eq!(set.slots.len(), computed.branches.len());
        assert!(!set.is_error());
    }

    #[test]
    fn test_replot_flag_take_clears() {
        let flag = ReplotFlag::new(false);
        assert!(!flag.take());
        flag.clone().set();
        assert!(flag.is_set());
        assert!(flag.take());
        assert!(!flag.is_set());
    }

    #[test]
    fn test_pool_reports_results_and_sets_flag() {
        let flag = ReplotFlag::new(false);
        let pool = ComputePool::new(2, flag.clone()).unwrap();
        pool.dispatch(job(7, "y = 2*x + 1"));
        pool.dispatch(job(8, "y = q*x"));
        let mut events = Vec::new();
        while events.len() < 2 {
            let event = pool.wait(Duration::from_secs(10)).expect("compute timed out");
            events.push(event);
        }
        events.sort_by_key(|e| e.id);
        assert!(events[0].outcome.is_ok());
        assert_eq!(
            events[1].outcome.as_ref().unwrap_err(),
            &PlotError::UndefinedVariable(vec!["q".to_string()])
        );
        assert!(flag.is_set());
    }
}
