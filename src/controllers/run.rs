//! Execution helper that runs an `argmin` solver on a cost function and
//! returns a crate-friendly [`FitOutcome`].
use crate::{
    controllers::{
        adapter::CostFuncAdapter,
        options::{FitOptions, FitOutcome, Minimizer},
    },
    errors::FitResult,
    types::{Grad, Params},
};
use argmin::core::{CostFunction, Executor, IterState, Solver, State};
use argmin_math::ArgminL2Norm;
use tracing::{debug, info};

/// Norm of whatever the solver state stores as its gradient.
///
/// Gradient-based solvers keep a `Grad`; Nelder–Mead keeps `()`.
pub trait GradientNorm {
    fn norm(&self) -> Option<f64>;
}

impl GradientNorm for Grad {
    fn norm(&self) -> Option<f64> {
        Some(self.l2_norm())
    }
}

impl GradientNorm for () {
    fn norm(&self) -> Option<f64> {
        None
    }
}

/// Run an `argmin` solver over a [`CostFuncAdapter`].
///
/// This is the shared runner for every [`Minimizer`]. It wires up the
/// adapter, the solver, the initial parameters `p0`, the optional slog
/// observer (feature `obs_slog`, when `opts.verbose`) and `max_iters`, then
/// executes the solver and converts its final state into a [`FitOutcome`].
///
/// # Type Parameters
/// - `S`: any solver over `IterState<Params, G, (), (), (), f64>`.
/// - `G`: the gradient slot of that state (`Grad` or `()`).
///
/// # Errors
/// - argmin runtime failures, including cost-function errors raised inside
///   the adapter, via `From<argmin::core::Error>`.
/// - Outcome validation errors (missing or non-finite estimate or cost).
pub fn run_solver<'a, S, G>(
    p0: Params, opts: &FitOptions, problem: CostFuncAdapter<'a>, solver: S,
    minimizer: Minimizer,
) -> FitResult<FitOutcome>
where
    S: Solver<CostFuncAdapter<'a>, IterState<Params, G, (), (), (), f64>> + Send + 'static,
    G: GradientNorm + Clone,
    IterState<Params, G, (), (), (), f64>: State<Param = Params, Float = f64>,
{
    let initial_cost = problem.cost(&p0)?;
    debug!(
        minimizer = minimizer.as_str(),
        cost_func = problem.cost_func.name(),
        initial_cost,
        n_params = p0.len(),
        "starting minimizer"
    );

    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(p0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad_norm = result.take_gradient().and_then(|g| g.norm());
    let outcome = FitOutcome::new(
        result.take_best_param(),
        result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad_norm,
        opts.tols.tol_grad,
        minimizer,
    )?;
    info!(
        minimizer = minimizer.as_str(),
        cost = outcome.cost,
        iterations = outcome.iterations,
        converged = outcome.converged,
        status = %outcome.status,
        "minimizer finished"
    );
    Ok(outcome)
}
