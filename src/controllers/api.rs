//! controllers::api — high-level entry points of the reference controller.
//!
//! Purpose
//! -------
//! Wire a fitting problem to a cost function and its derivative engines
//! ([`build_cost_func`]), then minimize it with one of the argmin solvers
//! ([`fit`]).
//!
//! Key behaviors
//! -------------
//! - [`build_cost_func`] resolves the cost function, Jacobian and (optionally)
//!   Hessian by their configuration keys, validates the problem against the
//!   cost function, and refuses derivative methods declared incompatible
//!   with the problem format.
//! - [`fit`] checks the minimizer against the cost function's algorithm-type
//!   restrictions before building and running the solver.
//!
//! Invariants & assumptions
//! ------------------------
//! - The Jacobian is shared (`Rc`) between the cost function and the
//!   Hessian engine that builds on it.
//! - `fit` never mutates the cost function; cache state is its only
//!   side effect.
//!
//! Downstream usage
//! ----------------
//! ```ignore
//! let config = CostFuncConfig::new("weighted_nlls", "scipy").with_jac_num_method("3-point");
//! let cost = build_cost_func(problem, &config)?;
//! let outcome = fit(cost.as_ref(), p0, "lbfgs_more_thuente".parse()?, &FitOptions::default())?;
//! ```
use crate::{
    controllers::{
        adapter::CostFuncAdapter,
        algorithm_check::ALGORITHM_CHECK,
        builders::{
            build_lbfgs_hager_zhang, build_lbfgs_more_thuente, build_nelder_mead,
            build_steepest_descent,
        },
        options::{FitOptions, FitOutcome, LineSearcher, Minimizer},
        run::run_solver,
    },
    cost_func::{CostFunc, create_cost_func},
    errors::{FitError, FitResult},
    hessian::resolve_hessian,
    jacobian::{Jacobian, resolve_jacobian},
    problem::FittingProblem,
    types::{Grad, Params},
};
use std::rc::Rc;
use tracing::debug;

/// Configuration keys selecting a cost function and its derivative engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostFuncConfig {
    pub cost_func: String,
    pub jac_method: String,
    pub jac_num_method: Option<String>,
    /// `None` leaves the Hessian slot empty.
    pub hes_method: Option<String>,
    pub hes_num_method: Option<String>,
}

impl CostFuncConfig {
    pub fn new(cost_func: &str, jac_method: &str) -> Self {
        Self {
            cost_func: cost_func.to_string(),
            jac_method: jac_method.to_string(),
            jac_num_method: None,
            hes_method: None,
            hes_num_method: None,
        }
    }

    pub fn with_jac_num_method(mut self, method: &str) -> Self {
        self.jac_num_method = Some(method.to_string());
        self
    }

    pub fn with_hessian(mut self, hes_method: &str, num_method: Option<&str>) -> Self {
        self.hes_method = Some(hes_method.to_string());
        self.hes_num_method = num_method.map(str::to_string);
        self
    }
}

impl Default for CostFuncConfig {
    fn default() -> Self {
        Self::new("nlls", "best_available")
    }
}

/// Build the configured cost function for `problem` and attach its engines.
///
/// # Errors
/// - Unknown keys (`UnknownCostFunc`, `UnknownJacobian`, `UnknownHessian`).
/// - `IncompatibleCostFunction` from `validate_problem`.
/// - Engine construction and method-selection errors.
/// - `NoJacobian` / `NoHessian` when the selected method is declared
///   incompatible with the problem format.
pub fn build_cost_func(
    problem: Rc<dyn FittingProblem>, config: &CostFuncConfig,
) -> FitResult<Box<dyn CostFunc>> {
    let mut cost_func = create_cost_func(&config.cost_func)?.build(problem.clone())?;
    cost_func.validate_problem()?;

    let jacobian: Rc<dyn Jacobian> = Rc::from(resolve_jacobian(
        &config.jac_method,
        config.jac_num_method.as_deref(),
        problem.clone(),
    )?);
    if !jacobian.is_method_compatible(jacobian.method(), problem.format()) {
        return Err(FitError::NoJacobian {
            reason: format!(
                "Method '{}' of the {} Jacobian cannot be used with '{}' problems.",
                jacobian.method(),
                jacobian.name(),
                problem.format()
            ),
        });
    }
    cost_func.set_jacobian(jacobian.clone());

    if let Some(hes_method) = &config.hes_method {
        let hessian = resolve_hessian(
            hes_method,
            config.hes_num_method.as_deref(),
            problem.clone(),
            jacobian,
        )?;
        if !hessian.is_method_compatible(hessian.method(), problem.format()) {
            return Err(FitError::NoHessian {
                reason: format!(
                    "Method '{}' of the {} Hessian cannot be used with '{}' problems.",
                    hessian.method(),
                    hessian.name(),
                    problem.format()
                ),
            });
        }
        cost_func.set_hessian(hessian);
    }
    debug!(cost_func = cost_func.name(), problem = problem.name(), "cost function ready");
    Ok(cost_func)
}

/// Minimize `cost_func` from `p0` with `minimizer`.
///
/// # Errors
/// - `IncompatibleCostFunction` / `IncompatibleMinimizer` from the
///   cost-function checks.
/// - Solver configuration errors (tolerances rejected by argmin).
/// - Any evaluation or runtime error raised while the solver runs.
pub fn fit(
    cost_func: &dyn CostFunc, p0: Params, minimizer: Minimizer, opts: &FitOptions,
) -> FitResult<FitOutcome> {
    cost_func.validate_problem()?;
    cost_func.validate_algorithm_type(ALGORITHM_CHECK, minimizer.as_str())?;

    let problem = CostFuncAdapter::new(cost_func);
    match minimizer {
        Minimizer::Lbfgs(LineSearcher::MoreThuente) => {
            let solver = build_lbfgs_more_thuente(opts)?;
            run_solver::<_, Grad>(p0, opts, problem, solver, minimizer)
        }
        Minimizer::Lbfgs(LineSearcher::HagerZhang) => {
            let solver = build_lbfgs_hager_zhang(opts)?;
            run_solver::<_, Grad>(p0, opts, problem, solver, minimizer)
        }
        Minimizer::NelderMead => {
            let solver = build_nelder_mead(&p0, opts)?;
            run_solver::<_, ()>(p0, opts, problem, solver, minimizer)
        }
        Minimizer::SteepestDescent => {
            run_solver::<_, Grad>(p0, opts, problem, build_steepest_descent(), minimizer)
        }
    }
}
