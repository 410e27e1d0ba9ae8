//! Public surface of the cost functions.
//!
//! - [`CostFunc`]: trait every cost function implements.
//! - [`CostFuncCore`]: state shared by every variant (problem handle,
//!   attached derivative engines, one-slot caches).
//!
//! Convention: `jac_res`/`hes_res` are derivatives of the *residual* `r(p)`
//! (or of the per-point cost term for non least-squares forms), obtained from
//! the attached model engines through the variant's chain rule.
use crate::{
    cache::ParamCache,
    errors::{FitError, FitResult},
    hessian::Hessian,
    jacobian::Jacobian,
    problem::FittingProblem,
    types::{CostHessian, DataOverride, Grad, JacobianMatrix, Params, ResidualHessian, Residuals},
};
use ndarray::Array1;
use std::{cell::RefCell, rc::Rc};

/// State shared by every cost function variant.
///
/// The derivative slots start empty and are filled by the controller before
/// the first derivative evaluation. The caches hold the last scalar cost,
/// the last residual vector and the last model output, each keyed on the
/// exact parameter vector.
pub struct CostFuncCore {
    problem: Rc<dyn FittingProblem>,
    jacobian: Option<Rc<dyn Jacobian>>,
    hessian: Option<Box<dyn Hessian>>,
    pub(crate) cache_cost_x: RefCell<ParamCache<f64>>,
    pub(crate) cache_rx: RefCell<ParamCache<Residuals>>,
    pub(crate) cache_fx: RefCell<ParamCache<Array1<f64>>>,
}

impl CostFuncCore {
    pub fn new(problem: Rc<dyn FittingProblem>) -> Self {
        Self {
            problem,
            jacobian: None,
            hessian: None,
            cache_cost_x: RefCell::new(ParamCache::new()),
            cache_rx: RefCell::new(ParamCache::new()),
            cache_fx: RefCell::new(ParamCache::new()),
        }
    }

    pub fn problem(&self) -> &Rc<dyn FittingProblem> {
        &self.problem
    }

    /// Drop every cached value.
    pub fn invalidate_caches(&self) {
        self.cache_cost_x.borrow_mut().invalidate();
        self.cache_rx.borrow_mut().invalidate();
        self.cache_fx.borrow_mut().invalidate();
    }
}

/// Objective evaluated by a controller.
///
/// Required:
/// - `core`/`core_mut`: access to the shared [`CostFuncCore`].
/// - `name`: registry key of the variant.
/// - `eval_cost`, `eval_r`, `jac_res`, `jac_cost`, `hes_res`, `hes_cost`.
///
/// Optional:
/// - `invalid_algorithm_types()`: algorithm types this objective rejects.
/// - `is_least_squares()`: whether `eval_cost == ‖eval_r‖²`.
/// - `eval_loglike()`: log-likelihood, for variants used in Bayesian fits.
/// - `validate_problem()`: pre-flight check of the problem data.
///
/// Every evaluation accepts a [`DataOverride`]; caches are bypassed when it
/// carries any field.
pub trait CostFunc {
    // Required methods
    fn core(&self) -> &CostFuncCore;
    fn core_mut(&mut self) -> &mut CostFuncCore;
    fn name(&self) -> &'static str;
    fn eval_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<f64>;
    fn eval_r(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<Residuals>;
    fn jac_res(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<JacobianMatrix>;
    fn jac_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<Grad>;
    fn hes_res(
        &self, params: &Params, data: &DataOverride<'_>,
    ) -> FitResult<(ResidualHessian, JacobianMatrix)>;
    fn hes_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<CostHessian>;

    // Optional methods
    fn invalid_algorithm_types(&self) -> &'static [&'static str] {
        &[]
    }

    fn is_least_squares(&self) -> bool {
        true
    }

    fn eval_loglike(&self, _params: &Params) -> FitResult<f64> {
        Err(FitError::NotSupported { owner: self.name().to_string(), operation: "eval_loglike" })
    }

    fn validate_problem(&self) -> FitResult<()> {
        Ok(())
    }

    // ---- Provided accessors ----

    fn problem(&self) -> &Rc<dyn FittingProblem> {
        self.core().problem()
    }

    /// Attached Jacobian engine.
    ///
    /// # Errors
    /// [`FitError::DerivativeNotAttached`] before `set_jacobian`.
    fn jacobian(&self) -> FitResult<&dyn Jacobian> {
        self.core()
            .jacobian
            .as_deref()
            .ok_or(FitError::DerivativeNotAttached { slot: "jacobian", cost_func: self.name() })
    }

    /// Shared handle on the attached Jacobian, for building Hessian engines
    /// that difference it.
    fn shared_jacobian(&self) -> FitResult<Rc<dyn Jacobian>> {
        self.core()
            .jacobian
            .clone()
            .ok_or(FitError::DerivativeNotAttached { slot: "jacobian", cost_func: self.name() })
    }

    /// Attached Hessian engine.
    ///
    /// # Errors
    /// [`FitError::DerivativeNotAttached`] before `set_hessian`.
    fn hessian(&self) -> FitResult<&dyn Hessian> {
        self.core()
            .hessian
            .as_deref()
            .ok_or(FitError::DerivativeNotAttached { slot: "hessian", cost_func: self.name() })
    }

    fn set_jacobian(&mut self, jacobian: Rc<dyn Jacobian>) {
        self.core_mut().jacobian = Some(jacobian);
    }

    fn set_hessian(&mut self, hessian: Box<dyn Hessian>) {
        self.core_mut().hessian = Some(hessian);
    }

    /// validate_algorithm_type — reject minimizers of an unsupported type.
    ///
    /// Parameters
    /// ----------
    /// - `algorithm_check`: `&[(&str, &[&str])]`
    ///   Algorithm type → minimizers of that type, as published by a
    ///   controller.
    /// - `minimizer`: `&str`
    ///   Minimizer about to be run.
    ///
    /// Errors
    /// ------
    /// - [`FitError::IncompatibleMinimizer`] naming the minimizer and the
    ///   first offending algorithm type.
    fn validate_algorithm_type(
        &self, algorithm_check: &[(&str, &[&str])], minimizer: &str,
    ) -> FitResult<()> {
        let invalid = self.invalid_algorithm_types();
        for (algorithm_type, minimizers) in algorithm_check {
            if minimizers.contains(&minimizer) && invalid.contains(algorithm_type) {
                return Err(FitError::IncompatibleMinimizer {
                    minimizer: minimizer.to_string(),
                    algorithm_type: algorithm_type.to_string(),
                    cost_func: self.name(),
                });
            }
        }
        Ok(())
    }
}
