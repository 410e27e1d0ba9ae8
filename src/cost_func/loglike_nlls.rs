//! cost_func::loglike_nlls — weighted least squares for Bayesian fitting.
//!
//! Same residual law as the weighted form, without NaN substitution, and
//! incompatible with every non-MCMC algorithm type. Exposes
//! `eval_loglike(p) = -½ · eval_cost(p)`.
use crate::{
    cost_func::{
        nlls_base,
        traits::{CostFunc, CostFuncCore},
        weighted_nlls::{weighted_hes_res, weighted_jac_res, weighted_residuals},
    },
    errors::FitResult,
    problem::FittingProblem,
    types::{CostHessian, DataOverride, Grad, JacobianMatrix, Params, ResidualHessian, Residuals},
};
use std::rc::Rc;

/// Algorithm types a log-likelihood objective cannot be minimized with.
pub const LOGLIKE_INVALID_ALGORITHM_TYPES: &[&str] = &[
    "ls",
    "deriv_free",
    "general",
    "simplex",
    "trust_region",
    "levenberg-marquardt",
    "gauss_newton",
    "bfgs",
    "conjugate_gradient",
    "steepest_descent",
    "global_optimization",
];

pub struct LoglikeNLLSCostFunc {
    core: CostFuncCore,
}

impl LoglikeNLLSCostFunc {
    pub fn new(problem: Rc<dyn FittingProblem>) -> Self {
        Self { core: CostFuncCore::new(problem) }
    }
}

impl CostFunc for LoglikeNLLSCostFunc {
    fn core(&self) -> &CostFuncCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CostFuncCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "loglike_nlls"
    }

    fn invalid_algorithm_types(&self) -> &'static [&'static str] {
        LOGLIKE_INVALID_ALGORITHM_TYPES
    }

    fn eval_loglike(&self, params: &Params) -> FitResult<f64> {
        Ok(-0.5 * self.eval_cost(params, &DataOverride::none())?)
    }

    fn eval_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<f64> {
        nlls_base::eval_cost(self, params, data)
    }

    fn eval_r(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<Residuals> {
        weighted_residuals(&self.core, params, data, self.name(), false)
    }

    fn jac_res(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<JacobianMatrix> {
        weighted_jac_res(self, params, data)
    }

    fn jac_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<Grad> {
        nlls_base::jac_cost(self, params, data)
    }

    fn hes_res(
        &self, params: &Params, data: &DataOverride<'_>,
    ) -> FitResult<(ResidualHessian, JacobianMatrix)> {
        weighted_hes_res(self, params, data)
    }

    fn hes_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<CostHessian> {
        nlls_base::hes_cost(self, params, data)
    }
}
