//! cost_func::nlls — unweighted non-linear least squares.
//!
//! `r = y - f(x, p)`, `cost = Σ rᵢ²`. The residual Jacobian and Hessian are
//! the negated model derivatives.
use crate::{
    cost_func::{
        nlls_base::{self, cached_residuals, effective_mask, masked_scale, residual_inputs},
        traits::{CostFunc, CostFuncCore},
    },
    errors::FitResult,
    problem::FittingProblem,
    types::{CostHessian, DataOverride, Grad, JacobianMatrix, Params, ResidualHessian, Residuals},
};
use ndarray::Array1;
use std::rc::Rc;

pub struct NLLSCostFunc {
    core: CostFuncCore,
}

impl NLLSCostFunc {
    pub fn new(problem: Rc<dyn FittingProblem>) -> Self {
        Self { core: CostFuncCore::new(problem) }
    }

    fn row_scale(&self, n_rows: usize, data: &DataOverride<'_>) -> Array1<f64> {
        masked_scale(Array1::from_elem(n_rows, -1.0), effective_mask(&self.core, data).as_ref())
    }
}

impl CostFunc for NLLSCostFunc {
    fn core(&self) -> &CostFuncCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CostFuncCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "nlls"
    }

    fn eval_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<f64> {
        nlls_base::eval_cost(self, params, data)
    }

    fn eval_r(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<Residuals> {
        cached_residuals(&self.core, params, data, || {
            let inputs = residual_inputs(&self.core, params, data, None)?;
            let mut r = &inputs.y - &inputs.f;
            inputs.apply_mask(&mut r);
            Ok(r)
        })
    }

    fn jac_res(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<JacobianMatrix> {
        let jac = self.jacobian()?.eval(params, data.x)?;
        jac.scale_rows(self.row_scale(jac.nrows(), data).view())
    }

    fn jac_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<Grad> {
        nlls_base::jac_cost(self, params, data)
    }

    fn hes_res(
        &self, params: &Params, data: &DataOverride<'_>,
    ) -> FitResult<(ResidualHessian, JacobianMatrix)> {
        let mut hes = self.hessian()?.eval(params, data.x)?;
        let scale = self.row_scale(hes.dim().2, data);
        nlls_base::scale_hessian_slices(&mut hes, scale.view());
        Ok((hes, self.jac_res(params, data)?))
    }

    fn hes_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<CostHessian> {
        nlls_base::hes_cost(self, params, data)
    }
}
