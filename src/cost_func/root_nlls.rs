//! cost_func::root_nlls — root (Hellinger) non-linear least squares.
//!
//! `r = √y - √f(x, p)`. One type serves both registry keys `root_nlls` and
//! `hellinger_nlls`; they share the residual law and differ only in name.
//!
//! Chain rule, per observation `i`:
//! - `∂r_i = -J_i / (2 √f_i)`
//! - `∂²r_i = J_iᵀ J_i / (4 f_i^{3/2}) - H_i / (2 √f_i)`
use crate::{
    cost_func::{
        nlls_base::{
            self, cached_residuals, effective_mask, masked_scale, model_values, residual_inputs,
        },
        traits::{CostFunc, CostFuncCore},
    },
    errors::{FitError, FitResult},
    problem::FittingProblem,
    types::{CostHessian, DataOverride, Grad, JacobianMatrix, Params, ResidualHessian, Residuals},
};
use ndarray::{Array1, Axis};
use std::rc::Rc;

/// Which registry key an instance answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootVariant {
    Root,
    Hellinger,
}

pub struct RootNLLSCostFunc {
    core: CostFuncCore,
    variant: RootVariant,
}

impl RootNLLSCostFunc {
    pub fn new(problem: Rc<dyn FittingProblem>) -> Self {
        Self { core: CostFuncCore::new(problem), variant: RootVariant::Root }
    }

    pub fn hellinger(problem: Rc<dyn FittingProblem>) -> Self {
        Self { core: CostFuncCore::new(problem), variant: RootVariant::Hellinger }
    }

    pub fn variant(&self) -> RootVariant {
        self.variant
    }

    fn mask(&self, data: &DataOverride<'_>) -> Option<Array1<bool>> {
        effective_mask(&self.core, data)
    }
}

impl CostFunc for RootNLLSCostFunc {
    fn core(&self) -> &CostFuncCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CostFuncCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        match self.variant {
            RootVariant::Root => "root_nlls",
            RootVariant::Hellinger => "hellinger_nlls",
        }
    }

    fn eval_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<f64> {
        nlls_base::eval_cost(self, params, data)
    }

    fn eval_r(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<Residuals> {
        cached_residuals(&self.core, params, data, || {
            let inputs = residual_inputs(&self.core, params, data, None)?;
            let mut r = inputs.y.mapv(f64::sqrt) - inputs.f.mapv(f64::sqrt);
            inputs.apply_mask(&mut r);
            Ok(r)
        })
    }

    fn jac_res(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<JacobianMatrix> {
        let f = model_values(&self.core, params, data)?;
        let jac = self.jacobian()?.eval(params, data.x)?;
        let scale = masked_scale(f.mapv(|fi| -1.0 / (2.0 * fi.sqrt())), self.mask(data).as_ref());
        jac.scale_rows(scale.view())
    }

    fn jac_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<Grad> {
        nlls_base::jac_cost(self, params, data)
    }

    fn hes_res(
        &self, params: &Params, data: &DataOverride<'_>,
    ) -> FitResult<(ResidualHessian, JacobianMatrix)> {
        let f = model_values(&self.core, params, data)?;
        let jac = self.jacobian()?.eval(params, data.x)?;
        let mut hes = self.hessian()?.eval(params, data.x)?;
        if hes.dim().2 != f.len() || jac.nrows() != f.len() {
            return Err(FitError::HessianShapeMismatch {
                expected: (params.len(), params.len(), f.len()),
                found: hes.shape().to_vec(),
            });
        }
        let mask = self.mask(data);
        for (i, &fi) in f.iter().enumerate() {
            let mut slice = hes.index_axis_mut(Axis(2), i);
            if mask.as_ref().is_some_and(|m| m[i]) {
                slice.fill(0.0);
                continue;
            }
            let row = jac.row(i);
            let col = row.view().insert_axis(Axis(1));
            let outer = col.dot(&col.t());
            let updated = outer / (4.0 * fi.powf(1.5)) - slice.to_owned() / (2.0 * fi.sqrt());
            slice.assign(&updated);
        }
        Ok((hes, self.jac_res(params, data)?))
    }

    fn hes_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<CostHessian> {
        nlls_base::hes_cost(self, params, data)
    }
}
