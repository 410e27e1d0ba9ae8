//! cost_func::poisson — Poisson deviance.
//!
//! Purpose
//! -------
//! Fit count data by minimizing
//! `Σ_i [ y_i log y_i - y_i log f_i - (y_i - f_i) ]`, which is not a sum of
//! squared residuals: there is no `eval_r`, and the derivatives are those of
//! the per-point deviance terms.
//!
//! Key behaviors
//! -------------
//! - `a log b` is taken as 0 whenever `a == 0`, explicitly, since `log 0`
//!   is `-inf`.
//! - Non-positive model values are replaced by `f64::MAX` before the logs,
//!   heavily penalizing invalid trial parameters instead of failing.
//! - NaN deviance terms and derivative entries are replaced by 0.
//! - Negative y is rejected by `eval_cost` (`NegativeData`) and by the
//!   pre-flight `validate_problem` (`IncompatibleCostFunction`).
//!
//! Derivatives
//! -----------
//! - `∂d_i = J_i (1 - y_i / f_i)`, gradient = column sums.
//! - `∂²d_i = H_i - y_i / f_i · (H_i - J_iᵀ J_i / f_i)`, cost Hessian = sum
//!   over observations.
use crate::{
    cache::cached_func_values,
    cost_func::{
        nlls_base::{ResidualInputs, masked_scale, residual_inputs},
        traits::{CostFunc, CostFuncCore},
    },
    errors::{FitError, FitResult},
    problem::FittingProblem,
    types::{CostHessian, DataOverride, Grad, JacobianMatrix, Params, ResidualHessian, Residuals},
};
use ndarray::{Array1, ArrayView1, Axis};
use std::rc::Rc;

/// Algorithm types unsuitable for a non least-squares objective.
pub const POISSON_INVALID_ALGORITHM_TYPES: &[&str] = &["ls"];

pub struct PoissonCostFunc {
    core: CostFuncCore,
}

impl PoissonCostFunc {
    pub fn new(problem: Rc<dyn FittingProblem>) -> Self {
        Self { core: CostFuncCore::new(problem) }
    }

    /// Lengths checked, y non-negative, model evaluated.
    fn inputs(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<ResidualInputs> {
        let y = data.y.as_ref().map(|y| y.view()).unwrap_or_else(|| self.core.problem().data_y());
        if let Some((index, &value)) = y.iter().enumerate().find(|(_, v)| **v < 0.0) {
            return Err(FitError::NegativeData { index, value });
        }
        residual_inputs(&self.core, params, data, None)
    }

    fn deviance(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<f64> {
        let inputs = self.inputs(params, data)?;
        let f = inputs.f.mapv(|fi| if fi <= 0.0 { f64::MAX } else { fi });
        let y = &inputs.y;
        let mut terms = safe_a_log_b(y.view(), y.view()) - safe_a_log_b(y.view(), f.view()) - (y - &f);
        terms.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
        inputs.apply_mask(&mut terms);
        Ok(terms.sum())
    }
}

/// safe_a_log_b — `a · ln b`, with the result 0 wherever `a == 0`.
///
/// Parameters
/// ----------
/// - `a`, `b`: equal-length views.
///
/// Returns
/// -------
/// - `Array1<f64>` with `a_i ln b_i`, or exactly `0` when `a_i == 0`
///   (regardless of `b_i`).
pub fn safe_a_log_b(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Array1<f64> {
    a.iter().zip(b.iter()).map(|(&ai, &bi)| if ai == 0.0 { 0.0 } else { ai * bi.ln() }).collect()
}

impl CostFunc for PoissonCostFunc {
    fn core(&self) -> &CostFuncCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CostFuncCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "poisson"
    }

    fn invalid_algorithm_types(&self) -> &'static [&'static str] {
        POISSON_INVALID_ALGORITHM_TYPES
    }

    fn is_least_squares(&self) -> bool {
        false
    }

    fn validate_problem(&self) -> FitResult<()> {
        if self.core.problem().data_y().iter().any(|&v| v < 0.0) {
            return Err(FitError::IncompatibleCostFunction {
                cost_func: "poisson",
                reason: "Problem has a negative y value.",
            });
        }
        Ok(())
    }

    fn eval_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<f64> {
        if data.is_empty() {
            cached_func_values(&self.core.cache_cost_x, params, || self.deviance(params, data))
        } else {
            self.deviance(params, data)
        }
    }

    fn eval_r(&self, _params: &Params, _data: &DataOverride<'_>) -> FitResult<Residuals> {
        Err(FitError::NotSupported { owner: self.name().to_string(), operation: "eval_r" })
    }

    fn jac_res(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<JacobianMatrix> {
        let inputs = self.inputs(params, data)?;
        let jac = self.jacobian()?.eval(params, data.x)?.substitute_nans()?;
        let ratio = &inputs.y / &inputs.f;
        let scale = masked_scale(ratio.mapv(|r| 1.0 - r), inputs.mask.as_ref());
        jac.scale_rows(scale.view())
    }

    fn jac_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<Grad> {
        Ok(self.jac_res(params, data)?.substitute_nans()?.column_sums())
    }

    fn hes_res(
        &self, params: &Params, data: &DataOverride<'_>,
    ) -> FitResult<(ResidualHessian, JacobianMatrix)> {
        let inputs = self.inputs(params, data)?;
        let jac = self.jacobian()?.eval(params, data.x)?;
        let mut hes = self.hessian()?.eval(params, data.x)?;
        let n_obs = inputs.y.len();
        if hes.dim().2 != n_obs || jac.nrows() != n_obs {
            return Err(FitError::HessianShapeMismatch {
                expected: (params.len(), params.len(), n_obs),
                found: hes.shape().to_vec(),
            });
        }
        for i in 0..n_obs {
            let mut slice = hes.index_axis_mut(Axis(2), i);
            if inputs.mask.as_ref().is_some_and(|m| m[i]) {
                slice.fill(0.0);
                continue;
            }
            let (yi, fi) = (inputs.y[i], inputs.f[i]);
            let row = jac.row(i);
            let col = row.view().insert_axis(Axis(1));
            let outer = col.dot(&col.t());
            let current = slice.to_owned();
            let updated = &current - &((&current - &(outer / fi)) * (yi / fi));
            slice.assign(&updated);
        }
        hes.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
        Ok((hes, self.jac_res(params, data)?))
    }

    fn hes_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<CostHessian> {
        let (hes, _) = self.hes_res(params, data)?;
        Ok(hes.mapv(|v| if v.is_nan() { 0.0 } else { v }).sum_axis(Axis(2)))
    }
}
