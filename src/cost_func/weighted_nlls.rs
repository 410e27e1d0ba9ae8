//! cost_func::weighted_nlls — error-weighted non-linear least squares.
//!
//! `r = (y - f(x, p)) / e`. Residuals that come out NaN (e.g. padded or
//! masked points) are replaced by zero; the residual derivatives are the
//! model derivatives scaled by `-1/e` per observation. The helpers here are
//! shared with the log-likelihood form.
use crate::{
    cost_func::{
        nlls_base::{
            self, cached_residuals, effective_mask, masked_scale, required_e, residual_inputs,
            scale_hessian_slices,
        },
        traits::{CostFunc, CostFuncCore},
    },
    errors::{FitError, FitResult},
    problem::FittingProblem,
    types::{CostHessian, DataOverride, Grad, JacobianMatrix, Params, ResidualHessian, Residuals},
};
use ndarray::Array1;
use std::rc::Rc;

pub struct WeightedNLLSCostFunc {
    core: CostFuncCore,
}

impl WeightedNLLSCostFunc {
    pub fn new(problem: Rc<dyn FittingProblem>) -> Self {
        Self { core: CostFuncCore::new(problem) }
    }
}

/// `(y - f) / e` with masked points zeroed; optionally NaN → 0.
pub(crate) fn weighted_residuals(
    core: &CostFuncCore, params: &Params, data: &DataOverride<'_>, cost_func: &'static str,
    substitute_nans: bool,
) -> FitResult<Residuals> {
    cached_residuals(core, params, data, || {
        let inputs = residual_inputs(core, params, data, Some(cost_func))?;
        let e = inputs.e.as_ref().ok_or(FitError::MissingErrors { cost_func })?;
        let mut r = (&inputs.y - &inputs.f) / e;
        if substitute_nans {
            r.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
        }
        inputs.apply_mask(&mut r);
        Ok(r)
    })
}

/// Per-observation scale `-1/e`, masked rows zeroed.
fn weight_scale(cost_func: &dyn CostFunc, data: &DataOverride<'_>) -> FitResult<Array1<f64>> {
    let e = required_e(cost_func.core(), data, cost_func.name())?;
    Ok(masked_scale(e.mapv(|ei| -1.0 / ei), effective_mask(cost_func.core(), data).as_ref()))
}

/// `-J / e[:, None]`, preserving sparsity.
pub(crate) fn weighted_jac_res(
    cost_func: &dyn CostFunc, params: &Params, data: &DataOverride<'_>,
) -> FitResult<JacobianMatrix> {
    let jac = cost_func.jacobian()?.eval(params, data.x)?;
    jac.scale_rows(weight_scale(cost_func, data)?.view())
}

/// `H[:, :, i] = -H[:, :, i] / e_i`, paired with the residual Jacobian.
pub(crate) fn weighted_hes_res(
    cost_func: &dyn CostFunc, params: &Params, data: &DataOverride<'_>,
) -> FitResult<(ResidualHessian, JacobianMatrix)> {
    let mut hes = cost_func.hessian()?.eval(params, data.x)?;
    let scale = weight_scale(cost_func, data)?;
    if scale.len() != hes.dim().2 {
        return Err(FitError::HessianShapeMismatch {
            expected: (params.len(), params.len(), scale.len()),
            found: hes.shape().to_vec(),
        });
    }
    scale_hessian_slices(&mut hes, scale.view());
    Ok((hes, weighted_jac_res(cost_func, params, data)?))
}

impl CostFunc for WeightedNLLSCostFunc {
    fn core(&self) -> &CostFuncCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CostFuncCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "weighted_nlls"
    }

    fn eval_cost(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<f64> {
        nlls_base::eval_cost(self, params, data)
    }

    fn eval_r(&self, params: &Params, data: &DataOverride<'_>) -> FitResult<Residuals> {
        weighted_residuals(&self.core, params, data, self.name(), true)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_func::fixtures::{attach_analytic, linear_problem};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Weighted residuals and cost of the linear fixture.
    // - `-J / e` scaling of the residual Jacobian.
    // - Missing or mis-sized errors.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Residuals are divided by the errors.
    //
    // Given
    // -----
    // - The linear fixture with e = [2, 4, 1], p = [5].
    //
    // Expect
    // ------
    // - `eval_r == [0, -0.75, 4]`, `eval_cost == 16.5625`.
    fn eval_r_and_cost_are_weighted() {
        // Arrange
        let (problem, _) = linear_problem(Some(array![2.0, 4.0, 1.0]));
        let cost = WeightedNLLSCostFunc::new(problem);
        let p = array![5.0];

        // Act
        let r = cost.eval_r(&p, &DataOverride::none()).unwrap();
        let c = cost.eval_cost(&p, &DataOverride::none()).unwrap();

        // Assert
        assert_eq!(r, array![0.0, -0.75, 4.0]);
        assert_abs_diff_eq!(c, 16.5625, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The residual Jacobian is the model Jacobian scaled by `-1/e`.
    //
    // Given
    // -----
    // - Analytic Jacobian of ones, e = [2, 4, 1].
    //
    // Expect
    // ------
    // - `jac_res == [[-0.5], [-0.25], [-1]]`; `hes_res` slices stay zero.
    fn jac_res_scales_rows_by_errors() {
        // Arrange
        let (problem, _) = linear_problem(Some(array![2.0, 4.0, 1.0]));
        let mut cost = WeightedNLLSCostFunc::new(problem);
        attach_analytic(&mut cost);
        let p = array![5.0];

        // Act
        let jac = cost.jac_res(&p, &DataOverride::none()).unwrap();
        let (hes, jac_from_hes) = cost.hes_res(&p, &DataOverride::none()).unwrap();

        // Assert
        assert_eq!(jac.to_dense(), array![[-0.5], [-0.25], [-1.0]]);
        assert_eq!(jac_from_hes.to_dense(), jac.to_dense());
        assert!(hes.iter().all(|&v| v == 0.0));
    }

    #[test]
    // Purpose
    // -------
    // Weighting needs errors of matching length.
    //
    // Given
    // -----
    // - A problem without errors; an override whose e has length 2 while
    //   x and y have length 3.
    //
    // Expect
    // ------
    // - `MissingErrors` and `LengthMismatch { e_len: Some(2), .. }`.
    fn missing_or_short_errors_are_rejected() {
        // Arrange
        let (unweighted, _) = linear_problem(None);
        let (weighted, _) = linear_problem(Some(array![2.0, 4.0, 1.0]));
        let missing = WeightedNLLSCostFunc::new(unweighted);
        let short = WeightedNLLSCostFunc::new(weighted);
        let x = array![1.0, 8.0, 11.0];
        let y = array![6.0, 10.0, 20.0].into_dyn();
        let e = array![1.0, 1.0].into_dyn();

        // Act
        let missing_err =
            missing.eval_r(&array![5.0], &DataOverride::none()).expect_err("no errors");
        let short_err = short
            .eval_r(&array![5.0], &DataOverride::with_xye(x.view(), y.view(), e.view()))
            .expect_err("short errors");

        // Assert
        assert_eq!(missing_err, FitError::MissingErrors { cost_func: "weighted_nlls" });
        assert_eq!(short_err, FitError::LengthMismatch { x_len: 3, y_len: 3, e_len: Some(2) });
    }

    #[test]
    // Purpose
    // -------
    // Repeated cost evaluations at the same parameters reuse the cached
    // model output.
    //
    // Given
    // -----
    // - `weighted_nlls` with e = [2, 4, 1], two `eval_cost` calls at p = [5].
    //
    // Expect
    // ------
    // - Identical values and a single model evaluation.
    fn eval_cost_hits_cache_for_identical_params() {
        // Arrange
        let (problem, counter) = linear_problem(Some(array![2.0, 4.0, 1.0]));
        let cost = WeightedNLLSCostFunc::new(problem);
        let p = array![5.0];

        // Act
        let first = cost.eval_cost(&p, &DataOverride::none()).unwrap();
        let second = cost.eval_cost(&p, &DataOverride::none()).unwrap();

        // Assert
        assert_eq!(first, second);
        assert_eq!(counter.model_evaluations(), 1);
    }
}
