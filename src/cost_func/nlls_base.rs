//! cost_func::nlls_base — plumbing shared by the cost function variants.
//!
//! Purpose
//! -------
//! Collect the steps every residual law repeats: resolving the effective
//! x/y/e from a [`DataOverride`], checking their lengths, evaluating the
//! model (memoized on the problem's own data), applying the observation
//! mask, and the generic least-squares reductions
//! `cost = r·r`, `∇cost = 2 J_rᵀ r`, `∇²cost = 2 (J_rᵀ J_r + Σ rᵢ H_rᵢ)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Overriding exactly one of x and y is rejected.
//! - The problem's mask applies only when y comes from the problem.
//! - Every cache is bypassed as soon as the override carries any field.
use crate::{
    cache::cached_func_values,
    cost_func::traits::{CostFunc, CostFuncCore},
    errors::{FitError, FitResult},
    problem::flatten_view,
    types::{CostHessian, DataOverride, Grad, Params, ResidualHessian, Residuals},
};
use ndarray::{Array1, ArrayView1, Axis};

/// Flattened inputs of one residual evaluation.
#[derive(Debug, Clone)]
pub(crate) struct ResidualInputs {
    pub y: Array1<f64>,
    pub f: Array1<f64>,
    pub e: Option<Array1<f64>>,
    pub mask: Option<Array1<bool>>,
}

impl ResidualInputs {
    /// Zero the entries of `values` at masked observations.
    pub fn apply_mask(&self, values: &mut Array1<f64>) {
        if let Some(mask) = &self.mask {
            for (v, &masked) in values.iter_mut().zip(mask.iter()) {
                if masked {
                    *v = 0.0;
                }
            }
        }
    }
}

/// x used by an evaluation: the override, else the problem's own.
pub(crate) fn effective_x<'a>(
    core: &'a CostFuncCore, data: &'a DataOverride<'_>,
) -> ArrayView1<'a, f64> {
    data.x.as_ref().map(|x| x.view()).unwrap_or_else(|| core.problem().data_x())
}

/// Flattened e used by an evaluation, if any.
pub(crate) fn effective_e(core: &CostFuncCore, data: &DataOverride<'_>) -> Option<Array1<f64>> {
    match &data.e {
        Some(e) => Some(flatten_view(e)),
        None => core.problem().data_e().map(|e| flatten_view(&e)),
    }
}

/// Flattened e, or [`FitError::MissingErrors`] for weighted forms.
pub(crate) fn required_e(
    core: &CostFuncCore, data: &DataOverride<'_>, cost_func: &'static str,
) -> FitResult<Array1<f64>> {
    effective_e(core, data).ok_or(FitError::MissingErrors { cost_func })
}

/// Flattened problem mask, when y is not overridden.
pub(crate) fn effective_mask(
    core: &CostFuncCore, data: &DataOverride<'_>,
) -> Option<Array1<bool>> {
    if data.y.is_some() {
        return None;
    }
    core.problem().data_mask().map(|mask| flatten_view(&mask))
}

/// Flattened model output, memoized when evaluating on the problem's data.
pub(crate) fn model_values(
    core: &CostFuncCore, params: &Params, data: &DataOverride<'_>,
) -> FitResult<Array1<f64>> {
    let problem = core.problem().as_ref();
    if data.is_empty() {
        cached_func_values(&core.cache_fx, params, || {
            problem.eval_model_flat(params, problem.data_x())
        })
    } else {
        problem.eval_model_flat(params, effective_x(core, data))
    }
}

/// residual_inputs — resolve and check everything a residual law needs.
///
/// Parameters
/// ----------
/// - `weighted`: `Option<&'static str>`
///   `Some(cost_func)` when e is required (and length-checked); the name is
///   reported in [`FitError::MissingErrors`].
///
/// Errors
/// ------
/// - [`FitError::PartialDataOverride`] if only one of x and y is overridden.
/// - [`FitError::MissingErrors`] if a weighted form has no e.
/// - [`FitError::LengthMismatch`] if x, y (and e) differ in leading length.
/// - [`FitError::ShapeMismatch`] if e or the model output do not match y.
/// - Propagates model evaluation errors.
pub(crate) fn residual_inputs(
    core: &CostFuncCore, params: &Params, data: &DataOverride<'_>, weighted: Option<&'static str>,
) -> FitResult<ResidualInputs> {
    if data.x.is_some() != data.y.is_some() {
        return Err(FitError::PartialDataOverride);
    }
    let problem = core.problem();
    let x = effective_x(core, data);
    let y_nd = data.y.as_ref().map(|y| y.view()).unwrap_or_else(|| problem.data_y());
    let e_nd = match &data.e {
        Some(e) => Some(e.view()),
        None => problem.data_e(),
    };
    let y_len = y_nd.shape().first().copied().unwrap_or(0);
    let e_len = match (weighted, &e_nd) {
        (Some(cost_func), None) => return Err(FitError::MissingErrors { cost_func }),
        (Some(_), Some(e)) => Some(e.shape().first().copied().unwrap_or(0)),
        (None, _) => None,
    };
    if x.len() != y_len || e_len.is_some_and(|len| len != x.len()) {
        return Err(FitError::LengthMismatch { x_len: x.len(), y_len, e_len });
    }
    let e = match (weighted, e_nd) {
        (Some(_), Some(e)) => {
            if e.shape() != y_nd.shape() {
                return Err(FitError::ShapeMismatch {
                    expected: y_nd.shape().to_vec(),
                    found: e.shape().to_vec(),
                });
            }
            Some(flatten_view(&e))
        }
        _ => None,
    };
    let y = flatten_view(&y_nd);
    let f = model_values(core, params, data)?;
    if f.len() != y.len() {
        return Err(FitError::ShapeMismatch { expected: y_nd.shape().to_vec(), found: vec![f.len()] });
    }
    Ok(ResidualInputs { y, f, e, mask: effective_mask(core, data) })
}

/// Residuals memoized in `cache_rx` when evaluating on the problem's data.
pub(crate) fn cached_residuals<F>(
    core: &CostFuncCore, params: &Params, data: &DataOverride<'_>, compute: F,
) -> FitResult<Residuals>
where
    F: FnOnce() -> FitResult<Residuals>,
{
    if data.is_empty() { cached_func_values(&core.cache_rx, params, compute) } else { compute() }
}

// ---- Least-squares reductions ----

/// `r · r`, memoized in `cache_cost_x` on the problem's data.
pub(crate) fn eval_cost(
    cost_func: &dyn CostFunc, params: &Params, data: &DataOverride<'_>,
) -> FitResult<f64> {
    let compute = || -> FitResult<f64> {
        let r = cost_func.eval_r(params, data)?;
        Ok(r.dot(&r))
    };
    if data.is_empty() {
        cached_func_values(&cost_func.core().cache_cost_x, params, compute)
    } else {
        compute()
    }
}

/// `2 J_rᵀ r`.
pub(crate) fn jac_cost(
    cost_func: &dyn CostFunc, params: &Params, data: &DataOverride<'_>,
) -> FitResult<Grad> {
    let r = cost_func.eval_r(params, data)?;
    let jac = cost_func.jac_res(params, data)?;
    if jac.nrows() != r.len() {
        return Err(FitError::JacobianShapeMismatch {
            expected: (r.len(), params.len()),
            found: (jac.nrows(), jac.ncols()),
        });
    }
    Ok(jac.t_dot(r.view()) * 2.0)
}

/// `2 (J_rᵀ J_r + Σ rᵢ H_rᵢ)` through the attached Hessian engine.
pub(crate) fn hes_cost(
    cost_func: &dyn CostFunc, params: &Params, data: &DataOverride<'_>,
) -> FitResult<CostHessian> {
    Ok(cost_func.hessian()?.eval_cost(params, data, cost_func)? * 2.0)
}

/// Multiply slice `i` of a residual Hessian by `scale[i]`.
pub(crate) fn scale_hessian_slices(hes: &mut ResidualHessian, scale: ArrayView1<'_, f64>) {
    for (mut slice, &s) in hes.axis_iter_mut(Axis(2)).zip(scale.iter()) {
        slice *= s;
    }
}

/// Row scale with masked observations set to zero.
pub(crate) fn masked_scale(mut scale: Array1<f64>, mask: Option<&Array1<bool>>) -> Array1<f64> {
    if let Some(mask) = mask {
        for (s, &masked) in scale.iter_mut().zip(mask.iter()) {
            if masked {
                *s = 0.0;
            }
        }
    }
    scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cost_func::fixtures::linear_problem, cost_func::NLLSCostFunc};
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Override validation in `residual_inputs`.
    // - Masking of observations.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Overriding only x is rejected before the model runs.
    //
    // Given
    // -----
    // - The linear fixture and an override carrying x but not y.
    //
    // Expect
    // ------
    // - `PartialDataOverride` and no model evaluation.
    fn partial_override_is_rejected() {
        // Arrange
        let (problem, counter) = linear_problem(None);
        let cost = NLLSCostFunc::new(problem);
        let x = array![1.0, 2.0];
        let data = DataOverride { x: Some(x.view()), y: None, e: None };

        // Act
        let err = residual_inputs(cost.core(), &array![5.0], &data, None)
            .expect_err("partial override");

        // Assert
        assert_eq!(err, FitError::PartialDataOverride);
        assert_eq!(counter.model_evaluations(), 0);
    }

    #[test]
    // Purpose
    // -------
    // Masked observations contribute nothing.
    //
    // Given
    // -----
    // - Inputs with mask `[false, true, false]` and values `[1, 2, 3]`.
    //
    // Expect
    // ------
    // - `[1, 0, 3]` after `apply_mask`; `masked_scale` zeroes the same row.
    fn mask_zeroes_observations() {
        // Arrange
        let mask = array![false, true, false];
        let inputs = ResidualInputs {
            y: array![0.0, 0.0, 0.0],
            f: array![0.0, 0.0, 0.0],
            e: None,
            mask: Some(mask.clone()),
        };
        let mut values = array![1.0, 2.0, 3.0];

        // Act
        inputs.apply_mask(&mut values);
        let scale = masked_scale(array![-1.0, -1.0, -1.0], Some(&mask));

        // Assert
        assert_eq!(values, array![1.0, 0.0, 3.0]);
        assert_eq!(scale, array![-1.0, 0.0, -1.0]);
    }
}
