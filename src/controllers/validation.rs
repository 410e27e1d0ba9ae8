//! controllers::validation — checks on options and solver output.
//!
//! Option checks run when `Tolerances`/`FitOptions` are constructed; output
//! checks run on every gradient handed to argmin and on the final
//! `FitOutcome`.
use crate::{
    errors::{FitError, FitResult},
    types::{CostHessian, Grad, Params},
};

pub fn verify_tol_grad(tol: Option<f64>) -> FitResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(FitError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(FitError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

pub fn verify_tol_cost(tol: Option<f64>) -> FitResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(FitError::InvalidTolCost { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(FitError::InvalidTolCost { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

pub fn validate_grad(grad: &Grad, dim: usize) -> FitResult<()> {
    if grad.len() != dim {
        return Err(FitError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(FitError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

pub fn validate_params_hat(params_hat: Option<Params>) -> FitResult<Params> {
    match params_hat {
        Some(p) => {
            for (index, &value) in p.iter().enumerate() {
                if !value.is_finite() {
                    return Err(FitError::InvalidParamsHat {
                        index,
                        value,
                        reason: "Parameter estimates must be finite.",
                    });
                }
            }
            Ok(p)
        }
        None => Err(FitError::MissingParamsHat),
    }
}

pub fn validate_cost(value: f64) -> FitResult<()> {
    if !value.is_finite() {
        return Err(FitError::NonFiniteCost { value });
    }
    Ok(())
}

pub fn validate_cost_hessian(hessian: &CostHessian, dim: usize) -> FitResult<()> {
    if hessian.nrows() != dim || hessian.ncols() != dim {
        return Err(FitError::HessianShapeMismatch {
            expected: (dim, dim, 1),
            found: hessian.shape().to_vec(),
        });
    }
    for ((row, col), &value) in hessian.indexed_iter() {
        if !value.is_finite() {
            return Err(FitError::InvalidCostHessian { row, col, value });
        }
    }
    Ok(())
}
