//! controllers::uncertainty — parameter covariance from the cost Hessian.
//!
//! Purpose
//! -------
//! Turn the cost Hessian at a fitted parameter vector into a covariance
//! matrix and standard errors, using an eigenvalue-truncated pseudoinverse
//! so that weakly identified directions do not blow up the computation.
//!
//! Key behaviors
//! -------------
//! - The information matrix is `hes_cost / 2` for least-squares objectives
//!   (whose cost is `Σ r²`, so `hes_cost ≈ 2 Jᵀ J`) and `hes_cost` itself for
//!   deviance-type objectives such as Poisson.
//! - Covariance is `Q diag(1/λ) Qᵀ` over eigenpairs with `λ > EIGEN_EPS`;
//!   directions at or below the cutoff contribute nothing.
//!
//! Invariants & assumptions
//! ------------------------
//! - A Hessian engine must be attached to the cost function.
//! - The Hessian is symmetrized before decomposition.
//! - For weighted least squares the errors are taken as true standard
//!   deviations; no residual-variance rescaling is applied.
use crate::{
    controllers::validation::validate_cost_hessian,
    cost_func::CostFunc,
    errors::FitResult,
    types::{DataOverride, Params},
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Eigenvalues at or below this are treated as zero.
pub const EIGEN_EPS: f64 = 1e-12;

/// Covariance of the parameters at `params`.
///
/// # Errors
/// - `DerivativeNotAttached` if no Hessian engine is attached.
/// - Evaluation errors of `hes_cost`.
/// - `HessianShapeMismatch` / `InvalidCostHessian` for a malformed Hessian.
pub fn parameter_covariance(cost_func: &dyn CostFunc, params: &Params) -> FitResult<Array2<f64>> {
    let n = params.len();
    let hessian = cost_func.hes_cost(params, &DataOverride::none())?;
    validate_cost_hessian(&hessian, n)?;
    let scale = if cost_func.is_least_squares() { 0.5 } else { 1.0 };

    let info = DMatrix::<f64>::from_fn(n, n, |i, j| {
        0.5 * scale * (hessian[[i, j]] + hessian[[j, i]])
    });
    let eigen_decomp = info.symmetric_eigen();
    let q = eigen_decomp.eigenvectors;
    let eigenvals = eigen_decomp.eigenvalues;

    let mut cov = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in eigenvals.iter().enumerate() {
        if lambda <= EIGEN_EPS {
            continue;
        }
        for i in 0..n {
            for j in 0..n {
                cov[[i, j]] += q[(i, k)] * q[(j, k)] / lambda;
            }
        }
    }
    Ok(cov)
}

/// Standard errors: square roots of the covariance diagonal.
///
/// # Errors
/// As [`parameter_covariance`].
pub fn standard_errors(cost_func: &dyn CostFunc, params: &Params) -> FitResult<Array1<f64>> {
    let cov = parameter_covariance(cost_func, params)?;
    Ok(cov.diag().mapv(f64::sqrt))
}
