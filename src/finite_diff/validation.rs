//! Shape checks and symmetry cleanup for derivative arrays.
//!
//! These helpers are shared by every Jacobian and Hessian engine:
//!
//! - **Jacobian shape**: [`validate_jacobian_shape`] checks
//!   `(n_obs_flat, n_params)`.
//! - **Hessian shape**: [`validate_residual_hessian`] checks
//!   `[n_params, n_params, n_obs_flat]`.
//! - **Symmetry**: [`symmetrize_residual_hessian`] averages `H[i,j,:]` and
//!   `H[j,i,:]` so consumers never see round-off asymmetries.
use crate::{
    errors::{FitError, FitResult},
    types::ResidualHessian,
};

/// Validate the `(rows, cols)` of a Jacobian.
///
/// # Errors
/// Returns [`FitError::JacobianShapeMismatch`] if `found != expected`.
pub fn validate_jacobian_shape(found: (usize, usize), expected: (usize, usize)) -> FitResult<()> {
    if found != expected {
        return Err(FitError::JacobianShapeMismatch { expected, found });
    }
    Ok(())
}

/// Validate the shape of a residual Hessian.
///
/// # Errors
/// Returns [`FitError::HessianShapeMismatch`] if `hes.shape()` differs from
/// `[n_params, n_params, n_obs]`.
pub fn validate_residual_hessian(
    hes: &ResidualHessian, n_params: usize, n_obs: usize,
) -> FitResult<()> {
    if hes.shape() != [n_params, n_params, n_obs] {
        return Err(FitError::HessianShapeMismatch {
            expected: (n_params, n_params, n_obs),
            found: hes.shape().to_vec(),
        });
    }
    Ok(())
}

/// Replace each pair `H[i,j,:]`, `H[j,i,:]` with its average, in place.
///
/// The first two axes must have equal length; the diagonal slices are left
/// untouched.
pub fn symmetrize_residual_hessian(hes: &mut ResidualHessian) {
    let (n, _, m) = hes.dim();
    for i in 0..n {
        for j in 0..i {
            for k in 0..m {
                let avg = 0.5 * (hes[[i, j, k]] + hes[[j, i, k]]);
                hes[[i, j, k]] = avg;
                hes[[j, i, k]] = avg;
            }
        }
    }
}
