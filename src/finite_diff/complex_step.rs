//! finite_diff::complex_step — complex-step Jacobians and Hessians.
//!
//! Purpose
//! -------
//! Differentiate models that accept complex parameters. A purely imaginary
//! perturbation avoids subtractive cancellation, so first derivatives are
//! exact to working precision for analytic functions.
//!
//! Key behaviors
//! -------------
//! - [`complex_step_jacobian`]: `J[:, k] = Im f(p + i h e_k) / h`.
//! - [`complex_step_hessian`]: hybrid complex step plus central difference,
//!   `Im[f(p + i h e_j + δ e_k) - f(p + i h e_j - δ e_k)] / (2 h δ)`,
//!   symmetrized before returning.
//!
//! Conventions
//! -----------
//! - `h = COMPLEX_STEP · max(1, |p_k|)`, `δ = EPS^(1/3) · max(1, |p_k|)`.
use crate::{
    errors::{FitError, FitResult},
    finite_diff::validation::symmetrize_residual_hessian,
    types::{Params, ResidualHessian},
};
use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;

/// Imaginary step size relative to `max(1, |p_k|)`.
pub const COMPLEX_STEP: f64 = 1e-20;

/// Complex-step Jacobian of `func` at `params`, shaped `(m × n)`.
///
/// # Errors
/// Propagates errors of `func`; [`FitError::ShapeMismatch`] if successive
/// evaluations return different lengths.
pub fn complex_step_jacobian<F>(params: &Params, func: &F) -> FitResult<Array2<f64>>
where
    F: Fn(&Array1<Complex64>) -> FitResult<Array1<Complex64>>,
{
    let n = params.len();
    let base = to_complex(params);
    let mut jac: Option<Array2<f64>> = None;
    for k in 0..n {
        let h = COMPLEX_STEP * params[k].abs().max(1.0);
        let mut p = base.clone();
        p[k].im = h;
        let fk = func(&p)?;
        let out = jac.get_or_insert_with(|| Array2::zeros((fk.len(), n)));
        check_len(out.nrows(), fk.len())?;
        out.column_mut(k).assign(&fk.mapv(|z| z.im / h));
    }
    Ok(jac.unwrap_or_else(|| Array2::zeros((0, 0))))
}

/// Hybrid complex-step Hessian of `func` at `params`, `[n, n, m]`.
///
/// # Errors
/// As [`complex_step_jacobian`].
pub fn complex_step_hessian<F>(params: &Params, func: &F) -> FitResult<ResidualHessian>
where
    F: Fn(&Array1<Complex64>) -> FitResult<Array1<Complex64>>,
{
    let n = params.len();
    let base = to_complex(params);
    let cbrt_eps = f64::EPSILON.cbrt();
    let mut hes: Option<ResidualHessian> = None;
    for j in 0..n {
        let h = COMPLEX_STEP * params[j].abs().max(1.0);
        for k in 0..n {
            let delta = cbrt_eps * params[k].abs().max(1.0);
            let mut plus = base.clone();
            plus[j].im += h;
            let mut minus = plus.clone();
            plus[k].re += delta;
            minus[k].re -= delta;
            let f_plus = func(&plus)?;
            let f_minus = func(&minus)?;
            check_len(f_plus.len(), f_minus.len())?;
            let out = hes.get_or_insert_with(|| Array3::zeros((n, n, f_plus.len())));
            check_len(out.dim().2, f_plus.len())?;
            for (obs, (fp, fm)) in f_plus.iter().zip(f_minus.iter()).enumerate() {
                out[[j, k, obs]] = (fp.im - fm.im) / (2.0 * h * delta);
            }
        }
    }
    let mut hes = hes.unwrap_or_else(|| Array3::zeros((0, 0, 0)));
    symmetrize_residual_hessian(&mut hes);
    Ok(hes)
}

// ---- Helper methods ----

fn to_complex(params: &Params) -> Array1<Complex64> {
    params.mapv(|v| Complex64::new(v, 0.0))
}

fn check_len(expected: usize, found: usize) -> FitResult<()> {
    if expected != found {
        return Err(FitError::ShapeMismatch { expected: vec![expected], found: vec![found] });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Machine-precision agreement of complex-step Jacobians.
    // - Hybrid Hessians on a polynomial with known second derivatives.
    // -------------------------------------------------------------------------

    fn exp_model(p: &Array1<Complex64>) -> FitResult<Array1<Complex64>> {
        let x = [1.0, 2.0, 3.0];
        Ok(x.iter().map(|&xi| p[0] * (p[1] * xi).exp()).collect())
    }

    #[test]
    // Purpose
    // -------
    // Complex-step Jacobians match analytic values to machine precision.
    //
    // Given
    // -----
    // - `f(x, p) = p0 exp(p1 x)` at `p = [2, 0.3]`.
    //
    // Expect
    // ------
    // - Agreement within 1e-12.
    fn jacobian_is_exact_to_working_precision() {
        // Arrange
        let p = array![2.0, 0.3];

        // Act
        let jac = complex_step_jacobian(&p, &exp_model).unwrap();

        // Assert
        for (i, xi) in [1.0_f64, 2.0, 3.0].iter().enumerate() {
            assert_abs_diff_eq!(jac[[i, 0]], (0.3 * xi).exp(), epsilon = 1e-12);
            assert_abs_diff_eq!(jac[[i, 1]], 2.0 * xi * (0.3 * xi).exp(), epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Hybrid Hessians recover polynomial second derivatives.
    //
    // Given
    // -----
    // - `f(p) = [p0² p1, p1³]` at `p = [1.5, 2]`.
    //
    // Expect
    // ------
    // - `H[:, :, 0] = [[2 p1, 2 p0], [2 p0, 0]]`, `H[1, 1, 1] = 6 p1`,
    //   symmetric, within 1e-6.
    fn hessian_recovers_polynomial_curvature() {
        // Arrange
        let p = array![1.5, 2.0];
        let func = |q: &Array1<Complex64>| Ok(array![q[0] * q[0] * q[1], q[1] * q[1] * q[1]]);

        // Act
        let hes = complex_step_hessian(&p, &func).unwrap();

        // Assert
        assert_eq!(hes.dim(), (2, 2, 2));
        assert_abs_diff_eq!(hes[[0, 0, 0]], 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(hes[[0, 1, 0]], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(hes[[1, 1, 1]], 12.0, epsilon = 1e-6);
        assert_eq!(hes[[0, 1, 0]], hes[[1, 0, 0]]);
    }
}
