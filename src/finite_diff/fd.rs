//! finite_diff::fd — real-valued forward/central Jacobians via `finitediff`.
//!
//! Purpose
//! -------
//! Approximate the Jacobian of a vector-valued, fallible function around a
//! parameter vector, hiding the `finitediff` API and its infallible closure
//! signature from the derivative engines.
//!
//! Key behaviors
//! -------------
//! - [`fd_jacobian`] computes dense forward (`2-point`) or central
//!   (`3-point`) Jacobians.
//! - [`fd_jacobian_sparse`] perturbs each column group of a
//!   [`SparsityPattern`] at once and returns a faer sparse matrix.
//! - The value at the unperturbed point (`f0`) is supplied by the caller and
//!   answered from memory, so the baseline is never re-evaluated.
//! - [`stack_to_residual_hessian`] reshapes a differenced, flattened
//!   Jacobian into the `[n_params, n_params, n_obs]` layout.
//!
//! Invariants & assumptions
//! ------------------------
//! - Any error raised by the wrapped function during differencing is
//!   captured in a `RefCell` and returned after the `finitediff` call; the
//!   closure reports `NaN` to `finitediff` in that case.
//! - Every evaluation must return `f0.len()` values; a different length is a
//!   [`FitError::ShapeMismatch`].
//!
//! Conventions
//! -----------
//! - Steps are absolute (`sqrt(EPS)`), as used by `finitediff`.
//! - `finitediff` lays its Jacobians out as `(n_params × n_outputs)`; they
//!   are transposed here so that every returned Jacobian is
//!   `(f0.len() × params.len())`.
use crate::{
    errors::{FitError, FitResult},
    finite_diff::{sparsity::SparsityPattern, validation::validate_jacobian_shape},
    types::{JacobianMatrix, Params, ResidualHessian},
};
use finitediff::FiniteDiff;
use ndarray::{Array1, Array2, Array3};
use std::{cell::RefCell, str::FromStr};

/// Method strings accepted by [`FdMethod::from_str`].
pub const FD_METHODS: &[&str] = &["2-point", "3-point", "cs"];

/// Finite-difference scheme selected by the `scipy` engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdMethod {
    /// Forward difference.
    TwoPoint,
    /// Central difference.
    ThreePoint,
    /// Complex step; needs a complex-capable model.
    ComplexStep,
}

impl FdMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FdMethod::TwoPoint => "2-point",
            FdMethod::ThreePoint => "3-point",
            FdMethod::ComplexStep => "cs",
        }
    }
}

impl FromStr for FdMethod {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2-point" => Ok(FdMethod::TwoPoint),
            "3-point" => Ok(FdMethod::ThreePoint),
            "cs" => Ok(FdMethod::ComplexStep),
            other => Err(FitError::InvalidJacobianMethod {
                engine: "scipy",
                method: other.to_string(),
                valid: FD_METHODS,
            }),
        }
    }
}

/// fd_jacobian — dense finite-difference Jacobian with error capture.
///
/// Purpose
/// -------
/// Difference `func` around `params` with the forward or central scheme and
/// return a validated `(m × n)` Jacobian, where `m = f0.len()`.
///
/// Parameters
/// ----------
/// - `params`: `&Params`
///   Point at which to differentiate.
/// - `f0`: `&Array1<f64>`
///   `func(params)`, computed by the caller. Requests for the unperturbed
///   point are answered with this value.
/// - `func`: `&F`
///   Fallible vector-valued function of the parameters.
/// - `method`: [`FdMethod`]
///   `TwoPoint` or `ThreePoint`.
///
/// Returns
/// -------
/// `FitResult<Array2<f64>>`
///   The approximated Jacobian.
///
/// Errors
/// ------
/// - The first error raised by `func` during differencing.
/// - [`FitError::ShapeMismatch`] if an evaluation changes output length.
/// - [`FitError::NotSupported`] for [`FdMethod::ComplexStep`], which is
///   handled by `complex_step` on the complex model.
///
/// Panics
/// ------
/// - Never panics.
///
/// Notes
/// -----
/// - Only the first captured error is reported.
pub fn fd_jacobian<F>(
    params: &Params, f0: &Array1<f64>, func: &F, method: FdMethod,
) -> FitResult<Array2<f64>>
where
    F: Fn(&Params) -> FitResult<Array1<f64>>,
{
    let closure_err: RefCell<Option<FitError>> = RefCell::new(None);
    let guarded = guard(params, f0, func, &closure_err);
    let jac_t = match method {
        FdMethod::TwoPoint => params.forward_jacobian(&guarded),
        FdMethod::ThreePoint => params.central_jacobian(&guarded),
        FdMethod::ComplexStep => {
            return Err(FitError::NotSupported {
                owner: "real-valued differencing".to_string(),
                operation: "cs",
            });
        }
    };
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    let jac = jac_t.reversed_axes();
    validate_jacobian_shape(jac.dim(), (f0.len(), params.len()))?;
    Ok(jac)
}

/// fd_jacobian_sparse — finite differences restricted to a sparsity pattern.
///
/// Same contract as [`fd_jacobian`], but the columns of each
/// [`SparsityPattern::column_groups`] group are perturbed together and only
/// the pattern's entries are returned, as a sparse [`JacobianMatrix`].
///
/// # Errors
/// As [`fd_jacobian`], plus [`FitError::JacobianShapeMismatch`] when the
/// pattern does not match `(f0.len(), params.len())`.
pub fn fd_jacobian_sparse<F>(
    params: &Params, f0: &Array1<f64>, func: &F, method: FdMethod, pattern: &SparsityPattern,
) -> FitResult<JacobianMatrix>
where
    F: Fn(&Params) -> FitResult<Array1<f64>>,
{
    validate_jacobian_shape((pattern.nrows(), pattern.ncols()), (f0.len(), params.len()))?;
    if method == FdMethod::ComplexStep {
        return Err(FitError::NotSupported {
            owner: "real-valued differencing".to_string(),
            operation: "cs_sparse",
        });
    }
    let closure_err: RefCell<Option<FitError>> = RefCell::new(None);
    let guarded = guard(params, f0, func, &closure_err);
    let step = f64::EPSILON.sqrt();

    let mut dense = Array2::zeros((f0.len(), params.len()));
    for group in pattern.column_groups() {
        let shifted = |sign: f64| {
            let mut p = params.clone();
            for &col in &group {
                p[col] += sign * step;
            }
            guarded(&p)
        };
        let (diff, denom) = match method {
            FdMethod::ThreePoint => (shifted(1.0) - shifted(-1.0), 2.0 * step),
            _ => (shifted(1.0) - f0, step),
        };
        for &col in &group {
            for &row in pattern.rows_of_col(col) {
                dense[[row, col]] = diff[row] / denom;
            }
        }
        if closure_err.borrow().is_some() {
            break;
        }
    }
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    pattern.gather(&dense)
}

/// Reshape a differenced, row-major flattened Jacobian into a residual
/// Hessian.
///
/// `stacked` has rows indexed by `obs * n_params + j` and columns by `k`;
/// the result holds `H[j, k, obs]`.
///
/// # Errors
/// [`FitError::JacobianShapeMismatch`] if the row count is not a multiple of
/// `n_params` or the column count differs from `n_params`.
pub fn stack_to_residual_hessian(
    stacked: &Array2<f64>, n_params: usize,
) -> FitResult<ResidualHessian> {
    let (rows, cols) = stacked.dim();
    if n_params == 0 || cols != n_params || rows % n_params != 0 {
        return Err(FitError::JacobianShapeMismatch {
            expected: (n_params * (rows / n_params.max(1)), n_params),
            found: (rows, cols),
        });
    }
    let n_obs = rows / n_params;
    let mut hes = Array3::zeros((n_params, n_params, n_obs));
    for obs in 0..n_obs {
        for j in 0..n_params {
            for k in 0..n_params {
                hes[[j, k, obs]] = stacked[[obs * n_params + j, k]];
            }
        }
    }
    Ok(hes)
}

// ---- Helper methods ----

/// Wrap a fallible function into the infallible form `finitediff` expects.
fn guard<'a, F>(
    params: &'a Params, f0: &'a Array1<f64>, func: &'a F,
    closure_err: &'a RefCell<Option<FitError>>,
) -> impl Fn(&Array1<f64>) -> Array1<f64> + 'a
where
    F: Fn(&Params) -> FitResult<Array1<f64>>,
{
    let m = f0.len();
    move |p: &Array1<f64>| {
        if p == params {
            return f0.clone();
        }
        let failure = match func(p) {
            Ok(values) if values.len() == m => return values,
            Ok(values) => FitError::ShapeMismatch { expected: vec![m], found: vec![values.len()] },
            Err(err) => err,
        };
        let mut slot = closure_err.borrow_mut();
        if slot.is_none() {
            *slot = Some(failure);
        }
        Array1::from_elem(m, f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::cell::Cell;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Forward and central Jacobians on a smooth two-parameter model.
    // - Baseline reuse and closure-error propagation.
    // - Sparse differencing and Hessian reshaping.
    //
    // They intentionally DO NOT cover:
    // - Complex-step schemes (see `complex_step`).
    // -------------------------------------------------------------------------

    fn model(p: &Params) -> FitResult<Array1<f64>> {
        let x = array![1.0, 2.0, 3.0];
        Ok(x.mapv(|xi| p[0] * (p[1] * xi).exp()))
    }

    fn analytic(p: &Params) -> Array2<f64> {
        let x = [1.0, 2.0, 3.0];
        let mut j = Array2::zeros((3, 2));
        for (i, &xi) in x.iter().enumerate() {
            j[[i, 0]] = (p[1] * xi).exp();
            j[[i, 1]] = p[0] * xi * (p[1] * xi).exp();
        }
        j
    }

    #[test]
    // Purpose
    // -------
    // Forward and central differences agree with the analytic Jacobian.
    //
    // Given
    // -----
    // - `f(x, p) = p0 exp(p1 x)` at `p = [2, 0.3]`.
    //
    // Expect
    // ------
    // - 2-point within 1e-5 and 3-point within 1e-7 of the analytic result.
    fn forward_and_central_match_analytic() {
        // Arrange
        let p = array![2.0, 0.3];
        let f0 = model(&p).unwrap();
        let expected = analytic(&p);

        // Act
        let fwd = fd_jacobian(&p, &f0, &model, FdMethod::TwoPoint).unwrap();
        let cen = fd_jacobian(&p, &f0, &model, FdMethod::ThreePoint).unwrap();

        // Assert
        assert_abs_diff_eq!(fwd, expected, epsilon = 1e-5);
        assert_abs_diff_eq!(cen, expected, epsilon = 1e-7);
    }

    #[test]
    // Purpose
    // -------
    // Results are laid out observations by parameters, also when the model is
    // non-square or its Jacobian is not symmetric.
    //
    // Given
    // -----
    // - `f(p) = [p0, 2 p1, 3 p0]` (3 × 2) with the forward scheme.
    // - `g(p) = [p0 + 10 p1, p1]` (2 × 2, upper triangular) with the central
    //   scheme.
    //
    // Expect
    // ------
    // - `[[1, 0], [0, 2], [3, 0]]` and `[[1, 10], [0, 1]]`.
    fn layout_is_observations_by_parameters() {
        // Arrange
        let p = array![0.5, -1.5];
        let tall = |q: &Params| -> FitResult<Array1<f64>> { Ok(array![q[0], 2.0 * q[1], 3.0 * q[0]]) };
        let upper = |q: &Params| -> FitResult<Array1<f64>> { Ok(array![q[0] + 10.0 * q[1], q[1]]) };
        let f0_tall = tall(&p).unwrap();
        let f0_upper = upper(&p).unwrap();

        // Act
        let jac_tall = fd_jacobian(&p, &f0_tall, &tall, FdMethod::TwoPoint).unwrap();
        let jac_upper = fd_jacobian(&p, &f0_upper, &upper, FdMethod::ThreePoint).unwrap();

        // Assert
        let expected_tall = array![[1.0, 0.0], [0.0, 2.0], [3.0, 0.0]];
        let expected_upper = array![[1.0, 10.0], [0.0, 1.0]];
        assert_abs_diff_eq!(jac_tall, expected_tall, epsilon = 1e-6);
        assert_abs_diff_eq!(jac_upper, expected_upper, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // The baseline is answered from `f0` instead of calling the function.
    //
    // Given
    // -----
    // - A counting wrapper around the model and two parameters.
    //
    // Expect
    // ------
    // - Forward differencing calls the function exactly twice (once per
    //   parameter).
    fn forward_reuses_baseline() {
        // Arrange
        let p = array![2.0, 0.3];
        let f0 = model(&p).unwrap();
        let calls = Cell::new(0);
        let counted = |q: &Params| {
            calls.set(calls.get() + 1);
            model(q)
        };

        // Act
        fd_jacobian(&p, &f0, &counted, FdMethod::TwoPoint).unwrap();

        // Assert
        assert_eq!(calls.get(), 2);
    }

    #[test]
    // Purpose
    // -------
    // Errors raised while differencing are returned, not swallowed.
    //
    // Given
    // -----
    // - A function that fails away from the baseline.
    //
    // Expect
    // ------
    // - The function's `ModelEvaluation` error.
    fn closure_error_is_propagated() {
        // Arrange
        let p = array![1.0];
        let f0 = array![1.0, 1.0];
        let failing =
            |_q: &Params| -> FitResult<Array1<f64>> { Err(FitError::ModelEvaluation { text: "boom".into() }) };

        // Act
        let err = fd_jacobian(&p, &f0, &failing, FdMethod::ThreePoint).expect_err("must fail");

        // Assert
        assert_eq!(err, FitError::ModelEvaluation { text: "boom".into() });
    }

    #[test]
    // Purpose
    // -------
    // Sparse differencing fills exactly the declared pattern.
    //
    // Given
    // -----
    // - `f(p) = [p0², p1³, p2]` with a diagonal pattern at `p = [1, 2, 3]`.
    //
    // Expect
    // ------
    // - A sparse result close to `diag(2, 12, 1)`.
    fn sparse_matches_diagonal() {
        // Arrange
        let p = array![1.0, 2.0, 3.0];
        let func = |q: &Params| Ok(array![q[0] * q[0], q[1].powi(3), q[2]]);
        let f0 = func(&p).unwrap();
        let declared =
            JacobianMatrix::from_triplets(3, 3, &[(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)]).unwrap();
        let pattern = SparsityPattern::from_jacobian(&declared).unwrap();

        // Act
        let jac = fd_jacobian_sparse(&p, &f0, &func, FdMethod::ThreePoint, &pattern).unwrap();

        // Assert
        assert!(jac.is_sparse());
        let expected = array![[2.0, 0.0, 0.0], [0.0, 12.0, 0.0], [0.0, 0.0, 1.0]];
        assert_abs_diff_eq!(jac.to_dense(), expected, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Sparse differencing handles non-square patterns with grouped columns,
    // for both schemes.
    //
    // Given
    // -----
    // - `f(p) = [p0, 2 p1, 3 p0]` with the pattern {(0,0), (1,1), (2,0)}.
    //
    // Expect
    // ------
    // - One column group; dense view `[[1, 0], [0, 2], [3, 0]]` for 2-point and
    //   3-point.
    fn sparse_handles_non_square_pattern() {
        // Arrange
        let p = array![0.5, -1.5];
        let func = |q: &Params| -> FitResult<Array1<f64>> { Ok(array![q[0], 2.0 * q[1], 3.0 * q[0]]) };
        let f0 = func(&p).unwrap();
        let declared =
            JacobianMatrix::from_triplets(3, 2, &[(0, 0, 1.0), (1, 1, 1.0), (2, 0, 1.0)]).unwrap();
        let pattern = SparsityPattern::from_jacobian(&declared).unwrap();
        let expected = array![[1.0, 0.0], [0.0, 2.0], [3.0, 0.0]];

        // Act
        let fwd = fd_jacobian_sparse(&p, &f0, &func, FdMethod::TwoPoint, &pattern).unwrap();
        let cen = fd_jacobian_sparse(&p, &f0, &func, FdMethod::ThreePoint, &pattern).unwrap();

        // Assert
        assert_eq!(pattern.column_groups().len(), 1);
        assert_abs_diff_eq!(fwd.to_dense(), expected, epsilon = 1e-6);
        assert_abs_diff_eq!(cen.to_dense(), expected, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Errors raised during sparse differencing are returned.
    //
    // Given
    // -----
    // - A function that fails away from the baseline and a diagonal pattern.
    //
    // Expect
    // ------
    // - The function's `ModelEvaluation` error.
    fn sparse_closure_error_is_propagated() {
        // Arrange
        let p = array![1.0, 2.0];
        let f0 = array![1.0, 2.0];
        let failing =
            |_q: &Params| -> FitResult<Array1<f64>> { Err(FitError::ModelEvaluation { text: "boom".into() }) };
        let declared = JacobianMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 1, 1.0)]).unwrap();
        let pattern = SparsityPattern::from_jacobian(&declared).unwrap();

        // Act
        let err = fd_jacobian_sparse(&p, &f0, &failing, FdMethod::TwoPoint, &pattern)
            .expect_err("must fail");

        // Assert
        assert_eq!(err, FitError::ModelEvaluation { text: "boom".into() });
    }

    #[test]
    // Purpose
    // -------
    // Reshaping maps stacked rows onto `[j, k, obs]`.
    //
    // Given
    // -----
    // - Two observations, two parameters, rows numbered 0..4.
    //
    // Expect
    // ------
    // - `H[1, 0, 1]` equals `stacked[3, 0]`.
    fn stack_to_residual_hessian_layout() {
        // Arrange
        let stacked = array![[0.0, 0.5], [1.0, 1.5], [2.0, 2.5], [3.0, 3.5]];

        // Act
        let hes = stack_to_residual_hessian(&stacked, 2).unwrap();

        // Assert
        assert_eq!(hes.dim(), (2, 2, 2));
        assert_eq!(hes[[1, 0, 1]], 3.0);
        assert_eq!(hes[[0, 1, 0]], 0.5);
    }

    #[test]
    // Purpose
    // -------
    // Method strings parse; unknown ones fail.
    //
    // Given
    // -----
    // - "3-point", "cs", "5-point".
    //
    // Expect
    // ------
    // - Two matches and an `InvalidJacobianMethod`.
    fn fd_method_parses_known_strings() {
        // Arrange / Act / Assert
        assert_eq!("3-point".parse::<FdMethod>().unwrap(), FdMethod::ThreePoint);
        assert_eq!("cs".parse::<FdMethod>().unwrap().as_str(), "cs");
        match "5-point".parse::<FdMethod>() {
            Err(FitError::InvalidJacobianMethod { .. }) => {}
            other => panic!("Expected InvalidJacobianMethod, got {other:?}"),
        }
    }
}
