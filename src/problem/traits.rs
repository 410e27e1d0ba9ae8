//! problem::traits — the read-only contract a parsed fitting problem offers.
//!
//! Purpose
//! -------
//! Describe what the fitting core consumes from a parsed problem: the
//! observed data, an evaluable model, and optional analytic derivatives.
//! Parsers for specific file formats live outside this crate and only need
//! to implement [`FittingProblem`].
//!
//! Key behaviors
//! -------------
//! - Required: data accessors, the `format` tag, and `eval_model`.
//! - Optional: complex-parameter model evaluation (complex-step schemes),
//!   analytic Jacobian/Hessian, sparse Jacobian and an observation mask.
//!   Each optional capability is paired with a `has_*` query so that engines
//!   can fail fast at construction instead of at first evaluation.
//!
//! Invariants & assumptions
//! ------------------------
//! - `data_x().len() == data_y().shape()[0]`, and `data_e()`, when present,
//!   has the same shape as `data_y()`.
//! - `eval_model(p, x)` returns an array whose leading axis has length
//!   `x.len()`; trailing axes (vector-valued models) match those of `data_y`.
//! - Jacobians are `(n_obs_flat × n_params)` and Hessians are
//!   `[n_params, n_params, n_obs_flat]`, where `n_obs_flat` counts
//!   observations after row-major flattening.
use crate::{
    errors::{FitError, FitResult},
    types::{JacobianMatrix, Params},
};
use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView1, ArrayViewD};
use num_complex::Complex64;

pub trait FittingProblem {
    // Required methods
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn data_x(&self) -> ArrayView1<'_, f64>;
    fn data_y(&self) -> ArrayViewD<'_, f64>;
    fn data_e(&self) -> Option<ArrayViewD<'_, f64>>;
    fn eval_model(&self, params: &Params, x: ArrayView1<'_, f64>) -> FitResult<ArrayD<f64>>;

    // Optional methods
    fn data_mask(&self) -> Option<ArrayViewD<'_, bool>> {
        None
    }

    fn has_complex_model(&self) -> bool {
        false
    }

    fn eval_model_complex(
        &self, _params: &Array1<Complex64>, _x: ArrayView1<'_, f64>,
    ) -> FitResult<ArrayD<Complex64>> {
        Err(FitError::ComplexModelUnavailable { problem: self.name().to_string() })
    }

    fn has_jacobian(&self) -> bool {
        false
    }

    fn jacobian(&self, _x: ArrayView1<'_, f64>, _params: &Params) -> FitResult<Array2<f64>> {
        Err(FitError::NoJacobian {
            reason: format!("problem '{}' has no analytic Jacobian", self.name()),
        })
    }

    fn has_hessian(&self) -> bool {
        false
    }

    fn hessian(&self, _x: ArrayView1<'_, f64>, _params: &Params) -> FitResult<Array3<f64>> {
        Err(FitError::NoHessian {
            reason: format!("problem '{}' has no analytic Hessian", self.name()),
        })
    }

    fn has_sparse_jacobian(&self) -> bool {
        false
    }

    /// Sparse Jacobian as declared by the problem. Implementations may return
    /// a dense matrix; consumers reject that as "not actually sparse".
    fn sparse_jacobian(
        &self, _x: ArrayView1<'_, f64>, _params: &Params,
    ) -> FitResult<JacobianMatrix> {
        Err(FitError::NoSparseJacobian {
            reason: format!("problem '{}' declares no sparse Jacobian", self.name()),
        })
    }

    // ---- Provided helpers ----

    /// Number of scalar outputs per observation (1 for scalar models).
    fn outputs_per_obs(&self) -> usize {
        self.data_y().shape().iter().skip(1).product()
    }

    /// Model output at `params`, flattened row-major.
    fn eval_model_flat(&self, params: &Params, x: ArrayView1<'_, f64>) -> FitResult<Array1<f64>> {
        Ok(flatten(&self.eval_model(params, x)?))
    }

    /// Complex model output at `params`, flattened row-major.
    fn eval_model_complex_flat(
        &self, params: &Array1<Complex64>, x: ArrayView1<'_, f64>,
    ) -> FitResult<Array1<Complex64>> {
        Ok(flatten(&self.eval_model_complex(params, x)?))
    }
}

/// Row-major flatten of an n-dimensional array.
pub fn flatten<T: Clone>(values: &ArrayD<T>) -> Array1<T> {
    values.iter().cloned().collect()
}

/// Row-major flatten of an n-dimensional view.
pub fn flatten_view<T: Clone>(values: &ArrayViewD<'_, T>) -> Array1<T> {
    values.iter().cloned().collect()
}
