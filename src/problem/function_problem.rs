//! problem::function_problem — a closure-backed [`FittingProblem`].
//!
//! Purpose
//! -------
//! Provide a ready-made problem type for callers that already hold the
//! model (and optionally its derivatives) as closures: parsers producing
//! function objects, the Python bindings, and tests.
//!
//! Key behaviors
//! -------------
//! - Built with [`FunctionProblemBuilder`], which validates the data once at
//!   `build()` time (matching leading lengths, e shape, positive finite e,
//!   mask shape).
//! - Counts real-valued model evaluations so callers can observe caching.
//!
//! Conventions
//! -----------
//! - Closures receive `(params, x)` for the model and `(x, params)` for
//!   derivatives, mirroring the usual parser signatures.
use crate::{
    errors::{FitError, FitResult},
    problem::traits::FittingProblem,
    types::{JacobianMatrix, Params},
};
use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView1, ArrayViewD, Dimension, Array};
use num_complex::Complex64;
use std::cell::Cell;

type ModelFn = Box<dyn Fn(&Params, ArrayView1<'_, f64>) -> FitResult<ArrayD<f64>>>;
type ComplexModelFn =
    Box<dyn Fn(&Array1<Complex64>, ArrayView1<'_, f64>) -> FitResult<ArrayD<Complex64>>>;
type JacobianFn = Box<dyn Fn(ArrayView1<'_, f64>, &Params) -> FitResult<Array2<f64>>>;
type HessianFn = Box<dyn Fn(ArrayView1<'_, f64>, &Params) -> FitResult<Array3<f64>>>;
type SparseJacobianFn = Box<dyn Fn(ArrayView1<'_, f64>, &Params) -> FitResult<JacobianMatrix>>;

/// Fitting problem whose model and derivatives are closures.
pub struct FunctionProblem {
    name: String,
    format: String,
    x: Array1<f64>,
    y: ArrayD<f64>,
    e: Option<ArrayD<f64>>,
    mask: Option<ArrayD<bool>>,
    model: ModelFn,
    model_complex: Option<ComplexModelFn>,
    jacobian: Option<JacobianFn>,
    hessian: Option<HessianFn>,
    sparse_jacobian: Option<SparseJacobianFn>,
    model_evaluations: Cell<usize>,
}

impl FunctionProblem {
    /// Start building a problem from its data and model.
    ///
    /// `y` may have any dimensionality; its leading axis must match `x`.
    pub fn builder<D, F>(
        name: &str, x: Array1<f64>, y: Array<f64, D>, model: F,
    ) -> FunctionProblemBuilder
    where
        D: Dimension,
        F: Fn(&Params, ArrayView1<'_, f64>) -> FitResult<ArrayD<f64>> + 'static,
    {
        FunctionProblemBuilder {
            problem: FunctionProblem {
                name: name.to_string(),
                format: "function".to_string(),
                x,
                y: y.into_dyn(),
                e: None,
                mask: None,
                model: Box::new(model),
                model_complex: None,
                jacobian: None,
                hessian: None,
                sparse_jacobian: None,
                model_evaluations: Cell::new(0),
            },
        }
    }

    /// Number of real-valued model evaluations so far.
    pub fn model_evaluations(&self) -> usize {
        self.model_evaluations.get()
    }

    pub fn reset_model_evaluations(&self) {
        self.model_evaluations.set(0);
    }
}

/// Builder for [`FunctionProblem`].
pub struct FunctionProblemBuilder {
    problem: FunctionProblem,
}

impl FunctionProblemBuilder {
    pub fn format(mut self, format: &str) -> Self {
        self.problem.format = format.to_string();
        self
    }

    /// Per-observation standard errors, same shape as y.
    pub fn errors<D: Dimension>(mut self, e: Array<f64, D>) -> Self {
        self.problem.e = Some(e.into_dyn());
        self
    }

    /// Observations to exclude from weighted residuals (`true` = masked).
    pub fn mask<D: Dimension>(mut self, mask: Array<bool, D>) -> Self {
        self.problem.mask = Some(mask.into_dyn());
        self
    }

    pub fn complex_model<F>(mut self, model: F) -> Self
    where
        F: Fn(&Array1<Complex64>, ArrayView1<'_, f64>) -> FitResult<ArrayD<Complex64>> + 'static,
    {
        self.problem.model_complex = Some(Box::new(model));
        self
    }

    pub fn jacobian<F>(mut self, jacobian: F) -> Self
    where
        F: Fn(ArrayView1<'_, f64>, &Params) -> FitResult<Array2<f64>> + 'static,
    {
        self.problem.jacobian = Some(Box::new(jacobian));
        self
    }

    pub fn hessian<F>(mut self, hessian: F) -> Self
    where
        F: Fn(ArrayView1<'_, f64>, &Params) -> FitResult<Array3<f64>> + 'static,
    {
        self.problem.hessian = Some(Box::new(hessian));
        self
    }

    pub fn sparse_jacobian<F>(mut self, sparse_jacobian: F) -> Self
    where
        F: Fn(ArrayView1<'_, f64>, &Params) -> FitResult<JacobianMatrix> + 'static,
    {
        self.problem.sparse_jacobian = Some(Box::new(sparse_jacobian));
        self
    }

    /// Validate the data and return the problem.
    ///
    /// # Errors
    /// - [`FitError::LengthMismatch`] if `len(x) != len(y)` or `len(e)`
    ///   differs.
    /// - [`FitError::ShapeMismatch`] if e or the mask do not match y's shape.
    /// - [`FitError::InvalidData`] if an error value is not finite and
    ///   strictly positive.
    pub fn build(self) -> FitResult<FunctionProblem> {
        let problem = self.problem;
        let y_len = problem.y.shape().first().copied().unwrap_or(0);
        if problem.y.ndim() == 0 || problem.x.len() != y_len {
            return Err(FitError::LengthMismatch {
                x_len: problem.x.len(),
                y_len,
                e_len: problem.e.as_ref().map(|e| e.len()),
            });
        }
        if let Some(e) = &problem.e {
            if e.shape() != problem.y.shape() {
                return Err(FitError::LengthMismatch {
                    x_len: problem.x.len(),
                    y_len,
                    e_len: Some(e.shape().first().copied().unwrap_or(0)),
                });
            }
            for (index, &value) in e.iter().enumerate() {
                if !value.is_finite() || value <= 0.0 {
                    return Err(FitError::InvalidData {
                        what: "data_e",
                        index,
                        value,
                        reason: "Errors must be finite and strictly positive.",
                    });
                }
            }
        }
        if let Some(mask) = &problem.mask {
            if mask.shape() != problem.y.shape() {
                return Err(FitError::ShapeMismatch {
                    expected: problem.y.shape().to_vec(),
                    found: mask.shape().to_vec(),
                });
            }
        }
        Ok(problem)
    }
}

impl FittingProblem for FunctionProblem {
    fn name(&self) -> &str {
        &self.name
    }

    fn format(&self) -> &str {
        &self.format
    }

    fn data_x(&self) -> ArrayView1<'_, f64> {
        self.x.view()
    }

    fn data_y(&self) -> ArrayViewD<'_, f64> {
        self.y.view()
    }

    fn data_e(&self) -> Option<ArrayViewD<'_, f64>> {
        self.e.as_ref().map(|e| e.view())
    }

    fn data_mask(&self) -> Option<ArrayViewD<'_, bool>> {
        self.mask.as_ref().map(|m| m.view())
    }

    fn eval_model(&self, params: &Params, x: ArrayView1<'_, f64>) -> FitResult<ArrayD<f64>> {
        self.model_evaluations.set(self.model_evaluations.get() + 1);
        (self.model)(params, x)
    }

    fn has_complex_model(&self) -> bool {
        self.model_complex.is_some()
    }

    fn eval_model_complex(
        &self, params: &Array1<Complex64>, x: ArrayView1<'_, f64>,
    ) -> FitResult<ArrayD<Complex64>> {
        match &self.model_complex {
            Some(model) => model(params, x),
            None => Err(FitError::ComplexModelUnavailable { problem: self.name.clone() }),
        }
    }

    fn has_jacobian(&self) -> bool {
        self.jacobian.is_some()
    }

    fn jacobian(&self, x: ArrayView1<'_, f64>, params: &Params) -> FitResult<Array2<f64>> {
        match &self.jacobian {
            Some(jacobian) => jacobian(x, params),
            None => Err(FitError::NoJacobian {
                reason: format!("problem '{}' has no analytic Jacobian", self.name),
            }),
        }
    }

    fn has_hessian(&self) -> bool {
        self.hessian.is_some()
    }

    fn hessian(&self, x: ArrayView1<'_, f64>, params: &Params) -> FitResult<Array3<f64>> {
        match &self.hessian {
            Some(hessian) => hessian(x, params),
            None => Err(FitError::NoHessian {
                reason: format!("problem '{}' has no analytic Hessian", self.name),
            }),
        }
    }

    fn has_sparse_jacobian(&self) -> bool {
        self.sparse_jacobian.is_some()
    }

    fn sparse_jacobian(&self, x: ArrayView1<'_, f64>, params: &Params) -> FitResult<JacobianMatrix> {
        match &self.sparse_jacobian {
            Some(sparse_jacobian) => sparse_jacobian(x, params),
            None => Err(FitError::NoSparseJacobian {
                reason: format!("problem '{}' declares no sparse Jacobian", self.name),
            }),
        }
    }
}
