//! jacobian::analytic — the problem's own Jacobian.
//!
//! Purpose
//! -------
//! Forward Jacobian requests to the analytic derivative a problem ships
//! with, dense or sparse.
//!
//! Key behaviors
//! -------------
//! - Construction fails with [`FitError::NoJacobian`] when the problem has no
//!   analytic Jacobian or, for the restricted constructor, when its format
//!   is not supported.
//! - Method `"sparse"` returns the problem's sparse Jacobian, rejecting a
//!   missing one ([`FitError::NoSparseJacobian`]) and a dense one
//!   ([`FitError::SparseJacobianIsDense`]).
//! - Output shape is checked against `(n_obs_flat, n_params)`.
use crate::{
    errors::{FitError, FitResult},
    finite_diff::validate_jacobian_shape,
    jacobian::traits::{Jacobian, JacobianKind, check_jacobian_method},
    problem::FittingProblem,
    types::{JacobianMatrix, Params},
};
use ndarray::ArrayView1;
use std::rc::Rc;

pub const ANALYTIC_METHODS: &[&str] = &["default", "sparse"];

pub struct AnalyticJacobian {
    problem: Rc<dyn FittingProblem>,
    method: String,
}

impl AnalyticJacobian {
    /// # Errors
    /// [`FitError::NoJacobian`] if the problem has no analytic Jacobian.
    pub fn new(problem: Rc<dyn FittingProblem>) -> FitResult<Self> {
        if !problem.has_jacobian() {
            return Err(FitError::NoJacobian {
                reason: "Problem set selected does not currently support analytic Jacobians"
                    .to_string(),
            });
        }
        Ok(Self { problem, method: "default".to_string() })
    }

    /// Analytic Jacobian restricted to problems of the given formats.
    ///
    /// # Errors
    /// As [`AnalyticJacobian::new`], and [`FitError::NoJacobian`] when the
    /// problem's format is not in `formats`.
    pub fn with_supported_formats(
        problem: Rc<dyn FittingProblem>, formats: &[&str],
    ) -> FitResult<Self> {
        if !formats.contains(&problem.format()) {
            return Err(FitError::NoJacobian {
                reason: format!(
                    "Analytic Jacobian is only supported for problem formats {formats:?}, \
                     not '{}'",
                    problem.format()
                ),
            });
        }
        Self::new(problem)
    }
}

impl Jacobian for AnalyticJacobian {
    fn kind(&self) -> JacobianKind {
        JacobianKind::Analytic
    }

    fn name(&self) -> String {
        "analytic".to_string()
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn set_method(&mut self, method: &str) -> FitResult<()> {
        check_jacobian_method("analytic", method, ANALYTIC_METHODS)?;
        self.method = method.to_string();
        Ok(())
    }

    fn valid_methods(&self) -> &'static [&'static str] {
        ANALYTIC_METHODS
    }

    fn eval(&self, params: &Params, x: Option<ArrayView1<'_, f64>>) -> FitResult<JacobianMatrix> {
        let x = x.map(|v| v.reborrow()).unwrap_or_else(|| self.problem.data_x());
        let expected = (x.len() * self.problem.outputs_per_obs(), params.len());
        if self.method == "sparse" {
            if !self.problem.has_sparse_jacobian() {
                return Err(FitError::NoSparseJacobian {
                    reason: format!(
                        "The selected method is {} but the sparse_jacobian function is None. \
                         Please provide a sparse jacobian function.",
                        self.method
                    ),
                });
            }
            let jac = self.problem.sparse_jacobian(x, params)?;
            if !jac.is_sparse() {
                return Err(FitError::SparseJacobianIsDense);
            }
            validate_jacobian_shape((jac.nrows(), jac.ncols()), expected)?;
            return Ok(jac);
        }
        let jac = self.problem.jacobian(x, params)?;
        validate_jacobian_shape(jac.dim(), expected)?;
        Ok(JacobianMatrix::Dense(jac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::FunctionProblem;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction failures (no Jacobian, unsupported format).
    // - Dense and sparse evaluation paths and their error cases.
    // -------------------------------------------------------------------------

    fn problem(with_jac: bool, dense_sparse: bool) -> Rc<dyn FittingProblem> {
        let mut builder = FunctionProblem::builder(
            "linear",
            array![1.0, 8.0, 11.0],
            array![6.0, 10.0, 20.0],
            |p: &Params, x: ArrayView1<'_, f64>| Ok((&x + p[0]).into_dyn()),
        );
        if with_jac {
            builder = builder
                .jacobian(|x: ArrayView1<'_, f64>, _p: &Params| Ok(Array2::ones((x.len(), 1))));
        }
        if dense_sparse {
            builder = builder.sparse_jacobian(|x: ArrayView1<'_, f64>, _p: &Params| {
                Ok(JacobianMatrix::Dense(Array2::ones((x.len(), 1))))
            });
        }
        Rc::new(builder.build().unwrap())
    }

    #[test]
    // Purpose
    // -------
    // Problems without an analytic Jacobian cannot build the engine.
    //
    // Given
    // -----
    // - A problem with no Jacobian closure.
    //
    // Expect
    // ------
    // - `NoJacobian`.
    fn new_without_jacobian_fails() {
        // Arrange / Act
        let err = AnalyticJacobian::new(problem(false, false)).err().expect("must fail");

        // Assert
        match err {
            FitError::NoJacobian { .. } => {}
            other => panic!("Expected NoJacobian, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // The restricted constructor checks the problem format.
    //
    // Given
    // -----
    // - A "function" format problem and supported formats `["cutest"]`.
    //
    // Expect
    // ------
    // - `NoJacobian`.
    fn restricted_constructor_checks_format() {
        // Arrange / Act
        let result = AnalyticJacobian::with_supported_formats(problem(true, false), &["cutest"]);

        // Assert
        assert!(matches!(result, Err(FitError::NoJacobian { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Dense evaluation returns the problem's Jacobian; the name is fixed.
    //
    // Given
    // -----
    // - `f = x + p0` with `J = 1`.
    //
    // Expect
    // ------
    // - A dense 3×1 matrix of ones and name "analytic".
    fn eval_returns_problem_jacobian() {
        // Arrange
        let jac = AnalyticJacobian::new(problem(true, false)).unwrap();

        // Act
        let j = jac.eval(&array![5.0], None).unwrap();

        // Assert
        assert!(!j.is_sparse());
        assert_eq!(j.to_dense(), Array2::ones((3, 1)));
        assert_eq!(jac.name(), "analytic");
    }

    #[test]
    // Purpose
    // -------
    // The sparse method rejects missing and dense sparse Jacobians.
    //
    // Given
    // -----
    // - One problem without a sparse Jacobian, one whose "sparse" Jacobian
    //   is dense.
    //
    // Expect
    // ------
    // - `NoSparseJacobian` and `SparseJacobianIsDense` respectively.
    fn sparse_method_rejects_missing_and_dense() {
        // Arrange
        let mut missing = AnalyticJacobian::new(problem(true, false)).unwrap();
        missing.set_method("sparse").unwrap();
        let mut dense = AnalyticJacobian::new(problem(true, true)).unwrap();
        dense.set_method("sparse").unwrap();

        // Act
        let e1 = missing.eval(&array![5.0], None).expect_err("missing");
        let e2 = dense.eval(&array![5.0], None).expect_err("dense");

        // Assert
        assert!(matches!(e1, FitError::NoSparseJacobian { .. }));
        assert_eq!(e2, FitError::SparseJacobianIsDense);
    }
}
