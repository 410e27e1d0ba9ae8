//! jacobian::scipy — finite-difference Jacobians of the model.
//!
//! Purpose
//! -------
//! Approximate the model Jacobian with forward (`2-point`), central
//! (`3-point`) or complex-step (`cs`) differences, optionally restricted to
//! the problem's declared sparsity pattern (`<method>_sparse`).
//!
//! Key behaviors
//! -------------
//! - The unperturbed model value is memoized per parameter vector and fed to
//!   the differencing routine as its baseline.
//! - `_sparse` methods read the pattern from the problem's sparse Jacobian
//!   at the current parameters and return a sparse result.
//! - A dense method on a problem that offers a sparse Jacobian logs that
//!   the sparse Jacobian is unused.
//!
//! Invariants & assumptions
//! ------------------------
//! - `cs` requires the problem to evaluate its model on complex parameters.
//! - [`SCIPY_INCOMPATIBLE_PROBLEMS`] is advisory; controllers consult it
//!   through [`Jacobian::is_method_compatible`].
use crate::{
    cache::{ParamCache, cached_func_values},
    errors::{FitError, FitResult},
    finite_diff::{
        FdMethod, SparsityPattern, complex_step_jacobian, fd_jacobian, fd_jacobian_sparse,
        validate_jacobian_shape,
    },
    jacobian::traits::{Jacobian, JacobianKind, VectorFn, check_jacobian_method},
    problem::FittingProblem,
    types::{JacobianMatrix, Params},
};
use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use std::{cell::RefCell, rc::Rc};
use tracing::info;

pub const SCIPY_METHODS: &[&str] =
    &["2-point", "3-point", "cs", "2-point_sparse", "3-point_sparse", "cs_sparse"];

/// Problem formats that must not be combined with a given method.
pub const SCIPY_INCOMPATIBLE_PROBLEMS: &[(&str, &[&str])] = &[("cs", &["mantid"])];

const SPARSE_SUFFIX: &str = "_sparse";

pub struct ScipyJacobian {
    problem: Rc<dyn FittingProblem>,
    method: String,
    cache_fx: RefCell<ParamCache<Array1<f64>>>,
}

impl ScipyJacobian {
    /// Engine with the default `2-point` method.
    pub fn new(problem: Rc<dyn FittingProblem>) -> Self {
        Self { problem, method: "2-point".to_string(), cache_fx: RefCell::new(ParamCache::new()) }
    }

    /// Differencing scheme and whether the sparse variant is selected.
    fn scheme(&self) -> FitResult<(FdMethod, bool)> {
        match self.method.strip_suffix(SPARSE_SUFFIX) {
            Some(base) => Ok((base.parse()?, true)),
            None => Ok((self.method.parse()?, false)),
        }
    }

    /// Flattened model value at `params`; memoized on the problem's own x.
    fn baseline(&self, params: &Params, x: Option<ArrayView1<'_, f64>>) -> FitResult<Array1<f64>> {
        match x {
            Some(x) => self.problem.eval_model_flat(params, x),
            None => cached_func_values(&self.cache_fx, params, || {
                self.problem.eval_model_flat(params, self.problem.data_x())
            }),
        }
    }

    fn sparsity_pattern(
        &self, params: &Params, x: ArrayView1<'_, f64>,
    ) -> FitResult<SparsityPattern> {
        if !self.problem.has_sparse_jacobian() {
            return Err(FitError::NoSparseJacobian {
                reason: format!(
                    "The selected method is {} but the sparse_jacobian function is None. \
                     Please provide a sparse jacobian function.",
                    self.method
                ),
            });
        }
        let declared = self.problem.sparse_jacobian(x, params)?;
        SparsityPattern::from_jacobian(&declared)
    }
}

impl Jacobian for ScipyJacobian {
    fn kind(&self) -> JacobianKind {
        JacobianKind::Scipy
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn set_method(&mut self, method: &str) -> FitResult<()> {
        check_jacobian_method("scipy", method, SCIPY_METHODS)?;
        self.method = method.to_string();
        Ok(())
    }

    fn valid_methods(&self) -> &'static [&'static str] {
        SCIPY_METHODS
    }

    fn incompatible_problems(&self) -> &'static [(&'static str, &'static [&'static str])] {
        SCIPY_INCOMPATIBLE_PROBLEMS
    }

    fn eval(&self, params: &Params, x: Option<ArrayView1<'_, f64>>) -> FitResult<JacobianMatrix> {
        let (scheme, sparse) = self.scheme()?;
        let x_eval = x.map(|v| v.reborrow()).unwrap_or_else(|| self.problem.data_x());
        let pattern = if sparse {
            Some(self.sparsity_pattern(params, x_eval)?)
        } else {
            if self.problem.has_sparse_jacobian() {
                info!(
                    "Sparse_jacobian function found, but it will not be used as the selected \
                     method is {}.",
                    self.method
                );
            }
            None
        };

        let jac = match scheme {
            FdMethod::ComplexStep => {
                let func = |pc: &Array1<Complex64>| self.problem.eval_model_complex_flat(pc, x_eval);
                let dense = complex_step_jacobian(params, &func)?;
                match &pattern {
                    Some(pattern) => pattern.gather(&dense)?,
                    None => JacobianMatrix::Dense(dense),
                }
            }
            _ => {
                let f0 = self.baseline(params, x)?;
                let func = |p: &Params| self.problem.eval_model_flat(p, x_eval);
                match &pattern {
                    Some(pattern) => fd_jacobian_sparse(params, &f0, &func, scheme, pattern)?,
                    None => JacobianMatrix::Dense(fd_jacobian(params, &f0, &func, scheme)?),
                }
            }
        };
        let expected = (x_eval.len() * self.problem.outputs_per_obs(), params.len());
        validate_jacobian_shape((jac.nrows(), jac.ncols()), expected)?;
        Ok(jac)
    }

    fn eval_func(&self, params: &Params, func: &VectorFn<'_>) -> FitResult<JacobianMatrix> {
        let (scheme, _) = self.scheme()?;
        let f0 = func(params)?;
        Ok(JacobianMatrix::Dense(fd_jacobian(params, &f0, &func, scheme)?))
    }
}
