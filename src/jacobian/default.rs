//! jacobian::default — marker engines that defer to the minimizer.
//!
//! [`DefaultJacobian`] and [`SolverJacobian`] compute nothing: their
//! presence tells a controller to let the minimizer approximate derivatives
//! with its own built-in scheme. `eval` therefore reports
//! [`FitError::NotSupported`].
use crate::{
    errors::{FitError, FitResult},
    jacobian::traits::{Jacobian, JacobianKind, check_jacobian_method},
    types::{JacobianMatrix, Params},
};
use ndarray::ArrayView1;

const MARKER_METHODS: &[&str] = &["default"];

/// Use the minimizer's default derivative approximation.
#[derive(Debug, Clone)]
pub struct DefaultJacobian {
    method: String,
}

impl DefaultJacobian {
    pub fn new() -> Self {
        Self { method: "default".to_string() }
    }
}

impl Default for DefaultJacobian {
    fn default() -> Self {
        Self::new()
    }
}

impl Jacobian for DefaultJacobian {
    fn kind(&self) -> JacobianKind {
        JacobianKind::Default
    }

    fn name(&self) -> String {
        "default".to_string()
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn set_method(&mut self, method: &str) -> FitResult<()> {
        check_jacobian_method("default", method, MARKER_METHODS)?;
        self.method = method.to_string();
        Ok(())
    }

    fn valid_methods(&self) -> &'static [&'static str] {
        MARKER_METHODS
    }

    fn eval(&self, _params: &Params, _x: Option<ArrayView1<'_, f64>>) -> FitResult<JacobianMatrix> {
        Err(FitError::NotSupported { owner: self.name(), operation: "eval" })
    }

    fn use_default_jac(&self) -> bool {
        true
    }
}

/// Use the solver's own Jacobian approximation.
#[derive(Debug, Clone)]
pub struct SolverJacobian {
    method: String,
}

impl SolverJacobian {
    pub fn new() -> Self {
        Self { method: "default".to_string() }
    }
}

impl Default for SolverJacobian {
    fn default() -> Self {
        Self::new()
    }
}

impl Jacobian for SolverJacobian {
    fn kind(&self) -> JacobianKind {
        JacobianKind::Solver
    }

    fn name(&self) -> String {
        "solver".to_string()
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn set_method(&mut self, method: &str) -> FitResult<()> {
        check_jacobian_method("solver", method, MARKER_METHODS)?;
        self.method = method.to_string();
        Ok(())
    }

    fn valid_methods(&self) -> &'static [&'static str] {
        MARKER_METHODS
    }

    fn eval(&self, _params: &Params, _x: Option<ArrayView1<'_, f64>>) -> FitResult<JacobianMatrix> {
        Err(FitError::NotSupported { owner: self.name(), operation: "eval" })
    }

    fn use_solver_jac(&self) -> bool {
        true
    }
}
