//! Public surface of the Jacobian engines.
//!
//! - [`Jacobian`]: trait every engine implements.
//! - [`JacobianKind`]: which engine family an instance belongs to.
//! - [`VectorFn`]: the fallible function type accepted by
//!   [`Jacobian::eval_func`].
//!
//! Convention: engines differentiate the *model* `f(x, p)`; the cost
//! functions apply their residual law's chain rule afterwards. Rows are
//! flattened observations, columns are parameters.
use crate::{
    errors::{FitError, FitResult},
    types::{JacobianMatrix, Params},
};
use ndarray::{Array1, ArrayView1};

/// Fallible vector-valued function of the parameters.
pub type VectorFn<'a> = dyn Fn(&Params) -> FitResult<Array1<f64>> + 'a;

/// Engine family of a [`Jacobian`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JacobianKind {
    Analytic,
    Scipy,
    Numdifftools,
    Default,
    Solver,
    BestAvailable,
}

impl JacobianKind {
    /// Registry key of the family.
    pub fn as_str(&self) -> &'static str {
        match self {
            JacobianKind::Analytic => "analytic",
            JacobianKind::Scipy => "scipy",
            JacobianKind::Numdifftools => "numdifftools",
            JacobianKind::Default => "default",
            JacobianKind::Solver => "solver",
            JacobianKind::BestAvailable => "best_available",
        }
    }
}

/// Derivative engine producing model Jacobians.
///
/// Required:
/// - `kind`, `method`, `set_method`, `valid_methods`.
/// - `eval(params, x)`: Jacobian of the model at `params`, with `x`
///   defaulting to the problem's data.
///
/// Optional:
/// - `name()`: `"<kind> <method>"` unless overridden.
/// - `eval_func(params, func)`: differentiate an arbitrary function instead
///   of the model. Only differencing engines support it.
/// - `use_default_jac` / `use_solver_jac`: marker flags telling a controller
///   to let the minimizer approximate derivatives itself.
/// - `delegate_kind`: the concrete family doing the work (differs from
///   `kind` only for `best_available`).
/// - `incompatible_problems`: `(method, formats)` pairs that must not be
///   combined; see [`Jacobian::is_method_compatible`].
pub trait Jacobian {
    // Required methods
    fn kind(&self) -> JacobianKind;
    fn method(&self) -> &str;
    fn set_method(&mut self, method: &str) -> FitResult<()>;
    fn valid_methods(&self) -> &'static [&'static str];
    fn eval(&self, params: &Params, x: Option<ArrayView1<'_, f64>>) -> FitResult<JacobianMatrix>;

    // Optional methods
    fn name(&self) -> String {
        format!("{} {}", self.kind().as_str(), self.method())
    }

    fn eval_func(&self, _params: &Params, _func: &VectorFn<'_>) -> FitResult<JacobianMatrix> {
        Err(FitError::NotSupported { owner: self.name(), operation: "eval_func" })
    }

    fn use_default_jac(&self) -> bool {
        false
    }

    fn use_solver_jac(&self) -> bool {
        false
    }

    fn delegate_kind(&self) -> JacobianKind {
        self.kind()
    }

    fn incompatible_problems(&self) -> &'static [(&'static str, &'static [&'static str])] {
        &[]
    }

    /// `false` if `method` is listed as incompatible with problem `format`.
    fn is_method_compatible(&self, method: &str, format: &str) -> bool {
        !self
            .incompatible_problems()
            .iter()
            .any(|(m, formats)| *m == method && formats.contains(&format))
    }
}

/// Check `method` against an engine's list of valid methods.
///
/// # Errors
/// [`FitError::InvalidJacobianMethod`] naming the engine and the valid set.
pub fn check_jacobian_method(
    engine: &'static str, method: &str, valid: &'static [&'static str],
) -> FitResult<()> {
    if valid.contains(&method) {
        Ok(())
    } else {
        Err(FitError::InvalidJacobianMethod { engine, method: method.to_string(), valid })
    }
}
