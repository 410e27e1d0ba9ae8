//! Public surface of the Hessian engines.
//!
//! - [`Hessian`]: trait every engine implements.
//! - [`HessianKind`]: which engine family an instance belongs to.
//!
//! Convention: `eval` returns second derivatives of the *model*,
//! `[n_params, n_params, n_obs_flat]`, symmetric in its first two axes.
//! [`Hessian::eval_cost`] combines the cost function's residual Hessian,
//! residual Jacobian and residuals into `Jᵀ J + Σ_i r_i H_i`.
use crate::{
    cost_func::CostFunc,
    errors::{FitError, FitResult},
    finite_diff::validate_residual_hessian,
    types::{CostHessian, DataOverride, Params, ResidualHessian},
};
use ndarray::{ArrayView1, Axis};

/// Engine family of a [`Hessian`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HessianKind {
    Analytic,
    Scipy,
    Numdifftools,
    BestAvailable,
}

impl HessianKind {
    /// Registry key of the family.
    pub fn as_str(&self) -> &'static str {
        match self {
            HessianKind::Analytic => "analytic",
            HessianKind::Scipy => "scipy",
            HessianKind::Numdifftools => "numdifftools",
            HessianKind::BestAvailable => "best_available",
        }
    }
}

/// Derivative engine producing model Hessians.
///
/// Required:
/// - `kind`, `method`, `set_method`, `valid_methods`.
/// - `eval(params, x)`: symmetric model Hessian at `params`.
///
/// Optional:
/// - `name()`: `"<kind> <method>"` unless overridden.
/// - `delegate_kind`, `incompatible_problems`, `is_method_compatible`: as for
///   Jacobians.
/// - `eval_cost(params, data, cost_func)`: Gauss–Newton combination used by
///   least-squares cost functions.
pub trait Hessian {
    // Required methods
    fn kind(&self) -> HessianKind;
    fn method(&self) -> &str;
    fn set_method(&mut self, method: &str) -> FitResult<()>;
    fn valid_methods(&self) -> &'static [&'static str];
    fn eval(&self, params: &Params, x: Option<ArrayView1<'_, f64>>) -> FitResult<ResidualHessian>;

    // Optional methods
    fn name(&self) -> String {
        format!("{} {}", self.kind().as_str(), self.method())
    }

    fn delegate_kind(&self) -> HessianKind {
        self.kind()
    }

    fn incompatible_problems(&self) -> &'static [(&'static str, &'static [&'static str])] {
        &[]
    }

    fn is_method_compatible(&self, method: &str, format: &str) -> bool {
        !self
            .incompatible_problems()
            .iter()
            .any(|(m, formats)| *m == method && formats.contains(&format))
    }

    /// eval_cost — `Jᵀ J + Σ_i r_i H_i` for a least-squares cost function.
    ///
    /// Parameters
    /// ----------
    /// - `params`: `&Params`
    ///   Point of evaluation.
    /// - `data`: `&DataOverride`
    ///   Optional x/y/e replacement forwarded to the cost function.
    /// - `cost_func`: `&dyn CostFunc`
    ///   Supplies `hes_res` (residual Hessian and Jacobian) and `eval_r`;
    ///   the residual is served from the cost function's cache when the
    ///   same parameters were evaluated last.
    ///
    /// Errors
    /// ------
    /// - Propagates errors of `hes_res`/`eval_r`.
    /// - [`FitError::HessianShapeMismatch`] if the residual Hessian does not
    ///   match `(n_params, n_params, len(r))`.
    fn eval_cost(
        &self, params: &Params, data: &DataOverride<'_>, cost_func: &dyn CostFunc,
    ) -> FitResult<CostHessian> {
        let (hes, jac) = cost_func.hes_res(params, data)?;
        let r = cost_func.eval_r(params, data)?;
        validate_residual_hessian(&hes, params.len(), r.len())?;
        let mut out = jac.gram();
        if out.dim() != (params.len(), params.len()) {
            return Err(FitError::JacobianShapeMismatch {
                expected: (r.len(), params.len()),
                found: (jac.nrows(), jac.ncols()),
            });
        }
        for (i, slice) in hes.axis_iter(Axis(2)).enumerate() {
            out.scaled_add(r[i], &slice);
        }
        Ok(out)
    }
}

/// Check `method` against an engine's list of valid methods.
///
/// # Errors
/// [`FitError::InvalidHessianMethod`] naming the engine and the valid set.
pub fn check_hessian_method(
    engine: &'static str, method: &str, valid: &'static [&'static str],
) -> FitResult<()> {
    if valid.contains(&method) {
        Ok(())
    } else {
        Err(FitError::InvalidHessianMethod { engine, method: method.to_string(), valid })
    }
}
