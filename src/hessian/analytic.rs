//! hessian::analytic — the problem's own Hessian.
//!
//! Construction fails with [`FitError::NoHessian`] when the problem ships no
//! analytic Hessian. Results are shape-checked and symmetrized like every
//! other engine's.
use crate::{
    errors::{FitError, FitResult},
    finite_diff::{symmetrize_residual_hessian, validate_residual_hessian},
    hessian::traits::{Hessian, HessianKind, check_hessian_method},
    problem::FittingProblem,
    types::{Params, ResidualHessian},
};
use ndarray::ArrayView1;
use std::rc::Rc;

pub const ANALYTIC_HESSIAN_METHODS: &[&str] = &["default"];

pub struct AnalyticHessian {
    problem: Rc<dyn FittingProblem>,
    method: String,
}

impl AnalyticHessian {
    /// # Errors
    /// [`FitError::NoHessian`] if the problem has no analytic Hessian.
    pub fn new(problem: Rc<dyn FittingProblem>) -> FitResult<Self> {
        if !problem.has_hessian() {
            return Err(FitError::NoHessian {
                reason: "Problem set selected does not currently support analytic Hessians"
                    .to_string(),
            });
        }
        Ok(Self { problem, method: "default".to_string() })
    }
}

impl Hessian for AnalyticHessian {
    fn kind(&self) -> HessianKind {
        HessianKind::Analytic
    }

    fn name(&self) -> String {
        "analytic".to_string()
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn set_method(&mut self, method: &str) -> FitResult<()> {
        check_hessian_method("analytic", method, ANALYTIC_HESSIAN_METHODS)?;
        self.method = method.to_string();
        Ok(())
    }

    fn valid_methods(&self) -> &'static [&'static str] {
        ANALYTIC_HESSIAN_METHODS
    }

    fn eval(&self, params: &Params, x: Option<ArrayView1<'_, f64>>) -> FitResult<ResidualHessian> {
        let x = x.map(|v| v.reborrow()).unwrap_or_else(|| self.problem.data_x());
        let mut hes = self.problem.hessian(x, params)?;
        validate_residual_hessian(&hes, params.len(), x.len() * self.problem.outputs_per_obs())?;
        symmetrize_residual_hessian(&mut hes);
        Ok(hes)
    }
}
