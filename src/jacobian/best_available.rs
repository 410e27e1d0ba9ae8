//! jacobian::best_available — analytic when possible, otherwise 2-point.
//!
//! The wrapper holds its delegate and forwards every call through the
//! [`Jacobian`] trait. The method is pinned at construction: attempts to
//! change it are logged and ignored.
use crate::{
    errors::FitResult,
    jacobian::{
        analytic::AnalyticJacobian,
        scipy::ScipyJacobian,
        traits::{Jacobian, JacobianKind, VectorFn},
    },
    problem::FittingProblem,
    types::{JacobianMatrix, Params},
};
use ndarray::ArrayView1;
use std::rc::Rc;
use tracing::warn;

pub struct BestAvailableJacobian {
    delegate: Box<dyn Jacobian>,
}

impl BestAvailableJacobian {
    /// Analytic (`"default"`) if the problem has a Jacobian, else scipy
    /// `"2-point"`.
    pub fn new(problem: Rc<dyn FittingProblem>) -> FitResult<Self> {
        let delegate: Box<dyn Jacobian> = if problem.has_jacobian() {
            Box::new(AnalyticJacobian::new(problem)?)
        } else {
            let mut scipy = ScipyJacobian::new(problem);
            scipy.set_method("2-point")?;
            Box::new(scipy)
        };
        Ok(Self { delegate })
    }

    pub fn delegate(&self) -> &dyn Jacobian {
        self.delegate.as_ref()
    }
}

impl Jacobian for BestAvailableJacobian {
    fn kind(&self) -> JacobianKind {
        JacobianKind::BestAvailable
    }

    fn name(&self) -> String {
        "best_available".to_string()
    }

    fn method(&self) -> &str {
        self.delegate.method()
    }

    fn set_method(&mut self, method: &str) -> FitResult<()> {
        if method != "default" {
            warn!(
                "Method cannot be selected for best_available, using default of {}.",
                self.delegate.method()
            );
        }
        Ok(())
    }

    fn valid_methods(&self) -> &'static [&'static str] {
        self.delegate.valid_methods()
    }

    fn eval(&self, params: &Params, x: Option<ArrayView1<'_, f64>>) -> FitResult<JacobianMatrix> {
        self.delegate.eval(params, x)
    }

    fn eval_func(&self, params: &Params, func: &VectorFn<'_>) -> FitResult<JacobianMatrix> {
        self.delegate.eval_func(params, func)
    }

    fn use_default_jac(&self) -> bool {
        self.delegate.use_default_jac()
    }

    fn use_solver_jac(&self) -> bool {
        self.delegate.use_solver_jac()
    }

    fn delegate_kind(&self) -> JacobianKind {
        self.delegate.kind()
    }

    fn incompatible_problems(&self) -> &'static [(&'static str, &'static [&'static str])] {
        self.delegate.incompatible_problems()
    }
}
