//! hessian::best_available — analytic when possible, otherwise 2-point.
//!
//! Mirrors the Jacobian wrapper: the delegate is chosen at construction and
//! method changes are logged and ignored.
use crate::{
    errors::FitResult,
    hessian::{
        analytic::AnalyticHessian,
        scipy::ScipyHessian,
        traits::{Hessian, HessianKind},
    },
    jacobian::Jacobian,
    problem::FittingProblem,
    types::{Params, ResidualHessian},
};
use ndarray::ArrayView1;
use std::rc::Rc;
use tracing::warn;

pub struct BestAvailableHessian {
    delegate: Box<dyn Hessian>,
}

impl BestAvailableHessian {
    pub fn new(problem: Rc<dyn FittingProblem>, jacobian: Rc<dyn Jacobian>) -> FitResult<Self> {
        let delegate: Box<dyn Hessian> = if problem.has_hessian() {
            let mut analytic = AnalyticHessian::new(problem)?;
            analytic.set_method("default")?;
            Box::new(analytic)
        } else {
            let mut scipy = ScipyHessian::new(problem, jacobian);
            scipy.set_method("2-point")?;
            Box::new(scipy)
        };
        Ok(Self { delegate })
    }
}

impl Hessian for BestAvailableHessian {
    fn kind(&self) -> HessianKind {
        HessianKind::BestAvailable
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

    fn eval(&self, params: &Params, x: Option<ArrayView1<'_, f64>>) -> FitResult<ResidualHessian> {
        self.delegate.eval(params, x)
    }

    fn delegate_kind(&self) -> HessianKind {
        self.delegate.kind()
    }

    fn incompatible_problems(&self) -> &'static [(&'static str, &'static [&'static str])] {
        self.delegate.incompatible_problems()
    }
}
