//! Adapter that exposes a [`CostFunc`] as an `argmin` problem.
//!
//! The cost is `eval_cost` on the problem's own data. The gradient comes from
//! `jac_cost` unless the attached Jacobian is one of the marker engines
//! (`default`/`solver`), which ask the minimizer to difference the cost
//! itself; in that case we finite-difference the cost closure.
use std::cell::RefCell;

use crate::{
    controllers::validation::{validate_cost, validate_grad},
    cost_func::CostFunc,
    types::{DataOverride, Grad, Params},
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// Bridges a [`CostFunc`] to `argmin`'s `CostFunction` and `Gradient`.
#[derive(Clone, Copy)]
pub struct CostFuncAdapter<'a> {
    pub cost_func: &'a dyn CostFunc,
}

impl<'a> CostFuncAdapter<'a> {
    pub fn new(cost_func: &'a dyn CostFunc) -> Self {
        Self { cost_func }
    }

    /// `true` when the attached Jacobian delegates differentiation to the
    /// minimizer. A missing Jacobian is not a request for differencing;
    /// `jac_cost` reports it instead.
    pub fn uses_numerical_gradient(&self) -> bool {
        self.cost_func
            .jacobian()
            .map(|jac| jac.use_default_jac() || jac.use_solver_jac())
            .unwrap_or(false)
    }
}

impl<'a> CostFunction for CostFuncAdapter<'a> {
    type Param = Params;
    type Output = f64;

    /// # Errors
    /// Propagates `eval_cost` failures; a non-finite value yields
    /// `NonFiniteCost`.
    fn cost(&self, params: &Self::Param) -> Result<Self::Output, Error> {
        let value = self.cost_func.eval_cost(params, &DataOverride::none())?;
        validate_cost(value)?;
        Ok(value)
    }
}

impl<'a> Gradient for CostFuncAdapter<'a> {
    type Param = Params;
    type Gradient = Grad;

    /// Analytic path: `jac_cost`, validated for size and finiteness.
    ///
    /// Numerical path: central differences of the cost; if a cost evaluation
    /// failed inside the closure, or the result is not finite, retry once
    /// with forward differences.
    ///
    /// The difference closure must return `f64`, so the first error it
    /// meets is parked in `closure_err` and `NaN` is returned in its place.
    fn gradient(&self, params: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = params.len();
        if !self.uses_numerical_gradient() {
            let grad = self.cost_func.jac_cost(params, &DataOverride::none())?;
            validate_grad(&grad, dim)?;
            return Ok(grad);
        }

        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let cost = |p: &Params| -> f64 {
            match self.cost(p) {
                Ok(val) => val,
                Err(e) => {
                    let mut slot = closure_err.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(e);
                    }
                    f64::NAN
                }
            }
        };
        let fd_grad = params.central_diff(&cost);
        if closure_err.borrow().is_some() || validate_grad(&fd_grad, dim).is_err() {
            return run_forward_diff(params, &cost, &closure_err);
        }
        Ok(fd_grad)
    }
}

/// Forward-difference gradient of `func` at `params`, surfacing any error
/// captured during evaluation.
fn run_forward_diff<G: Fn(&Params) -> f64>(
    params: &Params, func: &G, closure_err: &RefCell<Option<Error>>,
) -> Result<Grad, Error> {
    closure_err.replace(None);
    let fd_grad = params.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    validate_grad(&fd_grad, params.len())?;
    Ok(fd_grad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cost_func::{CostFunc, NLLSCostFunc, fixtures::linear_problem},
        errors::FitError,
        jacobian::{AnalyticJacobian, DefaultJacobian, Jacobian},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::rc::Rc;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Cost forwarding and the analytic gradient path.
    // - The finite-difference path selected by the `default` marker engine.
    // - Error propagation when no Jacobian is attached.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Analytic and marker-driven numerical gradients agree.
    //
    // Given
    // -----
    // - The linear fixture `f = x + p0` under `nlls` at `p0 = 1`, once with
    //   the analytic engine and once with the `default` marker.
    //
    // Expect
    // ------
    // - Cost 81 (residuals [4, 1, 8]) and gradient `-2 · Σr = -26` on both
    //   paths, the numerical one within 1e-5.
    fn analytic_and_numerical_gradients_agree() {
        // Arrange
        let (problem, _) = linear_problem(None);
        let mut analytic = NLLSCostFunc::new(problem.clone());
        let jac: Rc<dyn Jacobian> = Rc::new(AnalyticJacobian::new(problem.clone()).unwrap());
        analytic.set_jacobian(jac);
        let mut marked = NLLSCostFunc::new(problem);
        let marker: Rc<dyn Jacobian> = Rc::new(DefaultJacobian::new());
        marked.set_jacobian(marker);
        let p = array![1.0];

        // Act
        let exact = CostFuncAdapter::new(&analytic);
        let numeric = CostFuncAdapter::new(&marked);
        let cost = exact.cost(&p).unwrap();
        let g_exact = exact.gradient(&p).unwrap();
        let g_numeric = numeric.gradient(&p).unwrap();

        // Assert
        assert!(!exact.uses_numerical_gradient());
        assert!(numeric.uses_numerical_gradient());
        assert_abs_diff_eq!(cost, 81.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g_exact[0], -26.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g_numeric[0], -26.0, epsilon = 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // Without an attached engine the gradient request fails loudly.
    //
    // Given
    // -----
    // - An `nlls` cost function with no Jacobian.
    //
    // Expect
    // ------
    // - `DerivativeNotAttached` after conversion back to `FitError`.
    fn missing_jacobian_is_reported() {
        // Arrange
        let (problem, _) = linear_problem(None);
        let cost = NLLSCostFunc::new(problem);
        let adapter = CostFuncAdapter::new(&cost);

        // Act
        let err: FitError = adapter.gradient(&array![1.0]).expect_err("no Jacobian").into();

        // Assert
        assert!(matches!(err, FitError::DerivativeNotAttached { .. }));
    }
}
