//! hessian::factory — string-keyed registry of Hessian engines.
//!
//! Keys: `analytic`, `scipy`, `numdifftools`, `best_available`. Numerical
//! engines difference the Jacobian engine they are given, so every builder
//! takes the shared `Rc<dyn Jacobian>` alongside the problem.
use crate::{
    errors::{FitError, FitResult},
    hessian::{
        analytic::AnalyticHessian, best_available::BestAvailableHessian,
        numdifftools::NumdifftoolsHessian, scipy::ScipyHessian, traits::Hessian,
    },
    jacobian::Jacobian,
    problem::FittingProblem,
};
use std::rc::Rc;
use tracing::debug;

/// Constructor stored in the registry.
pub type HessianBuilder =
    fn(Rc<dyn FittingProblem>, Rc<dyn Jacobian>) -> FitResult<Box<dyn Hessian>>;

/// One registered Hessian engine.
#[derive(Debug, Clone, Copy)]
pub struct HessianEntry {
    key: &'static str,
    type_name: &'static str,
    builder: HessianBuilder,
}

impl HessianEntry {
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Instantiate the engine for `problem`, differencing `jacobian` where
    /// the engine is numerical.
    pub fn build(
        &self, problem: Rc<dyn FittingProblem>, jacobian: Rc<dyn Jacobian>,
    ) -> FitResult<Box<dyn Hessian>> {
        (self.builder)(problem, jacobian)
    }
}

fn build_analytic(
    problem: Rc<dyn FittingProblem>, _jacobian: Rc<dyn Jacobian>,
) -> FitResult<Box<dyn Hessian>> {
    Ok(Box::new(AnalyticHessian::new(problem)?))
}

fn build_scipy(
    problem: Rc<dyn FittingProblem>, jacobian: Rc<dyn Jacobian>,
) -> FitResult<Box<dyn Hessian>> {
    Ok(Box::new(ScipyHessian::new(problem, jacobian)))
}

fn build_numdifftools(
    problem: Rc<dyn FittingProblem>, jacobian: Rc<dyn Jacobian>,
) -> FitResult<Box<dyn Hessian>> {
    Ok(Box::new(NumdifftoolsHessian::new(problem, jacobian)))
}

fn build_best_available(
    problem: Rc<dyn FittingProblem>, jacobian: Rc<dyn Jacobian>,
) -> FitResult<Box<dyn Hessian>> {
    Ok(Box::new(BestAvailableHessian::new(problem, jacobian)?))
}

static HESSIAN_REGISTRY: &[HessianEntry] = &[
    HessianEntry { key: "analytic", type_name: "AnalyticHessian", builder: build_analytic },
    HessianEntry { key: "scipy", type_name: "ScipyHessian", builder: build_scipy },
    HessianEntry {
        key: "numdifftools",
        type_name: "NumdifftoolsHessian",
        builder: build_numdifftools,
    },
    HessianEntry {
        key: "best_available",
        type_name: "BestAvailableHessian",
        builder: build_best_available,
    },
];

/// Look up the Hessian engine registered under `hes_method`.
///
/// # Errors
/// [`FitError::UnknownHessian`] for unregistered keys.
pub fn create_hessian(hes_method: &str) -> FitResult<&'static HessianEntry> {
    HESSIAN_REGISTRY
        .iter()
        .find(|entry| entry.key == hes_method)
        .ok_or_else(|| FitError::UnknownHessian { name: hes_method.to_string() })
}

/// Build the engine for `hes_method` and select `num_method` on it.
///
/// # Errors
/// - [`FitError::UnknownHessian`] for unregistered keys.
/// - Construction errors of the engine (e.g. `NoHessian`).
/// - [`FitError::InvalidHessianMethod`] if `num_method` is not valid.
pub fn resolve_hessian(
    hes_method: &str, num_method: Option<&str>, problem: Rc<dyn FittingProblem>,
    jacobian: Rc<dyn Jacobian>,
) -> FitResult<Box<dyn Hessian>> {
    let entry = create_hessian(hes_method)?;
    let mut hessian = entry.build(problem, jacobian)?;
    if let Some(method) = num_method {
        hessian.set_method(method)?;
    }
    debug!(hessian = %hessian.name(), "resolved Hessian engine");
    Ok(hessian)
}

/// Registered keys, in lookup order.
pub fn registered_hessians() -> impl Iterator<Item = &'static str> {
    HESSIAN_REGISTRY.iter().map(|entry| entry.key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::ErrorKind, jacobian::ScipyJacobian, problem::FunctionProblem, types::Params,
    };
    use ndarray::{ArrayView1, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Registry lookup and failure on unknown keys.
    // - Method validation in `resolve_hessian`.
    // -------------------------------------------------------------------------

    fn problem() -> Rc<dyn FittingProblem> {
        Rc::new(
            FunctionProblem::builder(
                "linear",
                array![1.0, 8.0, 11.0],
                array![6.0, 10.0, 20.0],
                |p: &Params, x: ArrayView1<'_, f64>| Ok((&x + p[0]).into_dyn()),
            )
            .build()
            .unwrap(),
        )
    }

    #[test]
    // Purpose
    // -------
    // Every key resolves; unknown keys carry the NoHessian kind.
    //
    // Given
    // -----
    // - All registered keys and "foo".
    //
    // Expect
    // ------
    // - Type names ending in "Hessian"; `UnknownHessian` for "foo".
    fn create_hessian_resolves_all_keys() {
        // Arrange / Act / Assert
        for key in registered_hessians() {
            assert!(create_hessian(key).unwrap().type_name().ends_with("Hessian"), "{key}");
        }
        let err = create_hessian("foo").expect_err("unknown key");
        assert_eq!(err.kind(), ErrorKind::NoHessian);
    }

    #[test]
    // Purpose
    // -------
    // Methods are validated against the engine's list.
    //
    // Given
    // -----
    // - ("numdifftools", "forward") and ("scipy", "central").
    //
    // Expect
    // ------
    // - The first resolves; the second fails with `InvalidHessianMethod`.
    fn resolve_hessian_validates_method() {
        // Arrange
        let problem = problem();
        let jacobian: Rc<dyn Jacobian> = Rc::new(ScipyJacobian::new(problem.clone()));

        // Act
        let nd = resolve_hessian("numdifftools", Some("forward"), problem.clone(), jacobian.clone())
            .unwrap();
        let bad = resolve_hessian("scipy", Some("central"), problem, jacobian);

        // Assert
        assert_eq!(nd.name(), "numdifftools forward");
        assert!(matches!(bad, Err(FitError::InvalidHessianMethod { engine: "scipy", .. })));
    }
}
