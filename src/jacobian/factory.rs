//! jacobian::factory — string-keyed registry of Jacobian engines.
//!
//! Purpose
//! -------
//! Map the configuration keys `analytic`, `scipy`, `numdifftools`,
//! `default`, `solver` and `best_available` onto engine constructors through
//! a static table, and resolve `(jac_method, num_method)` pairs into a
//! ready-to-use engine.
//!
//! Key behaviors
//! -------------
//! - [`create_jacobian`] returns the registry entry (not an instance);
//!   unknown keys fail with [`FitError::UnknownJacobian`], whose kind is
//!   `NoJacobian`.
//! - [`resolve_jacobian`] builds the engine and applies the numerical method.
//!
//! Conventions
//! -----------
//! - Lookup scans the table in order; the first matching key wins.
use crate::{
    errors::{FitError, FitResult},
    jacobian::{
        analytic::AnalyticJacobian,
        best_available::BestAvailableJacobian,
        default::{DefaultJacobian, SolverJacobian},
        numdifftools::NumdifftoolsJacobian,
        scipy::ScipyJacobian,
        traits::Jacobian,
    },
    problem::FittingProblem,
};
use std::rc::Rc;
use tracing::debug;

/// Constructor stored in the registry.
pub type JacobianBuilder = fn(Rc<dyn FittingProblem>) -> FitResult<Box<dyn Jacobian>>;

/// One registered Jacobian engine.
#[derive(Debug, Clone, Copy)]
pub struct JacobianEntry {
    key: &'static str,
    type_name: &'static str,
    builder: JacobianBuilder,
}

impl JacobianEntry {
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Name of the engine type, e.g. `"ScipyJacobian"`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Instantiate the engine for `problem`.
    pub fn build(&self, problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn Jacobian>> {
        (self.builder)(problem)
    }
}

fn build_analytic(problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn Jacobian>> {
    Ok(Box::new(AnalyticJacobian::new(problem)?))
}

fn build_scipy(problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn Jacobian>> {
    Ok(Box::new(ScipyJacobian::new(problem)))
}

fn build_numdifftools(problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn Jacobian>> {
    Ok(Box::new(NumdifftoolsJacobian::new(problem)))
}

fn build_default(_problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn Jacobian>> {
    Ok(Box::new(DefaultJacobian::new()))
}

fn build_solver(_problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn Jacobian>> {
    Ok(Box::new(SolverJacobian::new()))
}

fn build_best_available(problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn Jacobian>> {
    Ok(Box::new(BestAvailableJacobian::new(problem)?))
}

static JACOBIAN_REGISTRY: &[JacobianEntry] = &[
    JacobianEntry { key: "analytic", type_name: "AnalyticJacobian", builder: build_analytic },
    JacobianEntry { key: "scipy", type_name: "ScipyJacobian", builder: build_scipy },
    JacobianEntry {
        key: "numdifftools",
        type_name: "NumdifftoolsJacobian",
        builder: build_numdifftools,
    },
    JacobianEntry { key: "default", type_name: "DefaultJacobian", builder: build_default },
    JacobianEntry { key: "solver", type_name: "SolverJacobian", builder: build_solver },
    JacobianEntry {
        key: "best_available",
        type_name: "BestAvailableJacobian",
        builder: build_best_available,
    },
];

/// Look up the Jacobian engine registered under `jac_method`.
///
/// # Errors
/// [`FitError::UnknownJacobian`] for unregistered keys.
pub fn create_jacobian(jac_method: &str) -> FitResult<&'static JacobianEntry> {
    JACOBIAN_REGISTRY
        .iter()
        .find(|entry| entry.key == jac_method)
        .ok_or_else(|| FitError::UnknownJacobian { name: jac_method.to_string() })
}

/// Build the engine for `jac_method` and select `num_method` on it.
///
/// # Errors
/// - [`FitError::UnknownJacobian`] for unregistered keys.
/// - Construction errors of the engine (e.g. `NoJacobian`).
/// - [`FitError::InvalidJacobianMethod`] if `num_method` is not valid for
///   the engine.
pub fn resolve_jacobian(
    jac_method: &str, num_method: Option<&str>, problem: Rc<dyn FittingProblem>,
) -> FitResult<Box<dyn Jacobian>> {
    let entry = create_jacobian(jac_method)?;
    let mut jacobian = entry.build(problem)?;
    if let Some(method) = num_method {
        jacobian.set_method(method)?;
    }
    debug!(jacobian = %jacobian.name(), "resolved Jacobian engine");
    Ok(jacobian)
}

/// Registered keys, in lookup order.
pub fn registered_jacobians() -> impl Iterator<Item = &'static str> {
    JACOBIAN_REGISTRY.iter().map(|entry| entry.key)
}
