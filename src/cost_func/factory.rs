//! cost_func::factory — string-keyed registry of cost functions.
//!
//! Purpose
//! -------
//! Resolve the configuration keys `nlls`, `weighted_nlls`,
//! `hellinger_nlls`, `root_nlls`, `poisson` and `loglike_nlls` to
//! constructors through a static table.
//!
//! Key behaviors
//! -------------
//! - [`create_cost_func`] returns the registry entry (not an instance); the
//!   caller builds it with a problem.
//! - [`create_nlls_cost_func`] only resolves least-squares objectives.
//! - Unknown keys fail with [`FitError::UnknownCostFunc`].
//!
//! Conventions
//! -----------
//! - Lookup scans the table in order; the first matching key wins.
use crate::{
    cost_func::{
        loglike_nlls::LoglikeNLLSCostFunc, nlls::NLLSCostFunc, poisson::PoissonCostFunc,
        root_nlls::RootNLLSCostFunc, traits::CostFunc, weighted_nlls::WeightedNLLSCostFunc,
    },
    errors::{FitError, FitResult},
    problem::FittingProblem,
};
use std::rc::Rc;
use tracing::debug;

/// Constructor stored in the registry.
pub type CostFuncBuilder = fn(Rc<dyn FittingProblem>) -> FitResult<Box<dyn CostFunc>>;

/// One registered cost function.
#[derive(Debug, Clone, Copy)]
pub struct CostFuncEntry {
    key: &'static str,
    type_name: &'static str,
    least_squares: bool,
    builder: CostFuncBuilder,
}

impl CostFuncEntry {
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Name of the implementing type, e.g. `"PoissonCostFunc"`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_least_squares(&self) -> bool {
        self.least_squares
    }

    /// Instantiate the cost function for `problem`.
    pub fn build(&self, problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn CostFunc>> {
        debug!(cost_func = self.key, problem = problem.name(), "building cost function");
        (self.builder)(problem)
    }
}

fn build_nlls(problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn CostFunc>> {
    Ok(Box::new(NLLSCostFunc::new(problem)))
}

fn build_weighted_nlls(problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn CostFunc>> {
    Ok(Box::new(WeightedNLLSCostFunc::new(problem)))
}

fn build_hellinger_nlls(problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn CostFunc>> {
    Ok(Box::new(RootNLLSCostFunc::hellinger(problem)))
}

fn build_root_nlls(problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn CostFunc>> {
    Ok(Box::new(RootNLLSCostFunc::new(problem)))
}

fn build_poisson(problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn CostFunc>> {
    Ok(Box::new(PoissonCostFunc::new(problem)))
}

fn build_loglike_nlls(problem: Rc<dyn FittingProblem>) -> FitResult<Box<dyn CostFunc>> {
    Ok(Box::new(LoglikeNLLSCostFunc::new(problem)))
}

static COST_FUNC_REGISTRY: &[CostFuncEntry] = &[
    CostFuncEntry {
        key: "nlls",
        type_name: "NLLSCostFunc",
        least_squares: true,
        builder: build_nlls,
    },
    CostFuncEntry {
        key: "weighted_nlls",
        type_name: "WeightedNLLSCostFunc",
        least_squares: true,
        builder: build_weighted_nlls,
    },
    CostFuncEntry {
        key: "hellinger_nlls",
        type_name: "HellingerNLLSCostFunc",
        least_squares: true,
        builder: build_hellinger_nlls,
    },
    CostFuncEntry {
        key: "root_nlls",
        type_name: "RootNLLSCostFunc",
        least_squares: true,
        builder: build_root_nlls,
    },
    CostFuncEntry {
        key: "poisson",
        type_name: "PoissonCostFunc",
        least_squares: false,
        builder: build_poisson,
    },
    CostFuncEntry {
        key: "loglike_nlls",
        type_name: "LoglikeNLLSCostFunc",
        least_squares: true,
        builder: build_loglike_nlls,
    },
];

/// Look up the cost function registered under `cost_func_type`.
///
/// # Errors
/// [`FitError::UnknownCostFunc`] for unregistered keys.
pub fn create_cost_func(cost_func_type: &str) -> FitResult<&'static CostFuncEntry> {
    COST_FUNC_REGISTRY
        .iter()
        .find(|entry| entry.key == cost_func_type)
        .ok_or_else(|| FitError::UnknownCostFunc { name: cost_func_type.to_string() })
}

/// Like [`create_cost_func`], restricted to least-squares objectives.
///
/// # Errors
/// [`FitError::UnknownCostFunc`] for unregistered keys and for keys whose
/// objective is not a sum of squared residuals (e.g. `poisson`).
pub fn create_nlls_cost_func(cost_func_type: &str) -> FitResult<&'static CostFuncEntry> {
    COST_FUNC_REGISTRY
        .iter()
        .find(|entry| entry.least_squares && entry.key == cost_func_type)
        .ok_or_else(|| FitError::UnknownCostFunc { name: cost_func_type.to_string() })
}

/// Registered keys, in lookup order.
pub fn registered_cost_funcs() -> impl Iterator<Item = &'static str> {
    COST_FUNC_REGISTRY.iter().map(|entry| entry.key)
}
