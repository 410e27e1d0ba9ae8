//! controllers::algorithm_check — algorithm-type table of the reference
//! controller.
//!
//! Every controller publishes which of its minimizers fall under each
//! algorithm type. Cost functions list the types they cannot be minimized
//! with (`CostFunc::invalid_algorithm_types`), and
//! `CostFunc::validate_algorithm_type` cross-references the two.
//!
//! The argmin solvers wired here are general-purpose minimizers of a scalar
//! objective, so none of them is listed under `ls`; every least-squares-only
//! type (Gauss–Newton, Levenberg–Marquardt, trust region) is empty.

/// Algorithm type → minimizer keys of that type.
pub static ALGORITHM_CHECK: &[(&str, &[&str])] = &[
    (
        "all",
        &["lbfgs_more_thuente", "lbfgs_hager_zhang", "nelder_mead", "steepest_descent"],
    ),
    ("ls", &[]),
    ("deriv_free", &["nelder_mead"]),
    (
        "general",
        &["lbfgs_more_thuente", "lbfgs_hager_zhang", "nelder_mead", "steepest_descent"],
    ),
    ("simplex", &["nelder_mead"]),
    ("trust_region", &[]),
    ("levenberg-marquardt", &[]),
    ("gauss_newton", &[]),
    ("bfgs", &["lbfgs_more_thuente", "lbfgs_hager_zhang"]),
    ("conjugate_gradient", &[]),
    ("steepest_descent", &["steepest_descent"]),
    ("global_optimization", &[]),
    ("MCMC", &[]),
];

/// Minimizer keys listed under `algorithm_type` (empty for unknown types).
pub fn minimizers_of_type(algorithm_type: &str) -> &'static [&'static str] {
    ALGORITHM_CHECK
        .iter()
        .find(|(name, _)| *name == algorithm_type)
        .map(|(_, minimizers)| *minimizers)
        .unwrap_or(&[])
}
