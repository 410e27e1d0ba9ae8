//! rust_fitbench — cost functions and derivative engines for benchmarking
//! nonlinear curve-fitting back ends.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and, with the `python-bindings`
//! feature, as the PyO3 bridge exposing cost functions to Python via the
//! `_rust_fitbench` extension module.
//!
//! Key behaviors
//! -------------
//! - [`problem`]: the fitting-problem abstraction (data plus model and
//!   optional analytic derivatives).
//! - [`cost_func`]: least-squares, weighted, root/Hellinger, Poisson and
//!   log-likelihood objectives with their residual/cost derivatives.
//! - [`jacobian`] / [`hessian`]: analytic and numerical derivative engines
//!   selected by configuration keys, backed by [`finite_diff`].
//! - [`controllers`]: a reference minimizer loop over argmin solvers.
//!
//! Invariants & assumptions
//! ------------------------
//! - Cost functions and engines are single-threaded: they share problems
//!   and Jacobians through `Rc` and memoize through `RefCell`.
//! - All fallible operations return [`errors::FitResult`].
//!
//! Conventions
//! -----------
//! - Jacobians are `(n_obs, n_params)`; residual Hessians are
//!   `(n_params, n_params, n_obs)`.
//! - Logging goes through `tracing`; install a subscriber to see it.
//!
//! Downstream usage
//! ----------------
//! - Rust callers typically go through
//!   [`controllers::build_cost_func`] and [`controllers::fit`], or build a
//!   cost function from [`cost_func::create_cost_func`] and attach engines
//!   themselves.
//! - Python callers use `rust_fitbench.CostFunction`.

pub mod cache;
pub mod controllers;
pub mod cost_func;
pub mod errors;
pub mod finite_diff;
pub mod hessian;
pub mod jacobian;
pub mod problem;
pub mod types;

#[cfg(feature = "python-bindings")]
pub mod python;
