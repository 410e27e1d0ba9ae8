//! controllers::types — solver aliases and controller constants.
//!
//! Purpose
//! -------
//! Pin argmin's generic solver types to the crate's numeric shapes
//! (`Params`, `Grad`, `f64`) so the builders and the runner never spell out
//! argmin generics themselves.
//!
//! Conventions
//! -----------
//! - Gradient-based solvers run on `IterState<Params, Grad, (), (), (), f64>`;
//!   Nelder–Mead runs on `IterState<Params, (), (), (), (), f64>`.
//! - `DEFAULT_LBFGS_MEM` and `DEFAULT_SIMPLEX_SCALE` are the fallbacks used
//!   when `FitOptions` leaves them unset.
use crate::types::{Grad, Params};
use argmin::solver::{
    gradientdescent::SteepestDescent,
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    neldermead::NelderMead,
    quasinewton::LBFGS,
};
use std::collections::HashMap;

/// Scalar objective value handed to argmin.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver.
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Default relative edge length of the initial Nelder–Mead simplex.
pub const DEFAULT_SIMPLEX_SCALE: f64 = 0.05;

pub type HagerZhangLS = HagerZhangLineSearch<Params, Grad, Cost>;

pub type MoreThuenteLS = MoreThuenteLineSearch<Params, Grad, Cost>;

pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Params, Grad, Cost>;

pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Params, Grad, Cost>;

pub type SteepestDescentMoreThuente = SteepestDescent<MoreThuenteLS>;

pub type NelderMeadSimplex = NelderMead<Params, Cost>;
