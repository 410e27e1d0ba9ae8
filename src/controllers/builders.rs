//! controllers::builders — solver construction helpers.
//!
//! Purpose
//! -------
//! Build configured argmin solvers for each [`Minimizer`] so that the API
//! layer never touches argmin generics.
//!
//! Key behaviors
//! -------------
//! - L-BFGS with More–Thuente or Hager–Zhang line search; tolerances come
//!   from [`FitOptions`] via [`configure_lbfgs`].
//! - Nelder–Mead over an initial simplex spanned around `p0` (see
//!   [`initial_simplex`]), stopping on the simplex cost spread `tol_cost`.
//! - Steepest descent with a More–Thuente line search.
//!
//! Conventions
//! -----------
//! - Builders never set `p0` or `max_iters`; the runner applies those.
//! - argmin configuration errors surface as `FitError` through `?`.
use crate::{
    controllers::{
        options::FitOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, NelderMeadSimplex, SteepestDescentMoreThuente,
        },
    },
    errors::FitResult,
    types::{Grad, Params},
};
use argmin::solver::quasinewton::LBFGS;

/// Absolute step used for simplex edges along zero-valued parameters.
const ZERO_PARAM_STEP: f64 = 0.00025;

pub fn build_lbfgs_hager_zhang(opts: &FitOptions) -> FitResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

pub fn build_lbfgs_more_thuente(opts: &FitOptions) -> FitResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply the gradient and cost-change tolerances that are set.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Params, Grad, Cost>, opts: &FitOptions,
) -> FitResult<LBFGS<L, Params, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// `n + 1` vertices: `p0`, then `p0` moved along each axis by
/// `simplex_scale · p0[k]` (or [`ZERO_PARAM_STEP`] where `p0[k] == 0`).
pub fn initial_simplex(p0: &Params, simplex_scale: f64) -> Vec<Params> {
    let mut vertices = Vec::with_capacity(p0.len() + 1);
    vertices.push(p0.clone());
    for k in 0..p0.len() {
        let mut vertex = p0.clone();
        vertex[k] += if p0[k] != 0.0 { simplex_scale * p0[k] } else { ZERO_PARAM_STEP };
        vertices.push(vertex);
    }
    vertices
}

pub fn build_nelder_mead(p0: &Params, opts: &FitOptions) -> FitResult<NelderMeadSimplex> {
    let mut solver = NelderMeadSimplex::new(initial_simplex(p0, opts.simplex_scale));
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_sd_tolerance(c)?;
    }
    Ok(solver)
}

pub fn build_steepest_descent() -> SteepestDescentMoreThuente {
    SteepestDescentMoreThuente::new(MoreThuenteLS::new())
}
