//! python — PyO3 bridge exposing cost functions to Python.
//!
//! Purpose
//! -------
//! Let Python callers (benchmark drivers, parsers producing Python model
//! callables) build a cost function over their own model and evaluate its
//! cost, residuals and derivatives, or fit it with the reference controller.
//!
//! Key behaviors
//! -------------
//! - [`PyModelProblem`] wraps Python callables `model(params, x)`,
//!   `jacobian(x, params)` and `hessian(x, params)` as a
//!   [`FittingProblem`] through [`FunctionProblem`].
//! - [`CostFunction`] is the Python-visible class; it owns a
//!   `Box<dyn CostFunc>` wired by [`build_cost_func`].
//! - Python exceptions raised inside callables become
//!   `FitError::ModelEvaluation`; `FitError` maps to `ValueError` at the
//!   boundary.
//!
//! Invariants & assumptions
//! ------------------------
//! - Cost functions are single-threaded (`Rc`, `RefCell` caches), so the
//!   class is `unsendable`.
//! - Callables return array-likes convertible to float64 arrays of the
//!   documented shapes.
//!
//! Conventions
//! -----------
//! - Arrays cross the boundary as contiguous float64 numpy arrays; inputs
//!   may also be pandas Series or Python sequences.
//! - Matrices are returned row-major as `list[list[float]]`.
use crate::{
    controllers::{
        CostFuncConfig, FitOptions, FitOutcome, Minimizer, Tolerances, build_cost_func, fit,
        standard_errors,
    },
    cost_func::{CostFunc, registered_cost_funcs},
    errors::{FitError, FitResult},
    hessian::registered_hessians,
    jacobian::registered_jacobians,
    problem::{FittingProblem, FunctionProblem},
    types::{DataOverride, Params},
};
use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView1};
use numpy::{
    IntoPyArray, PyArrayMethods, PyReadonlyArray1, PyReadonlyArray2, PyReadonlyArray3,
    PyReadonlyArrayDyn,
};
use pyo3::{prelude::*, types::PyAny};
use std::rc::Rc;

/// Contiguous float64 view of a numpy array, pandas Series or sequence.
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray_bound(py).readonly())
}

fn owned_array<'py>(py: Python<'py>, raw: &Bound<'py, PyAny>) -> PyResult<Array1<f64>> {
    Ok(extract_f64_array(py, raw)?.as_array().to_owned())
}

fn model_error(err: PyErr) -> FitError {
    FitError::ModelEvaluation { text: err.to_string() }
}

/// Call `callable(first, second)` with two float64 vectors.
fn call_vectors<'py>(
    py: Python<'py>, callable: &Py<PyAny>, first: ArrayView1<'_, f64>,
    second: ArrayView1<'_, f64>,
) -> PyResult<Bound<'py, PyAny>> {
    let a = first.to_vec().into_pyarray_bound(py);
    let b = second.to_vec().into_pyarray_bound(py);
    callable.bind(py).call1((a, b))
}

fn to_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// Builds a [`FunctionProblem`] whose closures call back into Python.
pub struct PyModelProblem;

impl PyModelProblem {
    /// # Errors
    /// Data validation errors of [`FunctionProblem`].
    pub fn build(
        name: &str, x: Array1<f64>, y: Array1<f64>, e: Option<Array1<f64>>, model: Py<PyAny>,
        jacobian: Option<Py<PyAny>>, hessian: Option<Py<PyAny>>,
    ) -> FitResult<FunctionProblem> {
        let mut builder = FunctionProblem::builder(
            name,
            x,
            y,
            move |params: &Params, x: ArrayView1<'_, f64>| -> FitResult<ArrayD<f64>> {
                Python::with_gil(|py| {
                    let out = call_vectors(py, &model, params.view(), x).map_err(model_error)?;
                    if let Ok(arr) = out.extract::<PyReadonlyArrayDyn<f64>>() {
                        return Ok(arr.as_array().to_owned());
                    }
                    let values: Vec<f64> = out.extract().map_err(model_error)?;
                    Ok(Array1::from(values).into_dyn())
                })
            },
        )
        .format("python");
        if let Some(e) = e {
            builder = builder.errors(e);
        }
        if let Some(jac) = jacobian {
            builder = builder.jacobian(
                move |x: ArrayView1<'_, f64>, params: &Params| -> FitResult<Array2<f64>> {
                    Python::with_gil(|py| {
                        let out = call_vectors(py, &jac, x, params.view()).map_err(model_error)?;
                        let arr: PyReadonlyArray2<f64> = out.extract().map_err(model_error)?;
                        Ok(arr.as_array().to_owned())
                    })
                },
            );
        }
        if let Some(hes) = hessian {
            builder = builder.hessian(
                move |x: ArrayView1<'_, f64>, params: &Params| -> FitResult<Array3<f64>> {
                    Python::with_gil(|py| {
                        let out = call_vectors(py, &hes, x, params.view()).map_err(model_error)?;
                        let arr: PyReadonlyArray3<f64> = out.extract().map_err(model_error)?;
                        Ok(arr.as_array().to_owned())
                    })
                },
            );
        }
        builder.build()
    }
}

/// FitSummary — read-only view of a controller run.
#[pyclass(module = "rust_fitbench")]
pub struct FitSummary {
    inner: FitOutcome,
}

#[pymethods]
impl FitSummary {
    #[getter]
    pub fn params(&self) -> Vec<f64> {
        self.inner.params.to_vec()
    }

    #[getter]
    pub fn cost(&self) -> f64 {
        self.inner.cost
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.converged
    }

    #[getter]
    pub fn status(&self) -> String {
        self.inner.status.clone()
    }

    #[getter]
    pub fn iterations(&self) -> usize {
        self.inner.iterations
    }

    #[getter]
    pub fn grad_norm(&self) -> Option<f64> {
        self.inner.grad_norm
    }

    #[getter]
    pub fn minimizer(&self) -> &'static str {
        self.inner.minimizer.as_str()
    }

    #[getter]
    pub fn fn_evals(&self) -> Vec<(String, u64)> {
        self.inner.fn_evals.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }
}

/// CostFunction — Python-facing cost function over a Python model.
///
/// Constructed as
/// `CostFunction(cost_func, x, y, model, e=None, jacobian=None, hessian=None,
/// jac_method="best_available", jac_num_method=None, hes_method=None,
/// hes_num_method=None, name="python")`.
///
/// Notes
/// -----
/// - `model(params, x)` returns the model values at every x.
/// - `jacobian(x, params)` returns an `(n_obs, n_params)` array and
///   `hessian(x, params)` an `(n_params, n_params, n_obs)` array.
#[pyclass(module = "rust_fitbench", unsendable)]
pub struct CostFunction {
    inner: Box<dyn CostFunc>,
}

#[pymethods]
impl CostFunction {
    #[new]
    #[pyo3(
        signature = (
            cost_func,
            x,
            y,
            model,
            e = None,
            jacobian = None,
            hessian = None,
            jac_method = "best_available",
            jac_num_method = None,
            hes_method = None,
            hes_num_method = None,
            name = "python",
        ),
        text_signature = "(cost_func, x, y, model, /, e=None, jacobian=None, hessian=None, \
                          jac_method='best_available', jac_num_method=None, hes_method=None, \
                          hes_num_method=None, name='python')"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new<'py>(
        py: Python<'py>, cost_func: &str, x: &Bound<'py, PyAny>, y: &Bound<'py, PyAny>,
        model: Py<PyAny>, e: Option<&Bound<'py, PyAny>>, jacobian: Option<Py<PyAny>>,
        hessian: Option<Py<PyAny>>, jac_method: &str, jac_num_method: Option<&str>,
        hes_method: Option<&str>, hes_num_method: Option<&str>, name: &str,
    ) -> PyResult<Self> {
        let x = owned_array(py, x)?;
        let y = owned_array(py, y)?;
        let e = e.map(|e| owned_array(py, e)).transpose()?;
        let problem: Rc<dyn FittingProblem> =
            Rc::new(PyModelProblem::build(name, x, y, e, model, jacobian, hessian)?);

        let mut config = CostFuncConfig::new(cost_func, jac_method);
        if let Some(method) = jac_num_method {
            config = config.with_jac_num_method(method);
        }
        if let Some(method) = hes_method {
            config = config.with_hessian(method, hes_num_method);
        }
        let inner = build_cost_func(problem, &config)?;
        Ok(CostFunction { inner })
    }

    #[getter]
    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    pub fn eval_cost<'py>(&self, py: Python<'py>, params: &Bound<'py, PyAny>) -> PyResult<f64> {
        let p = owned_array(py, params)?;
        Ok(self.inner.eval_cost(&p, &DataOverride::none())?)
    }

    pub fn eval_r<'py>(&self, py: Python<'py>, params: &Bound<'py, PyAny>) -> PyResult<Vec<f64>> {
        let p = owned_array(py, params)?;
        Ok(self.inner.eval_r(&p, &DataOverride::none())?.to_vec())
    }

    pub fn jac_res<'py>(
        &self, py: Python<'py>, params: &Bound<'py, PyAny>,
    ) -> PyResult<Vec<Vec<f64>>> {
        let p = owned_array(py, params)?;
        Ok(to_rows(&self.inner.jac_res(&p, &DataOverride::none())?.to_dense()))
    }

    pub fn jac_cost<'py>(&self, py: Python<'py>, params: &Bound<'py, PyAny>) -> PyResult<Vec<f64>> {
        let p = owned_array(py, params)?;
        Ok(self.inner.jac_cost(&p, &DataOverride::none())?.to_vec())
    }

    pub fn hes_cost<'py>(
        &self, py: Python<'py>, params: &Bound<'py, PyAny>,
    ) -> PyResult<Vec<Vec<f64>>> {
        let p = owned_array(py, params)?;
        Ok(to_rows(&self.inner.hes_cost(&p, &DataOverride::none())?))
    }

    pub fn standard_errors<'py>(
        &self, py: Python<'py>, params: &Bound<'py, PyAny>,
    ) -> PyResult<Vec<f64>> {
        let p = owned_array(py, params)?;
        Ok(standard_errors(self.inner.as_ref(), &p)?.to_vec())
    }

    #[pyo3(
        signature = (
            p0,
            minimizer = "lbfgs_more_thuente",
            tol_grad = None,
            tol_cost = None,
            max_iter = None,
            lbfgs_mem = None,
            simplex_scale = None,
        ),
        text_signature = "(self, p0, /, minimizer='lbfgs_more_thuente', tol_grad=None, \
                          tol_cost=None, max_iter=None, lbfgs_mem=None, simplex_scale=None)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn fit<'py>(
        &self, py: Python<'py>, p0: &Bound<'py, PyAny>, minimizer: &str, tol_grad: Option<f64>,
        tol_cost: Option<f64>, max_iter: Option<usize>, lbfgs_mem: Option<usize>,
        simplex_scale: Option<f64>,
    ) -> PyResult<FitSummary> {
        let p0 = owned_array(py, p0)?;
        let minimizer: Minimizer = minimizer.parse()?;
        let tols = if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            Tolerances::default()
        } else {
            Tolerances::new(tol_grad, tol_cost, max_iter)?
        };
        let opts = FitOptions::new(tols, lbfgs_mem, simplex_scale, false)?;
        let inner = fit(self.inner.as_ref(), p0, minimizer, &opts)?;
        Ok(FitSummary { inner })
    }
}

/// Registered configuration keys: `(cost functions, jacobians, hessians)`.
#[pyfunction]
pub fn registered_methods() -> (Vec<&'static str>, Vec<&'static str>, Vec<&'static str>) {
    (
        registered_cost_funcs().collect(),
        registered_jacobians().collect(),
        registered_hessians().collect(),
    )
}

/// _rust_fitbench — PyO3 module initializer for the Python extension.
#[pymodule]
fn _rust_fitbench<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<CostFunction>()?;
    m.add_class::<FitSummary>()?;
    m.add_function(wrap_pyfunction!(registered_methods, m)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Conversions that do not need a Python interpreter.
    //
    // They intentionally DO NOT cover:
    // - Callbacks into Python (exercised from the Python side).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Matrices returned to Python keep their row-major layout.
    //
    // Given
    // -----
    // - A 3 × 2 matrix.
    //
    // Expect
    // ------
    // - Three rows of two values in the original order.
    fn to_rows_preserves_layout() {
        // Arrange
        let matrix = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];

        // Act
        let rows = to_rows(&matrix);

        // Assert
        assert_eq!(rows, vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
    }
}
