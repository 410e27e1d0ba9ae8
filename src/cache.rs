//! cache — one-slot parameter memoization.
//!
//! Purpose
//! -------
//! Centralize the "same parameters as last time → reuse the value" contract
//! used by cost functions and derivative engines, so that an optimizer which
//! re-supplies the previous parameter vector does not trigger a second model
//! evaluation.
//!
//! Key behaviors
//! -------------
//! - [`ParamCache`] stores at most one `(params, value)` pair.
//! - A lookup hits only when the requested vector is exactly equal to the
//!   stored one (elementwise `==`, no tolerance).
//! - The slot is written only after a successful computation; a failing
//!   computation leaves the previous entry untouched.
//! - [`cached_func_values`] wraps a `RefCell<ParamCache<T>>` so that the
//!   compute closure runs without any outstanding borrow of the cell.
//!
//! Invariants & assumptions
//! ------------------------
//! - Single-threaded use; caches live inside `RefCell`s owned by one
//!   cost-function or engine instance.
//! - Callers skip the cache entirely when evaluating on overridden data.
use crate::{errors::FitResult, types::Params};
use std::cell::RefCell;

/// Last-seen parameters and the value computed for them.
#[derive(Debug, Clone)]
pub struct ParamCache<T> {
    params: Option<Params>,
    value: Option<T>,
}

impl<T> Default for ParamCache<T> {
    fn default() -> Self {
        Self { params: None, value: None }
    }
}

impl<T: Clone> ParamCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value if `params` equals the stored vector exactly.
    pub fn get(&self, params: &Params) -> Option<&T> {
        match (&self.params, &self.value) {
            (Some(stored), Some(value)) if stored == params => Some(value),
            _ => None,
        }
    }

    /// Replace the slot with `(params, value)`.
    pub fn store(&mut self, params: &Params, value: T) {
        self.params = Some(params.clone());
        self.value = Some(value);
    }

    /// Return the cached value or compute, store and return a fresh one.
    ///
    /// # Errors
    /// Propagates the error of `compute`; the slot is left unchanged.
    pub fn get_or_compute<F>(&mut self, params: &Params, compute: F) -> FitResult<T>
    where
        F: FnOnce() -> FitResult<T>,
    {
        if let Some(value) = self.get(params) {
            return Ok(value.clone());
        }
        let value = compute()?;
        self.store(params, value.clone());
        Ok(value)
    }

    pub fn invalidate(&mut self) {
        self.params = None;
        self.value = None;
    }

    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

/// cached_func_values — memoize `compute` through a shared cache cell.
///
/// Purpose
/// -------
/// Same contract as [`ParamCache::get_or_compute`], but usable from `&self`
/// methods: the cell is only borrowed for the lookup and for the final
/// store, never while `compute` runs, so `compute` may itself consult other
/// caches (or even this one) without a `BorrowMutError`.
///
/// Errors
/// ------
/// - Propagates the error of `compute`; the cache is left unchanged.
pub fn cached_func_values<T, F>(
    cache: &RefCell<ParamCache<T>>, params: &Params, compute: F,
) -> FitResult<T>
where
    T: Clone,
    F: FnOnce() -> FitResult<T>,
{
    if let Some(value) = cache.borrow().get(params) {
        return Ok(value.clone());
    }
    let value = compute()?;
    cache.borrow_mut().store(params, value.clone());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FitError;
    use ndarray::array;
    use std::cell::Cell;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Hit/miss behavior under exact equality.
    // - Cache immutability on failed computations.
    // - Re-entrancy of `cached_func_values`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Two identical requests compute once; a different vector recomputes.
    //
    // Given
    // -----
    // - An empty cache and a counting compute closure.
    //
    // Expect
    // ------
    // - Calls with `[1, 2]`, `[1, 2]`, `[1, 2.0000001]` compute twice.
    fn get_or_compute_hits_only_on_exact_equality() {
        // Arrange
        let mut cache: ParamCache<f64> = ParamCache::new();
        let calls = Cell::new(0);
        let compute = |v: f64| {
            calls.set(calls.get() + 1);
            Ok(v)
        };

        // Act
        let a = cache.get_or_compute(&array![1.0, 2.0], || compute(10.0)).unwrap();
        let b = cache.get_or_compute(&array![1.0, 2.0], || compute(99.0)).unwrap();
        let c = cache.get_or_compute(&array![1.0, 2.000_000_1], || compute(20.0)).unwrap();

        // Assert
        assert_eq!((a, b, c), (10.0, 10.0, 20.0));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    // Purpose
    // -------
    // A failing computation does not disturb the stored entry.
    //
    // Given
    // -----
    // - A cache holding `([1], 5.0)` and a compute closure that errors.
    //
    // Expect
    // ------
    // - The error propagates and `([1], 5.0)` is still served afterwards.
    fn failed_compute_leaves_cache_untouched() {
        // Arrange
        let cell = RefCell::new(ParamCache::new());
        cell.borrow_mut().store(&array![1.0], 5.0);

        // Act
        let err = cached_func_values(&cell, &array![2.0], || {
            Err(FitError::ModelEvaluation { text: "boom".into() })
        });

        // Assert
        assert!(err.is_err());
        assert_eq!(cell.borrow().params(), Some(&array![1.0]));
        assert_eq!(cell.borrow().get(&array![1.0]), Some(&5.0));
    }

    #[test]
    // Purpose
    // -------
    // `cached_func_values` does not hold a borrow while computing.
    //
    // Given
    // -----
    // - A compute closure that reads the same cell.
    //
    // Expect
    // ------
    // - No borrow panic; the value is stored.
    fn cached_func_values_is_reentrant() {
        // Arrange
        let cell: RefCell<ParamCache<f64>> = RefCell::new(ParamCache::new());

        // Act
        let value = cached_func_values(&cell, &array![3.0], || {
            let seen = cell.borrow().value().copied();
            Ok(seen.unwrap_or(7.0))
        })
        .unwrap();

        // Assert
        assert_eq!(value, 7.0);
        assert_eq!(cell.borrow().value(), Some(&7.0));
    }
}
