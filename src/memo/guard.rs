//! Memo Guard
//!
//! Keeps one computed value and recomputes only when its dependencies change.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::memo::shallow::{deps_changed, shallow_equal};

type Comparator<D> = Box<dyn Fn(&D, &D) -> bool + Send + Sync>;

// == Memo Guard ==
/// Single-slot memo keyed by a dependency value.
///
/// The first call always computes. Later calls reuse the stored result
/// while the comparator reports the dependencies as equal.
pub struct MemoGuard<D, R> {
    last: Option<(D, R)>,
    equal: Comparator<D>,
    computations: u64,
}

impl<T, R> MemoGuard<Vec<T>, R>
where
    T: PartialEq + 'static,
{
    /// Dependency-list guard: equal iff same length and every element equal.
    pub fn new() -> Self {
        Self::with_comparator(|a: &Vec<T>, b: &Vec<T>| !deps_changed(a, b))
    }
}

impl<T, R> Default for MemoGuard<Vec<T>, R>
where
    T: PartialEq + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, R> MemoGuard<HashMap<K, V>, R>
where
    K: Eq + Hash + 'static,
    V: PartialEq + 'static,
{
    /// Guard over a map of dependencies compared with [`shallow_equal`].
    pub fn shallow() -> Self {
        Self::with_comparator(shallow_equal)
    }
}

impl<D, R> MemoGuard<D, R> {
    /// Guard with a custom equality over the whole dependency value.
    pub fn with_comparator<F>(equal: F) -> Self
    where
        F: Fn(&D, &D) -> bool + Send + Sync + 'static,
    {
        Self {
            last: None,
            equal: Box::new(equal),
            computations: 0,
        }
    }

    /// Returns the stored result, recomputing when `deps` changed.
    pub fn get<F>(&mut self, deps: D, compute: F) -> &R
    where
        F: FnOnce(&D) -> R,
    {
        let stale = match &self.last {
            Some((prev, _)) => !(self.equal)(prev, &deps),
            None => true,
        };
        if stale {
            self.last = None;
        }
        let computations = &mut self.computations;
        let (_, value) = self.last.get_or_insert_with(move || {
            *computations += 1;
            let value = compute(&deps);
            (deps, value)
        });
        value
    }

    /// Number of times the computation has run.
    pub fn computations(&self) -> u64 {
        self.computations
    }

    /// Forgets the stored result so the next `get` recomputes.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl<D, R> fmt::Debug for MemoGuard<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoGuard")
            .field("populated", &self.last.is_some())
            .field("computations", &self.computations)
            .finish()
    }
}
