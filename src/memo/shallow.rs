//! Shallow comparison helpers used by the memo guards.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;

/// Two maps are shallow-equal iff they have the same keys and every value
/// compares equal at the top level.
pub fn shallow_equal<K, V>(a: &HashMap<K, V>, b: &HashMap<K, V>) -> bool
where
    K: Eq + Hash,
    V: PartialEq,
{
    a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
}

/// True when a dependency list differs by length or any element.
pub fn deps_changed<D: PartialEq>(prev: &[D], next: &[D]) -> bool {
    prev.len() != next.len() || prev.iter().zip(next).any(|(a, b)| a != b)
}

// == ByRef ==
/// Shared value compared by identity rather than contents.
///
/// Use as a map value or dependency when "same allocation" is the equality
/// that matters.
#[derive(Debug, Default)]
pub struct ByRef<T>(pub Arc<T>);

impl<T> ByRef<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl<T> Clone for ByRef<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for ByRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for ByRef<T> {}

impl<T> Deref for ByRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&'static str, i32)]) -> HashMap<&'static str, i32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_shallow_equal_maps() {
        assert!(shallow_equal(&map(&[("a", 1), ("b", 2)]), &map(&[("b", 2), ("a", 1)])));
        assert!(!shallow_equal(&map(&[("a", 1)]), &map(&[("a", 1), ("b", 2)])));
        assert!(!shallow_equal(&map(&[("a", 1)]), &map(&[("a", 2)])));
        assert!(!shallow_equal(&map(&[("a", 1)]), &map(&[("b", 1)])));
    }

    #[test]
    fn test_shallow_equal_uses_identity_for_nested() {
        let lesson = ByRef::new(vec![1, 2, 3]);
        let same_contents = ByRef::new(vec![1, 2, 3]);

        let a: HashMap<_, _> = [("lesson", lesson.clone())].into_iter().collect();
        let b: HashMap<_, _> = [("lesson", lesson)].into_iter().collect();
        let c: HashMap<_, _> = [("lesson", same_contents)].into_iter().collect();

        assert!(shallow_equal(&a, &b));
        assert!(!shallow_equal(&a, &c));
    }

    #[test]
    fn test_deps_changed() {
        assert!(!deps_changed::<i32>(&[], &[]));
        assert!(!deps_changed(&[1, 2], &[1, 2]));
        assert!(deps_changed(&[1, 2], &[1, 3]));
        assert!(deps_changed(&[1, 2], &[1, 2, 3]));
    }
}
