use std::collections::HashMap;
use std::hash::Hash;

use crate::{Arena, Id};

/// A structural interning pool: `intern(key, make)` returns the existing id
/// for `key` if one was already allocated, otherwise allocates a fresh node
/// via `make` and remembers it under `key`.
///
/// `key` is the "profile" spec.md's manager operations compute for each
/// candidate node (e.g. `(op, lhs_id, rhs_id, type)` for a binary symbolic
/// expression); `T` is the node itself. Because the backing [`Arena`] never
/// moves or frees a slot, `Id` equality is pointer equality for the node's
/// lifetime, which is the correctness requirement the symbol/region
/// managers rely on for state keying and `leq` short-circuits.
pub struct Interner<'a, K, T> {
    arena: Arena<'a, T>,
    index: HashMap<K, Id<T>>,
}

impl<'a, K, T> Interner<'a, K, T>
where
    K: Eq + Hash,
{
    pub fn new(bump: &'a bumpalo::Bump) -> Self {
        Self {
            arena: Arena::new(bump),
            index: HashMap::new(),
        }
    }

    /// Returns the interned id for `key`, allocating via `make` on first
    /// sight of this structural key.
    pub fn intern(&mut self, key: K, make: impl FnOnce() -> T) -> Id<T> {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.arena.alloc(make());
        self.index.insert(key, id);
        id
    }

    pub fn get(&self, id: Id<T>) -> &'a T {
        self.arena.get(id)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &'a T)> + '_ {
        self.arena.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_intern_of_equal_key_returns_same_id() {
        let bump = bumpalo::Bump::new();
        let mut pool: Interner<'_, (i64, &'static str), String> = Interner::new(&bump);
        let a = pool.intern((10, "int"), || "10:int".to_string());
        let b = pool.intern((10, "int"), || panic!("should not reconstruct"));
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn distinct_keys_get_distinct_ids() {
        let bump = bumpalo::Bump::new();
        let mut pool: Interner<'_, i64, i64> = Interner::new(&bump);
        let a = pool.intern(1, || 1);
        let b = pool.intern(2, || 2);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }
}
