// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Type registry: interning of sorted id sequences (spec §4.3).
//!
//! A "type" is the immutable, sorted set of component/tag/pair ids an
//! entity carries. Types are interned so that two entities of the same
//! type share one [`TypeHandle`], giving archetype lookup an O(1) map from
//! handle to table instead of a structural comparison on every mutation.

use ahash::AHashMap;

use crate::entity::EntityId;

/// Index into the type registry's interning table. Stable for the life of
/// the world (types, like archetypes, are never evicted).
pub type TypeHandle = usize;

/// Does `candidate` satisfy pattern `pattern`, honoring wildcard pairs?
///
/// A non-pair pattern must match exactly. A pair pattern whose object half
/// is the wildcard marker matches any pair in the type sharing the same
/// relation, regardless of object (spec §4.3/§6, S5).
pub fn id_matches(candidate: EntityId, pattern: EntityId) -> bool {
    if pattern.is_pair() && pattern.object().is_wildcard() {
        candidate.is_pair() && candidate.relation() == pattern.relation()
    } else {
        candidate == pattern
    }
}

/// Interning table for entity types (spec §4.3).
pub struct TypeRegistry {
    types: Vec<Vec<EntityId>>,
    index: AHashMap<Vec<EntityId>, TypeHandle>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            index: AHashMap::new(),
        };
        // Type 0 is always the empty type (archetype 0, the bootstrap table).
        registry.intern(&[]);
        registry
    }

    /// Intern a (not-necessarily-sorted, not-necessarily-deduplicated) id
    /// sequence, returning the shared handle for its canonical sorted form.
    pub fn intern(&mut self, ids: &[EntityId]) -> TypeHandle {
        let mut sorted: Vec<EntityId> = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        if let Some(&handle) = self.index.get(&sorted) {
            return handle;
        }
        let handle = self.types.len();
        self.index.insert(sorted.clone(), handle);
        self.types.push(sorted);
        handle
    }

    /// The empty type, handle 0.
    pub fn empty(&self) -> TypeHandle {
        0
    }

    /// Produce (interning if necessary) the type that is `handle` plus `id`.
    /// Idempotent: adding an id already present returns `handle` unchanged.
    pub fn add(&mut self, handle: TypeHandle, id: EntityId) -> TypeHandle {
        let current = &self.types[handle];
        if current.binary_search(&id).is_ok() {
            return handle;
        }
        let mut next = current.clone();
        next.push(id);
        next.sort_unstable();
        self.intern(&next)
    }

    /// Produce (interning if necessary) the type that is `handle` minus `id`.
    /// Idempotent: removing an id already absent returns `handle` unchanged.
    pub fn remove(&mut self, handle: TypeHandle, id: EntityId) -> TypeHandle {
        let current = &self.types[handle];
        if current.binary_search(&id).is_err() {
            return handle;
        }
        let next: Vec<EntityId> = current.iter().copied().filter(|&i| i != id).collect();
        self.intern(&next)
    }

    /// The sorted id sequence for a type handle.
    pub fn get(&self, handle: TypeHandle) -> &[EntityId] {
        &self.types[handle]
    }

    /// Column index of the first id in `handle` matching `pattern`, honoring
    /// wildcards (spec §4.3 `match`).
    pub fn match_id(&self, handle: TypeHandle, pattern: EntityId) -> Option<usize> {
        self.get(handle).iter().position(|&id| id_matches(id, pattern))
    }

    /// Does the type contain an id matching `pattern`?
    pub fn contains(&self, handle: TypeHandle, pattern: EntityId) -> bool {
        self.match_id(handle, pattern).is_some()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(i: u32) -> EntityId {
        EntityId::new_plain(i, 0)
    }

    #[test]
    fn interning_dedupes_and_sorts() {
        let mut reg = TypeRegistry::new();
        let a = reg.intern(&[eid(3), eid(1), eid(2), eid(1)]);
        let b = reg.intern(&[eid(1), eid(2), eid(3)]);
        assert_eq!(a, b);
        assert_eq!(reg.get(a), &[eid(1), eid(2), eid(3)]);
    }

    #[test]
    fn add_remove_idempotent() {
        let mut reg = TypeRegistry::new();
        let base = reg.intern(&[eid(1)]);
        let same = reg.add(base, eid(1));
        assert_eq!(base, same);

        let widened = reg.add(base, eid(2));
        assert_eq!(reg.get(widened), &[eid(1), eid(2)]);

        let narrowed = reg.remove(widened, eid(2));
        assert_eq!(narrowed, base);

        let unchanged = reg.remove(base, eid(99));
        assert_eq!(unchanged, base);
    }

    #[test]
    fn wildcard_pair_match() {
        let mut reg = TypeRegistry::new();
        let relation = eid(10);
        let pair = EntityId::new_pair(relation, eid(20));
        let ty = reg.intern(&[pair, eid(1)]);

        let wildcard_pattern = EntityId::new_pair(relation, EntityId::WILDCARD);
        assert!(reg.contains(ty, wildcard_pattern));
        assert_eq!(reg.match_id(ty, wildcard_pattern), Some(0));
    }
}
