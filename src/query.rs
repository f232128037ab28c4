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

//! Cached, filter-driven iteration over archetypes (spec §4.4/§4.5).
//!
//! A [`Query`] keeps a list of the archetypes its filter currently matches,
//! plus (per archetype) the concrete id a wildcard pair term resolved to.
//! The list is rebuilt once against every existing archetype and then kept
//! current incrementally as archetypes are created (`notify_new_archetype`);
//! it never shrinks on its own, since archetypes are never destroyed.

use std::ptr::NonNull;

use crate::archetype::Archetype;
use crate::component::Component;
use crate::entity::EntityId;
use crate::filter::{Filter, Source};
use crate::types::TypeRegistry;

struct MatchedArchetype {
    archetype: usize,
    /// Per filter term: the concrete id to look up in this archetype's
    /// columns. Equal to the term's own id unless the term is a wildcard
    /// pair, in which case it's whatever this archetype's type resolved it
    /// to (spec §6, scenario S5).
    resolved_ids: Vec<EntityId>,
}

fn resolve_ids(filter: &Filter, archetype: &Archetype, types: &TypeRegistry) -> Vec<EntityId> {
    filter
        .terms
        .iter()
        .map(|term| {
            if term.id.is_pair() && term.id.object().is_wildcard() {
                match types.match_id(archetype.type_handle(), term.id) {
                    Some(idx) => types.get(archetype.type_handle())[idx],
                    None => term.id,
                }
            } else {
                term.id
            }
        })
        .collect()
}

/// A cached filter plus the archetypes it currently matches.
pub struct Query {
    pub filter: Filter,
    matched: Vec<MatchedArchetype>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            matched: Vec::new(),
        }
    }

    /// Rebuild the match list from scratch against every archetype that
    /// currently exists.
    pub fn refresh(&mut self, archetypes: &[Archetype], types: &TypeRegistry) {
        self.matched.clear();
        for (idx, archetype) in archetypes.iter().enumerate() {
            if self.filter.matches_type(archetype.type_handle(), types) {
                self.matched.push(MatchedArchetype {
                    archetype: idx,
                    resolved_ids: resolve_ids(&self.filter, archetype, types),
                });
            }
        }
    }

    /// Consider one newly created archetype for inclusion. Called by the
    /// world immediately after a new archetype is pushed, so the cache never
    /// has to be invalidated wholesale (spec §4.4, scenario S2).
    pub fn notify_new_archetype(&mut self, idx: usize, archetype: &Archetype, types: &TypeRegistry) -> bool {
        if self.filter.matches_type(archetype.type_handle(), types) {
            self.matched.push(MatchedArchetype {
                archetype: idx,
                resolved_ids: resolve_ids(&self.filter, archetype, types),
            });
            true
        } else {
            false
        }
    }

    pub fn matched_archetypes(&self) -> impl Iterator<Item = usize> + '_ {
        self.matched.iter().map(|m| m.archetype)
    }

    pub fn len(&self) -> usize {
        self.matched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }

    fn entry(&self, archetype: usize) -> Option<&MatchedArchetype> {
        self.matched.iter().find(|m| m.archetype == archetype)
    }

    pub(crate) fn resolved_ids(&self, archetype: usize) -> &[EntityId] {
        self.entry(archetype).map(|m| m.resolved_ids.as_slice()).unwrap_or(&[])
    }
}

/// A fixed-subject term's resolved value: a pointer to its one instance plus
/// the byte size of that instance (0 for a tag).
#[derive(Clone, Copy)]
pub struct SharedField {
    pub ptr: *const u8,
    pub size: usize,
}

/// One archetype's worth of rows matched by a query, handed to the caller
/// of `World::run_query`.
///
/// Holds a raw pointer rather than a borrow of the archetype so the world
/// can pass `&mut World` into the iteration callback for deferred mutation
/// without violating the borrow checker; soundness relies on the world
/// never resizing `archetypes` (creating one mid-iteration is deferred,
/// spec §4.2/§4.6) for as long as any `Batch` is alive.
pub struct Batch<'a> {
    archetype: NonNull<Archetype>,
    filter: &'a Filter,
    resolved_ids: &'a [EntityId],
    fixed: Vec<Option<SharedField>>,
}

impl<'a> Batch<'a> {
    pub(crate) fn new(
        archetype: NonNull<Archetype>,
        filter: &'a Filter,
        resolved_ids: &'a [EntityId],
        fixed: Vec<Option<SharedField>>,
    ) -> Self {
        Self {
            archetype,
            filter,
            resolved_ids,
            fixed,
        }
    }

    fn archetype(&self) -> &Archetype {
        unsafe { self.archetype.as_ref() }
    }

    #[allow(clippy::mut_from_ref)]
    fn archetype_mut(&self) -> &mut Archetype {
        unsafe { &mut *self.archetype.as_ptr() }
    }

    pub fn len(&self) -> usize {
        self.archetype().len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetype().is_empty()
    }

    pub fn entities(&self) -> &[EntityId] {
        self.archetype().entities()
    }

    pub fn entity(&self, row: usize) -> EntityId {
        self.archetype().entities()[row]
    }

    /// Whether the term at `term_index` is shared (fixed-subject) rather
    /// than owned per-row by the entity being iterated (spec §4.4/§4.5).
    pub fn is_shared(&self, term_index: usize) -> bool {
        self.filter.terms[term_index].is_shared()
    }

    /// Whether the term at `term_index` is read-only, i.e. not writable
    /// through [`Batch::get_mut`] (spec §4.4/§4.5).
    pub fn is_readonly(&self, term_index: usize) -> bool {
        self.filter.terms[term_index].is_readonly()
    }

    /// Whether the term at `term_index` has data present for this batch:
    /// always true for a required term, meaningful for an optional one.
    pub fn has(&self, term_index: usize) -> bool {
        match self.filter.terms[term_index].source {
            Source::This => self.archetype().column(self.resolved_ids[term_index]).is_some(),
            Source::Fixed(_) => self.fixed[term_index].is_some(),
        }
    }

    pub fn get<T: Component>(&self, term_index: usize, row: usize) -> Option<&T> {
        match self.filter.terms[term_index].source {
            Source::This => Some(self.archetype().column(self.resolved_ids[term_index])?.get::<T>(row)),
            Source::Fixed(_) => {
                let field = self.fixed[term_index]?;
                Some(unsafe { &*(field.ptr as *const T) })
            }
        }
    }

    /// Mutable access to an owned, non-read-only term's data.
    ///
    /// Returns `None` for a fixed-subject term: shared data is read-only by
    /// construction (spec §4.5 `ColumnIsShared`).
    pub fn get_mut<T: Component>(&mut self, term_index: usize, row: usize) -> Option<&mut T> {
        match self.filter.terms[term_index].source {
            Source::This => Some(
                self.archetype_mut()
                    .column_mut(self.resolved_ids[term_index])?
                    .get_mut::<T>(row),
            ),
            Source::Fixed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::Column;
    use crate::component::ComponentRegistry;
    use crate::filter::{InOutMode, Operator, Term};

    fn eid(i: u32) -> EntityId {
        EntityId::new_plain(i, 0)
    }

    fn plain_term(id: EntityId) -> Term {
        Term {
            id,
            operator: Operator::And,
            source: Source::This,
            inout: InOutMode::InOut,
        }
    }

    #[test]
    fn refresh_finds_matching_archetypes() {
        let pos = eid(1);
        let vel = eid(2);
        let mut types = TypeRegistry::new();
        let t_pos = types.intern(&[pos]);
        let t_pos_vel = types.intern(&[pos, vel]);

        let archetypes = vec![
            Archetype::new(t_pos, vec![(pos, Column::new(4, None))]),
            Archetype::new(t_pos_vel, vec![(pos, Column::new(4, None)), (vel, Column::new(4, None))]),
        ];

        let filter = Filter::new(vec![plain_term(pos)]);
        let mut query = Query::new(filter);
        query.refresh(&archetypes, &types);
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn notify_new_archetype_extends_cache_incrementally() {
        let pos = eid(1);
        let mut types = TypeRegistry::new();
        let t_pos = types.intern(&[pos]);

        let filter = Filter::new(vec![plain_term(pos)]);
        let mut query = Query::new(filter);
        query.refresh(&[], &types);
        assert!(query.is_empty());

        let archetype = Archetype::new(t_pos, vec![(pos, Column::new(4, None))]);
        let matched = query.notify_new_archetype(0, &archetype, &types);
        assert!(matched);
        assert_eq!(query.len(), 1);
    }

    #[test]
    fn batch_reads_and_writes_owned_column() {
        let pos = eid(1);
        let mut types = TypeRegistry::new();
        let t_pos = types.intern(&[pos]);
        let mut archetype = Archetype::new(t_pos, vec![(pos, Column::new(4, None))]);
        let e = eid(100);
        let row = archetype.append(e);
        unsafe { *(archetype.column_mut(pos).unwrap().row_ptr_mut(row) as *mut i32) = 5 };

        let filter = Filter::new(vec![plain_term(pos)]);
        let resolved_ids = vec![pos];
        let ptr = NonNull::from(&mut archetype);
        let mut batch = Batch::new(ptr, &filter, &resolved_ids, vec![None]);

        assert_eq!(*batch.get::<i32>(0, row).unwrap(), 5);
        *batch.get_mut::<i32>(0, row).unwrap() = 9;
        assert_eq!(*batch.get::<i32>(0, row).unwrap(), 9);

        let _ = ComponentRegistry::new();
    }
}
