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

//! Component records: a component id is an [`EntityId`] that also names a
//! storable field (spec §3). Registering one assigns it a size and
//! alignment; a zero-size registration is a tag and contributes no column.

use std::any::TypeId;

use rustc_hash::FxHashMap;

use crate::entity::EntityId;

/// Marker trait for the typed convenience layer (`World::register_component`,
/// `World::add`, `World::get`). The storage core itself is untyped: it only
/// ever sees ids, sizes, and byte slices, per spec §9's redesign note to
/// replace the variadic typed front-end with a builder the typed layer feeds.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// Metadata describing one registered component id.
#[derive(Clone)]
pub struct ComponentRecord {
    pub id: EntityId,
    pub size: usize,
    pub align: usize,
    pub name: String,
    pub(crate) drop_fn: Option<unsafe fn(*mut u8)>,
}

impl ComponentRecord {
    /// A zero-size record (a tag): carries no column in any archetype.
    pub fn is_tag(&self) -> bool {
        self.size == 0
    }
}

impl std::fmt::Debug for ComponentRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRecord")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("align", &self.align)
            .field("name", &self.name)
            .finish()
    }
}

/// Registry of component metadata, keyed both by id and (for the typed
/// convenience layer) by Rust `TypeId`, plus a name index used by the
/// filter grammar (§6) and the stream codec's component segment (§4.8).
#[derive(Default)]
pub struct ComponentRegistry {
    records: FxHashMap<EntityId, ComponentRecord>,
    by_rust_type: FxHashMap<TypeId, EntityId>,
    by_name: FxHashMap<String, EntityId>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ComponentRecord) {
        self.by_name.insert(record.name.clone(), record.id);
        self.records.insert(record.id, record);
    }

    pub fn bind_rust_type(&mut self, type_id: TypeId, component: EntityId) {
        self.by_rust_type.insert(type_id, component);
    }

    pub fn rust_type_id(&self, type_id: TypeId) -> Option<EntityId> {
        self.by_rust_type.get(&type_id).copied()
    }

    pub fn get(&self, id: EntityId) -> Option<&ComponentRecord> {
        self.records.get(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_has_no_size() {
        let record = ComponentRecord {
            id: EntityId::new_plain(1, 0),
            size: 0,
            align: 1,
            name: "Tag".into(),
            drop_fn: None,
        };
        assert!(record.is_tag());
    }

    #[test]
    fn registry_resolves_by_name() {
        let mut registry = ComponentRegistry::new();
        let id = EntityId::new_plain(5, 0);
        registry.insert(ComponentRecord {
            id,
            size: 8,
            align: 8,
            name: "Position".into(),
            drop_fn: None,
        });
        assert_eq!(registry.by_name("Position"), Some(id));
        assert_eq!(registry.get(id).unwrap().size, 8);
    }
}
