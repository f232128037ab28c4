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

//! The central world: entity index, type registry, archetype storage,
//! component registry, queries, and observers, tied together (spec §6).

use std::any::TypeId;
use std::ptr::NonNull;

use ahash::AHashMap;
use rustc_hash::FxHashMap;

use crate::archetype::Archetype;
use crate::codec::{self, EncodeComponent, EncodeTable};
use crate::command::CommandBuffer;
use crate::component::{Component, ComponentRecord, ComponentRegistry};
use crate::entity::{EntityId, EntityIndex, EntityLocation};
use crate::error::{EcsError, Result};
use crate::event::{EntityEvent, EventKind};
use crate::filter::{Filter, Source, Term};
use crate::observer::{self, ObserverRegistry};
use crate::query::{Batch, Query, SharedField};
use crate::types::{TypeHandle, TypeRegistry};

#[cfg(feature = "profiling")]
use tracing::info_span;

unsafe fn drop_in_place<T>(ptr: *mut u8) {
    std::ptr::drop_in_place(ptr as *mut T);
}

/// Central ECS world: owns every entity, archetype, component record,
/// query, and observer.
pub struct World {
    entities: EntityIndex,
    types: TypeRegistry,
    archetypes: Vec<Archetype>,
    archetype_by_type: AHashMap<TypeHandle, usize>,
    components: ComponentRegistry,
    queries: Vec<Query>,
    observers: ObserverRegistry,
    deferred: CommandBuffer,
    iter_depth: u32,
    child_of: EntityId,
    instance_of: EntityId,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        let mut types = TypeRegistry::new();
        let empty = types.empty();
        let mut archetypes = Vec::new();
        archetypes.push(Archetype::new(empty, vec![]));
        let mut archetype_by_type = AHashMap::new();
        archetype_by_type.insert(empty, 0);

        let mut world = Self {
            entities: EntityIndex::new(),
            types,
            archetypes,
            archetype_by_type,
            components: ComponentRegistry::new(),
            queries: Vec::new(),
            observers: ObserverRegistry::new(),
            deferred: CommandBuffer::new(),
            iter_depth: 0,
            child_of: EntityId::NULL,
            instance_of: EntityId::NULL,
        };

        let child_of = world.spawn();
        world.components.insert(ComponentRecord {
            id: child_of,
            size: 0,
            align: 1,
            name: "ChildOf".into(),
            drop_fn: None,
        });
        let instance_of = world.spawn();
        world.components.insert(ComponentRecord {
            id: instance_of,
            size: 0,
            align: 1,
            name: "InstanceOf".into(),
            drop_fn: None,
        });
        world.child_of = child_of;
        world.instance_of = instance_of;
        world
    }

    pub fn child_of_relation(&self) -> EntityId {
        self.child_of
    }

    pub fn instance_of_relation(&self) -> EntityId {
        self.instance_of
    }

    // ---- entity lifecycle -------------------------------------------------

    pub fn spawn(&mut self) -> EntityId {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.spawn", archetype_count = self.archetypes.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let id = self.entities.new_id();
        let row = self.archetypes[0].append(id);
        self.entities.set(
            id,
            EntityLocation {
                archetype_id: 0,
                archetype_row: row,
            },
        );
        id
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn delete(&mut self, entity: EntityId) -> Result<()> {
        if self.iter_depth > 0 {
            self.deferred.delete(entity);
            return Ok(());
        }
        self.delete_immediate(entity)
    }

    pub(crate) fn delete_immediate(&mut self, entity: EntityId) -> Result<()> {
        let loc = self.entities.lookup(entity)?;
        let type_handle = self.archetypes[loc.archetype_id].type_handle();
        let ids: Vec<EntityId> = self.types.get(type_handle).to_vec();

        let mut observers = std::mem::take(&mut self.observers);
        for id in &ids {
            observers.fire(self, EntityEvent::new(EventKind::OnRemove, entity, *id), type_handle, &self.types);
        }
        self.observers = observers;

        let loc = self.entities.lookup(entity)?;
        let archetype = &mut self.archetypes[loc.archetype_id];
        let swapped = archetype.remove(loc.archetype_row);
        if let Some(swapped_entity) = swapped {
            self.entities.set(
                swapped_entity,
                EntityLocation {
                    archetype_id: loc.archetype_id,
                    archetype_row: loc.archetype_row,
                },
            );
        }
        self.entities.recycle(entity);
        Ok(())
    }

    // ---- component registration -------------------------------------------

    pub fn register_component<T: Component>(&mut self, name: &str) -> EntityId {
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.components.rust_type_id(type_id) {
            return existing;
        }
        let id = self.spawn();
        let drop_fn = if std::mem::needs_drop::<T>() {
            Some(drop_in_place::<T> as unsafe fn(*mut u8))
        } else {
            None
        };
        self.components.insert(ComponentRecord {
            id,
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
            name: name.to_string(),
            drop_fn,
        });
        self.components.bind_rust_type(type_id, id);
        id
    }

    pub fn register_tag(&mut self, name: &str) -> EntityId {
        let id = self.spawn();
        self.components.insert(ComponentRecord {
            id,
            size: 0,
            align: 1,
            name: name.to_string(),
            drop_fn: None,
        });
        id
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    // ---- structural / data mutation ---------------------------------------

    pub fn add_id(&mut self, entity: EntityId, component: EntityId) -> Result<()> {
        if self.iter_depth > 0 {
            self.deferred.add(entity, component);
            return Ok(());
        }
        self.add_immediate(entity, component)
    }

    pub fn remove_id(&mut self, entity: EntityId, component: EntityId) -> Result<()> {
        if self.iter_depth > 0 {
            self.deferred.remove(entity, component);
            return Ok(());
        }
        self.remove_immediate(entity, component)
    }

    pub fn add<T: Component>(&mut self, entity: EntityId, value: T) -> Result<()> {
        let component = self
            .components
            .rust_type_id(TypeId::of::<T>())
            .ok_or(EcsError::TypeMismatch)?;
        self.add_id(entity, component)?;
        self.set(entity, value)
    }

    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Result<()> {
        let component = self
            .components
            .rust_type_id(TypeId::of::<T>())
            .ok_or(EcsError::TypeMismatch)?;
        self.remove_id(entity, component)
    }

    pub fn set<T: Component>(&mut self, entity: EntityId, value: T) -> Result<()> {
        let component = self
            .components
            .rust_type_id(TypeId::of::<T>())
            .ok_or(EcsError::TypeMismatch)?;
        self.add_id(entity, component)?;
        let bytes =
            unsafe { std::slice::from_raw_parts(&value as *const T as *const u8, std::mem::size_of::<T>()) };
        if self.iter_depth > 0 {
            self.deferred.set(entity, component, bytes);
        } else {
            self.set_immediate(entity, component, bytes)?;
            self.fire_modified(entity, component);
        }
        std::mem::forget(value);
        Ok(())
    }

    pub fn get<T: Component>(&self, entity: EntityId) -> Result<&T> {
        let component = self
            .components
            .rust_type_id(TypeId::of::<T>())
            .ok_or(EcsError::TypeMismatch)?;
        let loc = self.entities.lookup(entity)?;
        let column = self.archetypes[loc.archetype_id]
            .column(component)
            .ok_or(EcsError::TypeMismatch)?;
        Ok(column.get::<T>(loc.archetype_row))
    }

    /// Mutable access to a component's value. If issued while a query is
    /// being iterated, the write is staged into the deferred command
    /// buffer's arena and copied into the real column (firing `modified`)
    /// once the outermost iteration ends (spec §4.6).
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Result<&mut T> {
        let component = self
            .components
            .rust_type_id(TypeId::of::<T>())
            .ok_or(EcsError::TypeMismatch)?;
        let loc = self.entities.lookup(entity)?;

        if self.iter_depth > 0 {
            let item_size = std::mem::size_of::<T>();
            let existing = {
                let column = self.archetypes[loc.archetype_id]
                    .column(component)
                    .ok_or(EcsError::TypeMismatch)?;
                unsafe { std::slice::from_raw_parts(column.row_ptr(loc.archetype_row), item_size) }.to_vec()
            };
            let ptr = self.deferred.stage_mut(entity, component, item_size);
            unsafe { std::ptr::copy_nonoverlapping(existing.as_ptr(), ptr, item_size) };
            return Ok(unsafe { &mut *(ptr as *mut T) });
        }

        let archetype = &mut self.archetypes[loc.archetype_id];
        let column = archetype.column_mut(component).ok_or(EcsError::TypeMismatch)?;
        Ok(column.get_mut::<T>(loc.archetype_row))
    }

    pub fn has_id(&self, entity: EntityId, component: EntityId) -> bool {
        match self.entities.lookup(entity) {
            Ok(loc) => self
                .types
                .contains(self.archetypes[loc.archetype_id].type_handle(), component),
            Err(_) => false,
        }
    }

    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        match self.components.rust_type_id(TypeId::of::<T>()) {
            Some(id) => self.has_id(entity, id),
            None => false,
        }
    }

    pub fn child_of(&mut self, child: EntityId, parent: EntityId) -> Result<()> {
        let relation = self.child_of;
        self.add_id(child, EntityId::new_pair(relation, parent))
    }

    pub fn instance_of(&mut self, instance: EntityId, prototype: EntityId) -> Result<()> {
        let relation = self.instance_of;
        self.add_id(instance, EntityId::new_pair(relation, prototype))
    }

    pub(crate) fn add_immediate(&mut self, entity: EntityId, component: EntityId) -> Result<()> {
        let loc = self.entities.lookup(entity)?;
        let src_idx = loc.archetype_id;
        if self.types.contains(self.archetypes[src_idx].type_handle(), component) {
            return Ok(());
        }

        let dst_idx = match self.archetypes[src_idx].get_add_edge(component) {
            Some(idx) => idx,
            None => {
                let new_type = self.types.add(self.archetypes[src_idx].type_handle(), component);
                let idx = self.get_or_create_archetype(new_type);
                self.archetypes[src_idx].cache_add_edge(component, idx);
                idx
            }
        };
        self.move_entity(entity, src_idx, loc.archetype_row, dst_idx)?;

        let loc = self.entities.lookup(entity)?;
        let type_handle = self.archetypes[loc.archetype_id].type_handle();
        let mut observers = std::mem::take(&mut self.observers);
        observers.fire(self, EntityEvent::new(EventKind::OnAdd, entity, component), type_handle, &self.types);
        self.observers = observers;
        Ok(())
    }

    pub(crate) fn remove_immediate(&mut self, entity: EntityId, component: EntityId) -> Result<()> {
        let loc = self.entities.lookup(entity)?;
        let src_idx = loc.archetype_id;
        let src_type = self.archetypes[src_idx].type_handle();
        if !self.types.contains(src_type, component) {
            return Ok(());
        }

        let mut observers = std::mem::take(&mut self.observers);
        observers.fire(self, EntityEvent::new(EventKind::OnRemove, entity, component), src_type, &self.types);
        self.observers = observers;

        let loc = self.entities.lookup(entity)?;
        let src_idx = loc.archetype_id;
        let dst_idx = match self.archetypes[src_idx].get_remove_edge(component) {
            Some(idx) => idx,
            None => {
                let new_type = self.types.remove(self.archetypes[src_idx].type_handle(), component);
                let idx = self.get_or_create_archetype(new_type);
                self.archetypes[src_idx].cache_remove_edge(component, idx);
                idx
            }
        };
        self.move_entity(entity, src_idx, loc.archetype_row, dst_idx)?;
        Ok(())
    }

    pub(crate) fn set_immediate(&mut self, entity: EntityId, component: EntityId, bytes: &[u8]) -> Result<()> {
        let loc = self.entities.lookup(entity)?;
        let archetype = &mut self.archetypes[loc.archetype_id];
        let column = archetype.column_mut(component).ok_or(EcsError::TypeMismatch)?;
        if bytes.len() != column.item_size() {
            return Err(EcsError::TypeMismatch);
        }
        let ptr = column.row_ptr_mut(loc.archetype_row);
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()) };
        Ok(())
    }

    pub(crate) fn fire_modified(&mut self, entity: EntityId, component: EntityId) {
        let Ok(loc) = self.entities.lookup(entity) else {
            return;
        };
        let type_handle = self.archetypes[loc.archetype_id].type_handle();
        let mut observers = std::mem::take(&mut self.observers);
        observers.fire(self, EntityEvent::new(EventKind::OnSet, entity, component), type_handle, &self.types);
        self.observers = observers;
    }

    fn move_entity(&mut self, entity: EntityId, src_idx: usize, src_row: usize, dst_idx: usize) -> Result<()> {
        if src_idx == dst_idx {
            return Ok(());
        }
        let (dst_row, swapped) = if src_idx < dst_idx {
            let (left, right) = self.archetypes.split_at_mut(dst_idx);
            crate::archetype::move_row(&mut left[src_idx], src_row, &mut right[0])
        } else {
            let (left, right) = self.archetypes.split_at_mut(src_idx);
            crate::archetype::move_row(&mut right[0], src_row, &mut left[dst_idx])
        };
        self.entities.set(
            entity,
            EntityLocation {
                archetype_id: dst_idx,
                archetype_row: dst_row,
            },
        );
        if let Some(swapped_entity) = swapped {
            self.entities.set(
                swapped_entity,
                EntityLocation {
                    archetype_id: src_idx,
                    archetype_row: src_row,
                },
            );
        }
        Ok(())
    }

    fn get_or_create_archetype(&mut self, type_handle: TypeHandle) -> usize {
        if let Some(&idx) = self.archetype_by_type.get(&type_handle) {
            return idx;
        }

        #[cfg(feature = "profiling")]
        let span = info_span!("world.create_archetype", existing = self.archetypes.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let ids = self.types.get(type_handle).to_vec();
        let mut columns = Vec::new();
        for &id in &ids {
            if let Some(record) = self.components.get(id) {
                if !record.is_tag() {
                    columns.push((id, crate::archetype::Column::new(record.size, record.drop_fn)));
                }
            }
        }
        let idx = self.archetypes.len();
        self.archetypes.push(Archetype::new(type_handle, columns));
        self.archetype_by_type.insert(type_handle, idx);

        for (qidx, query) in self.queries.iter_mut().enumerate() {
            if query.notify_new_archetype(idx, &self.archetypes[idx], &self.types) {
                self.archetypes[idx].notify_query_match(qidx);
            }
        }
        idx
    }

    // ---- queries ------------------------------------------------------------

    pub fn register_query(&mut self, filter: Filter) -> usize {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.query_match", archetype_count = self.archetypes.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let mut query = Query::new(filter);
        query.refresh(&self.archetypes, &self.types);
        let idx = self.queries.len();
        let matched: Vec<usize> = query.matched_archetypes().collect();
        for archetype_id in matched {
            self.archetypes[archetype_id].notify_query_match(idx);
        }
        self.queries.push(query);
        idx
    }

    fn resolve_fixed_field(&self, term: &Term) -> Option<SharedField> {
        let subject = match term.source {
            Source::Fixed(e) => e,
            Source::This => return None,
        };
        let loc = self.entities.lookup(subject).ok()?;
        let archetype = &self.archetypes[loc.archetype_id];
        let column = archetype.column(term.id)?;
        Some(SharedField {
            ptr: column.row_ptr(loc.archetype_row),
            size: column.item_size(),
        })
    }

    fn begin_iteration(&mut self) {
        self.iter_depth += 1;
    }

    fn end_iteration(&mut self) -> Result<()> {
        self.iter_depth -= 1;
        if self.iter_depth == 0 {
            let mut deferred = std::mem::take(&mut self.deferred);
            let result = deferred.apply(self);
            self.deferred = deferred;
            result?;
        }
        Ok(())
    }

    /// Run `callback` once per matched archetype. Mutations the callback
    /// issues through `World`'s public API are automatically deferred and
    /// replayed after the whole query finishes (spec §4.6, scenario S3).
    pub fn run_query<F>(&mut self, query_id: usize, mut callback: F) -> Result<()>
    where
        F: FnMut(&mut World, Batch<'_>),
    {
        self.begin_iteration();
        let archetype_ids: Vec<usize> = self.queries[query_id].matched_archetypes().collect();
        let filter: Filter = self.queries[query_id].filter.clone();

        for archetype_id in archetype_ids {
            let resolved_ids: Vec<EntityId> = self.queries[query_id].resolved_ids(archetype_id).to_vec();
            let fixed: Vec<Option<SharedField>> = filter.terms.iter().map(|t| self.resolve_fixed_field(t)).collect();
            let archetype_ptr = NonNull::from(&mut self.archetypes[archetype_id]);
            let batch = Batch::new(archetype_ptr, &filter, &resolved_ids, fixed);
            callback(self, batch);
        }

        self.end_iteration()
    }

    // ---- observers ------------------------------------------------------------

    pub fn observe<F>(&mut self, filter: Filter, events: &[EventKind], callback: F) -> Result<usize>
    where
        F: FnMut(&mut World, EntityEvent) + Send + 'static,
    {
        observer::validate_events(events)?;
        Ok(self.observers.register(filter, events, callback))
    }

    pub fn unobserve(&mut self, id: usize) {
        self.observers.unregister(id);
    }

    // ---- snapshots ------------------------------------------------------------

    pub fn save_snapshot(&self) -> Vec<u8> {
        let components: Vec<EncodeComponent> = self
            .components
            .iter()
            .map(|r| EncodeComponent {
                id: r.id,
                size: r.size as u32,
                name: r.name.as_str(),
            })
            .collect();

        let ids_per_table: Vec<Vec<EntityId>> = self
            .archetypes
            .iter()
            .map(|a| self.types.get(a.type_handle()).to_vec())
            .collect();

        let columns_per_table: Vec<Vec<(EntityId, &[u8])>> = self
            .archetypes
            .iter()
            .zip(&ids_per_table)
            .map(|(archetype, ids)| {
                ids.iter()
                    .filter_map(|&id| archetype.column(id).map(|c| (id, c.as_bytes())))
                    .collect()
            })
            .collect();

        let tables: Vec<EncodeTable> = self
            .archetypes
            .iter()
            .enumerate()
            .map(|(i, archetype)| EncodeTable {
                ids: &ids_per_table[i],
                row_count: archetype.len() as u32,
                columns: &columns_per_table[i],
            })
            .collect();

        codec::encode(&components, &tables)
    }

    /// Replace every entity and archetype with the contents of `bytes`.
    /// Component registrations (ids, sizes, names) are assumed unchanged
    /// between save and load; only entity/archetype state is restored.
    pub fn load_snapshot(&mut self, bytes: &[u8]) -> Result<()> {
        let snapshot = codec::decode(bytes)?;

        self.entities = EntityIndex::new();
        self.types = TypeRegistry::new();
        let empty = self.types.empty();
        self.archetypes.clear();
        self.archetypes.push(Archetype::new(empty, vec![]));
        self.archetype_by_type.clear();
        self.archetype_by_type.insert(empty, 0);

        for table in snapshot.tables {
            let type_handle = self.types.intern(&table.ids);
            let archetype_idx = self.get_or_create_archetype(type_handle);

            let mut column_data: FxHashMap<EntityId, &[u8]> = FxHashMap::default();
            for (id, bytes) in &table.columns {
                column_data.insert(*id, bytes.as_slice());
            }

            for row in 0..table.row_count as usize {
                let entity = self.entities.new_id();
                let dst_row = {
                    let archetype = &mut self.archetypes[archetype_idx];
                    archetype.append(entity)
                };
                for &id in &table.ids {
                    if let Some(bytes) = column_data.get(&id) {
                        let archetype = &mut self.archetypes[archetype_idx];
                        if let Some(column) = archetype.column_mut(id) {
                            let size = column.item_size();
                            let start = row * size;
                            let slice = &bytes[start..start + size];
                            unsafe {
                                std::ptr::copy_nonoverlapping(slice.as_ptr(), column.row_ptr_mut(dst_row), size)
                            };
                        }
                    }
                }
                self.entities.set(
                    entity,
                    EntityLocation {
                        archetype_id: archetype_idx,
                        archetype_row: dst_row,
                    },
                );
            }
        }
        Ok(())
    }
}
