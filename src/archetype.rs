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

//! Archetype ("table") storage: a dense column store for one exact type
//! (spec §4.2). Structure-of-arrays: one `Column` per non-zero-size
//! component, plus a parallel `entities` column shared by every column.

use rustc_hash::FxHashMap;

use crate::entity::EntityId;
use crate::types::TypeHandle;

/// Type-erased, dense column of raw component bytes.
///
/// Values are stored back to back; `drop_fn` runs on every occupied slot
/// when the column is dropped, and on any slot explicitly discarded by a
/// row removal (spec §3 Lifecycle: "columns only in the source are
/// dropped").
pub struct Column {
    data: Vec<u8>,
    item_size: usize,
    drop_fn: Option<unsafe fn(*mut u8)>,
}

impl Column {
    pub fn new(item_size: usize, drop_fn: Option<unsafe fn(*mut u8)>) -> Self {
        Self {
            data: Vec::new(),
            item_size,
            drop_fn,
        }
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    pub fn len(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Append a zeroed slot, returning a pointer the caller writes into.
    pub fn push_zeroed(&mut self) -> *mut u8 {
        let offset = self.data.len();
        self.data.resize(offset + self.item_size, 0);
        unsafe { self.data.as_mut_ptr().add(offset) }
    }

    /// Raw pointer to the start of row `row`'s bytes.
    pub fn row_ptr(&self, row: usize) -> *const u8 {
        unsafe { self.data.as_ptr().add(row * self.item_size) }
    }

    pub fn row_ptr_mut(&mut self, row: usize) -> *mut u8 {
        unsafe { self.data.as_mut_ptr().add(row * self.item_size) }
    }

    pub fn get<T>(&self, row: usize) -> &T {
        unsafe { &*(self.row_ptr(row) as *const T) }
    }

    pub fn get_mut<T>(&mut self, row: usize) -> &mut T {
        unsafe { &mut *(self.row_ptr_mut(row) as *mut T) }
    }

    /// Swap-remove the bytes at `row`, returning ownership of the removed
    /// row's original bytes without running `drop_fn` on them. The caller
    /// must either write those bytes into a destination column (transferring
    /// ownership) or explicitly drop them via [`Column::drop_taken`].
    pub fn swap_remove_bytes(&mut self, row: usize) -> Vec<u8> {
        if self.item_size == 0 {
            return Vec::new();
        }
        let len = self.len();
        let size = self.item_size;
        let start = row * size;
        let mut taken = vec![0u8; size];
        taken.copy_from_slice(&self.data[start..start + size]);

        let last_start = (len - 1) * size;
        if start != last_start {
            let last: Vec<u8> = self.data[last_start..last_start + size].to_vec();
            self.data[start..start + size].copy_from_slice(&last);
        }
        self.data.truncate(last_start);
        taken
    }

    /// Run `drop_fn` over bytes previously extracted with
    /// [`Column::swap_remove_bytes`] that are being discarded rather than
    /// relocated into another column.
    pub fn drop_taken(&self, mut bytes: Vec<u8>) {
        if bytes.is_empty() {
            return;
        }
        if let Some(drop_fn) = self.drop_fn {
            unsafe { drop_fn(bytes.as_mut_ptr()) };
        }
    }

    /// Write raw bytes (taken from another column via `swap_remove_bytes`,
    /// or from a user's typed value) into a freshly appended slot.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        if self.item_size == 0 {
            return;
        }
        debug_assert_eq!(bytes.len(), self.item_size);
        self.data.extend_from_slice(bytes);
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        if let Some(drop_fn) = self.drop_fn {
            if self.item_size > 0 {
                let count = self.len();
                for i in 0..count {
                    unsafe { drop_fn(self.data.as_mut_ptr().add(i * self.item_size)) };
                }
            }
        }
    }
}

/// The dense storage for every entity currently of one interned [`TypeHandle`].
///
/// Tags (zero-size ids) are part of the type but own no `Column`; only ids
/// present in `column_index` have backing storage.
pub struct Archetype {
    type_handle: TypeHandle,
    entities: Vec<EntityId>,
    columns: Vec<Column>,
    /// component id -> index into `columns`, only for ids with a column.
    column_index: FxHashMap<EntityId, usize>,
    add_edges: FxHashMap<EntityId, usize>,
    remove_edges: FxHashMap<EntityId, usize>,
    /// Queries whose cached match list includes this archetype (spec §4.2:
    /// "a list of queries to notify when this archetype gains or loses
    /// entities"). Used for diagnostics and so observer dispatch can find
    /// interested queries without a linear scan of every registered query.
    matched_queries: Vec<usize>,
}

impl Archetype {
    pub fn new(type_handle: TypeHandle, columns: Vec<(EntityId, Column)>) -> Self {
        let mut column_index = FxHashMap::default();
        let mut store = Vec::with_capacity(columns.len());
        for (id, column) in columns {
            column_index.insert(id, store.len());
            store.push(column);
        }
        Self {
            type_handle,
            entities: Vec::new(),
            columns: store,
            column_index,
            add_edges: FxHashMap::default(),
            remove_edges: FxHashMap::default(),
            matched_queries: Vec::new(),
        }
    }

    pub fn type_handle(&self) -> TypeHandle {
        self.type_handle
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn column_index(&self, component: EntityId) -> Option<usize> {
        self.column_index.get(&component).copied()
    }

    pub fn column(&self, component: EntityId) -> Option<&Column> {
        self.column_index(component).map(|i| &self.columns[i])
    }

    pub fn column_mut(&mut self, component: EntityId) -> Option<&mut Column> {
        let idx = self.column_index(component)?;
        Some(&mut self.columns[idx])
    }

    pub fn column_by_index(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_by_index_mut(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    /// Allocate a new row for `entity`, appending a zeroed slot to every
    /// data column. Returns the row index.
    pub fn append(&mut self, entity: EntityId) -> usize {
        let row = self.entities.len();
        self.entities.push(entity);
        for column in &mut self.columns {
            column.push_zeroed();
        }
        row
    }

    /// Swap-remove `row`. Returns the entity that was swapped into the
    /// vacated slot, if any (spec §4.2 `remove`).
    pub fn remove(&mut self, row: usize) -> Option<EntityId> {
        debug_assert!(row < self.entities.len());
        self.entities.swap_remove(row);
        for column in &mut self.columns {
            let taken = column.swap_remove_bytes(row);
            column.drop_taken(taken);
        }
        self.entities.get(row).copied()
    }

    pub fn get_add_edge(&self, component: EntityId) -> Option<usize> {
        self.add_edges.get(&component).copied()
    }

    pub fn cache_add_edge(&mut self, component: EntityId, destination: usize) {
        self.add_edges.insert(component, destination);
    }

    pub fn get_remove_edge(&self, component: EntityId) -> Option<usize> {
        self.remove_edges.get(&component).copied()
    }

    pub fn cache_remove_edge(&mut self, component: EntityId, destination: usize) {
        self.remove_edges.insert(component, destination);
    }

    pub fn matched_queries(&self) -> &[usize] {
        &self.matched_queries
    }

    pub fn notify_query_match(&mut self, query: usize) {
        if !self.matched_queries.contains(&query) {
            self.matched_queries.push(query);
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        self.entities.reserve(additional);
    }
}

/// Move the row at `src_row` of `src` into a freshly appended row of `dst`.
///
/// Columns present in both archetypes are byte-relocated (ownership moves,
/// no drop runs); columns only in `src` are dropped; columns only in `dst`
/// are left zeroed. The source row is always destructively removed (spec
/// §4.2: "Moves are destructive").
///
/// Returns `(new_row_in_dst, entity_swapped_into_src_row)`.
pub fn move_row(src: &mut Archetype, src_row: usize, dst: &mut Archetype) -> (usize, Option<EntityId>) {
    let entity = src.entities[src_row];
    let dst_row = dst.entities.len();
    dst.entities.push(entity);

    let src_idx_to_id: FxHashMap<usize, EntityId> =
        src.column_index.iter().map(|(&c, &i)| (i, c)).collect();

    // Columns shared with dst: relocate the row's bytes.
    let dst_targets: Vec<(EntityId, usize)> = dst.column_index.iter().map(|(&c, &i)| (c, i)).collect();
    let mut handled_src_columns = vec![false; src.columns.len()];
    for (component, dst_idx) in dst_targets {
        match src.column_index(component) {
            Some(src_idx) => {
                let taken = src.columns[src_idx].swap_remove_bytes(src_row);
                dst.columns[dst_idx].push_bytes(&taken);
                handled_src_columns[src_idx] = true;
            }
            None => {
                dst.columns[dst_idx].push_zeroed();
            }
        }
    }

    // Columns only in src: swap-remove and drop.
    for (idx, handled) in handled_src_columns.into_iter().enumerate() {
        if handled {
            continue;
        }
        let _component = src_idx_to_id[&idx];
        let taken = src.columns[idx].swap_remove_bytes(src_row);
        src.columns[idx].drop_taken(taken);
    }

    src.entities.swap_remove(src_row);
    let swapped = src.entities.get(src_row).copied();

    (dst_row, swapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(i: u32) -> EntityId {
        EntityId::new_plain(i, 0)
    }

    #[test]
    fn append_and_remove_swaps_last_entity() {
        let mut arch = Archetype::new(0, vec![]);
        let e1 = eid(1);
        let e2 = eid(2);
        let e3 = eid(3);
        arch.append(e1);
        arch.append(e2);
        arch.append(e3);

        let swapped = arch.remove(0);
        assert_eq!(swapped, Some(e3));
        assert_eq!(arch.entities(), &[e3, e2]);
    }

    #[test]
    fn column_roundtrip() {
        let mut col = Column::new(std::mem::size_of::<u32>(), None);
        let ptr = col.push_zeroed();
        unsafe { *(ptr as *mut u32) = 42 };
        assert_eq!(*col.get::<u32>(0), 42);
    }

    #[test]
    fn move_row_relocates_shared_columns_and_drops_source_only() {
        let a_id = eid(100);
        let b_id = eid(101);
        let mut src = Archetype::new(
            0,
            vec![
                (a_id, Column::new(4, None)),
                (b_id, Column::new(4, None)),
            ],
        );
        let mut dst = Archetype::new(1, vec![(a_id, Column::new(4, None))]);

        let e = eid(5);
        let row = src.append(e);
        unsafe { *(src.column_mut(a_id).unwrap().row_ptr_mut(row) as *mut i32) = 7 };
        unsafe { *(src.column_mut(b_id).unwrap().row_ptr_mut(row) as *mut i32) = 9 };

        let (dst_row, swapped) = move_row(&mut src, row, &mut dst);
        assert_eq!(swapped, None);
        assert_eq!(dst.entities(), &[e]);
        assert_eq!(*dst.column(a_id).unwrap().get::<i32>(dst_row), 7);
        assert!(src.is_empty());
    }
}
