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

//! Deferred mutation buffer (spec §4.6).
//!
//! Structural mutations issued while a query is being iterated cannot touch
//! `World::archetypes` directly: doing so could invalidate the archetype
//! pointers a batch iterator is holding. Instead they're recorded here and
//! replayed, in insertion order, once the outermost iteration ends.
//!
//! `get_mut` issued while deferred can't hand back a pointer into a real
//! column either (the entity may not even have the component yet, or the
//! row may move before replay). It instead returns a pointer into this
//! buffer's bump arena; the bytes written through that pointer are copied
//! into the entity's column, and `modified` fires, when the buffer replays.

use bumpalo::Bump;

use crate::entity::EntityId;
use crate::error::Result;
use crate::world::World;

enum Command {
    Delete(EntityId),
    Add(EntityId, EntityId),
    Remove(EntityId, EntityId),
    Set {
        entity: EntityId,
        component: EntityId,
        data: *const u8,
        len: usize,
    },
    Modified(EntityId, EntityId),
}

// Pointers in `Set` only ever point into this buffer's own `staging` arena,
// which a `CommandBuffer` owns for its whole lifetime; nothing else ever
// dereferences them.
unsafe impl Send for Command {}

/// A replayable log of world mutations plus a scratch arena for staged
/// `get_mut` writes.
#[derive(Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    staging: Bump,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(&mut self, entity: EntityId) {
        self.commands.push(Command::Delete(entity));
    }

    pub fn add(&mut self, entity: EntityId, component: EntityId) {
        self.commands.push(Command::Add(entity, component));
    }

    pub fn remove(&mut self, entity: EntityId, component: EntityId) {
        self.commands.push(Command::Remove(entity, component));
    }

    /// Stage a `size`-byte write, returning a pointer the caller writes the
    /// new value through immediately. The write is copied into the entity's
    /// column, and `modified` fires, on replay.
    pub fn set(&mut self, entity: EntityId, component: EntityId, bytes: &[u8]) {
        let slot = self.staging.alloc_slice_copy(bytes);
        self.commands.push(Command::Set {
            entity,
            component,
            data: slot.as_ptr(),
            len: slot.len(),
        });
    }

    pub fn stage_mut(&mut self, entity: EntityId, component: EntityId, size: usize) -> *mut u8 {
        let slot = self.staging.alloc_slice_fill_copy(size, 0u8);
        let ptr = slot.as_mut_ptr();
        self.commands.push(Command::Set {
            entity,
            component,
            data: ptr,
            len: size,
        });
        ptr
    }

    pub fn modified(&mut self, entity: EntityId, component: EntityId) {
        self.commands.push(Command::Modified(entity, component));
    }

    /// Replay every recorded command against `world`, in insertion order,
    /// then clear the buffer (including the staging arena).
    pub fn apply(&mut self, world: &mut World) -> Result<()> {
        for command in self.commands.drain(..) {
            match command {
                Command::Delete(entity) => {
                    world.delete_immediate(entity)?;
                }
                Command::Add(entity, component) => {
                    world.add_immediate(entity, component)?;
                }
                Command::Remove(entity, component) => {
                    world.remove_immediate(entity, component)?;
                }
                Command::Set {
                    entity,
                    component,
                    data,
                    len,
                } => {
                    // SAFETY: `data` points into `self.staging`, which is still
                    // alive (we haven't reset it yet) and was sized to exactly
                    // `len` bytes when the command was recorded.
                    let bytes = unsafe { std::slice::from_raw_parts(data, len) };
                    world.set_immediate(entity, component, bytes)?;
                    world.fire_modified(entity, component);
                }
                Command::Modified(entity, component) => {
                    world.fire_modified(entity, component);
                }
            }
        }
        self.staging.reset();
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.staging.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_starts_empty() {
        let buf = CommandBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn recording_grows_the_log() {
        let mut buf = CommandBuffer::new();
        let e = EntityId::new_plain(1, 0);
        let c = EntityId::new_plain(2, 0);
        buf.add(e, c);
        buf.delete(e);
        assert_eq!(buf.len(), 2);
        buf.clear();
        assert!(buf.is_empty());
    }

    #[test]
    fn staged_set_roundtrips_through_the_arena() {
        let mut buf = CommandBuffer::new();
        let e = EntityId::new_plain(1, 0);
        let c = EntityId::new_plain(2, 0);
        buf.set(e, c, &[1, 2, 3, 4]);
        assert_eq!(buf.len(), 1);
    }
}
