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

//! Triggers and observers (spec §4.7).
//!
//! An observer's filter can have many terms, but an `OnAdd`/`OnRemove`/
//! `OnSet` event only ever names one component. So registering an observer
//! installs one trigger per (positive term, subscribed event kind) pair,
//! same as the source library: "create a trigger for each term in the
//! filter". When any of those triggers fires, the observer re-evaluates its
//! whole filter against the entity's current type before invoking its
//! callback, so a multi-term observer doesn't fire on a partial match.

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::event::{EntityEvent, EventKind};
use crate::filter::{Filter, Operator};
use crate::types::{TypeHandle, TypeRegistry};
use crate::world::World;

#[cfg(feature = "profiling")]
use tracing::info_span;

type ObserverCallback = Box<dyn FnMut(&mut World, EntityEvent) + Send>;

struct ObserverEntry {
    filter: Filter,
    callback: ObserverCallback,
}

/// Registry of installed observers plus the trigger index that routes an
/// `(component, event kind)` firing to the observers it might concern.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Option<ObserverEntry>>,
    triggers: FxHashMap<(crate::entity::EntityId, EventKind), Vec<usize>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer watching `events` on any term of `filter` other
    /// than a `Not` term (absence can't be "triggered on"). Returns an id
    /// usable with [`ObserverRegistry::unregister`].
    pub fn register<F>(&mut self, filter: Filter, events: &[EventKind], callback: F) -> usize
    where
        F: FnMut(&mut World, EntityEvent) + Send + 'static,
    {
        let idx = self.observers.len();
        for term in &filter.terms {
            if term.operator == Operator::Not {
                continue;
            }
            for &kind in events {
                self.triggers.entry((term.id, kind)).or_default().push(idx);
            }
        }
        self.observers.push(Some(ObserverEntry {
            filter,
            callback: Box::new(callback),
        }));
        idx
    }

    pub fn unregister(&mut self, id: usize) {
        if let Some(slot) = self.observers.get_mut(id) {
            *slot = None;
        }
        for indices in self.triggers.values_mut() {
            indices.retain(|&i| i != id);
        }
    }

    /// Route one event firing to every observer whose trigger matches and
    /// whose full filter is satisfied by `type_handle`.
    pub fn fire(&mut self, world: &mut World, event: EntityEvent, type_handle: TypeHandle, types: &TypeRegistry) {
        let Some(indices) = self.triggers.get(&(event.component, event.kind)) else {
            return;
        };
        let indices = indices.clone();

        #[cfg(feature = "profiling")]
        let span = info_span!("world.observer_dispatch", candidates = indices.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        for idx in indices {
            let matches = match &self.observers[idx] {
                Some(entry) => entry.filter.matches_type(type_handle, types) && entry.filter.matches_fixed(world),
                None => false,
            };
            if matches {
                if let Some(entry) = &mut self.observers[idx] {
                    (entry.callback)(world, event);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.observers.iter().filter(|o| o.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Install-time validation: an observer with no events is a programmer
/// error, since it would never fire.
pub fn validate_events(events: &[EventKind]) -> Result<()> {
    if events.is_empty() {
        return Err(crate::error::EcsError::ProgrammerError(
            "observer registered with no event kinds".into(),
        ));
    }
    Ok(())
}
