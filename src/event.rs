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

//! Entity lifecycle event kinds consumed by triggers and observers (spec
//! §4.7).

use crate::entity::EntityId;

/// What happened to a component on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    OnAdd,
    OnRemove,
    OnSet,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::OnAdd => "OnAdd",
            EventKind::OnRemove => "OnRemove",
            EventKind::OnSet => "OnSet",
        }
    }
}

/// One firing of a trigger: which entity, which component, which kind.
#[derive(Debug, Clone, Copy)]
pub struct EntityEvent {
    pub kind: EventKind,
    pub entity: EntityId,
    pub component: EntityId,
}

impl EntityEvent {
    pub fn new(kind: EventKind, entity: EntityId, component: EntityId) -> Self {
        Self {
            kind,
            entity,
            component,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_name() {
        assert_eq!(EventKind::OnAdd.name(), "OnAdd");
        assert_eq!(EventKind::OnSet.name(), "OnSet");
    }

    #[test]
    fn entity_event_carries_its_fields() {
        let e = EntityId::new_plain(1, 0);
        let c = EntityId::new_plain(2, 0);
        let ev = EntityEvent::new(EventKind::OnRemove, e, c);
        assert_eq!(ev.entity, e);
        assert_eq!(ev.component, c);
        assert_eq!(ev.kind, EventKind::OnRemove);
    }
}
