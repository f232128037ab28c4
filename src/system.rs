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

//! System trait and the access metadata an external scheduler needs to
//! run systems that don't conflict in parallel (spec §7; the scheduler
//! and thread pool themselves are out of scope for this crate).

use crate::entity::EntityId;
use crate::error::Result;
use crate::filter::{Filter, InOutMode};
use crate::world::World;

/// Stable id assigned to a system at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(pub u32);

/// The pipeline phase a system runs in, in execution order. `Manual`
/// systems aren't placed in any phase; the host application runs them
/// explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    OnLoad,
    PostLoad,
    PreUpdate,
    OnUpdate,
    OnValidate,
    PostUpdate,
    PreStore,
    OnStore,
    Manual,
}

/// The component ids a system reads and writes, derived from its query
/// filter's inout modes. Two systems can run in parallel iff their
/// accesses don't conflict.
#[derive(Debug, Clone, Default)]
pub struct SystemAccess {
    pub reads: Vec<EntityId>,
    pub writes: Vec<EntityId>,
}

impl SystemAccess {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Derive access from a filter: `In`/`None` terms are reads, `Out`
    /// terms are writes, `InOut` terms are both. A `Not` term constrains
    /// matching but touches no data, so it contributes nothing here.
    pub fn from_filter(filter: &Filter) -> Self {
        let mut access = Self::empty();
        for term in &filter.terms {
            if term.operator == crate::filter::Operator::Not {
                continue;
            }
            match term.inout {
                InOutMode::In => access.reads.push(term.id),
                InOutMode::Out => access.writes.push(term.id),
                InOutMode::InOut => {
                    access.reads.push(term.id);
                    access.writes.push(term.id);
                }
                InOutMode::None => {}
            }
        }
        access
    }

    /// Do these two accesses touch a common component in a way that
    /// can't run concurrently (any write overlapping any access)?
    pub fn conflicts_with(&self, other: &SystemAccess) -> bool {
        self.writes.iter().any(|w| other.writes.contains(w))
            || self.writes.iter().any(|w| other.reads.contains(w))
            || self.reads.iter().any(|r| other.writes.contains(r))
    }
}

/// A unit of per-frame logic the host application schedules and runs.
pub trait System: Send {
    fn access(&self) -> SystemAccess;

    fn name(&self) -> &'static str;

    fn stage(&self) -> PipelineStage {
        PipelineStage::OnUpdate
    }

    fn run(&mut self, world: &mut World) -> Result<()>;
}

pub type BoxedSystem = Box<dyn System>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Operator, Source, Term};

    fn eid(i: u32) -> EntityId {
        EntityId::new_plain(i, 0)
    }

    fn term(id: EntityId, inout: InOutMode) -> Term {
        Term {
            id,
            operator: Operator::And,
            source: Source::This,
            inout,
        }
    }

    #[test]
    fn write_write_conflicts() {
        let mut a = SystemAccess::empty();
        a.writes.push(eid(1));
        let mut b = SystemAccess::empty();
        b.writes.push(eid(1));
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn read_read_does_not_conflict() {
        let mut a = SystemAccess::empty();
        a.reads.push(eid(1));
        let mut b = SystemAccess::empty();
        b.reads.push(eid(1));
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn access_derives_reads_and_writes_from_inout_modes() {
        let pos = eid(1);
        let vel = eid(2);
        let dead = eid(3);
        let filter = Filter::new(vec![
            term(pos, InOutMode::InOut),
            term(vel, InOutMode::In),
            Term {
                id: dead,
                operator: Operator::Not,
                source: Source::This,
                inout: InOutMode::InOut,
            },
        ]);
        let access = SystemAccess::from_filter(&filter);
        assert!(access.writes.contains(&pos));
        assert!(access.reads.contains(&pos));
        assert!(access.reads.contains(&vel));
        assert!(!access.writes.contains(&vel));
        assert!(!access.reads.contains(&dead) && !access.writes.contains(&dead));
    }

    #[test]
    fn pipeline_stages_order_by_declaration() {
        assert!(PipelineStage::OnLoad < PipelineStage::OnUpdate);
        assert!(PipelineStage::OnUpdate < PipelineStage::Manual);
    }
}
