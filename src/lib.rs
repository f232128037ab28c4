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

//! Archetype ECS — archetype/table-based entity component storage and
//! query engine.
//!
//! Data for entities of the same component set lives packed together in
//! one [`archetype::Archetype`]; adding or removing a component moves an
//! entity's row to a different archetype. [`world::World`] ties entity
//! identity, component registration, archetype storage, cached queries,
//! and trigger/observer dispatch together into one API.

pub mod app;
pub mod archetype;
pub mod codec;
pub mod command;
pub mod component;
pub mod entity;
pub mod error;
pub mod event;
pub mod filter;
pub mod observer;
pub mod profiling;
pub mod query;
pub mod system;
pub mod types;
pub mod world;

pub mod prelude;

pub use app::{App, AppConfig};
pub use archetype::Archetype;
pub use command::CommandBuffer;
pub use component::{Component, ComponentRecord, ComponentRegistry};
pub use entity::{EntityId, EntityLocation};
pub use error::{EcsError, Result};
pub use event::{EntityEvent, EventKind};
pub use filter::Filter;
pub use observer::ObserverRegistry;
pub use query::{Batch, Query};
pub use system::{BoxedSystem, PipelineStage, System, SystemAccess, SystemId};
pub use types::{TypeHandle, TypeRegistry};
pub use world::World;
