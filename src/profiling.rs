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

//! # Profiling guide
//!
//! Enable the `profiling` feature to pull in `tracing`/`tracing-subscriber`:
//!
//! ```toml
//! [dependencies]
//! archetype-ecs = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! With the feature on, [`World`](crate::world::World) emits an
//! `info_span!` around its own hot paths: `world.spawn`,
//! `world.create_archetype`, `world.query_match`, and (in
//! [`ObserverRegistry::fire`](crate::observer::ObserverRegistry::fire))
//! `world.observer_dispatch`. Without the feature, none of that code is
//! compiled in.
//!
//! A [`System`](crate::system::System) implementation instruments itself by
//! wrapping its `run` body in a span, gated so the instrumentation compiles
//! away entirely without the feature:
//!
//! ```ignore
//! use tracing::info_span;
//! use archetype_ecs::{World, Result};
//!
//! struct MovementSystem;
//!
//! impl archetype_ecs::System for MovementSystem {
//!     fn name(&self) -> &'static str { "movement" }
//!     fn access(&self) -> archetype_ecs::SystemAccess { archetype_ecs::SystemAccess::empty() }
//!     fn run(&mut self, world: &mut World) -> Result<()> {
//!         #[cfg(feature = "profiling")]
//!         let _guard = info_span!("movement_system", entities = world.entity_count()).entered();
//!
//!         // system logic here
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Installing a subscriber once at startup is enough to collect every span
//! an instrumented system emits:
//!
//! ```ignore
//! use tracing_subscriber::prelude::*;
//!
//! let subscriber = tracing_subscriber::Registry::default()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(tracing_subscriber::EnvFilter::from_default_env());
//! tracing::subscriber::set_global_default(subscriber).unwrap();
//! ```
//!
//! Profile in release mode for accurate numbers; `RUST_LOG=debug` surfaces
//! every span without changing the code above.
