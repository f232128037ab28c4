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

//! Error types

use std::fmt;

/// ECS error type.
///
/// Invariant violations (`InternalError`) are for conditions that should be
/// unreachable in a correct program; user-input errors (bad handles, bad
/// filters, truncated streams) are reported and leave the world unchanged.
#[derive(Debug, Clone)]
pub enum EcsError {
    /// Entity handle carries a stale or never-issued generation.
    InvalidHandle,

    /// `get`/`set` issued against the wrong component for an entity's type.
    TypeMismatch,

    /// A write was attempted through a term declared read-only.
    ColumnAccessViolation,

    /// A shared (fixed-subject) term was accessed as if it were owned.
    ColumnIsShared,

    /// An owned term was accessed as if it were shared.
    ColumnIsNotShared,

    /// Archetype growth could not allocate.
    OutOfMemory,

    /// Filter grammar failed to parse.
    ParseError(String),

    /// Stream codec hit a truncated buffer or an unrecognized tag.
    IoError(String),

    /// Invariant violation. Aborts in production builds; never returned
    /// to a caller that hasn't misused an internal-only API.
    InternalError(String),

    /// Mutation attempted during iteration with deferral disabled.
    ProgrammerError(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::InvalidHandle => write!(f, "invalid or stale entity handle"),
            EcsError::TypeMismatch => write!(f, "component type mismatch"),
            EcsError::ColumnAccessViolation => write!(f, "write through a read-only term"),
            EcsError::ColumnIsShared => write!(f, "term is shared, not owned"),
            EcsError::ColumnIsNotShared => write!(f, "term is owned, not shared"),
            EcsError::OutOfMemory => write!(f, "out of memory growing archetype storage"),
            EcsError::ParseError(msg) => write!(f, "filter parse error: {msg}"),
            EcsError::IoError(msg) => write!(f, "stream codec error: {msg}"),
            EcsError::InternalError(msg) => write!(f, "internal invariant violation: {msg}"),
            EcsError::ProgrammerError(msg) => write!(f, "programmer error: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<std::io::Error> for EcsError {
    fn from(err: std::io::Error) -> Self {
        EcsError::IoError(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
