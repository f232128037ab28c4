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

//! Filter grammar: `[<mode>] <op><id>[.<subject>]`, comma-separated terms
//! (spec §6).
//!
//! ```text
//! [in] Position, [out] Velocity, !Dead, ?Name, pair(ChildOf, *), Health.player1
//! ```
//!
//! `<mode>` is one of `in`, `out`, `inout`, `none` and defaults to `inout`.
//! `<op>` is `!` (Not), `?` (Optional), `|` (Or, chains onto the previous
//! term) or nothing (And). `<id>` is a component name or `pair(rel, obj)`,
//! where either half of a pair may be `*` for a wildcard. `.subject` fixes
//! the term's source to a named entity instead of the entity being matched.

use crate::component::ComponentRegistry;
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::types::{TypeHandle, TypeRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InOutMode {
    In,
    Out,
    InOut,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Matched against the entity the query is iterating.
    This,
    /// Matched against one fixed entity, shared across every row of a batch.
    Fixed(EntityId),
}

#[derive(Debug, Clone, Copy)]
pub struct Term {
    pub id: EntityId,
    pub operator: Operator,
    pub source: Source,
    pub inout: InOutMode,
}

impl Term {
    pub fn is_shared(&self) -> bool {
        matches!(self.source, Source::Fixed(_))
    }

    pub fn is_readonly(&self) -> bool {
        matches!(self.inout, InOutMode::In | InOutMode::None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub terms: Vec<Term>,
}

impl Filter {
    pub fn new(terms: Vec<Term>) -> Self {
        Self { terms }
    }

    /// Parse a filter string, resolving bare identifiers through `components`
    /// (by name) and `*` to the wildcard marker.
    pub fn parse(text: &str, components: &ComponentRegistry) -> Result<Self> {
        let mut terms = Vec::new();
        for raw in text.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            terms.push(parse_term(raw, components)?);
        }
        Ok(Self { terms })
    }

    /// Does `type_handle` satisfy every `This`-sourced term? `Or` terms
    /// chain onto the immediately preceding term to form one group matched
    /// if any id in the group is present; `Fixed`-sourced terms are checked
    /// separately against their subject entity, not against the type.
    pub fn matches_type(&self, type_handle: TypeHandle, types: &TypeRegistry) -> bool {
        let mut groups: Vec<(Operator, Vec<EntityId>)> = Vec::new();
        for term in &self.terms {
            if term.is_shared() {
                continue;
            }
            if term.operator == Operator::Or {
                if let Some(last) = groups.last_mut() {
                    last.1.push(term.id);
                    continue;
                }
            }
            groups.push((term.operator, vec![term.id]));
        }

        for (kind, ids) in &groups {
            let any = ids.iter().any(|&id| types.contains(type_handle, id));
            let ok = match kind {
                Operator::Not => !any,
                Operator::Optional => true,
                Operator::And | Operator::Or => any,
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Does every `Fixed`-sourced term hold against its own subject entity?
    /// `This`-sourced terms are left to [`Filter::matches_type`]; together
    /// the two cover "the whole filter" an observer re-evaluates when one of
    /// its triggers fires (spec §4.7).
    pub fn matches_fixed(&self, world: &crate::world::World) -> bool {
        let mut groups: Vec<(Operator, Vec<(EntityId, EntityId)>)> = Vec::new();
        for term in &self.terms {
            let Source::Fixed(subject) = term.source else {
                continue;
            };
            if term.operator == Operator::Or {
                if let Some(last) = groups.last_mut() {
                    last.1.push((subject, term.id));
                    continue;
                }
            }
            groups.push((term.operator, vec![(subject, term.id)]));
        }

        for (kind, pairs) in &groups {
            let any = pairs.iter().any(|&(subject, id)| world.has_id(subject, id));
            let ok = match kind {
                Operator::Not => !any,
                Operator::Optional => true,
                Operator::And | Operator::Or => any,
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

fn parse_term(raw: &str, components: &ComponentRegistry) -> Result<Term> {
    let mut rest = raw;

    let mut inout = InOutMode::InOut;
    if let Some(stripped) = rest.strip_prefix('[') {
        let close = stripped
            .find(']')
            .ok_or_else(|| EcsError::ParseError(format!("unterminated '[' in term `{raw}`")))?;
        let mode = &stripped[..close];
        inout = match mode {
            "in" => InOutMode::In,
            "out" => InOutMode::Out,
            "inout" => InOutMode::InOut,
            "none" => InOutMode::None,
            other => return Err(EcsError::ParseError(format!("unknown mode `{other}` in term `{raw}`"))),
        };
        rest = stripped[close + 1..].trim_start();
    }

    let operator = match rest.chars().next() {
        Some('!') => {
            rest = &rest[1..];
            Operator::Not
        }
        Some('?') => {
            rest = &rest[1..];
            Operator::Optional
        }
        Some('|') => {
            rest = &rest[1..];
            Operator::Or
        }
        _ => Operator::And,
    };

    let (id_part, subject_part) = split_subject(rest);
    let id = parse_id(id_part.trim(), components)?;
    let source = match subject_part {
        Some(name) => {
            let entity = components
                .by_name(name.trim())
                .ok_or_else(|| EcsError::ParseError(format!("unknown subject `{name}`")))?;
            Source::Fixed(entity)
        }
        None => Source::This,
    };

    Ok(Term {
        id,
        operator,
        source,
        inout,
    })
}

/// Split `ident.subject` or `pair(a, b).subject` into (id part, subject).
/// The dot can't be confused with the comma inside `pair(...)` because that
/// comma was already consumed by the outer term split.
fn split_subject(text: &str) -> (&str, Option<&str>) {
    if let Some(close) = text.rfind(')') {
        if let Some(dot) = text[close..].find('.') {
            let at = close + dot;
            return (&text[..at], Some(&text[at + 1..]));
        }
        return (text, None);
    }
    match text.find('.') {
        Some(at) => (&text[..at], Some(&text[at + 1..])),
        None => (text, None),
    }
}

fn parse_id(text: &str, components: &ComponentRegistry) -> Result<EntityId> {
    if let Some(inner) = text.strip_prefix("pair(").and_then(|s| s.strip_suffix(')')) {
        let (rel, obj) = inner
            .split_once(',')
            .ok_or_else(|| EcsError::ParseError(format!("malformed pair `{text}`")))?;
        let relation = parse_atom(rel.trim(), components)?;
        let object = parse_atom(obj.trim(), components)?;
        return Ok(EntityId::new_pair(relation, object));
    }
    parse_atom(text, components)
}

fn parse_atom(text: &str, components: &ComponentRegistry) -> Result<EntityId> {
    if text == "*" {
        return Ok(EntityId::WILDCARD);
    }
    components
        .by_name(text)
        .ok_or_else(|| EcsError::ParseError(format!("unknown identifier `{text}`")))
}
