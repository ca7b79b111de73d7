//! Join-predicate construction.
//!
//! Two independent concerns live here: inheritance joins (child table to
//! parent table over the shared primary key) and relation joins (the four
//! relation kinds, including the two-hop route through an association entity
//! for many-to-many). Everything operates on alias-qualified columns; alias
//! allocation itself belongs to the caller.

use std::collections::HashMap;

use crate::error::{StrataError, StrataResult};
use crate::schema::{EntityDef, FieldDef, Registry, Relation};

/// Prefix a column with a table alias.
pub(crate) fn qualify(alias: &str, column: &str) -> String {
    format!("{alias}.{column}")
}

/// Per-query table alias allocator.
///
/// The root keeps its bare entity name; every allocation for a name yields
/// `name0`, `name1`, … so repeated joins to one table can never collide.
#[derive(Debug, Default)]
pub struct AliasAllocator {
    counters: HashMap<String, u64>,
}

impl AliasAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next unique alias for `name`.
    pub fn alias(&mut self, name: &str) -> String {
        let counter = self
            .counters
            .entry(name.to_string())
            .and_modify(|c| *c += 1)
            .or_insert(0);
        format!("{name}{counter}")
    }
}

/// A single resolved join clause, not yet part of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: String,
    pub alias: String,
    pub on: Vec<(String, String)>,
}

/// Compute the (child pk, parent pk) predicate for a child→parent
/// inheritance join. A child that declares no primary key of its own
/// inherits the parent's key definition (same column name, child's table).
pub fn inheritance_join(
    registry: &Registry,
    child: &EntityDef,
    parent: &EntityDef,
    child_alias: &str,
    parent_alias: &str,
) -> StrataResult<Vec<(String, String)>> {
    let parent_primaries = registry.primary_fields(parent)?;
    if parent_primaries.is_empty() {
        return Err(StrataError::MissingPrimaryKey(parent.name.clone()));
    }

    let mut child_primaries = child.own_primary_fields();
    if child_primaries.is_empty() {
        child_primaries = parent_primaries.clone();
    }
    if child_primaries.len() != parent_primaries.len() {
        return Err(StrataError::PrimaryKeyMismatch {
            child: child.name.clone(),
            parent: parent.name.clone(),
        });
    }
    if child_primaries.len() > 1 {
        return Err(StrataError::CompositeKeyUnsupported(child.name.clone()));
    }

    Ok(vec![(
        qualify(child_alias, &child_primaries[0].column),
        qualify(parent_alias, &parent_primaries[0].column),
    )])
}

/// Resolve the join clause(s) for a relation field on `source`.
///
/// To-one and one-to-many relations produce a single clause. Many-to-many
/// produces two, routed through the association entity; the last clause is
/// always the one whose alias the target's fields should be read under.
pub fn relation_joins(
    registry: &Registry,
    source: &EntityDef,
    field: &FieldDef,
    source_alias: &str,
    aliases: &mut AliasAllocator,
) -> StrataResult<Vec<JoinClause>> {
    let (target_name, relation) = match (&field.ref_entity(), field.relation()) {
        (Some(entity), Some(relation)) => (entity.to_string(), relation),
        _ => {
            return Err(StrataError::invalid_relation(
                &field.owner,
                &field.name,
                "not a relation field",
            ));
        }
    };
    let target = registry.get(&target_name)?;

    match relation {
        Relation::OneToOne | Relation::ManyToOne => {
            let target_pk = registry.single_primary(target)?;
            let alias = aliases.alias(&target.name);
            Ok(vec![JoinClause {
                table: target.table.clone(),
                on: vec![(
                    qualify(source_alias, &field.column),
                    qualify(&alias, &target_pk.column),
                )],
                alias,
            }])
        }
        Relation::OneToMany => {
            let mapped_by = field.mapped_by.as_deref().ok_or_else(|| {
                StrataError::invalid_relation(
                    &field.owner,
                    &field.name,
                    "one-to-many relations require mappedBy",
                )
            })?;
            let inverse = registry.field(target, mapped_by).ok_or_else(|| {
                StrataError::invalid_relation(
                    &field.owner,
                    &field.name,
                    format!("mappedBy field '{mapped_by}' does not exist on '{}'", target.name),
                )
            })?;
            let source_pk = registry.single_primary(source)?;
            let alias = aliases.alias(&target.name);
            Ok(vec![JoinClause {
                table: target.table.clone(),
                on: vec![(
                    qualify(source_alias, &source_pk.column),
                    qualify(&alias, &inverse.column),
                )],
                alias,
            }])
        }
        Relation::ManyToMany => {
            many_to_many_joins(registry, source, field, target, source_alias, aliases)
        }
    }
}

/// Resolve a many-to-many relation as two joins through the association
/// entity: source → association, association → target.
///
/// The owning side is the field without `mapped_by`; when resolution starts
/// from the non-owning side, the owning field is found on the target via
/// `mapped_by`. Either direction lands on the same memoized association.
fn many_to_many_joins(
    registry: &Registry,
    source: &EntityDef,
    field: &FieldDef,
    target: &EntityDef,
    source_alias: &str,
    aliases: &mut AliasAllocator,
) -> StrataResult<Vec<JoinClause>> {
    let owning = match field.mapped_by.as_deref() {
        Some(mapped_by) => registry.field(target, mapped_by).ok_or_else(|| {
            StrataError::invalid_relation(
                &field.owner,
                &field.name,
                format!("mappedBy field '{mapped_by}' does not exist on '{}'", target.name),
            )
        })?,
        None => field,
    };
    let assoc = registry.association_for(owning)?;

    // The target is aliased before the association, so an entity joined both
    // directly and through an association numbers consistently.
    let target_alias = aliases.alias(&target.name);
    let assoc_alias = aliases.alias(&assoc.name);

    let source_pk = registry.single_primary(source)?;
    let target_pk = registry.single_primary(target)?;
    let (to_source, to_target) = association_sides(&assoc, owning, &source.name, &target.name)?;

    Ok(vec![
        JoinClause {
            table: assoc.table.clone(),
            alias: assoc_alias.clone(),
            on: vec![(
                qualify(&assoc_alias, &to_source.column),
                qualify(source_alias, &source_pk.column),
            )],
        },
        JoinClause {
            table: target.table.clone(),
            on: vec![(
                qualify(&assoc_alias, &to_target.column),
                qualify(&target_alias, &target_pk.column),
            )],
            alias: target_alias,
        },
    ])
}

/// Pick the association fields for the two sides of a many-to-many join,
/// returned as (source side, target side).
///
/// For a self-referential relation both fields refer to the same entity, so
/// the target side is chosen first (preferring the owning field's
/// `join_column` hint when one is set) and the source side is whichever
/// field remains. Resolving by elimination guarantees the two clauses never
/// collapse onto one association column.
fn association_sides<'a>(
    assoc: &'a EntityDef,
    owning: &FieldDef,
    source: &str,
    target: &str,
) -> StrataResult<(&'a FieldDef, &'a FieldDef)> {
    let target_candidates: Vec<usize> = assoc
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.ref_entity() == Some(target))
        .map(|(i, _)| i)
        .collect();
    let target_idx = match (target_candidates.as_slice(), owning.join_column.as_deref()) {
        ([], _) => {
            return Err(StrataError::invalid_relation(
                &owning.owner,
                &owning.name,
                format!("association '{}' has no field referring to '{target}'", assoc.name),
            ));
        }
        ([only], _) => *only,
        (many, Some(hint)) => many
            .iter()
            .copied()
            .find(|&i| assoc.fields[i].column == hint)
            .unwrap_or(many[0]),
        (many, None) => many[0],
    };
    let source_idx = assoc
        .fields
        .iter()
        .enumerate()
        .find(|(i, f)| *i != target_idx && f.ref_entity() == Some(source))
        .map(|(i, _)| i)
        .ok_or_else(|| {
            StrataError::invalid_relation(
                &owning.owner,
                &owning.name,
                format!(
                    "association '{}' has no field referring back to '{source}'",
                    assoc.name
                ),
            )
        })?;
    Ok((&assoc.fields[source_idx], &assoc.fields[target_idx]))
}
