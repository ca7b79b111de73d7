//! Mutation compilation.
//!
//! Splits a live [`Instance`] into per-table payloads along its inheritance
//! chain. Payloads are emitted root-most table first, so a datastore that
//! enforces the chain's foreign keys can apply them in order (and a delete
//! batch can be applied in reverse).

use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use crate::ast::{DeletePayload, InsertPayload, UpdatePayload};
use crate::error::{StrataError, StrataResult};
use crate::instance::Instance;
use crate::schema::{EntityDef, Registry};
use crate::value::Value;

/// The set of field names whose current value differs from the last-known
/// persisted snapshot. A field removed since the snapshot counts as changed.
pub fn changed_fields(instance: &Instance) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = instance.values().keys().cloned().collect();
    names.extend(instance.original().keys().cloned());
    names
        .into_iter()
        .filter(|name| instance.values().get(name) != instance.original().get(name))
        .collect()
}

/// Compile per-table insert payloads for an instance, root-most table first.
///
/// Every chain table gets a payload, even an empty one, since a record must
/// exist in each table of its chain.
pub fn insert_payloads(
    registry: &Registry,
    instance: &Instance,
) -> StrataResult<Vec<InsertPayload>> {
    let entity = registry.get(instance.entity())?;
    let changed = changed_fields(instance);
    let mut payloads = vec![];
    for link in registry.chain(entity)? {
        payloads.push(InsertPayload {
            table: link.table.clone(),
            values: table_values(link, instance, &changed),
        });
    }
    trace!(
        "compiled {} insert payload(s) for '{}'",
        payloads.len(),
        instance.entity()
    );
    Ok(payloads)
}

/// Compile per-table update payloads for an instance, root-most table first.
/// Chain tables with no changed fields are skipped.
pub fn update_payloads(
    registry: &Registry,
    instance: &Instance,
) -> StrataResult<Vec<UpdatePayload>> {
    let entity = registry.get(instance.entity())?;
    let changed = changed_fields(instance);
    let mut payloads = vec![];
    for link in registry.chain(entity)? {
        let values = table_values(link, instance, &changed);
        if values.is_empty() {
            continue;
        }
        payloads.push(UpdatePayload {
            table: link.table.clone(),
            values,
            conditions: key_conditions(registry, link, instance)?,
        });
    }
    Ok(payloads)
}

/// Compile per-table delete payloads for an instance, root-most table first.
pub fn delete_payloads(
    registry: &Registry,
    instance: &Instance,
) -> StrataResult<Vec<DeletePayload>> {
    let entity = registry.get(instance.entity())?;
    let mut payloads = vec![];
    for link in registry.chain(entity)? {
        payloads.push(DeletePayload {
            table: link.table.clone(),
            conditions: key_conditions(registry, link, instance)?,
        });
    }
    Ok(payloads)
}

/// The changed values belonging to one chain entity, keyed by storage
/// column. Collection relations have no column on this side and are skipped.
fn table_values(
    entity: &EntityDef,
    instance: &Instance,
    changed: &BTreeSet<String>,
) -> BTreeMap<String, Value> {
    let mut values = BTreeMap::new();
    for field in &entity.fields {
        if field.is_collection() || !changed.contains(&field.name) {
            continue;
        }
        let value = instance
            .get(&field.name)
            .cloned()
            .unwrap_or(Value::Null);
        values.insert(field.column.clone(), value);
    }
    values
}

/// Map a chain entity's primary-key column to the instance's current key
/// value. A chain entity without its own key borrows the inherited one, so
/// every table in the chain keys on the same value.
fn key_conditions(
    registry: &Registry,
    entity: &EntityDef,
    instance: &Instance,
) -> StrataResult<BTreeMap<String, Value>> {
    let primary = registry.single_primary(entity)?;
    let value = instance.get(&primary.name).cloned().ok_or_else(|| {
        StrataError::InvalidOperationState(format!(
            "instance of '{}' carries no value for primary key '{}'",
            instance.entity(),
            primary.name
        ))
    })?;
    let mut conditions = BTreeMap::new();
    conditions.insert(primary.column.clone(), value);
    Ok(conditions)
}
