//! Live entity instances.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A live entity instance: current field values plus the persistence
/// metadata the mutation compiler reads.
///
/// A freshly built instance is "new". The flag flips only through
/// [`Instance::mark_persisted`], which the consuming layer calls after a
/// successful create; the compiler itself never transitions it, only reads
/// it to choose between create and update semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    entity: String,
    is_new: bool,
    values: BTreeMap<String, Value>,
    /// Last-known-persisted snapshot, diffed against `values` to compute the
    /// changed-field set.
    original: BTreeMap<String, Value>,
}

impl Instance {
    /// Create a new, unpersisted instance of the named entity.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            is_new: true,
            values: BTreeMap::new(),
            original: BTreeMap::new(),
        }
    }

    /// Build an instance from values already persisted in the datastore
    /// (e.g. a row mapped back by an adapter). Not new; the snapshot equals
    /// the values, so nothing is initially changed.
    pub fn hydrated(entity: impl Into<String>, values: BTreeMap<String, Value>) -> Self {
        Self {
            entity: entity.into(),
            is_new: false,
            original: values.clone(),
            values,
        }
    }

    /// The entity this instance belongs to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Whether this instance has never been persisted.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Assign a field value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Read a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Current values, keyed by field name.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// The last-known-persisted snapshot.
    pub fn original(&self) -> &BTreeMap<String, Value> {
        &self.original
    }

    /// Record a successful persist: the instance stops being new and the
    /// snapshot catches up with the current values.
    pub fn mark_persisted(&mut self) {
        self.is_new = false;
        self.original = self.values.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_instance_is_new() {
        let instance = Instance::new("User");
        assert!(instance.is_new());
        assert!(instance.original().is_empty());
    }

    #[test]
    fn test_mark_persisted_snapshots_values() {
        let mut instance = Instance::new("User");
        instance.set("id", 81).set("role", "admin");
        instance.mark_persisted();
        assert!(!instance.is_new());
        assert_eq!(instance.original().get("role"), Some(&Value::from("admin")));
    }

    #[test]
    fn test_hydrated_starts_clean() {
        let mut values = BTreeMap::new();
        values.insert("id".to_string(), Value::Int(81));
        let instance = Instance::hydrated("User", values);
        assert!(!instance.is_new());
        assert_eq!(instance.values(), instance.original());
    }
}
