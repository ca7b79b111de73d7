//! The storage-agnostic query AST.
//!
//! These structures are the only artifact that crosses the boundary to a
//! storage adapter. They carry no dialect: an adapter renders them into
//! whatever its datastore understands. The compiler guarantees that every
//! identifier in here is alias-qualified and collision-free.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A single joined table reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Table being joined.
    pub to: String,
    /// Unique alias assigned to this use of the table.
    #[serde(rename = "as")]
    pub alias: String,
    /// Equi-join predicate as (left column, right column) pairs, both
    /// alias-qualified.
    pub on: Vec<(String, String)>,
}

/// Compiled representation of a read operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindQuery {
    /// (qualified source column, flattened output alias) pairs. The flattened
    /// alias replaces the `.` separator with `_`, so every output identifier
    /// is unique even when one table is joined repeatedly.
    pub columns: Vec<(String, String)>,
    /// Root table.
    pub from: String,
    /// Root alias (the root entity's own name).
    #[serde(rename = "as")]
    pub alias: String,
    /// Inheritance and relation joins, in the order they were established.
    #[serde(default, rename = "join", skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<Join>,
    /// Conditions keyed by alias-qualified column.
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub conditions: Option<BTreeMap<String, Value>>,
    /// Records to discard from the head of the result set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    /// Maximum number of records to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl FindQuery {
    /// Create an empty query over the given table/alias pair.
    pub fn new(from: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            columns: vec![],
            from: from.into(),
            alias: alias.into(),
            joins: vec![],
            conditions: None,
            skip: None,
            limit: None,
        }
    }
}

/// One per-table insert/update payload in an inheritance chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertPayload {
    /// Target table.
    pub table: String,
    /// Changed values keyed by storage column name. May be empty; callers
    /// decide whether an empty payload is worth a round trip.
    pub values: BTreeMap<String, Value>,
}

/// One per-table update in an inheritance chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePayload {
    /// Target table.
    pub table: String,
    /// Changed values keyed by storage column name.
    pub values: BTreeMap<String, Value>,
    /// Primary-key columns mapped to the instance's current key values.
    #[serde(rename = "where")]
    pub conditions: BTreeMap<String, Value>,
}

/// One per-table delete in an inheritance chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePayload {
    /// Target table.
    pub table: String,
    /// Primary-key columns mapped to the instance's current key values.
    #[serde(rename = "where")]
    pub conditions: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_query_serializes_boundary_shape() {
        let mut query = FindQuery::new("users", "User");
        query.columns.push(("User.id".into(), "User_id".into()));
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["from"], "users");
        assert_eq!(json["as"], "User");
        assert_eq!(json["columns"][0][0], "User.id");
        // Absent clauses stay out of the serialized form entirely.
        assert!(json.get("join").is_none());
        assert!(json.get("where").is_none());
        assert!(json.get("limit").is_none());
    }
}
