use serde::{Deserialize, Serialize};

use crate::schema::field::FieldDef;

/// A named, immutable collection of field definitions mapped to a storage
/// table, with an optional parent forming a single-inheritance chain.
///
/// An entity is built once with the builder methods below, handed to
/// [`Registry::define`](crate::schema::Registry::define), and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name, unique across the registry.
    pub name: String,
    /// Storage table name. Defaults to the entity name.
    pub table: String,
    /// Parent entity name, when this entity extends another.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Fields in definition order. Definition order drives column order in
    /// compiled queries.
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Create a new entity. The table name defaults to the entity name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            extends: None,
            fields: vec![],
        }
    }

    /// Builder: set the storage table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Builder: declare the parent entity.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Builder: append a field definition.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up one of this entity's own fields by name. Inherited fields are
    /// resolved through [`Registry::field`](crate::schema::Registry::field).
    pub fn field_named(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// This entity's own primary-key fields, excluding inherited ones.
    pub fn own_primary_fields(&self) -> Vec<&FieldDef> {
        self.fields.iter().filter(|f| f.primary).collect()
    }
}
