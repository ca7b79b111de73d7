use serde::{Deserialize, Serialize};

/// Scalar storage types understood by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
    Uuid,
}

/// Relationship cardinality of a reference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relation {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

/// What a field holds: exactly one of a scalar column or a reference to
/// another entity. The enum makes the either/or invariant unrepresentable
/// to violate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// A plain typed column.
    Scalar(ScalarType),
    /// A reference to another entity, resolved by name through the registry
    /// at the point of use. Name-based resolution is what makes self- and
    /// mutually-referential schemas definable in any order.
    Ref { entity: String, relation: Relation },
}

/// A single field definition. A field belongs to exactly one entity; the
/// `owner` is stamped when the entity is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Storage column name. Defaults to the field name.
    pub column: String,
    /// Name of the entity this field is defined on.
    #[serde(default)]
    pub owner: String,
    /// Scalar type or entity reference.
    pub kind: FieldKind,
    /// Part of the entity's primary key.
    #[serde(default)]
    pub primary: bool,
    /// Relation is joined/loaded on every query unless explicitly excluded.
    #[serde(default)]
    pub eager: bool,
    /// Excluded from results unless explicitly included.
    #[serde(default)]
    pub exclude: bool,
    /// Column accepts NULL. Metadata for adapters; the compiler ignores it.
    #[serde(default)]
    pub nullable: bool,
    /// Column carries a unique constraint. Metadata for adapters.
    #[serde(default)]
    pub unique: bool,
    /// For one-to-many/many-to-many: name of the field on the referenced
    /// entity that owns the inverse side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_by: Option<String>,
    /// For many-to-many: an explicitly defined association entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
    /// For many-to-many: join table name override for the synthesized
    /// association entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_table: Option<String>,
    /// For many-to-many: column on the association table that refers to this
    /// field's target entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_column: Option<String>,
    /// For many-to-many: column on the association table that refers back to
    /// the owning entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_join_column: Option<String>,
}

impl FieldDef {
    fn base(name: String, kind: FieldKind) -> Self {
        Self {
            column: name.clone(),
            name,
            owner: String::new(),
            kind,
            primary: false,
            eager: false,
            exclude: false,
            nullable: false,
            unique: false,
            mapped_by: None,
            through: None,
            join_table: None,
            join_column: None,
            inverse_join_column: None,
        }
    }

    /// Create a scalar field. Column defaults to the field name.
    pub fn scalar(name: impl Into<String>, typ: ScalarType) -> Self {
        Self::base(name.into(), FieldKind::Scalar(typ))
    }

    /// Create a reference field pointing at `entity` with the given relation
    /// kind.
    pub fn reference(
        name: impl Into<String>,
        entity: impl Into<String>,
        relation: Relation,
    ) -> Self {
        Self::base(
            name.into(),
            FieldKind::Ref {
                entity: entity.into(),
                relation,
            },
        )
    }

    /// Builder: override the storage column name.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Builder: mark as primary key.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Builder: mark as eagerly loaded.
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Builder: exclude from results by default.
    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }

    /// Builder: mark as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Builder: mark as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Builder: name the inverse-side field on the referenced entity.
    pub fn mapped_by(mut self, field: impl Into<String>) -> Self {
        self.mapped_by = Some(field.into());
        self
    }

    /// Builder: route a many-to-many relation through an explicitly defined
    /// association entity.
    pub fn through(mut self, entity: impl Into<String>) -> Self {
        self.through = Some(entity.into());
        self
    }

    /// Builder: override the synthesized association's table name.
    pub fn join_table(mut self, table: impl Into<String>) -> Self {
        self.join_table = Some(table.into());
        self
    }

    /// Builder: override the association column pointing at this field's
    /// target.
    pub fn join_column(mut self, column: impl Into<String>) -> Self {
        self.join_column = Some(column.into());
        self
    }

    /// Builder: override the association column pointing back at the owning
    /// entity.
    pub fn inverse_join_column(mut self, column: impl Into<String>) -> Self {
        self.inverse_join_column = Some(column.into());
        self
    }

    /// The referenced entity name, when this is a reference field.
    pub fn ref_entity(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Ref { entity, .. } => Some(entity),
            FieldKind::Scalar(_) => None,
        }
    }

    /// The relation kind, when this is a reference field.
    pub fn relation(&self) -> Option<Relation> {
        match &self.kind {
            FieldKind::Ref { relation, .. } => Some(*relation),
            FieldKind::Scalar(_) => None,
        }
    }

    /// Whether this field references another entity.
    pub fn is_ref(&self) -> bool {
        matches!(self.kind, FieldKind::Ref { .. })
    }

    /// Whether this relation holds many target records and therefore has no
    /// storage column on the owning side.
    pub fn is_collection(&self) -> bool {
        matches!(
            self.relation(),
            Some(Relation::OneToMany) | Some(Relation::ManyToMany)
        )
    }
}
