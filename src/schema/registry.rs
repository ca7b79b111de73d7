use std::collections::HashMap;
use std::sync::RwLock;

use log::debug;

use crate::error::{StrataError, StrataResult};
use crate::schema::entity::EntityDef;
use crate::schema::field::{FieldDef, Relation};

/// The schema metadata registry.
///
/// Entities are registered once, at schema-definition time, and are immutable
/// afterwards; every later lookup is a plain read. The one piece of interior
/// mutability is the association cache: association entities for many-to-many
/// relations without an explicit `through` are synthesized lazily on first
/// use and memoized by the unordered pair of participating entities, so
/// repeated resolution (including concurrent resolution) is idempotent.
pub struct Registry {
    entities: HashMap<String, EntityDef>,
    associations: RwLock<HashMap<(String, String), EntityDef>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            associations: RwLock::new(HashMap::new()),
        }
    }

    /// Register an entity definition.
    ///
    /// Fails with [`StrataError::DuplicateEntity`] when the name is taken,
    /// [`StrataError::InvalidParent`] when `extends` names an undefined
    /// entity, and rejects primary-key sets that are composite or disagree
    /// with the parent's cardinality. On success every field has its column
    /// and owner defaulted.
    pub fn define(&mut self, mut def: EntityDef) -> StrataResult<()> {
        if self.entities.contains_key(&def.name) {
            return Err(StrataError::DuplicateEntity(def.name));
        }
        if let Some(parent) = &def.extends {
            if !self.entities.contains_key(parent) {
                return Err(StrataError::InvalidParent {
                    entity: def.name.clone(),
                    parent: parent.clone(),
                });
            }
        }

        for field in &mut def.fields {
            if field.column.is_empty() {
                field.column = field.name.clone();
            }
            field.owner = def.name.clone();
        }

        let own_primaries = def.own_primary_fields().len();
        if own_primaries > 1 {
            return Err(StrataError::CompositeKeyUnsupported(def.name));
        }
        if let Some(parent) = &def.extends {
            let parent_def = self.get(parent)?;
            let parent_primaries = self.primary_fields(parent_def)?.len();
            if own_primaries != 0 && own_primaries != parent_primaries {
                return Err(StrataError::PrimaryKeyMismatch {
                    child: def.name.clone(),
                    parent: parent.clone(),
                });
            }
        }

        debug!(
            "defined entity '{}' (table '{}', {} fields)",
            def.name,
            def.table,
            def.fields.len()
        );
        self.entities.insert(def.name.clone(), def);
        Ok(())
    }

    /// Look up an entity by name.
    pub fn get(&self, name: &str) -> StrataResult<&EntityDef> {
        self.entities
            .get(name)
            .ok_or_else(|| StrataError::NotFound(name.to_string()))
    }

    /// The direct parent of an entity, if any. Parent names are validated at
    /// definition time, so a dangling parent means the registry was bypassed.
    pub fn parent(&self, entity: &EntityDef) -> StrataResult<Option<&EntityDef>> {
        match &entity.extends {
            Some(parent) => Ok(Some(self.get(parent)?)),
            None => Ok(None),
        }
    }

    /// The inheritance ancestors of an entity, nearest first: parent,
    /// grandparent, and so on up to the root.
    pub fn ancestors(&self, entity: &EntityDef) -> StrataResult<Vec<&EntityDef>> {
        let mut ancestors = vec![];
        let mut current = entity;
        while let Some(parent) = self.parent(current)? {
            ancestors.push(parent);
            current = parent;
        }
        Ok(ancestors)
    }

    /// The full inheritance chain, root-most ancestor first, the entity
    /// itself last. Per-table mutation payloads are emitted in this order.
    pub fn chain<'a>(&'a self, entity: &'a EntityDef) -> StrataResult<Vec<&'a EntityDef>> {
        let mut chain = self.ancestors(entity)?;
        chain.reverse();
        chain.push(entity);
        Ok(chain)
    }

    /// Look up a field by name on an entity, searching the whole inheritance
    /// chain. The entity's own fields shadow ancestral ones.
    pub fn field<'a>(&'a self, entity: &'a EntityDef, name: &str) -> Option<&'a FieldDef> {
        let mut current = entity;
        loop {
            if let Some(field) = current.field_named(name) {
                return Some(field);
            }
            match &current.extends {
                Some(parent) => current = self.entities.get(parent)?,
                None => return None,
            }
        }
    }

    /// All fields of an entity, own fields first, then each ancestor's in
    /// chain order. Shadowed ancestral fields are skipped.
    pub fn all_fields<'a>(&'a self, entity: &'a EntityDef) -> StrataResult<Vec<&'a FieldDef>> {
        let mut fields: Vec<&FieldDef> = entity.fields.iter().collect();
        for ancestor in self.ancestors(entity)? {
            for field in &ancestor.fields {
                if !fields.iter().any(|f| f.name == field.name) {
                    fields.push(field);
                }
            }
        }
        Ok(fields)
    }

    /// The primary-key fields of an entity, inherited ones included.
    pub fn primary_fields<'a>(
        &'a self,
        entity: &'a EntityDef,
    ) -> StrataResult<Vec<&'a FieldDef>> {
        Ok(self
            .all_fields(entity)?
            .into_iter()
            .filter(|f| f.primary)
            .collect())
    }

    /// The single primary-key field of an entity. Errors when the entity
    /// declares none ([`StrataError::MissingPrimaryKey`]) or more than one
    /// ([`StrataError::CompositeKeyUnsupported`]).
    pub fn single_primary<'a>(&'a self, entity: &'a EntityDef) -> StrataResult<&'a FieldDef> {
        let primaries = self.primary_fields(entity)?;
        match primaries.len() {
            0 => Err(StrataError::MissingPrimaryKey(entity.name.clone())),
            1 => Ok(primaries[0]),
            _ => Err(StrataError::CompositeKeyUnsupported(entity.name.clone())),
        }
    }

    /// Find the field on `entity` that owns the inverse side of `field`:
    /// its ref points back at `field`'s owner and its `mapped_by` names
    /// `field`. Used to locate the owning side of a many-to-many relation
    /// when resolution starts from the non-owning side, and the inverse side
    /// when it starts from the owning one.
    pub fn inverse_field<'a>(
        &'a self,
        entity: &'a EntityDef,
        field: &FieldDef,
    ) -> Option<&'a FieldDef> {
        entity.fields.iter().find(|candidate| {
            candidate.ref_entity() == Some(field.owner.as_str())
                && candidate.mapped_by.as_deref() == Some(field.name.as_str())
        })
    }

    /// Resolve the association entity for the owning side of a many-to-many
    /// relation.
    ///
    /// With an explicit `through`, that entity is returned as defined.
    /// Otherwise an association is synthesized (two primary many-to-one
    /// fields, one per side) and memoized so both sides of the relation see
    /// the identical entity.
    pub fn association_for(&self, owning: &FieldDef) -> StrataResult<EntityDef> {
        if let Some(through) = &owning.through {
            return Ok(self.get(through)?.clone());
        }

        let target_name = owning.ref_entity().ok_or_else(|| {
            StrataError::invalid_relation(&owning.owner, &owning.name, "not a relation field")
        })?;
        let owner = self.get(&owning.owner)?;
        let target = self.get(target_name)?;

        let key = pair_key(&owner.name, &target.name);
        if let Ok(cache) = self.associations.read() {
            if let Some(assoc) = cache.get(&key) {
                return Ok(assoc.clone());
            }
        }

        let assoc = synthesize_association(owning, owner, target, self.inverse_field(target, owning));
        debug!(
            "synthesized association entity '{}' (table '{}') for {}.{}",
            assoc.name, assoc.table, owning.owner, owning.name
        );
        if let Ok(mut cache) = self.associations.write() {
            cache.entry(key).or_insert_with(|| assoc.clone());
        }
        Ok(assoc)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Build the implicit association entity for a many-to-many relation.
///
/// The entity name concatenates the two side names in owning-field order
/// (`Book.authors -> Author` yields `BookAuthor`); the table joins them with
/// an underscore unless a `join_table` override is configured on the owning
/// field. Each side becomes a primary many-to-one field: the far side is
/// named after the owning field, the near side after the inverse field (or
/// the owning entity when the relation is unidirectional).
fn synthesize_association(
    owning: &FieldDef,
    owner: &EntityDef,
    target: &EntityDef,
    inverse: Option<&FieldDef>,
) -> EntityDef {
    let name = format!("{}{}", owner.name, target.name);
    let table = owning
        .join_table
        .clone()
        .unwrap_or_else(|| format!("{}_{}", owner.name, target.name));

    let far_column = owning.join_column.clone().unwrap_or_else(|| owning.name.clone());
    let far_field = FieldDef::reference(owning.name.clone(), target.name.clone(), Relation::ManyToOne)
        .column(far_column)
        .primary();

    let near_name = inverse
        .map(|f| f.name.clone())
        .unwrap_or_else(|| owner.name.clone());
    let near_column = owning
        .inverse_join_column
        .clone()
        .unwrap_or_else(|| near_name.clone());
    let near_field = FieldDef::reference(near_name, owner.name.clone(), Relation::ManyToOne)
        .column(near_column)
        .primary();

    let mut assoc = EntityDef::new(name)
        .table(table)
        .field(far_field)
        .field(near_field);
    for field in &mut assoc.fields {
        field.owner = assoc.name.clone();
    }
    assoc
}
