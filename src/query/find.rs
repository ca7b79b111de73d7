//! Find-query compilation.
//!
//! Turns an entity name plus [`FindOptions`] into a [`FindQuery`] AST: the
//! column list, the join tree covering inheritance chains and expanded
//! relations, and alias-qualified conditions. Output is deterministic for a
//! given schema and options.

use std::collections::{BTreeMap, HashMap};

use log::trace;

use crate::ast::{FindQuery, Join};
use crate::error::{StrataError, StrataResult};
use crate::graph;
use crate::query::joins::{self, AliasAllocator};
use crate::schema::{EntityDef, FieldDef, Registry};
use crate::value::Value;

/// Options shaping a find query.
///
/// `include`/`exclude` take graph paths, root-relative or fully qualified.
/// An explicit exclude always wins for its exact path; an explicit include
/// overrides a field-level `exclude` flag and forces lazy relations to join.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub conditions: BTreeMap<String, Value>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: include a graph path in the result set.
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.include.push(path.into());
        self
    }

    /// Builder: exclude a graph path from the result set.
    pub fn exclude(mut self, path: impl Into<String>) -> Self {
        self.exclude.push(path.into());
        self
    }

    /// Builder: constrain a field to a value. Unqualified names resolve
    /// against the root entity's inheritance chain; names containing a dot
    /// pass through as written.
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    /// Builder: skip the first `n` results. Zero means no offset.
    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    /// Builder: cap the result count. Zero means no cap.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Compile a find query for the named root entity.
pub fn compile_find(
    registry: &Registry,
    root: &str,
    options: FindOptions,
) -> StrataResult<FindQuery> {
    let root = registry.get(root)?;
    FindQueryBuilder::new(registry, root, options).build()
}

/// Stateful walk over the root entity's fields, inheritance chain, and
/// expanded relations, accumulating columns and joins as it goes.
pub struct FindQueryBuilder<'a> {
    registry: &'a Registry,
    root: &'a EntityDef,
    options: FindOptions,
    include: Vec<String>,
    exclude: Vec<String>,
    columns: Vec<(String, String)>,
    joins: Vec<Join>,
    aliases: AliasAllocator,
    /// Graph path → alias of the joined target, so a path joined once (say
    /// eagerly and by include) is never joined twice.
    join_memo: HashMap<String, String>,
    /// Aliases of the root's own inheritance chain, keyed by entity name.
    /// Conditions on inherited fields qualify against these.
    chain_aliases: HashMap<String, String>,
    /// Entities currently being expanded. Eager relations pointing back into
    /// this set are skipped, which is what terminates eager cycles.
    expanding: Vec<String>,
}

impl<'a> FindQueryBuilder<'a> {
    pub fn new(registry: &'a Registry, root: &'a EntityDef, options: FindOptions) -> Self {
        let include = options
            .include
            .iter()
            .map(|p| normalize_path(&root.name, p))
            .collect();
        let exclude = options
            .exclude
            .iter()
            .map(|p| normalize_path(&root.name, p))
            .collect();
        Self {
            registry,
            root,
            options,
            include,
            exclude,
            columns: vec![],
            joins: vec![],
            aliases: AliasAllocator::new(),
            join_memo: HashMap::new(),
            chain_aliases: HashMap::new(),
            expanding: vec![],
        }
    }

    /// Compile the query.
    pub fn build(mut self) -> StrataResult<FindQuery> {
        // The root keeps its bare entity name as alias.
        let root_alias = self.root.name.clone();
        self.chain_aliases
            .insert(self.root.name.clone(), root_alias.clone());
        self.expanding.push(self.root.name.clone());

        let root_path = self.root.name.clone();
        self.add_fields(self.root, &root_alias, &root_path)?;
        self.join_ancestors(self.root, &root_alias, &root_path, true)?;
        self.expanding.pop();

        // Includes the schema cannot resolve pass through verbatim, exactly
        // as written, for adapters that understand raw expressions.
        for (raw, normalized) in self.options.include.iter().zip(&self.include) {
            if graph::resolve(self.registry, self.root, normalized).is_none() {
                self.columns
                    .push((raw.clone(), raw.replace('.', "_")));
            }
        }

        let conditions = self.qualified_conditions()?;
        trace!(
            "compiled find for '{}': {} columns, {} joins",
            self.root.name,
            self.columns.len(),
            self.joins.len()
        );

        Ok(FindQuery {
            columns: self.columns,
            from: self.root.table.clone(),
            alias: root_alias,
            joins: self.joins,
            conditions: if conditions.is_empty() {
                None
            } else {
                Some(conditions)
            },
            skip: self.options.skip.filter(|&n| n > 0),
            limit: self.options.limit.filter(|&n| n > 0),
        })
    }

    /// Emit columns for `entity`'s own fields under `alias`, joining and
    /// expanding relations as the include/exclude/eager rules dictate.
    fn add_fields(&mut self, entity: &'a EntityDef, alias: &str, prefix: &str) -> StrataResult<()> {
        for field in &entity.fields {
            let path = format!("{prefix}.{}", field.name);
            if self.excluded(&path) {
                continue;
            }
            let included = self.included(&path);
            if field.exclude && !included {
                continue;
            }
            if field.is_ref() {
                let expand = included
                    || (field.eager
                        && !self
                            .expanding
                            .iter()
                            .any(|e| Some(e.as_str()) == field.ref_entity()));
                if expand {
                    self.join_relation(entity, field, alias, &path)?;
                } else if !field.is_collection() {
                    // Lazy to-one relations surface only their fk column.
                    self.push_column(alias, &field.column);
                }
                continue;
            }
            self.push_column(alias, &field.column);
        }
        Ok(())
    }

    /// Join the relation behind `field` (memoized by path) and expand the
    /// target entity's fields and ancestors under the joined alias.
    fn join_relation(
        &mut self,
        source: &'a EntityDef,
        field: &'a FieldDef,
        source_alias: &str,
        path: &str,
    ) -> StrataResult<()> {
        if self.join_memo.contains_key(path) {
            return Ok(());
        }

        let registry = self.registry;
        let clauses = joins::relation_joins(registry, source, field, source_alias, &mut self.aliases)?;
        let mut target_alias = source_alias.to_string();
        for clause in clauses {
            target_alias = clause.alias.clone();
            self.joins.push(Join {
                to: clause.table,
                alias: clause.alias,
                on: clause.on,
            });
        }
        self.join_memo.insert(path.to_string(), target_alias.clone());

        let target_name = field.ref_entity().ok_or_else(|| {
            StrataError::invalid_relation(&field.owner, &field.name, "not a relation field")
        })?;
        let target = registry.get(target_name)?;
        self.expanding.push(target.name.clone());
        self.add_fields(target, &target_alias, path)?;
        self.join_ancestors(target, &target_alias, path, false)?;
        self.expanding.pop();
        Ok(())
    }

    /// Walk `entity`'s inheritance chain upward, joining each parent table
    /// and emitting its fields. When `record` is set (the root chain) the
    /// parent aliases are kept for condition qualification.
    fn join_ancestors(
        &mut self,
        entity: &'a EntityDef,
        alias: &str,
        prefix: &str,
        record: bool,
    ) -> StrataResult<()> {
        let registry = self.registry;
        let mut child = entity;
        let mut child_alias = alias.to_string();
        for parent in registry.ancestors(entity)? {
            let parent_alias = self.aliases.alias(&parent.name);
            let on = joins::inheritance_join(registry, child, parent, &child_alias, &parent_alias)?;
            self.joins.push(Join {
                to: parent.table.clone(),
                alias: parent_alias.clone(),
                on,
            });
            if record {
                self.chain_aliases
                    .insert(parent.name.clone(), parent_alias.clone());
            }
            self.add_fields(parent, &parent_alias, prefix)?;
            child = parent;
            child_alias = parent_alias;
        }
        Ok(())
    }

    /// Qualify condition keys. Unqualified names resolve against the root's
    /// inheritance chain and rewrite to `alias.column`; names already
    /// containing a dot pass through untouched.
    fn qualified_conditions(&self) -> StrataResult<BTreeMap<String, Value>> {
        let mut conditions = BTreeMap::new();
        for (key, value) in &self.options.conditions {
            if key.contains('.') {
                conditions.insert(key.clone(), value.clone());
                continue;
            }
            let field = self
                .registry
                .field(self.root, key)
                .ok_or_else(|| StrataError::unknown_field(&self.root.name, key))?;
            let alias = self
                .chain_aliases
                .get(&field.owner)
                .map(String::as_str)
                .unwrap_or(self.root.name.as_str());
            conditions.insert(joins::qualify(alias, &field.column), value.clone());
        }
        Ok(conditions)
    }

    fn push_column(&mut self, alias: &str, column: &str) {
        self.columns.push((
            format!("{alias}.{column}"),
            format!("{alias}_{column}"),
        ));
    }

    fn included(&self, path: &str) -> bool {
        self.include
            .iter()
            .any(|i| i == path || i.starts_with(&format!("{path}.")))
    }

    fn excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|e| e == path)
    }
}

/// Qualify a root-relative option path with the root entity's name.
fn normalize_path(root: &str, path: &str) -> String {
    if path == root || path.starts_with(&format!("{root}.")) {
        path.to_string()
    } else {
        format!("{root}.{path}")
    }
}
