//! The session: schema definition, query execution, and instance lifecycle,
//! bridged to a datastore through the [`Adapter`] trait.

use std::collections::BTreeMap;

use log::debug;

use crate::ast::{DeletePayload, FindQuery, InsertPayload, UpdatePayload};
use crate::error::{StrataError, StrataResult};
use crate::instance::Instance;
use crate::query::{self, FindOptions};
use crate::schema::{EntityDef, Registry};
use crate::value::Value;

/// A flat result row, keyed by the flattened column aliases of the query
/// that produced it.
pub type Row = BTreeMap<String, Value>;

/// The storage boundary. Adapters receive fully compiled ASTs and payloads
/// and never see schema metadata.
pub trait Adapter {
    fn find(&mut self, query: &FindQuery) -> StrataResult<Vec<Row>>;
    fn create(&mut self, payloads: &[InsertPayload]) -> StrataResult<()>;
    fn update(&mut self, payloads: &[UpdatePayload]) -> StrataResult<()>;
    fn remove(&mut self, payloads: &[DeletePayload]) -> StrataResult<()>;
}

/// A unit of work over one adapter: define entities, compile and run finds,
/// and persist instances.
pub struct Session<A: Adapter> {
    registry: Registry,
    adapter: A,
}

impl<A: Adapter> Session<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            registry: Registry::new(),
            adapter,
        }
    }

    /// Register an entity definition.
    pub fn define(&mut self, def: EntityDef) -> StrataResult<()> {
        self.registry.define(def)
    }

    /// The schema metadata registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The underlying adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Compile a find query without running it.
    pub fn compile_find(&self, entity: &str, options: FindOptions) -> StrataResult<FindQuery> {
        query::compile_find(&self.registry, entity, options)
    }

    /// Run a find query and return every matching row.
    pub fn find_all(&mut self, entity: &str, options: FindOptions) -> StrataResult<Vec<Row>> {
        let query = query::compile_find(&self.registry, entity, options)?;
        self.adapter.find(&query)
    }

    /// Return the first matching row, if any.
    pub fn find_one(&mut self, entity: &str, mut options: FindOptions) -> StrataResult<Option<Row>> {
        options.limit = Some(1);
        let rows = self.find_all(entity, options)?;
        Ok(rows.into_iter().next())
    }

    /// Return the only matching row. More than one match is an error, so the
    /// query asks for two rows, enough to detect the violation without
    /// fetching the full result set.
    pub fn find_only(&mut self, entity: &str, mut options: FindOptions) -> StrataResult<Option<Row>> {
        options.limit = Some(2);
        let rows = self.find_all(entity, options)?;
        if rows.len() > 1 {
            return Err(StrataError::NonUniqueResult);
        }
        Ok(rows.into_iter().next())
    }

    /// Persist a new instance. The instance stops being new on success.
    pub fn create(&mut self, instance: &mut Instance) -> StrataResult<()> {
        if !instance.is_new() {
            return Err(StrataError::InvalidOperationState(format!(
                "cannot create an already-persisted instance of '{}'",
                instance.entity()
            )));
        }
        let payloads = query::insert_payloads(&self.registry, instance)?;
        debug!(
            "creating '{}' across {} table(s)",
            instance.entity(),
            payloads.len()
        );
        self.adapter.create(&payloads)?;
        instance.mark_persisted();
        Ok(())
    }

    /// Persist the changed fields of an already-persisted instance.
    pub fn update(&mut self, instance: &mut Instance) -> StrataResult<()> {
        if instance.is_new() {
            return Err(StrataError::InvalidOperationState(format!(
                "cannot update an instance of '{}' that was never persisted",
                instance.entity()
            )));
        }
        let payloads = query::update_payloads(&self.registry, instance)?;
        self.adapter.update(&payloads)?;
        instance.mark_persisted();
        Ok(())
    }

    /// Persist an instance whatever its lifecycle state: new instances are
    /// created, persisted ones updated.
    pub fn upsert(&mut self, instance: &mut Instance) -> StrataResult<()> {
        if instance.is_new() {
            self.create(instance)
        } else {
            self.update(instance)
        }
    }

    /// Delete a persisted instance from every table in its chain.
    pub fn remove(&mut self, instance: &Instance) -> StrataResult<()> {
        if instance.is_new() {
            return Err(StrataError::InvalidOperationState(format!(
                "cannot remove an instance of '{}' that was never persisted",
                instance.entity()
            )));
        }
        let payloads = query::delete_payloads(&self.registry, instance)?;
        debug!(
            "removing '{}' from {} table(s)",
            instance.entity(),
            payloads.len()
        );
        self.adapter.remove(&payloads)
    }
}
