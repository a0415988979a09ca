//! Thread-safe repository facade
//!
//! [`Repository`] wraps a [`DatabaseTableGroup`] in a read/write lock so
//! one entity type can be shared across threads: reads run concurrently,
//! writes are exclusive. The change-tracking triple
//! [`begin_changes`](Repository::begin_changes) /
//! [`save_changes`](Repository::save_changes) /
//! [`cancel_changes`](Repository::cancel_changes) brackets a batch of edits
//! in one store transaction.

use crate::core::accessor::EntityAccessor;
use crate::core::connection::ConnectionProvider;
use crate::core::error::Result;
use crate::core::schema::EntitySchema;
use crate::core::value::Value;
use crate::mapper::{DatabaseTableGroup, SaveData};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

pub struct Repository<T: EntityAccessor> {
    group: RwLock<DatabaseTableGroup<T>>,
}

impl<T: EntityAccessor> Repository<T> {
    /// Create the repository and register its tables with the provider
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Result<Self> {
        Ok(Self {
            group: RwLock::new(DatabaseTableGroup::new(provider)?),
        })
    }

    pub fn get(&self, id: i64) -> Result<T> {
        self.group.read().get(id)
    }

    pub fn get_by_uuid(&self, uuid: Uuid) -> Result<T> {
        self.group.read().get_by_uuid(uuid)
    }

    pub fn get_many(&self, ids: &[i64]) -> Result<Vec<T>> {
        self.group.read().get_many(ids)
    }

    pub fn get_many_reporting(&self, ids: &[i64]) -> Result<(Vec<T>, Vec<i64>)> {
        self.group.read().get_many_reporting(ids)
    }

    pub fn get_all(&self) -> Result<Vec<T>> {
        self.group.read().get_all()
    }

    pub fn get_all_filtered(&self, filters: &[(&str, Value)]) -> Result<Vec<T>> {
        self.group.read().get_all_filtered(filters)
    }

    pub fn exists(&self, id: i64) -> Result<bool> {
        self.group.read().exists(id)
    }

    pub fn exists_by_uuid(&self, uuid: Uuid) -> Result<bool> {
        self.group.read().exists_by_uuid(uuid)
    }

    pub fn add(&self, entity: &mut T) -> Result<()> {
        self.group.write().add(entity)
    }

    pub fn update(&self, entity: &T) -> Result<()> {
        self.group.write().update(entity)
    }

    pub fn remove(&self, id: i64) -> Result<()> {
        self.group.write().remove(id)
    }

    pub fn remove_many(&self, ids: &[i64]) -> Result<()> {
        self.group.write().remove_many(ids)
    }

    pub fn change_active_status(&self, ids: &[i64], active: bool) -> Result<()> {
        self.group.write().change_active_status(ids, active)
    }

    pub fn clear(&self) -> Result<()> {
        self.group.write().clear()
    }

    pub fn save(&self, ids: &[i64]) -> Result<SaveData> {
        self.group.read().save(ids)
    }

    pub fn restore(&self, data: &SaveData) -> Result<()> {
        self.group.write().restore(data)
    }

    pub fn get_entities_in_relation_of(
        &self,
        left_schema: &EntitySchema,
        left_id: i64,
        field_name: &str,
    ) -> Result<Vec<T>> {
        self.group
            .read()
            .get_entities_in_relation_of(left_schema, left_id, field_name)
    }

    pub fn get_entity_in_relation_of(
        &self,
        left_schema: &EntitySchema,
        left_id: i64,
        field_name: &str,
    ) -> Result<Option<T>> {
        self.group
            .read()
            .get_entity_in_relation_of(left_schema, left_id, field_name)
    }

    pub fn update_entities_in_relation_of(
        &self,
        left_schema: &EntitySchema,
        left_id: i64,
        field_name: &str,
        desired: &[T],
    ) -> Result<Vec<T>> {
        self.group
            .write()
            .update_entities_in_relation_of(left_schema, left_id, field_name, desired)
    }

    pub fn update_entity_in_relation_of(
        &self,
        left_schema: &EntitySchema,
        left_id: i64,
        field_name: &str,
        entity: &T,
    ) -> Result<()> {
        self.group
            .write()
            .update_entity_in_relation_of(left_schema, left_id, field_name, entity)
    }

    pub fn remove_associations_with(&self, ids: &[i64]) -> Result<()> {
        self.group.write().remove_associations_with(ids)
    }

    /// Begin a batch of edits; holds no lock between the bracket calls
    pub fn begin_changes(&self) -> Result<()> {
        self.group.write().begin_transaction()
    }

    /// Commit the current batch of edits
    pub fn save_changes(&self) -> Result<()> {
        self.group.write().commit()
    }

    /// Discard the current batch of edits
    pub fn cancel_changes(&self) -> Result<()> {
        self.group.write().rollback()
    }
}
