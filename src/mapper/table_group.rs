//! Generic table mapper
//!
//! A [`DatabaseTableGroup`] maps one entity type onto its own table plus the
//! junction tables of every relationship declared on its schema's backward
//! side. Construction appends all DDL to the shared connection provider;
//! the provider executes the accumulated statements when the store is
//! initialized.
//!
//! Relation operations are addressed from the owning (left) side: the
//! caller passes the left entity's schema, its id, and the relationship's
//! field name. The group resolves the forward entry in the left schema,
//! then routes to the associator it owns for that relationship.

use crate::associators::{fetch_in_order, AnyAssociator};
use crate::core::accessor::EntityAccessor;
use crate::core::connection::ConnectionProvider;
use crate::core::error::{PersistenceError, Result};
use crate::core::query_builder::{
    CreateTableBuilder, DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder,
};
use crate::core::schema::{Direction, EntitySchema, RelationshipInfo};
use crate::core::value::{Row, Value};
use crate::mapper::snapshot::SaveData;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

/// Table mapper for one entity type
pub struct DatabaseTableGroup<T: EntityAccessor> {
    provider: Arc<dyn ConnectionProvider>,
    table: String,
    associators: Vec<AnyAssociator<T>>,
}

impl<T: EntityAccessor> DatabaseTableGroup<T> {
    /// Create the table group and append its DDL to the provider
    ///
    /// Emits the entity's own table first, then one junction table per
    /// backward relationship, in schema declaration order. Fails if any
    /// relationship has a shape the dispatch does not recognize.
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Result<Self> {
        let schema = T::schema();
        let table = schema.table_name();

        let mut builder = CreateTableBuilder::new(&table).id_primary_key();
        for field in schema.own_fields() {
            builder = builder.column(&field.column_name(), field.column_type);
        }
        provider.append_creation_sql("entity table", &builder.build());

        let mut associators = Vec::new();
        for relationship in schema.relationships_with_direction(Direction::Backward) {
            let associator = AnyAssociator::for_relationship(provider.clone(), relationship)?;
            provider.append_creation_sql("junction table", &associator.creation_sql());
            associators.push(associator);
        }

        debug!(
            "table group `{}` registered ({} junction tables)",
            table,
            associators.len()
        );

        Ok(Self {
            provider,
            table,
            associators,
        })
    }

    /// Derived table name of the mapped entity
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Fetch one entity by primary key; fails with
    /// [`PersistenceError::RowMissing`] when no row matches
    pub fn get(&self, id: i64) -> Result<T> {
        let select = SelectBuilder::new(&self.table).where_eq("id", id);
        let rows = self.provider.query(&select.build(), &select.params())?;
        rows.first()
            .map(T::from_row)
            .ok_or_else(|| PersistenceError::row_missing(&self.table, id))
    }

    /// Fetch one entity by its `uuid` column; fails with
    /// [`PersistenceError::RowMissing`] when no row matches
    pub fn get_by_uuid(&self, uuid: Uuid) -> Result<T> {
        let select = SelectBuilder::new(&self.table).where_eq("uuid", uuid);
        let rows = self.provider.query(&select.build(), &select.params())?;
        rows.first()
            .map(T::from_row)
            .ok_or_else(|| PersistenceError::row_missing(&self.table, uuid))
    }

    /// Fetch a batch of entities by primary key, preserving the requested
    /// order
    ///
    /// Ids with no matching row are silently omitted; use
    /// [`get_many_reporting`](Self::get_many_reporting) when the caller
    /// must know which ids were absent.
    pub fn get_many(&self, ids: &[i64]) -> Result<Vec<T>> {
        fetch_in_order(&self.provider, ids)
    }

    /// Fetch a batch of entities by primary key, reporting the ids that had
    /// no matching row alongside the found entities
    pub fn get_many_reporting(&self, ids: &[i64]) -> Result<(Vec<T>, Vec<i64>)> {
        let entities = fetch_in_order::<T>(&self.provider, ids)?;
        let found: std::collections::HashSet<i64> =
            entities.iter().map(EntityAccessor::id).collect();
        let missing: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect();
        Ok((entities, missing))
    }

    /// Fetch every entity in the table
    pub fn get_all(&self) -> Result<Vec<T>> {
        let select = SelectBuilder::new(&self.table);
        let rows = self.provider.query(&select.build(), &select.params())?;
        Ok(rows.iter().map(T::from_row).collect())
    }

    /// Fetch every entity matching all equality filters; an empty filter
    /// list imposes no predicate
    pub fn get_all_filtered(&self, filters: &[(&str, Value)]) -> Result<Vec<T>> {
        let mut select = SelectBuilder::new(&self.table);
        for (column, value) in filters {
            select = select.where_eq(column, value.clone());
        }
        let rows = self.provider.query(&select.build(), &select.params())?;
        Ok(rows.iter().map(T::from_row).collect())
    }

    /// Insert an entity and assign its primary key
    ///
    /// An entity with id 0 receives a fresh key from the store; a nonzero
    /// id is inserted explicitly, which restores from external data.
    pub fn add(&self, entity: &mut T) -> Result<()> {
        let mut insert = InsertBuilder::new(&self.table);
        if entity.id() != 0 {
            insert = insert.value("id", entity.id());
        }
        for (column, value) in entity.to_row() {
            insert = insert.value(&column, value);
        }

        let affected = self.provider.execute(&insert.build(), &insert.params())?;
        if affected != 1 {
            return Err(PersistenceError::insert_failed(&self.table, 1, affected));
        }
        if entity.id() == 0 {
            entity.set_id(self.provider.last_insert_id()?);
        }
        Ok(())
    }

    /// Write all own columns of a persisted entity back to its row
    pub fn update(&self, entity: &T) -> Result<()> {
        let mut update = UpdateBuilder::new(&self.table);
        for (column, value) in entity.to_row() {
            update = update.set(&column, value);
        }
        let update = update.where_eq("id", entity.id());

        let affected = self.provider.execute(&update.build(), &update.params())?;
        if affected != 1 {
            return Err(PersistenceError::update_failed(&self.table, 1, affected));
        }
        Ok(())
    }

    /// Delete one entity row; junction rows referencing it cascade
    ///
    /// Ordered associations must be spliced first
    /// ([`remove_associations_with`](Self::remove_associations_with)), the
    /// cascade alone would leave neighbor pointers dangling.
    pub fn remove(&self, id: i64) -> Result<()> {
        let delete = DeleteBuilder::new(&self.table).where_eq("id", id);
        let affected = self.provider.execute(&delete.build(), &delete.params())?;
        if affected != 1 {
            return Err(PersistenceError::delete_failed(&self.table, 1, affected));
        }
        Ok(())
    }

    /// Delete a batch of entity rows, failing unless every id matched
    pub fn remove_many(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let delete = DeleteBuilder::new(&self.table).where_in("id", ids.iter().copied());
        let affected = self.provider.execute(&delete.build(), &delete.params())?;
        if affected != ids.len() {
            return Err(PersistenceError::delete_failed(
                &self.table,
                ids.len(),
                affected,
            ));
        }
        Ok(())
    }

    /// Whether a row with this primary key exists
    pub fn exists(&self, id: i64) -> Result<bool> {
        let select = SelectBuilder::new(&self.table)
            .columns(&["id"])
            .where_eq("id", id);
        let rows = self.provider.query(&select.build(), &select.params())?;
        Ok(!rows.is_empty())
    }

    /// Whether a row with this `uuid` column exists
    pub fn exists_by_uuid(&self, uuid: Uuid) -> Result<bool> {
        let select = SelectBuilder::new(&self.table)
            .columns(&["id"])
            .where_eq("uuid", uuid);
        let rows = self.provider.query(&select.build(), &select.params())?;
        Ok(!rows.is_empty())
    }

    /// Flip the `is_active` column of a batch of entities, failing unless
    /// every id matched
    pub fn change_active_status(&self, ids: &[i64], active: bool) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let update = UpdateBuilder::new(&self.table)
            .set("is_active", active)
            .where_in("id", ids.iter().copied());
        let affected = self.provider.execute(&update.build(), &update.params())?;
        if affected != ids.len() {
            return Err(PersistenceError::update_failed(
                &self.table,
                ids.len(),
                affected,
            ));
        }
        Ok(())
    }

    /// Delete every row of the entity table; junction rows cascade
    pub fn clear(&self) -> Result<()> {
        let delete = DeleteBuilder::new(&self.table);
        self.provider.execute(&delete.build(), &delete.params())?;
        Ok(())
    }

    /// Snapshot the given entities plus their junction rows
    ///
    /// Captures the entity rows and, for every junction table this group
    /// owns, the rows linking the given entities; an empty id list
    /// snapshots the entire table group. The returned [`SaveData`] is
    /// detached; hand it to [`restore`](Self::restore) to reinstate the
    /// captured state.
    pub fn save(&self, ids: &[i64]) -> Result<SaveData> {
        let mut data = SaveData::new();

        let mut select = SelectBuilder::new(&self.table);
        if !ids.is_empty() {
            select = select.where_in("id", ids.iter().copied());
        }
        let rows = self.provider.query(&select.build(), &select.params())?;
        data.add_rows(&self.table, rows);

        for associator in &self.associators {
            let mut select = SelectBuilder::new(associator.junction_table());
            if !ids.is_empty() {
                select = select.where_in("right_id", ids.iter().copied());
            }
            let rows = self.provider.query(&select.build(), &select.params())?;
            data.add_rows(associator.junction_table(), rows);
        }

        debug!(
            "`{}`: snapshot of {} ids captured {} rows",
            self.table,
            ids.len(),
            data.row_count()
        );
        Ok(data)
    }

    /// Reinstate a snapshot: each captured row is written back under its
    /// captured primary key, updating the live row or re-inserting it
    ///
    /// The entity table is restored before the captured junction tables;
    /// their foreign keys require the entity rows to exist first.
    pub fn restore(&self, data: &SaveData) -> Result<()> {
        for row in data.rows(&self.table) {
            self.upsert_row(&self.table, row)?;
        }
        for (table, rows) in data.tables() {
            if table == self.table {
                continue;
            }
            for row in rows {
                self.upsert_row(table, row)?;
            }
        }
        Ok(())
    }

    fn upsert_row(&self, table: &str, row: &Row) -> Result<()> {
        let id = row
            .get("id")
            .and_then(Value::as_long)
            .ok_or_else(|| PersistenceError::snapshot(format!("row of `{}` has no id", table)))?;

        let mut update = UpdateBuilder::new(table);
        for (column, value) in row {
            if column != "id" {
                update = update.set(column, value.clone());
            }
        }
        let update = update.where_eq("id", id);
        let affected = self.provider.execute(&update.build(), &update.params())?;
        if affected == 1 {
            return Ok(());
        }

        let mut insert = InsertBuilder::new(table);
        for (column, value) in row {
            insert = insert.value(column, value.clone());
        }
        let affected = self.provider.execute(&insert.build(), &insert.params())?;
        if affected != 1 {
            return Err(PersistenceError::insert_failed(table, 1, affected));
        }
        Ok(())
    }

    /// Begin a transaction on the shared connection
    pub fn begin_transaction(&self) -> Result<()> {
        self.provider.begin_transaction()
    }

    /// Commit the current transaction
    pub fn commit(&self) -> Result<()> {
        self.provider.commit()
    }

    /// Roll back the current transaction
    pub fn rollback(&self) -> Result<()> {
        self.provider.rollback()
    }

    /// Resolve a relation operation: look up the forward entry in the left
    /// schema, then the associator this group owns for it
    fn associator_for(
        &self,
        left_schema: &EntitySchema,
        field_name: &str,
    ) -> Result<&AnyAssociator<T>> {
        let relationship = self
            .resolve_forward(left_schema, field_name)
            .ok_or_else(|| {
                PersistenceError::not_implemented(field_name, "unknown", "unknown")
            })?;
        self.associators
            .iter()
            .find(|a| {
                let owned = a.relationship();
                owned.left_entity_name == relationship.left_entity_name
                    && owned.field_name == relationship.field_name
            })
            .ok_or_else(|| {
                PersistenceError::not_implemented(
                    field_name,
                    relationship.relation_type.as_str(),
                    relationship.cardinality.as_str(),
                )
            })
    }

    fn resolve_forward<'a>(
        &self,
        left_schema: &'a EntitySchema,
        field_name: &str,
    ) -> Option<&'a RelationshipInfo> {
        left_schema.forward_relationship(field_name, &T::schema().name)
    }

    /// The entities linked to `left_id` via the named plural relationship,
    /// in list order for ordered relationships
    pub fn get_entities_in_relation_of(
        &self,
        left_schema: &EntitySchema,
        left_id: i64,
        field_name: &str,
    ) -> Result<Vec<T>> {
        self.associator_for(left_schema, field_name)?
            .get_right_entities(left_id)
    }

    /// The single entity linked to `left_id` via the named one-to-one
    /// relationship
    pub fn get_entity_in_relation_of(
        &self,
        left_schema: &EntitySchema,
        left_id: i64,
        field_name: &str,
    ) -> Result<Option<T>> {
        self.associator_for(left_schema, field_name)?
            .get_right_entity(left_id)
    }

    /// Replace the linked entities of a plural relationship; returns the
    /// list re-read from the store
    pub fn update_entities_in_relation_of(
        &self,
        left_schema: &EntitySchema,
        left_id: i64,
        field_name: &str,
        desired: &[T],
    ) -> Result<Vec<T>> {
        self.associator_for(left_schema, field_name)?
            .update_right_entities(left_id, desired)
    }

    /// Replace the linked entity of a one-to-one relationship; an entity
    /// with id 0 clears it
    pub fn update_entity_in_relation_of(
        &self,
        left_schema: &EntitySchema,
        left_id: i64,
        field_name: &str,
        entity: &T,
    ) -> Result<()> {
        self.associator_for(left_schema, field_name)?
            .update_right_entity(left_id, entity)
    }

    /// Splice the given entities out of every ordered association before
    /// their rows are deleted
    ///
    /// Must run before [`remove`](Self::remove)/[`remove_many`](Self::remove_many)
    /// when the entity participates in an ordered relationship; unordered
    /// junction rows need no repair and are handled by the cascade.
    pub fn remove_associations_with(&self, ids: &[i64]) -> Result<()> {
        for associator in &self.associators {
            if let AnyAssociator::OneToManyOrdered(ordered) = associator {
                ordered.remove_these_right_ids(ids)?;
            }
        }
        Ok(())
    }
}
