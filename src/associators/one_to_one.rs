//! One-to-one associator
//!
//! Owns the junction table for a one-to-one relationship: at most one
//! junction row per left entity (`UNIQUE (left_id)`). Clearing the relation
//! is expressed by updating with an entity whose id is 0.

use crate::core::accessor::EntityAccessor;
use crate::core::connection::ConnectionProvider;
use crate::core::error::{PersistenceError, Result};
use crate::core::query_builder::{CreateTableBuilder, DeleteBuilder, InsertBuilder, SelectBuilder};
use crate::core::schema::{ColumnType, RelationshipInfo, to_snake_case};
use crate::core::value::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use super::fetch_in_order;

pub struct OneToOneAssociator<T: EntityAccessor> {
    provider: Arc<dyn ConnectionProvider>,
    relationship: RelationshipInfo,
    junction_table: String,
    _marker: PhantomData<T>,
}

impl<T: EntityAccessor> OneToOneAssociator<T> {
    pub fn new(provider: Arc<dyn ConnectionProvider>, relationship: RelationshipInfo) -> Self {
        assert_eq!(
            relationship.right_entity_name,
            T::schema().name,
            "relationship `{}` does not target entity `{}`",
            relationship.field_name,
            T::schema().name
        );
        let junction_table = relationship.junction_table_name();
        Self {
            provider,
            relationship,
            junction_table,
            _marker: PhantomData,
        }
    }

    pub fn relationship(&self) -> &RelationshipInfo {
        &self.relationship
    }

    pub fn junction_table(&self) -> &str {
        &self.junction_table
    }

    /// Junction DDL; deletes cascade from either entity table
    pub fn creation_sql(&self) -> String {
        CreateTableBuilder::new(&self.junction_table)
            .id_primary_key()
            .not_null_column("left_id", ColumnType::Integer)
            .not_null_column("right_id", ColumnType::Integer)
            .unique(&["left_id"])
            .foreign_key(
                "left_id",
                &to_snake_case(&self.relationship.left_entity_name),
                "id",
                true,
            )
            .foreign_key("right_id", &T::table_name(), "id", true)
            .build()
    }

    /// The right entity currently linked to `left_id`, if any
    pub fn get_right_entity(&self, left_id: i64) -> Result<Option<T>> {
        let select = SelectBuilder::new(&self.junction_table)
            .columns(&["right_id"])
            .where_eq("left_id", left_id);
        let rows = self.provider.query(&select.build(), &select.params())?;

        let right_id = match rows.first().and_then(|r| r.get("right_id")) {
            Some(value) => value.as_long().ok_or_else(|| {
                PersistenceError::sql(
                    select.build(),
                    format!("`right_id` holds non-integer value {:?}", value),
                )
            })?,
            None => return Ok(None),
        };

        let entities: Vec<T> = fetch_in_order(&self.provider, &[right_id])?;
        entities
            .into_iter()
            .next()
            .map(Some)
            .ok_or_else(|| PersistenceError::row_missing(T::table_name(), right_id))
    }

    /// Replace the relation for `left_id`; an entity with id 0 clears it
    pub fn update_right_entity(&self, left_id: i64, entity: &T) -> Result<()> {
        if entity.id() == 0 {
            let delete = DeleteBuilder::new(&self.junction_table).where_eq("left_id", left_id);
            self.provider.execute(&delete.build(), &delete.params())?;
            return Ok(());
        }

        let select = SelectBuilder::new(&self.junction_table)
            .columns(&["right_id"])
            .where_eq("left_id", left_id);
        let rows = self.provider.query(&select.build(), &select.params())?;
        let current = rows
            .first()
            .and_then(|r| r.get("right_id"))
            .and_then(Value::as_long);

        if current == Some(entity.id()) {
            return Ok(());
        }

        if current.is_some() {
            let delete = DeleteBuilder::new(&self.junction_table).where_eq("left_id", left_id);
            let affected = self.provider.execute(&delete.build(), &delete.params())?;
            if affected != 1 {
                return Err(PersistenceError::delete_failed(
                    &self.junction_table,
                    1,
                    affected,
                ));
            }
        }

        let insert = InsertBuilder::new(&self.junction_table)
            .value("left_id", left_id)
            .value("right_id", entity.id());
        let affected = self.provider.execute(&insert.build(), &insert.params())?;
        if affected != 1 {
            return Err(PersistenceError::insert_failed(
                &self.junction_table,
                1,
                affected,
            ));
        }
        Ok(())
    }
}
