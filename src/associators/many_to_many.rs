//! Many-to-many unordered associator
//!
//! Owns the junction table for a many-to-many relationship: any number of
//! links per side, with `UNIQUE (left_id, right_id)` rejecting duplicate
//! pairs. Updates apply the symmetric difference between the current and
//! desired membership of one left group.

use crate::core::accessor::EntityAccessor;
use crate::core::connection::ConnectionProvider;
use crate::core::error::{PersistenceError, Result};
use crate::core::query_builder::{CreateTableBuilder, DeleteBuilder, InsertBuilder, SelectBuilder};
use crate::core::schema::{ColumnType, RelationshipInfo, to_snake_case};
use crate::core::value::Value;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use super::fetch_in_order;

pub struct ManyToManyUnorderedAssociator<T: EntityAccessor> {
    provider: Arc<dyn ConnectionProvider>,
    relationship: RelationshipInfo,
    junction_table: String,
    _marker: PhantomData<T>,
}

impl<T: EntityAccessor> ManyToManyUnorderedAssociator<T> {
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
            .unique(&["left_id", "right_id"])
            .foreign_key(
                "left_id",
                &to_snake_case(&self.relationship.left_entity_name),
                "id",
                true,
            )
            .foreign_key("right_id", &T::table_name(), "id", true)
            .build()
    }

    fn linked_ids(&self, left_id: i64) -> Result<Vec<i64>> {
        let select = SelectBuilder::new(&self.junction_table)
            .columns(&["right_id"])
            .where_eq("left_id", left_id);
        let rows = self.provider.query(&select.build(), &select.params())?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get("right_id").and_then(Value::as_long))
            .collect())
    }

    /// All right entities linked to `left_id`, in no particular order
    pub fn get_right_entities(&self, left_id: i64) -> Result<Vec<T>> {
        let ids = self.linked_ids(left_id)?;
        fetch_in_order(&self.provider, &ids)
    }

    /// Replace the membership for `left_id` with `desired`
    pub fn update_right_entities(&self, left_id: i64, desired: &[T]) -> Result<Vec<T>> {
        let desired_ids: HashSet<i64> = desired.iter().map(|e| e.id()).collect();
        let current_ids: HashSet<i64> = self.linked_ids(left_id)?.into_iter().collect();

        let to_remove: Vec<i64> = current_ids.difference(&desired_ids).copied().collect();
        let to_add: Vec<i64> = desired_ids.difference(&current_ids).copied().collect();

        if !to_remove.is_empty() {
            let delete = DeleteBuilder::new(&self.junction_table)
                .where_eq("left_id", left_id)
                .where_in("right_id", to_remove.iter().copied());
            let affected = self.provider.execute(&delete.build(), &delete.params())?;
            if affected != to_remove.len() {
                return Err(PersistenceError::delete_failed(
                    &self.junction_table,
                    to_remove.len(),
                    affected,
                ));
            }
        }

        for right_id in to_add {
            let insert = InsertBuilder::new(&self.junction_table)
                .value("left_id", left_id)
                .value("right_id", right_id);
            let affected = self.provider.execute(&insert.build(), &insert.params())?;
            if affected != 1 {
                return Err(PersistenceError::insert_failed(
                    &self.junction_table,
                    1,
                    affected,
                ));
            }
        }

        self.get_right_entities(left_id)
    }
}
