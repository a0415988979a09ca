//! One-to-many ordered associator
//!
//! The only relationship kind whose position matters. The junction table
//! stores a doubly-linked list per left entity: `previous_id`/`next_id`
//! hold the neighboring junction row's right entity id, the head row has
//! `previous_id IS NULL` and the tail `next_id IS NULL`. Following the
//! pointers from any row of one left group visits every row of that group
//! exactly once.
//!
//! Wholesale replacement goes through shadow reconciliation
//! ([`merge_shadows`](super::shadow::merge_shadows)) so that unchanged
//! entries are never deleted and re-inserted, and removal of right entities
//! from the outside goes through a run-based splice that repairs the
//! neighbors around each removed stretch.

use crate::core::accessor::EntityAccessor;
use crate::core::connection::ConnectionProvider;
use crate::core::error::{PersistenceError, Result};
use crate::core::query_builder::{CreateTableBuilder, DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
use crate::core::schema::{ColumnType, RelationshipInfo, to_snake_case};
use crate::core::value::{Row, Value};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use super::fetch_in_order;
use super::shadow::{merge_shadows, EntityShadow};

pub struct OneToManyOrderedAssociator<T: EntityAccessor> {
    provider: Arc<dyn ConnectionProvider>,
    relationship: RelationshipInfo,
    junction_table: String,
    _marker: PhantomData<T>,
}

/// One junction row as loaded for splice removal
#[derive(Debug, Clone)]
struct JunctionRow {
    id: i64,
    right_id: i64,
    previous_id: Option<i64>,
    next_id: Option<i64>,
}

impl JunctionRow {
    fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            id: row.get("id")?.as_long()?,
            right_id: row.get("right_id")?.as_long()?,
            previous_id: row.get("previous_id").and_then(Value::as_long),
            next_id: row.get("next_id").and_then(Value::as_long),
        })
    }
}

impl<T: EntityAccessor> OneToManyOrderedAssociator<T> {
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

    /// Junction DDL. `previous_id`/`next_id` reference another junction
    /// row's right entity id; they are repaired by the splice path, so they
    /// carry no FK clause of their own. Callers removing right entities
    /// must splice them out first (`remove_these_right_ids`), otherwise the
    /// cascading delete leaves the neighbors' pointers dangling.
    pub fn creation_sql(&self) -> String {
        CreateTableBuilder::new(&self.junction_table)
            .id_primary_key()
            .not_null_column("left_id", ColumnType::Integer)
            .not_null_column("right_id", ColumnType::Integer)
            .column("previous_id", ColumnType::Integer)
            .column("next_id", ColumnType::Integer)
            .unique(&["right_id"])
            .foreign_key(
                "left_id",
                &to_snake_case(&self.relationship.left_entity_name),
                "id",
                true,
            )
            .foreign_key("right_id", &T::table_name(), "id", true)
            .build()
    }

    /// Ordered right entity ids for one left group, walking the linked
    /// list head-to-tail in a single recursive query
    fn ordered_ids(&self, left_id: i64) -> Result<Vec<i64>> {
        let sql = format!(
            "WITH RECURSIVE chain(right_id, next_id, depth) AS (\
             SELECT right_id, next_id, 0 FROM {table} \
             WHERE left_id = ?1 AND previous_id IS NULL \
             UNION ALL \
             SELECT j.right_id, j.next_id, chain.depth + 1 FROM {table} j \
             JOIN chain ON j.right_id = chain.next_id WHERE j.left_id = ?1) \
             SELECT right_id FROM chain ORDER BY depth",
            table = self.junction_table
        );
        let rows = self.provider.query(&sql, &[Value::Long(left_id)])?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get("right_id").and_then(Value::as_long))
            .collect())
    }

    /// The ordered list of right entities linked to `left_id`
    ///
    /// The entity fetch preserves the traversal order regardless of how the
    /// storage engine returns the batch.
    pub fn get_right_entities(&self, left_id: i64) -> Result<Vec<T>> {
        let ids = self.ordered_ids(left_id)?;
        fetch_in_order(&self.provider, &ids)
    }

    /// Replace the entire ordered association for `left_id` with `desired`,
    /// issuing the minimum number of row mutations
    ///
    /// Returns the list re-read from the store, not assumed from the
    /// shadows.
    pub fn update_right_entities(&self, left_id: i64, desired: &[T]) -> Result<Vec<T>> {
        let desired_ids: Vec<i64> = desired.iter().map(|e| e.id()).collect();
        let originals = self.load_shadows(left_id)?;
        let merged = merge_shadows(originals, &desired_ids);
        self.execute_shadows(left_id, &merged)?;
        self.get_right_entities(left_id)
    }

    fn load_shadows(&self, left_id: i64) -> Result<Vec<EntityShadow>> {
        let select = SelectBuilder::new(&self.junction_table)
            .columns(&["id", "right_id", "previous_id", "next_id"])
            .where_eq("left_id", left_id);
        let rows = self.provider.query(&select.build(), &select.params())?;
        Ok(rows
            .iter()
            .filter_map(JunctionRow::from_row)
            .map(|row| EntityShadow::persisted(row.id, row.right_id, row.previous_id, row.next_id))
            .collect())
    }

    fn execute_shadows(&self, left_id: i64, shadows: &[EntityShadow]) -> Result<()> {
        let remove_ids: Vec<i64> = shadows
            .iter()
            .filter(|s| s.remove)
            .filter_map(|s| s.junction_id)
            .collect();
        let creates: Vec<&EntityShadow> = shadows.iter().filter(|s| s.create).collect();
        let updates: Vec<&EntityShadow> = shadows
            .iter()
            .filter(|s| s.common && s.update_links)
            .collect();

        debug!(
            "{}: reconciling left {} ({} delete, {} insert, {} pointer update)",
            self.junction_table,
            left_id,
            remove_ids.len(),
            creates.len(),
            updates.len()
        );

        if !remove_ids.is_empty() {
            let delete =
                DeleteBuilder::new(&self.junction_table).where_in("id", remove_ids.iter().copied());
            let affected = self.provider.execute(&delete.build(), &delete.params())?;
            if affected != remove_ids.len() {
                return Err(PersistenceError::delete_failed(
                    &self.junction_table,
                    remove_ids.len(),
                    affected,
                ));
            }
        }

        for shadow in creates {
            let insert = InsertBuilder::new(&self.junction_table)
                .value("left_id", left_id)
                .value("right_id", shadow.entity_id)
                .value("previous_id", shadow.new_previous)
                .value("next_id", shadow.new_next);
            let affected = self.provider.execute(&insert.build(), &insert.params())?;
            if affected != 1 {
                return Err(PersistenceError::insert_failed(
                    &self.junction_table,
                    1,
                    affected,
                ));
            }
        }

        for shadow in updates {
            // Common shadows always carry their persisted junction id.
            let junction_id = match shadow.junction_id {
                Some(id) => id,
                None => continue,
            };
            let update = UpdateBuilder::new(&self.junction_table)
                .set("previous_id", shadow.new_previous)
                .set("next_id", shadow.new_next)
                .where_eq("id", junction_id);
            let affected = self.provider.execute(&update.build(), &update.params())?;
            if affected != 1 {
                return Err(PersistenceError::update_failed(
                    &self.junction_table,
                    1,
                    affected,
                ));
            }
        }

        Ok(())
    }

    /// Splice the given right entities out of every ordered list that
    /// references them, repairing the neighbor pointers around each removed
    /// stretch
    ///
    /// Adjacent removals are grouped into runs so that deleting several
    /// consecutive list members costs one delete plus at most two pointer
    /// patches per run. Any failure while splicing is fatal
    /// ([`PersistenceError::AssociationRemovalFailed`]): a partial splice
    /// corrupts list integrity, so this path is expected to run inside the
    /// caller's transaction.
    pub fn remove_these_right_ids(&self, right_ids: &[i64]) -> Result<()> {
        if right_ids.is_empty() {
            return Ok(());
        }

        let select = SelectBuilder::new(&self.junction_table)
            .columns(&["id", "left_id", "right_id", "previous_id", "next_id"])
            .where_in("right_id", right_ids.iter().copied());
        let rows = self.provider.query(&select.build(), &select.params())?;

        let mut groups: HashMap<i64, Vec<JunctionRow>> = HashMap::new();
        for row in &rows {
            let left_id = match row.get("left_id").and_then(Value::as_long) {
                Some(id) => id,
                None => continue,
            };
            if let Some(junction) = JunctionRow::from_row(row) {
                groups.entry(left_id).or_default().push(junction);
            }
        }

        for (left_id, members) in groups {
            for run in group_into_runs(members) {
                self.splice_run(left_id, &run)?;
            }
        }

        Ok(())
    }

    fn splice_run(&self, left_id: i64, run: &[JunctionRow]) -> Result<()> {
        let leading = run.first().and_then(|r| r.previous_id);
        let trailing = run.last().and_then(|r| r.next_id);

        debug!(
            "{}: splicing {} row(s) out of left {} (lead {:?}, trail {:?})",
            self.junction_table,
            run.len(),
            left_id,
            leading,
            trailing
        );

        let delete = DeleteBuilder::new(&self.junction_table)
            .where_in("id", run.iter().map(|r| r.id));
        let affected = self
            .provider
            .execute(&delete.build(), &delete.params())
            .map_err(|e| PersistenceError::association_removal(&self.junction_table, e.to_string()))?;
        if affected != run.len() {
            return Err(PersistenceError::association_removal(
                &self.junction_table,
                format!("deleted {} of {} run rows", affected, run.len()),
            ));
        }

        // Patch the neighbor on each side of the run; a NULL boundary
        // needs no patch.
        if let Some(lead) = leading {
            let update = UpdateBuilder::new(&self.junction_table)
                .set("next_id", trailing)
                .where_eq("left_id", left_id)
                .where_eq("right_id", lead);
            let affected = self
                .provider
                .execute(&update.build(), &update.params())
                .map_err(|e| {
                    PersistenceError::association_removal(&self.junction_table, e.to_string())
                })?;
            if affected != 1 {
                return Err(PersistenceError::association_removal(
                    &self.junction_table,
                    format!("leading neighbor {} not patched", lead),
                ));
            }
        }
        if let Some(trail) = trailing {
            let update = UpdateBuilder::new(&self.junction_table)
                .set("previous_id", leading)
                .where_eq("left_id", left_id)
                .where_eq("right_id", trail);
            let affected = self
                .provider
                .execute(&update.build(), &update.params())
                .map_err(|e| {
                    PersistenceError::association_removal(&self.junction_table, e.to_string())
                })?;
            if affected != 1 {
                return Err(PersistenceError::association_removal(
                    &self.junction_table,
                    format!("trailing neighbor {} not patched", trail),
                ));
            }
        }

        Ok(())
    }
}

/// Group one left group's to-be-removed junction rows into runs of
/// list-adjacent rows
///
/// Two rows belong to the same run when one's `next_id` names the other's
/// right entity. Each run is returned head-to-tail.
fn group_into_runs(members: Vec<JunctionRow>) -> Vec<Vec<JunctionRow>> {
    let in_set: HashSet<i64> = members.iter().map(|r| r.right_id).collect();
    let mut by_right: HashMap<i64, JunctionRow> =
        members.into_iter().map(|r| (r.right_id, r)).collect();

    // Run heads are rows whose predecessor is not itself being removed.
    let head_ids: Vec<i64> = by_right
        .values()
        .filter(|row| match row.previous_id {
            Some(prev) => !in_set.contains(&prev),
            None => true,
        })
        .map(|row| row.right_id)
        .collect();

    let mut runs = Vec::new();
    for head_id in head_ids {
        let mut run = Vec::new();
        let mut cursor = Some(head_id);
        while let Some(right_id) = cursor {
            match by_right.remove(&right_id) {
                Some(row) => {
                    cursor = row.next_id.filter(|next| in_set.contains(next));
                    run.push(row);
                }
                None => break,
            }
        }
        if !run.is_empty() {
            runs.push(run);
        }
    }
    runs
}
