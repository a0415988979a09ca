//! Relationship associators
//!
//! Each associator owns one junction table and implements one relationship
//! shape. The table mapper instantiates them from the backward relationship
//! entries of its entity's schema and routes relation operations through
//! [`AnyAssociator`], a closed dispatch over `(relation type, cardinality)`.
//!
//! | Shape                    | Junction constraint        | Variant |
//! |--------------------------|----------------------------|---------|
//! | one-to-one               | `UNIQUE (left_id)`         | [`OneToOneAssociator`] |
//! | one-to-many, unordered   | `UNIQUE (right_id)`        | [`OneToManyUnorderedAssociator`] |
//! | one-to-many, ordered     | `UNIQUE (right_id)` + list | [`OneToManyOrderedAssociator`] |
//! | many-to-many             | `UNIQUE (left_id, right_id)` | [`ManyToManyUnorderedAssociator`] |
//!
//! Any other combination is rejected with
//! [`PersistenceError::NotImplemented`].

mod many_to_many;
mod one_to_many_unordered;
mod one_to_one;
mod ordered;
mod shadow;

pub use many_to_many::ManyToManyUnorderedAssociator;
pub use one_to_many_unordered::OneToManyUnorderedAssociator;
pub use one_to_one::OneToOneAssociator;
pub use ordered::OneToManyOrderedAssociator;

use crate::core::accessor::EntityAccessor;
use crate::core::connection::ConnectionProvider;
use crate::core::error::{PersistenceError, Result};
use crate::core::query_builder::SelectBuilder;
use crate::core::schema::{Cardinality, RelationType, RelationshipInfo};
use crate::core::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Fetch the entities for the given ids, preserving the ids' order
///
/// Ids with no matching row are silently skipped, so the result can be
/// shorter than the input. The batch is fetched with one bound `IN` query
/// and reordered in memory.
pub(crate) fn fetch_in_order<T: EntityAccessor>(
    provider: &Arc<dyn ConnectionProvider>,
    ids: &[i64],
) -> Result<Vec<T>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let select = SelectBuilder::new(T::table_name()).where_in("id", ids.iter().copied());
    let rows = provider.query(&select.build(), &select.params())?;

    let mut by_id: HashMap<i64, T> = rows
        .iter()
        .filter_map(|row| {
            let id = row.get("id").and_then(Value::as_long)?;
            Some((id, T::from_row(row)))
        })
        .collect();

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

/// One associator of any shape, selected per relationship at table group
/// construction time
pub enum AnyAssociator<T: EntityAccessor> {
    OneToOne(OneToOneAssociator<T>),
    OneToManyOrdered(OneToManyOrderedAssociator<T>),
    OneToManyUnordered(OneToManyUnorderedAssociator<T>),
    ManyToMany(ManyToManyUnorderedAssociator<T>),
}

impl<T: EntityAccessor> AnyAssociator<T> {
    /// Select the associator variant for a relationship's shape
    ///
    /// The dispatch is a pure function of `(relation type, cardinality)`;
    /// unsupported combinations fail here, before any DDL is emitted.
    pub fn for_relationship(
        provider: Arc<dyn ConnectionProvider>,
        relationship: &RelationshipInfo,
    ) -> Result<Self> {
        match (relationship.relation_type, relationship.cardinality) {
            (RelationType::OneToOne, Cardinality::One) => Ok(AnyAssociator::OneToOne(
                OneToOneAssociator::new(provider, relationship.clone()),
            )),
            (RelationType::OneToMany, Cardinality::ManyOrdered) => {
                Ok(AnyAssociator::OneToManyOrdered(
                    OneToManyOrderedAssociator::new(provider, relationship.clone()),
                ))
            }
            (RelationType::OneToMany, Cardinality::ManyUnordered) => {
                Ok(AnyAssociator::OneToManyUnordered(
                    OneToManyUnorderedAssociator::new(provider, relationship.clone()),
                ))
            }
            (RelationType::ManyToMany, _) => Ok(AnyAssociator::ManyToMany(
                ManyToManyUnorderedAssociator::new(provider, relationship.clone()),
            )),
            (relation_type, cardinality) => Err(PersistenceError::not_implemented(
                &relationship.field_name,
                relation_type.as_str(),
                cardinality.as_str(),
            )),
        }
    }

    pub fn relationship(&self) -> &RelationshipInfo {
        match self {
            AnyAssociator::OneToOne(a) => a.relationship(),
            AnyAssociator::OneToManyOrdered(a) => a.relationship(),
            AnyAssociator::OneToManyUnordered(a) => a.relationship(),
            AnyAssociator::ManyToMany(a) => a.relationship(),
        }
    }

    pub fn junction_table(&self) -> &str {
        match self {
            AnyAssociator::OneToOne(a) => a.junction_table(),
            AnyAssociator::OneToManyOrdered(a) => a.junction_table(),
            AnyAssociator::OneToManyUnordered(a) => a.junction_table(),
            AnyAssociator::ManyToMany(a) => a.junction_table(),
        }
    }

    pub fn creation_sql(&self) -> String {
        match self {
            AnyAssociator::OneToOne(a) => a.creation_sql(),
            AnyAssociator::OneToManyOrdered(a) => a.creation_sql(),
            AnyAssociator::OneToManyUnordered(a) => a.creation_sql(),
            AnyAssociator::ManyToMany(a) => a.creation_sql(),
        }
    }

    /// The right entities linked to `left_id`; plural shapes only
    pub fn get_right_entities(&self, left_id: i64) -> Result<Vec<T>> {
        match self {
            AnyAssociator::OneToManyOrdered(a) => a.get_right_entities(left_id),
            AnyAssociator::OneToManyUnordered(a) => a.get_right_entities(left_id),
            AnyAssociator::ManyToMany(a) => a.get_right_entities(left_id),
            AnyAssociator::OneToOne(_) => Err(self.wrong_arity()),
        }
    }

    /// Replace the linked right entities for `left_id`; plural shapes only
    pub fn update_right_entities(&self, left_id: i64, desired: &[T]) -> Result<Vec<T>> {
        match self {
            AnyAssociator::OneToManyOrdered(a) => a.update_right_entities(left_id, desired),
            AnyAssociator::OneToManyUnordered(a) => a.update_right_entities(left_id, desired),
            AnyAssociator::ManyToMany(a) => a.update_right_entities(left_id, desired),
            AnyAssociator::OneToOne(_) => Err(self.wrong_arity()),
        }
    }

    /// The single right entity linked to `left_id`; one-to-one only
    pub fn get_right_entity(&self, left_id: i64) -> Result<Option<T>> {
        match self {
            AnyAssociator::OneToOne(a) => a.get_right_entity(left_id),
            _ => Err(self.wrong_arity()),
        }
    }

    /// Replace the single linked right entity; one-to-one only
    pub fn update_right_entity(&self, left_id: i64, entity: &T) -> Result<()> {
        match self {
            AnyAssociator::OneToOne(a) => a.update_right_entity(left_id, entity),
            _ => Err(self.wrong_arity()),
        }
    }

    fn wrong_arity(&self) -> PersistenceError {
        let relationship = self.relationship();
        PersistenceError::not_implemented(
            &relationship.field_name,
            relationship.relation_type.as_str(),
            relationship.cardinality.as_str(),
        )
    }
}
