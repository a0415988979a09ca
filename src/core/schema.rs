//! Static entity and relationship descriptors
//!
//! Schemas are constructed once per entity type (typically by generated
//! code), then shared by reference everywhere. The table mapper consumes a
//! schema at construction time to emit DDL and to select, per relationship,
//! which associator variant to instantiate.
//!
//! Naming is deterministic: PascalCase/camelCase entity and field names are
//! converted to snake_case tables and columns, and each junction table name
//! is derived from `(left entity, field, right entity)`.

/// Scalar column type for a non-relationship field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit integer column
    Integer,
    /// Floating point column
    Real,
    /// Text column
    Text,
    /// Binary column
    Blob,
    /// Boolean column (stored as integer 0/1)
    Boolean,
}

impl ColumnType {
    /// SQL type name for DDL emission
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// Relationship kind between a left and a right entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationType {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::OneToOne => "one-to-one",
            RelationType::OneToMany => "one-to-many",
            RelationType::ManyToMany => "many-to-many",
        }
    }
}

/// Cardinality of the right-hand side of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    ManyOrdered,
    ManyUnordered,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::One => "one",
            Cardinality::ManyOrdered => "many-ordered",
            Cardinality::ManyUnordered => "many-unordered",
        }
    }
}

/// Which side of the relationship this descriptor was declared on
///
/// Every relationship is mirrored into both entity schemas. The left
/// (owning) entity carries the `Forward` entry, used by the dispatch
/// lookup; the right entity carries the `Backward` copy, and the right
/// entity's table group declares the junction DDL and owns the associator.
/// Exactly one side declares the junction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Static description of one relationship between two entity types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// Name of the left (owning) entity
    pub left_entity_name: String,
    /// Logical name of the relationship, unique per left entity
    pub field_name: String,
    /// Name of the right (target) entity
    pub right_entity_name: String,
    pub relation_type: RelationType,
    pub cardinality: Cardinality,
    pub direction: Direction,
}

impl RelationshipInfo {
    pub fn new(
        left_entity_name: impl Into<String>,
        field_name: impl Into<String>,
        right_entity_name: impl Into<String>,
        relation_type: RelationType,
        cardinality: Cardinality,
        direction: Direction,
    ) -> Self {
        Self {
            left_entity_name: left_entity_name.into(),
            field_name: field_name.into(),
            right_entity_name: right_entity_name.into(),
            relation_type,
            cardinality,
            direction,
        }
    }

    /// Deterministic junction table name, identical from either side
    pub fn junction_table_name(&self) -> String {
        format!(
            "{}_{}_{}",
            to_snake_case(&self.left_entity_name),
            to_snake_case(&self.field_name),
            to_snake_case(&self.right_entity_name)
        )
    }
}

/// Static description of one field of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Logical field name as declared on the entity type
    pub name: String,
    pub column_type: ColumnType,
    /// Relationship fields are excluded from the entity's own table and
    /// live in junction tables instead
    pub is_relationship: bool,
}

impl FieldDescriptor {
    /// Derived snake_case column name
    pub fn column_name(&self) -> String {
        to_snake_case(&self.name)
    }
}

/// Static description of an entity type: its own fields plus its
/// relationships to other entities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub name: String,
    /// Ordered field list; order defines column order in DDL
    pub fields: Vec<FieldDescriptor>,
    pub relationships: Vec<RelationshipInfo>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Add a non-relationship field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            column_type,
            is_relationship: false,
        });
        self
    }

    /// Add a relationship field (excluded from the entity's own table)
    #[must_use]
    pub fn relationship_field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            column_type: ColumnType::Integer,
            is_relationship: true,
        });
        self
    }

    /// Add a relationship descriptor
    #[must_use]
    pub fn relationship(mut self, info: RelationshipInfo) -> Self {
        self.relationships.push(info);
        self
    }

    /// Derived snake_case table name
    pub fn table_name(&self) -> String {
        to_snake_case(&self.name)
    }

    /// Snake_case column names of the entity's own (non-relationship)
    /// fields, excluding the implicit `id` primary key
    pub fn own_columns(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| !f.is_relationship)
            .map(|f| f.column_name())
            .collect()
    }

    /// Non-relationship field descriptors, in declaration order
    pub fn own_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_relationship)
    }

    /// Relationships declared on this entity with the given direction
    pub fn relationships_with_direction(
        &self,
        direction: Direction,
    ) -> impl Iterator<Item = &RelationshipInfo> {
        self.relationships
            .iter()
            .filter(move |r| r.direction == direction)
    }

    /// Locate the forward relationship entry for a dispatch lookup:
    /// this schema is the left side, `right_entity_name` the target
    pub fn forward_relationship(
        &self,
        field_name: &str,
        right_entity_name: &str,
    ) -> Option<&RelationshipInfo> {
        self.relationships.iter().find(|r| {
            r.direction == Direction::Forward
                && r.field_name == field_name
                && r.right_entity_name == right_entity_name
        })
    }
}

/// Convert a PascalCase or camelCase name to snake_case
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            for low in ch.to_lowercase() {
                out.push(low);
            }
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}
