//! Shared test fixture: a small Car domain
//!
//! Car owns three relationships, one of each shape the engine supports:
//! an ordered passenger list, a single driver, and a many-to-many tag set.
//! Each relationship is mirrored into both schemas; the right-hand entity
//! declares the backward entry and therefore owns the junction table.
#![allow(dead_code)]

use once_cell::sync::Lazy;
use rust_persistence_system::core::{
    Cardinality, ColumnType, ConnectionProvider, Direction, EntityAccessor, EntitySchema,
    RelationType, RelationshipInfo, Value,
};
use rust_persistence_system::{Repository, SqliteConnectionProvider};
use std::sync::Arc;
use uuid::Uuid;

fn passengers_relation(direction: Direction) -> RelationshipInfo {
    RelationshipInfo::new(
        "Car",
        "passengers",
        "Passenger",
        RelationType::OneToMany,
        Cardinality::ManyOrdered,
        direction,
    )
}

fn driver_relation(direction: Direction) -> RelationshipInfo {
    RelationshipInfo::new(
        "Car",
        "driver",
        "Driver",
        RelationType::OneToOne,
        Cardinality::One,
        direction,
    )
}

fn tags_relation(direction: Direction) -> RelationshipInfo {
    RelationshipInfo::new(
        "Car",
        "tags",
        "Tag",
        RelationType::ManyToMany,
        Cardinality::ManyUnordered,
        direction,
    )
}

pub static CAR_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("Car")
        .field("uuid", ColumnType::Text)
        .field("content", ColumnType::Text)
        .field("isActive", ColumnType::Boolean)
        .relationship_field("passengers")
        .relationship_field("driver")
        .relationship_field("tags")
        .relationship(passengers_relation(Direction::Forward))
        .relationship(driver_relation(Direction::Forward))
        .relationship(tags_relation(Direction::Forward))
});

pub static PASSENGER_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("Passenger")
        .field("name", ColumnType::Text)
        .relationship(passengers_relation(Direction::Backward))
});

pub static DRIVER_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("Driver")
        .field("name", ColumnType::Text)
        .relationship(driver_relation(Direction::Backward))
});

pub static TAG_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::new("Tag")
        .field("label", ColumnType::Text)
        .relationship(tags_relation(Direction::Backward))
});

#[derive(Debug, Default, Clone)]
pub struct Car {
    pub id: i64,
    pub uuid: String,
    pub content: String,
    pub is_active: bool,
}

impl Car {
    pub fn new(content: &str) -> Self {
        Self {
            id: 0,
            uuid: Uuid::new_v4().to_string(),
            content: content.to_string(),
            is_active: true,
        }
    }
}

impl EntityAccessor for Car {
    fn schema() -> &'static EntitySchema {
        &CAR_SCHEMA
    }

    fn read_field(&self, column: &str) -> Value {
        match column {
            "uuid" => Value::from(self.uuid.clone()),
            "content" => Value::from(self.content.clone()),
            "is_active" => Value::from(self.is_active),
            _ => Value::Null,
        }
    }

    fn write_field(&mut self, column: &str, value: Value) {
        match column {
            "uuid" => {
                if let Some(text) = value.as_text() {
                    self.uuid = text.to_string();
                }
            }
            "content" => {
                if let Some(text) = value.as_text() {
                    self.content = text.to_string();
                }
            }
            "is_active" => {
                if let Some(flag) = value.as_bool() {
                    self.is_active = flag;
                }
            }
            _ => {}
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Debug, Default, Clone)]
pub struct Passenger {
    pub id: i64,
    pub name: String,
}

impl Passenger {
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
        }
    }
}

impl EntityAccessor for Passenger {
    fn schema() -> &'static EntitySchema {
        &PASSENGER_SCHEMA
    }

    fn read_field(&self, column: &str) -> Value {
        match column {
            "name" => Value::from(self.name.clone()),
            _ => Value::Null,
        }
    }

    fn write_field(&mut self, column: &str, value: Value) {
        if column == "name" {
            if let Some(text) = value.as_text() {
                self.name = text.to_string();
            }
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Debug, Default, Clone)]
pub struct Driver {
    pub id: i64,
    pub name: String,
}

impl Driver {
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
        }
    }
}

impl EntityAccessor for Driver {
    fn schema() -> &'static EntitySchema {
        &DRIVER_SCHEMA
    }

    fn read_field(&self, column: &str) -> Value {
        match column {
            "name" => Value::from(self.name.clone()),
            _ => Value::Null,
        }
    }

    fn write_field(&mut self, column: &str, value: Value) {
        if column == "name" {
            if let Some(text) = value.as_text() {
                self.name = text.to_string();
            }
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Debug, Default, Clone)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

impl Tag {
    pub fn new(label: &str) -> Self {
        Self {
            id: 0,
            label: label.to_string(),
        }
    }
}

impl EntityAccessor for Tag {
    fn schema() -> &'static EntitySchema {
        &TAG_SCHEMA
    }

    fn read_field(&self, column: &str) -> Value {
        match column {
            "label" => Value::from(self.label.clone()),
            _ => Value::Null,
        }
    }

    fn write_field(&mut self, column: &str, value: Value) {
        if column == "label" {
            if let Some(text) = value.as_text() {
                self.label = text.to_string();
            }
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// One in-memory store with all four repositories registered
pub struct Fixture {
    pub provider: Arc<dyn ConnectionProvider>,
    pub cars: Repository<Car>,
    pub passengers: Repository<Passenger>,
    pub drivers: Repository<Driver>,
    pub tags: Repository<Tag>,
}

pub fn fixture() -> Fixture {
    let provider: Arc<dyn ConnectionProvider> = Arc::new(SqliteConnectionProvider::in_memory());
    let cars = Repository::new(provider.clone()).unwrap();
    let passengers = Repository::new(provider.clone()).unwrap();
    let drivers = Repository::new(provider.clone()).unwrap();
    let tags = Repository::new(provider.clone()).unwrap();
    provider.init().unwrap();
    Fixture {
        provider,
        cars,
        passengers,
        drivers,
        tags,
    }
}

impl Fixture {
    /// Persist one car
    pub fn add_car(&self, content: &str) -> Car {
        let mut car = Car::new(content);
        self.cars.add(&mut car).unwrap();
        car
    }

    /// Persist one passenger per name, in order
    pub fn add_passengers(&self, names: &[&str]) -> Vec<Passenger> {
        names
            .iter()
            .map(|name| {
                let mut passenger = Passenger::new(name);
                self.passengers.add(&mut passenger).unwrap();
                passenger
            })
            .collect()
    }

    /// Read back the ordered passenger list of one car
    pub fn passenger_names(&self, car_id: i64) -> Vec<String> {
        self.passengers
            .get_entities_in_relation_of(&CAR_SCHEMA, car_id, "passengers")
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect()
    }

    /// Raw junction rows of the passenger list, as
    /// `(junction id, right id, previous, next)` keyed lookup by right id
    pub fn passenger_junction_rows(&self, car_id: i64) -> Vec<(i64, i64, Option<i64>, Option<i64>)> {
        let rows = self
            .provider
            .query(
                "SELECT id, right_id, previous_id, next_id \
                 FROM car_passengers_passenger WHERE left_id = ? ORDER BY id",
                &[Value::Long(car_id)],
            )
            .unwrap();
        rows.iter()
            .map(|row| {
                (
                    row.get("id").and_then(Value::as_long).unwrap(),
                    row.get("right_id").and_then(Value::as_long).unwrap(),
                    row.get("previous_id").and_then(Value::as_long),
                    row.get("next_id").and_then(Value::as_long),
                )
            })
            .collect()
    }
}
