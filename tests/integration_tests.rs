//! End-to-end tests over the public API and an in-memory store

mod common;

use common::{fixture, Car, Driver, Passenger, Tag, CAR_SCHEMA};
use rust_persistence_system::core::{EntityAccessor, PersistenceError, Value};
use uuid::Uuid;

#[test]
fn test_add_assigns_id_and_round_trips() {
    let fix = fixture();

    let mut car = Car::new("sedan");
    assert_eq!(car.id, 0);
    fix.cars.add(&mut car).unwrap();
    assert_ne!(car.id, 0);

    let loaded = fix.cars.get(car.id).unwrap();
    assert_eq!(loaded.content, "sedan");
    assert_eq!(loaded.uuid, car.uuid);
    assert!(loaded.is_active);

    let err = fix.cars.get(car.id + 1000).unwrap_err();
    assert!(matches!(err, PersistenceError::RowMissing { .. }));
}

#[test]
fn test_update_and_remove() {
    let fix = fixture();
    let mut car = fix.add_car("sedan");

    car.content = "wagon".to_string();
    fix.cars.update(&car).unwrap();
    assert_eq!(fix.cars.get(car.id).unwrap().content, "wagon");

    fix.cars.remove(car.id).unwrap();
    assert!(matches!(
        fix.cars.get(car.id).unwrap_err(),
        PersistenceError::RowMissing { .. }
    ));

    let err = fix.cars.remove(car.id).unwrap_err();
    assert!(matches!(err, PersistenceError::DeleteFailed { .. }));

    let err = fix.cars.update(&car).unwrap_err();
    assert!(matches!(err, PersistenceError::UpdateFailed { .. }));
}

#[test]
fn test_uuid_lookup() {
    let fix = fixture();
    let car = fix.add_car("sedan");
    let uuid = Uuid::parse_str(&car.uuid).unwrap();

    assert!(fix.cars.exists_by_uuid(uuid).unwrap());
    let loaded = fix.cars.get_by_uuid(uuid).unwrap();
    assert_eq!(loaded.id, car.id);

    assert!(!fix.cars.exists_by_uuid(Uuid::new_v4()).unwrap());
    assert!(matches!(
        fix.cars.get_by_uuid(Uuid::new_v4()).unwrap_err(),
        PersistenceError::RowMissing { .. }
    ));
}

#[test]
fn test_get_many_silently_omits_missing() {
    let fix = fixture();
    let a = fix.add_car("a");
    let b = fix.add_car("b");

    let loaded = fix.cars.get_many(&[b.id, 9999, a.id]).unwrap();
    let contents: Vec<&str> = loaded.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["b", "a"]);
}

#[test]
fn test_get_many_reporting_names_the_missing_ids() {
    let fix = fixture();
    let a = fix.add_car("a");

    let (found, missing) = fix.cars.get_many_reporting(&[a.id]).unwrap();
    assert_eq!(found.len(), 1);
    assert!(missing.is_empty());

    let (found, missing) = fix.cars.get_many_reporting(&[a.id, 9999, 8888]).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(missing, vec![9999, 8888]);
}

#[test]
fn test_active_status_and_filtering() {
    let fix = fixture();
    let a = fix.add_car("a");
    let _b = fix.add_car("b");

    fix.cars.change_active_status(&[a.id], false).unwrap();

    let inactive = fix
        .cars
        .get_all_filtered(&[("is_active", Value::from(false))])
        .unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].id, a.id);
    // No filters: full scan.
    assert_eq!(fix.cars.get_all_filtered(&[]).unwrap().len(), 2);
    assert_eq!(fix.cars.get_all().unwrap().len(), 2);

    let err = fix.cars.change_active_status(&[a.id, 9999], true).unwrap_err();
    assert!(matches!(err, PersistenceError::UpdateFailed { .. }));
}

#[test]
fn test_remove_many_and_clear() {
    let fix = fixture();
    let a = fix.add_car("a");
    let b = fix.add_car("b");
    let c = fix.add_car("c");

    fix.cars.remove_many(&[a.id, b.id]).unwrap();
    assert_eq!(fix.cars.get_all().unwrap().len(), 1);

    let err = fix.cars.remove_many(&[c.id, 9999]).unwrap_err();
    assert!(matches!(err, PersistenceError::DeleteFailed { .. }));

    fix.cars.clear().unwrap();
    assert!(fix.cars.get_all().unwrap().is_empty());
}

#[test]
fn test_one_to_one_driver() {
    let fix = fixture();
    let car = fix.add_car("sedan");

    assert!(fix
        .drivers
        .get_entity_in_relation_of(&CAR_SCHEMA, car.id, "driver")
        .unwrap()
        .is_none());

    let mut alice = Driver::new("alice");
    fix.drivers.add(&mut alice).unwrap();
    fix.drivers
        .update_entity_in_relation_of(&CAR_SCHEMA, car.id, "driver", &alice)
        .unwrap();

    let linked = fix
        .drivers
        .get_entity_in_relation_of(&CAR_SCHEMA, car.id, "driver")
        .unwrap()
        .unwrap();
    assert_eq!(linked.name, "alice");

    // Replacing keeps exactly one junction row.
    let mut bob = Driver::new("bob");
    fix.drivers.add(&mut bob).unwrap();
    fix.drivers
        .update_entity_in_relation_of(&CAR_SCHEMA, car.id, "driver", &bob)
        .unwrap();
    let linked = fix
        .drivers
        .get_entity_in_relation_of(&CAR_SCHEMA, car.id, "driver")
        .unwrap()
        .unwrap();
    assert_eq!(linked.name, "bob");

    // An entity with id 0 clears the relation.
    fix.drivers
        .update_entity_in_relation_of(&CAR_SCHEMA, car.id, "driver", &Driver::default())
        .unwrap();
    assert!(fix
        .drivers
        .get_entity_in_relation_of(&CAR_SCHEMA, car.id, "driver")
        .unwrap()
        .is_none());
}

#[test]
fn test_one_to_one_surfaces_malformed_junction_value() {
    let fix = fixture();
    let car = fix.add_car("sedan");

    // Plant a corrupt right_id by hand; with the foreign-key check off the
    // text value lands in the integer column unchanged.
    fix.provider
        .execute("PRAGMA foreign_keys = OFF", &[])
        .unwrap();
    fix.provider
        .execute(
            "INSERT INTO car_driver_driver (left_id, right_id) VALUES (?, ?)",
            &[Value::Long(car.id), Value::Text("garbage".to_string())],
        )
        .unwrap();

    let err = fix
        .drivers
        .get_entity_in_relation_of(&CAR_SCHEMA, car.id, "driver")
        .unwrap_err();
    match err {
        PersistenceError::Sql { message, .. } => {
            assert!(message.contains("right_id"));
            assert!(message.contains("garbage"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_ordered_passengers_preserve_order() {
    let fix = fixture();
    let car = fix.add_car("bus");
    let people = fix.add_passengers(&["alice", "bob", "carol"]);

    let stored = fix
        .passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &people)
        .unwrap();
    assert_eq!(
        stored.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["alice", "bob", "carol"]
    );
    assert_eq!(fix.passenger_names(car.id), vec!["alice", "bob", "carol"]);

    // Reorder without membership change.
    let rotated: Vec<Passenger> =
        vec![people[2].clone(), people[0].clone(), people[1].clone()];
    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &rotated)
        .unwrap();
    assert_eq!(fix.passenger_names(car.id), vec!["carol", "alice", "bob"]);
}

#[test]
fn test_ordered_update_reuses_junction_rows() {
    let fix = fixture();
    let car = fix.add_car("bus");
    let people = fix.add_passengers(&["alice", "bob", "carol", "dave"]);
    let (a, b, c, d) = (
        people[0].clone(),
        people[1].clone(),
        people[2].clone(),
        people[3].clone(),
    );

    fix.passengers
        .update_entities_in_relation_of(
            &CAR_SCHEMA,
            car.id,
            "passengers",
            &[a.clone(), b.clone(), c.clone()],
        )
        .unwrap();

    let before = fix.passenger_junction_rows(car.id);
    let junction_of = |rows: &[(i64, i64, Option<i64>, Option<i64>)], right: i64| {
        rows.iter().find(|r| r.1 == right).map(|r| r.0).unwrap()
    };
    let a_row = junction_of(&before, a.id);
    let b_row = junction_of(&before, b.id);

    // [A, B, C] -> [A, D, B]: A and B must keep their junction rows.
    fix.passengers
        .update_entities_in_relation_of(
            &CAR_SCHEMA,
            car.id,
            "passengers",
            &[a.clone(), d.clone(), b.clone()],
        )
        .unwrap();

    let after = fix.passenger_junction_rows(car.id);
    assert_eq!(after.len(), 3);
    assert_eq!(junction_of(&after, a.id), a_row);
    assert_eq!(junction_of(&after, b.id), b_row);
    assert!(!after.iter().any(|r| r.1 == c.id));

    // Pointer integrity: A -> D -> B.
    let find = |right: i64| after.iter().find(|r| r.1 == right).unwrap();
    assert_eq!(find(a.id).2, None);
    assert_eq!(find(a.id).3, Some(d.id));
    assert_eq!(find(d.id).2, Some(a.id));
    assert_eq!(find(d.id).3, Some(b.id));
    assert_eq!(find(b.id).2, Some(d.id));
    assert_eq!(find(b.id).3, None);

    assert_eq!(fix.passenger_names(car.id), vec!["alice", "dave", "bob"]);
}

#[test]
fn test_ordered_empty_desired_removes_all() {
    let fix = fixture();
    let car = fix.add_car("bus");
    let people = fix.add_passengers(&["alice", "bob"]);

    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &people)
        .unwrap();
    let stored = fix
        .passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &[])
        .unwrap();

    assert!(stored.is_empty());
    assert!(fix.passenger_junction_rows(car.id).is_empty());
    // The passenger rows themselves are untouched.
    assert_eq!(fix.passengers.get_all().unwrap().len(), 2);
}

#[test]
fn test_ordered_duplicate_desired_ids_keep_first() {
    let fix = fixture();
    let car = fix.add_car("bus");
    let people = fix.add_passengers(&["alice", "bob"]);

    let with_duplicate = vec![people[0].clone(), people[1].clone(), people[0].clone()];
    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &with_duplicate)
        .unwrap();

    assert_eq!(fix.passenger_names(car.id), vec!["alice", "bob"]);
}

#[test]
fn test_splice_removal_repairs_neighbors() {
    let fix = fixture();
    let car = fix.add_car("bus");
    let people = fix.add_passengers(&["a", "b", "c", "d", "e"]);

    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &people)
        .unwrap();

    // Remove the adjacent pair B, C: one run, one splice.
    let removed = [people[1].id, people[2].id];
    fix.passengers.remove_associations_with(&removed).unwrap();
    fix.passengers.remove_many(&removed).unwrap();

    assert_eq!(fix.passenger_names(car.id), vec!["a", "d", "e"]);

    let rows = fix.passenger_junction_rows(car.id);
    assert_eq!(rows.len(), 3);
    let find = |right: i64| rows.iter().find(|r| r.1 == right).unwrap();
    assert_eq!(find(people[0].id).3, Some(people[3].id));
    assert_eq!(find(people[3].id).2, Some(people[0].id));
}

#[test]
fn test_splice_removal_of_head_and_tail() {
    let fix = fixture();
    let car = fix.add_car("bus");
    let people = fix.add_passengers(&["a", "b", "c"]);

    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &people)
        .unwrap();

    let removed = [people[0].id, people[2].id];
    fix.passengers.remove_associations_with(&removed).unwrap();
    fix.passengers.remove_many(&removed).unwrap();

    assert_eq!(fix.passenger_names(car.id), vec!["b"]);
    let rows = fix.passenger_junction_rows(car.id);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].2, None);
    assert_eq!(rows[0].3, None);
}

#[test]
fn test_splice_spans_multiple_cars() {
    let fix = fixture();
    let bus = fix.add_car("bus");
    let van = fix.add_car("van");
    let bus_people = fix.add_passengers(&["a", "b", "c"]);
    let van_people = fix.add_passengers(&["x", "y"]);

    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, bus.id, "passengers", &bus_people)
        .unwrap();
    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, van.id, "passengers", &van_people)
        .unwrap();

    // One removal batch touching both lists; each is spliced separately.
    let removed = [bus_people[1].id, van_people[1].id];
    fix.passengers.remove_associations_with(&removed).unwrap();
    fix.passengers.remove_many(&removed).unwrap();

    assert_eq!(fix.passenger_names(bus.id), vec!["a", "c"]);
    assert_eq!(fix.passenger_names(van.id), vec!["x"]);
}

#[test]
fn test_many_to_many_tags() {
    let fix = fixture();
    let sedan = fix.add_car("sedan");
    let wagon = fix.add_car("wagon");

    let mut red = Tag::new("red");
    let mut fast = Tag::new("fast");
    fix.tags.add(&mut red).unwrap();
    fix.tags.add(&mut fast).unwrap();

    fix.tags
        .update_entities_in_relation_of(
            &CAR_SCHEMA,
            sedan.id,
            "tags",
            &[red.clone(), fast.clone()],
        )
        .unwrap();
    fix.tags
        .update_entities_in_relation_of(&CAR_SCHEMA, wagon.id, "tags", &[red.clone()])
        .unwrap();

    let mut sedan_tags: Vec<String> = fix
        .tags
        .get_entities_in_relation_of(&CAR_SCHEMA, sedan.id, "tags")
        .unwrap()
        .into_iter()
        .map(|t| t.label)
        .collect();
    sedan_tags.sort();
    assert_eq!(sedan_tags, vec!["fast", "red"]);

    // Shrinking one car's set leaves the other car's links alone.
    fix.tags
        .update_entities_in_relation_of(&CAR_SCHEMA, sedan.id, "tags", &[fast.clone()])
        .unwrap();
    let wagon_tags = fix
        .tags
        .get_entities_in_relation_of(&CAR_SCHEMA, wagon.id, "tags")
        .unwrap();
    assert_eq!(wagon_tags.len(), 1);
    assert_eq!(wagon_tags[0].label, "red");
}

#[test]
fn test_relation_dispatch_rejects_wrong_shape() {
    let fix = fixture();
    let car = fix.add_car("sedan");

    // Singular accessor on a plural relationship.
    let err = fix
        .passengers
        .get_entity_in_relation_of(&CAR_SCHEMA, car.id, "passengers")
        .unwrap_err();
    assert!(matches!(err, PersistenceError::NotImplemented { .. }));

    // Plural accessor on a one-to-one relationship.
    let err = fix
        .drivers
        .get_entities_in_relation_of(&CAR_SCHEMA, car.id, "driver")
        .unwrap_err();
    assert!(matches!(err, PersistenceError::NotImplemented { .. }));

    // Unknown field name.
    let err = fix
        .passengers
        .get_entities_in_relation_of(&CAR_SCHEMA, car.id, "copilots")
        .unwrap_err();
    assert!(matches!(err, PersistenceError::NotImplemented { .. }));
}

#[test]
fn test_transaction_bracket() {
    let fix = fixture();

    fix.cars.begin_changes().unwrap();
    let car = fix.add_car("sedan");
    fix.cars.cancel_changes().unwrap();
    assert!(!fix.cars.exists(car.id).unwrap());

    fix.cars.begin_changes().unwrap();
    let car = fix.add_car("wagon");
    fix.cars.save_changes().unwrap();
    assert_eq!(fix.cars.get(car.id).unwrap().content, "wagon");

    let err = fix.cars.save_changes().unwrap_err();
    assert!(matches!(err, PersistenceError::Transaction(_)));
}

#[test]
fn test_save_restore_entity_rows() {
    let fix = fixture();
    let mut car = fix.add_car("sedan");

    let snapshot = fix.cars.save(&[car.id]).unwrap();
    assert!(!snapshot.is_empty());

    car.content = "wagon".to_string();
    fix.cars.update(&car).unwrap();

    fix.cars.restore(&snapshot).unwrap();
    assert_eq!(fix.cars.get(car.id).unwrap().content, "sedan");
}

#[test]
fn test_save_with_empty_ids_snapshots_whole_table() {
    let fix = fixture();
    let a = fix.add_car("a");
    let b = fix.add_car("b");

    let snapshot = fix.cars.save(&[]).unwrap();
    fix.cars.clear().unwrap();
    assert!(fix.cars.get_all().unwrap().is_empty());

    fix.cars.restore(&snapshot).unwrap();
    assert_eq!(fix.cars.get_all().unwrap().len(), 2);
    assert!(fix.cars.exists(a.id).unwrap());
    assert!(fix.cars.exists(b.id).unwrap());
}

#[test]
fn test_save_restore_reinstates_deleted_rows() {
    let fix = fixture();
    let car = fix.add_car("sedan");

    let snapshot = fix.cars.save(&[car.id]).unwrap();
    fix.cars.remove(car.id).unwrap();
    assert!(!fix.cars.exists(car.id).unwrap());

    fix.cars.restore(&snapshot).unwrap();
    let restored = fix.cars.get(car.id).unwrap();
    assert_eq!(restored.content, "sedan");
    assert_eq!(restored.uuid, car.uuid);
}

#[test]
fn test_save_restore_ordered_association() {
    let fix = fixture();
    let car = fix.add_car("bus");
    let people = fix.add_passengers(&["alice", "bob", "carol"]);

    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &people)
        .unwrap();

    let ids: Vec<i64> = people.iter().map(|p| p.id).collect();
    let snapshot = fix.passengers.save(&ids).unwrap();

    // Drop the list entirely; the junction rows disappear.
    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &[])
        .unwrap();
    assert!(fix.passenger_names(car.id).is_empty());

    fix.passengers.restore(&snapshot).unwrap();
    assert_eq!(fix.passenger_names(car.id), vec!["alice", "bob", "carol"]);
}

#[test]
fn test_restore_undoes_entity_delete_with_links() {
    let fix = fixture();
    let car = fix.add_car("bus");
    let people = fix.add_passengers(&["alice", "bob", "carol"]);

    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &people)
        .unwrap();

    let ids: Vec<i64> = people.iter().map(|p| p.id).collect();
    let snapshot = fix.passengers.save(&ids).unwrap();

    // Destructive delete: splice the list out, then drop the entity rows.
    fix.passengers.remove_associations_with(&ids).unwrap();
    fix.passengers.remove_many(&ids).unwrap();
    assert!(fix.passengers.get_all().unwrap().is_empty());
    assert!(fix.passenger_junction_rows(car.id).is_empty());

    // The junction table sorts before the passenger table in the snapshot;
    // restore must still reinsert the entity rows first or the junction
    // foreign keys have nothing to point at.
    fix.passengers.restore(&snapshot).unwrap();
    assert_eq!(fix.passenger_names(car.id), vec!["alice", "bob", "carol"]);
    let (found, missing) = fix.passengers.get_many_reporting(&ids).unwrap();
    assert_eq!(found.len(), 3);
    assert!(missing.is_empty());
}

#[test]
fn test_snapshot_json_round_trip() {
    let fix = fixture();
    let car = fix.add_car("sedan");

    let snapshot = fix.cars.save(&[car.id]).unwrap();
    let json = snapshot.to_json().unwrap();
    let parsed = rust_persistence_system::SaveData::from_json(&json).unwrap();
    assert_eq!(parsed, snapshot);

    fix.cars.remove(car.id).unwrap();
    fix.cars.restore(&parsed).unwrap();
    assert!(fix.cars.exists(car.id).unwrap());
}

#[test]
fn test_explicit_id_insert() {
    let fix = fixture();

    let mut car = Car::new("imported");
    car.id = 77;
    fix.cars.add(&mut car).unwrap();
    assert_eq!(car.id, 77);
    assert_eq!(fix.cars.get(77).unwrap().content, "imported");
}

#[test]
fn test_removing_car_cascades_junction_rows() {
    let fix = fixture();
    let car = fix.add_car("bus");
    let people = fix.add_passengers(&["alice", "bob"]);

    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &people)
        .unwrap();
    assert_eq!(fix.passenger_junction_rows(car.id).len(), 2);

    fix.cars.remove(car.id).unwrap();
    assert!(fix.passenger_junction_rows(car.id).is_empty());
    // Passengers survive their car.
    assert_eq!(fix.passengers.get_all().unwrap().len(), 2);
}

#[test]
fn test_shared_provider_across_threads() {
    let fix = fixture();
    let car = fix.add_car("bus");
    let people = fix.add_passengers(&["alice", "bob"]);
    fix.passengers
        .update_entities_in_relation_of(&CAR_SCHEMA, car.id, "passengers", &people)
        .unwrap();

    let passengers = std::sync::Arc::new(fix.passengers);
    let mut handles = Vec::new();
    for _ in 0..4 {
        let repo = passengers.clone();
        let car_id = car.id;
        handles.push(std::thread::spawn(move || {
            for _ in 0..25 {
                let listed = repo
                    .get_entities_in_relation_of(&CAR_SCHEMA, car_id, "passengers")
                    .unwrap();
                assert_eq!(listed.len(), 2);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_value_is_usable_in_filters() {
    let fix = fixture();
    fix.add_car("sedan");

    let rows = fix
        .cars
        .get_all_filtered(&[("content", Value::from("sedan"))])
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].read_field("content").as_text(), Some("sedan"));
}
