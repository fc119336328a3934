use chrono::Utc;
use tidedb::common::Value;
use tidedb::errors::ErrorKind;
use tidedb::index::unique_index;
use tidedb::{doc, val, Datastore};
use tidedb_int_test::test_util::{
    cleanup, create_memory_test_context, create_test_context, create_test_docs, run_test,
};

#[test]
fn test_insert() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let inserted = db.insert(doc! {
                first_name: "John",
                last_name: "Doe",
                birth_day: 1234567890,
                data: [1, 2, 3],
                body: "This is a test document",
            })?;

            let id = inserted.id().cloned().unwrap();
            assert_eq!(id.as_str().map(str::len), Some(16));
            assert_eq!(inserted.keys().next().map(String::as_str), Some("_id"));

            let stored = db.find_one(&doc! { _id: (id.clone()) }, None)?.unwrap();
            assert_eq!(stored, inserted);
            assert_eq!(stored.get("data"), val!(vec![1, 2, 3]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_many() {
    run_test(
        create_test_context,
        |ctx| {
            let inserted = ctx.db().insert_many(create_test_docs())?;
            assert_eq!(inserted.len(), 4);
            assert_eq!(ctx.db().count(&doc! {})?, 4);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_many_is_all_or_nothing() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(unique_index("email"))?;
            db.insert(doc! { email: "taken@example.com" })?;

            let err = db
                .insert_many(vec![
                    doc! { email: "free@example.com" },
                    doc! { email: "taken@example.com" },
                ])
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);
            assert_eq!(db.count(&doc! {})?, 1);

            // nothing of the failed batch reached the datafile
            let reopened = ctx.reopen()?;
            assert_eq!(reopened.count(&doc! {})?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_duplicate_id_fails() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let db = ctx.db();
            db.insert(doc! { _id: "abc", name: "first" })?;
            let err = db.insert(doc! { _id: "abc", name: "second" }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);

            let stored = db.find_one(&doc! { _id: "abc" }, None)?.unwrap();
            assert_eq!(stored.get("name"), val!("first"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_field_names_fail() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let db = ctx.db();
            let err = db.insert(doc! { "$name": "John" }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            let mut dotted = doc! { name: "John" };
            dotted.put("nested", doc! { "first.name": "John" })?;
            let err = db.insert(dotted).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            assert_eq!(db.count(&doc! {})?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_returns_a_copy() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let db = ctx.db();
            let mut inserted = db.insert(doc! { _id: 1, name: "John" })?;
            inserted.put("name", "Changed")?;

            let mut found = db.find_one(&doc! { _id: 1 }, None)?.unwrap();
            assert_eq!(found.get("name"), val!("John"));

            found.put("name", "Changed again")?;
            let again = db.find_one(&doc! { _id: 1 }, None)?.unwrap();
            assert_eq!(again.get("name"), val!("John"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_with_timestamps() {
    run_test(
        create_memory_test_context,
        |_| {
            let db = Datastore::builder().timestamp_data(true).open()?;
            let before = Utc::now() - chrono::Duration::seconds(1);

            let inserted = db.insert(doc! { name: "John" })?;
            let created_at = match inserted.get("createdAt") {
                Value::Date(date) => date,
                other => panic!("createdAt is not a date: {:?}", other),
            };
            assert!(created_at >= before);
            assert_eq!(inserted.get("updatedAt"), Value::Date(created_at));
            Ok(())
        },
        cleanup,
    )
}
