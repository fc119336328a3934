use std::fs::OpenOptions;
use std::io::Write;
use tidedb::index::{unique_index, IndexOptions};
use tidedb::errors::ErrorKind;
use tidedb::doc;
use tidedb_int_test::test_util::{cleanup, create_seeded_test_context, run_test};

#[test]
fn test_count_by_age() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            assert_eq!(ctx.db().count(&doc! { age: 30 })?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_keeps_id_in_projection() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let emily = ctx.db().find_one(&doc! { _id: 3 }, Some(&doc! { name: 1 }))?;
            assert_eq!(emily, Some(doc! { _id: 3, name: "Emily" }));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unique_index_keeps_count() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            let options = IndexOptions::from_document(&doc! { fieldName: "name", unique: true })?;
            db.ensure_index(options)?;

            let err = db.insert(doc! { name: "Mary", age: 99 }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);
            assert_eq!(db.count(&doc! {})?, 4);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_recreated_index_scans_all_documents() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(unique_index("name"))?;
            db.remove_index("name")?;
            assert!(!db.index_names().contains(&"name".to_string()));

            // Mary twice is fine without the index, and blocks recreating it
            db.insert(doc! { name: "Mary" })?;
            let err = db.ensure_index(unique_index("name")).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);

            db.remove(doc! { name: "Mary", age: { "$exists": false } }, Default::default())?;
            db.ensure_index(unique_index("name"))?;
            assert!(db.index_names().contains(&"name".to_string()));
            assert!(db.insert(doc! { name: "John" }).is_err());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_deletion_marker_survives_reload() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let mut file = OpenOptions::new().append(true).open(ctx.path())?;
            writeln!(file, r#"{{"$$deleted":true,"_id":1}}"#)?;
            drop(file);

            let reopened = ctx.reopen()?;
            assert_eq!(reopened.count(&doc! {})?, 3);
            assert!(reopened.find_one(&doc! { _id: 1 }, None)?.is_none());
            Ok(())
        },
        cleanup,
    )
}
