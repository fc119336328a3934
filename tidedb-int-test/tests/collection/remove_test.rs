use tidedb::collection::{remove_all, RemoveOptions};
use tidedb::errors::ErrorKind;
use tidedb::index::non_unique_index;
use tidedb::{doc, val};
use tidedb_int_test::test_util::{cleanup, create_seeded_test_context, run_test};

#[test]
fn test_remove_first_match() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            let removed = db.remove(doc! { age: 30 }, RemoveOptions::default())?;
            assert_eq!(removed, 1);

            let left: Vec<_> = db.find(&doc! { age: 30 }, None)?.iter().map(|d| d.get("name")).collect();
            assert_eq!(left, vec![val!("Peter")]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_remove_all_matches() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            assert_eq!(db.remove(doc! { role: "Developer" }, remove_all())?, 2);
            assert_eq!(db.count(&doc! {})?, 2);

            assert_eq!(db.remove(doc! { role: "Developer" }, remove_all())?, 0);
            assert_eq!(db.remove(doc! {}, remove_all())?, 2);
            assert_eq!(db.count(&doc! {})?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_remove_updates_indexes() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(non_unique_index("age"))?;
            db.remove(doc! { name: "Emily" }, RemoveOptions::default())?;

            assert_eq!(db.count(&doc! { age: 30 })?, 1);
            assert_eq!(db.count(&doc! { age: { "$gte": 25 } })?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_remove_is_persisted() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            ctx.db().remove(doc! { _id: 2 }, RemoveOptions::default())?;

            let reopened = ctx.reopen()?;
            assert_eq!(reopened.count(&doc! {})?, 3);
            assert!(reopened.find_one(&doc! { _id: 2 }, None)?.is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_remove_with_invalid_query() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let err = ctx
                .db()
                .remove(doc! { "$nor": [{ age: 30 }] }, remove_all())
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidQuery);
            assert_eq!(ctx.db().count(&doc! {})?, 4);
            Ok(())
        },
        cleanup,
    )
}
