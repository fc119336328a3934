use tidedb::collection::{multi, upsert, UpdateOptions};
use tidedb::errors::ErrorKind;
use tidedb::index::unique_index;
use tidedb::{doc, val};
use tidedb_int_test::test_util::{cleanup, create_seeded_test_context, run_test};

#[test]
fn test_update_by_replacement() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            let result = db.update(
                doc! { _id: 1 },
                doc! { name: "Johnny", age: 21 },
                UpdateOptions::default(),
            )?;
            assert_eq!(result.num_affected(), 1);
            assert!(!result.is_upsert());

            let john = db.find_one(&doc! { _id: 1 }, None)?.unwrap();
            assert_eq!(john, doc! { _id: 1, name: "Johnny", age: 21 });
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_first_match_only() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            let result = db.update(
                doc! { role: "Developer" },
                doc! { "$set": { senior: true } },
                UpdateOptions::default(),
            )?;
            assert_eq!(result.num_affected(), 1);
            assert_eq!(db.count(&doc! { senior: true })?, 1);

            let result = db.update(
                doc! { role: "Developer" },
                doc! { "$set": { senior: true } },
                multi(),
            )?;
            assert_eq!(result.num_affected(), 2);
            assert_eq!(db.count(&doc! { senior: true })?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_returns_updated_documents() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let result = ctx.db().update(
                doc! { age: 30 },
                doc! { "$inc": { age: 1 } },
                multi().with_return_updated_docs(true),
            )?;
            let ages: Vec<_> = result.affected_documents().iter().map(|d| d.get("age")).collect();
            assert_eq!(ages, vec![val!(31), val!(31)]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_upsert_with_modifiers() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            let result = db.update(
                doc! { name: "Ann", age: { "$gt": 10 } },
                doc! { "$set": { role: "Designer" }, "$inc": { visits: 1 } },
                upsert(),
            )?;
            assert_eq!(result.num_affected(), 1);
            assert!(result.is_upsert());

            let ann = db.find_one(&doc! { name: "Ann" }, None)?.unwrap();
            assert_eq!(ann.get("role"), val!("Designer"));
            assert_eq!(ann.get("visits"), val!(1));
            // operator clauses of the query are not copied
            assert!(ann.get("age").is_undefined());
            assert!(ann.has_id());

            // matched this time, nothing is inserted
            let result = db.update(
                doc! { name: "Ann" },
                doc! { "$inc": { visits: 1 } },
                upsert(),
            )?;
            assert!(!result.is_upsert());
            assert_eq!(db.count(&doc! { name: "Ann" })?, 1);
            assert_eq!(
                db.find_one(&doc! { name: "Ann" }, None)?.unwrap().get("visits"),
                val!(2)
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_upsert_with_replacement() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            let result = db.update(
                doc! { name: "Zoe" },
                doc! { name: "Zoe", age: 40 },
                upsert().with_return_updated_docs(true),
            )?;
            assert!(result.is_upsert());
            let zoe = &result.affected_documents()[0];
            assert_eq!(zoe.get("age"), val!(40));
            assert!(zoe.has_id());
            assert_eq!(db.count(&doc! {})?, 5);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_cannot_change_id() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            let err = db
                .update(doc! { _id: 1 }, doc! { _id: 99, name: "John" }, UpdateOptions::default())
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            assert_eq!(err.message(), "You cannot change a document's _id");

            let err = db
                .update(doc! { _id: 1 }, doc! { "$set": { _id: 99 } }, UpdateOptions::default())
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            assert!(db.find_one(&doc! { _id: 1 }, None)?.is_some());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_mixed_update_fails() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let err = ctx
                .db()
                .update(doc! { _id: 1 }, doc! { "$set": { age: 1 }, name: "x" }, multi())
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_multi_update_is_atomic() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(unique_index("name"))?;

            // Emily and Peter would both become "Same"
            let err = db
                .update(doc! { age: 30 }, doc! { "$set": { name: "Same" } }, multi())
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);
            assert_eq!(db.count(&doc! { name: "Same" })?, 0);
            assert_eq!(db.count(&doc! { name: "Emily" })?, 1);
            assert_eq!(db.count(&doc! { name: "Peter" })?, 1);

            let reopened = ctx.reopen()?;
            assert_eq!(reopened.count(&doc! { name: "Same" })?, 0);
            assert_eq!(reopened.count(&doc! {})?, 4);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_modifiers() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            db.update(
                doc! { _id: 2 },
                doc! {
                    "$set": { "address.city": "Paris", tags: ["a", "b", "c"] },
                    "$unset": { role: true },
                    "$max": { age: 27 },
                },
                UpdateOptions::default(),
            )?;
            db.update(
                doc! { _id: 2 },
                doc! {
                    "$push": { tags: "d" },
                    "$addToSet": { skills: { "$each": ["rust", "rust", "sql"] } },
                    "$min": { age: 26 },
                },
                UpdateOptions::default(),
            )?;
            db.update(
                doc! { _id: 2 },
                doc! { "$pop": { tags: (-1) }, "$pull": { skills: "sql" } },
                UpdateOptions::default(),
            )?;

            let mary = db.find_one(&doc! { _id: 2 }, None)?.unwrap();
            assert_eq!(mary.get("address.city"), val!("Paris"));
            assert!(mary.get("role").is_undefined());
            assert_eq!(mary.get("age"), val!(26));
            assert_eq!(mary.get("tags"), val!(vec!["b", "c", "d"]));
            assert_eq!(mary.get("skills"), val!(vec!["rust"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_push_each_with_slice() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            db.update(
                doc! { _id: 3 },
                doc! { "$push": { scores: { "$each": [1, 2, 3, 4], "$slice": (-2) } } },
                UpdateOptions::default(),
            )?;
            let emily = db.find_one(&doc! { _id: 3 }, None)?.unwrap();
            assert_eq!(emily.get("scores"), val!(vec![3, 4]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_inc_on_non_number_fails() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let err = ctx
                .db()
                .update(doc! { _id: 1 }, doc! { "$inc": { name: 1 } }, UpdateOptions::default())
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            Ok(())
        },
        cleanup,
    )
}
