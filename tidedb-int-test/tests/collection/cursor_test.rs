use tidedb::{doc, val};
use tidedb_int_test::test_util::{cleanup, create_seeded_test_context, run_test};

#[test]
fn test_find_cursor_with_projection_and_limit() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let found = ctx
                .db()
                .find_cursor(doc! {})
                .projection(doc! { _id: 0, name: 1 })
                .limit(1)
                .exec()?;
            assert_eq!(found, vec![doc! { name: "John" }]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_cursor_with_skip() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let found = ctx
                .db()
                .find_one_cursor(doc! { age: 30 })
                .projection(doc! { _id: 0, name: 1 })
                .skip(1)
                .exec()?;
            assert_eq!(found, Some(doc! { name: "Peter" }));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_count_cursor_with_limit() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            assert_eq!(db.count_cursor(doc! { age: { "$gt": 10 } }).exec()?, 4);
            assert_eq!(db.count_cursor(doc! { age: { "$gt": 10 } }).limit(2).exec()?, 2);
            assert_eq!(db.count_cursor(doc! {}).skip(3).limit(5).exec()?, 1);
            assert_eq!(db.count_cursor(doc! {}).skip(10).exec()?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_sort_by_several_fields() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let found = ctx
                .db()
                .find_cursor(doc! {})
                .sort(doc! { age: (-1), name: 1 })
                .exec()?;
            let names: Vec<_> = found.iter().map(|d| d.get("name")).collect();
            assert_eq!(
                names,
                vec![val!("Emily"), val!("Peter"), val!("Mary"), val!("John")]
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_options_apply_in_fixed_order() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            // sort, then skip, then limit, whatever the call order
            let found = ctx
                .db()
                .find_cursor(doc! {})
                .limit(2)
                .skip(1)
                .projection(doc! { name: 1, _id: 0 })
                .sort(doc! { age: 1 })
                .exec()?;
            assert_eq!(found, vec![doc! { name: "Mary" }, doc! { name: "Emily" }]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_cursor_is_reusable() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            let cursor = db.find_cursor(doc! { role: "Developer" }).sort(doc! { name: 1 });
            assert_eq!(cursor.query(), &doc! { role: "Developer" });
            assert_eq!(cursor.exec()?.len(), 2);

            db.insert(doc! { name: "Ann", role: "Developer" })?;
            let names: Vec<_> = cursor.exec()?.iter().map(|d| d.get("name")).collect();
            assert_eq!(names, vec![val!("Ann"), val!("Emily"), val!("John")]);

            // chaining returns a new cursor and leaves the original alone
            let limited = cursor.clone().limit(1);
            assert_eq!(limited.exec()?.len(), 1);
            assert_eq!(cursor.exec()?.len(), 3);
            Ok(())
        },
        cleanup,
    )
}
