use awaitility::at_most;
use std::time::Duration;
use tidedb::collection::{RemoveOptions, UpdateOptions};
use tidedb::index::non_unique_index;
use tidedb::doc;
use tidedb_int_test::test_util::{
    cleanup, create_seeded_test_context, read_datafile, run_test, temp_file_of,
};

#[test]
fn test_compact_datafile() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(non_unique_index("age"))?;
            for age in 21..26 {
                db.update(doc! { _id: 1 }, doc! { "$set": { age: age } }, UpdateOptions::default())?;
            }
            db.remove(doc! { _id: 4 }, RemoveOptions::default())?;
            assert_eq!(read_datafile(ctx.path()).len(), 11);

            db.compact_datafile()?;
            let lines = read_datafile(ctx.path());
            assert_eq!(
                lines,
                vec![
                    r#"{"$$indexCreated":{"fieldName":"age","unique":false,"sparse":false}}"#,
                    r#"{"_id":1,"name":"John","age":25,"role":"Developer"}"#,
                    r#"{"_id":2,"name":"Mary","age":25,"role":"Project Manager"}"#,
                    r#"{"_id":3,"name":"Emily","age":30,"role":"Developer"}"#,
                ]
            );
            assert!(!temp_file_of(ctx.path()).exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_compaction_is_idempotent() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            db.compact_datafile()?;
            let first = std::fs::read_to_string(ctx.path())?;
            db.compact_datafile()?;
            let second = std::fs::read_to_string(ctx.path())?;
            assert_eq!(first, second);

            let reopened = ctx.reopen()?;
            assert_eq!(std::fs::read_to_string(ctx.path())?, first);
            assert_eq!(reopened.count(&doc! {})?, 4);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_autocompaction() {
    run_test(
        create_seeded_test_context,
        |ctx| {
            let db = ctx.db();
            db.update(doc! {}, doc! { "$set": { age: 40 } }, UpdateOptions::default())?;
            assert_eq!(read_datafile(ctx.path()).len(), 5);

            // shorter intervals are raised to the minimum of five seconds
            db.set_autocompaction_interval(Duration::from_millis(10));
            assert!(db.is_autocompaction_running());

            at_most(Duration::from_secs(15)).until(|| read_datafile(ctx.path()).len() == 4);

            db.stop_autocompaction();
            assert!(!db.is_autocompaction_running());
            Ok(())
        },
        cleanup,
    )
}
