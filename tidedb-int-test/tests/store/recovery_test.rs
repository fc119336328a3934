use tidedb::errors::ErrorKind;
use tidedb::{doc, val, Datastore, LoadState};
use tidedb_int_test::test_util::{
    cleanup, create_memory_test_context, random_path, read_datafile, run_test, temp_file_of,
    write_datafile,
};

#[test]
fn test_recover_from_temp_file() {
    run_test(
        create_memory_test_context,
        |ctx| {
            // a compaction stopped between writing the temp file and renaming it
            write_datafile(
                &temp_file_of(ctx.path()),
                &[r#"{"_id":1,"name":"John"}"#, r#"{"_id":2,"name":"Mary"}"#],
            );
            assert!(!ctx.path().exists());

            let db = ctx.reopen()?;
            assert_eq!(db.count(&doc! {})?, 2);
            assert!(ctx.path().exists());
            assert!(!temp_file_of(ctx.path()).exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_datafile_wins_over_temp_file() {
    run_test(
        create_memory_test_context,
        |ctx| {
            write_datafile(ctx.path(), &[r#"{"_id":1,"name":"John"}"#]);
            write_datafile(&temp_file_of(ctx.path()), &[r#"{"_id":2,"name":"Stale"}"#]);

            let db = ctx.reopen()?;
            assert_eq!(db.get_all_data()?, vec![doc! { _id: 1, name: "John" }]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_missing_directories_are_created() {
    run_test(
        create_memory_test_context,
        |_| {
            let root = random_path();
            let path = root.join("nested").join("data.db");
            let db = Datastore::builder().filename(&path).autoload(true).open()?;
            db.insert(doc! { _id: 1 })?;
            assert_eq!(read_datafile(&path).len(), 1);

            std::fs::remove_dir_all(&root)?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_corrupt_lines_under_threshold_are_skipped() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let good: Vec<String> = (1..=10).map(|i| format!(r#"{{"_id":{}}}"#, i)).collect();
            let mut lines: Vec<&str> = good.iter().map(String::as_str).collect();
            lines.push("not json at all");
            lines.push("");
            write_datafile(ctx.path(), &lines);

            // 1 corrupt line out of 11 is under the default 10% threshold
            let db = ctx.reopen()?;
            assert_eq!(db.count(&doc! {})?, 10);
            // and it is gone after the load compaction
            assert_eq!(read_datafile(ctx.path()).len(), 10);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_corrupt_lines_over_threshold_fail_the_load() {
    run_test(
        create_memory_test_context,
        |ctx| {
            write_datafile(
                ctx.path(),
                &[r#"{"_id":1}"#, "{broken", r#"{"_id":2}"#, "[1, 2]"],
            );

            let err = ctx.reopen().err().unwrap();
            assert_eq!(err.kind(), &ErrorKind::CorruptRecord);
            // the file is left as found
            assert_eq!(read_datafile(ctx.path()).len(), 4);

            let tolerant = Datastore::builder()
                .filename(ctx.path())
                .corrupt_alert_threshold(0.5)
                .autoload(true)
                .open()?;
            assert_eq!(tolerant.count(&doc! {})?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_load_keeps_previous_state() {
    run_test(
        create_memory_test_context,
        |ctx| {
            let db = Datastore::builder().filename(ctx.path()).autoload(true).open()?;
            db.insert(doc! { _id: 1, name: "John" })?;

            write_datafile(ctx.path(), &["garbage", "more garbage"]);
            let err = db.load_database().unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::CorruptRecord);

            assert_eq!(db.load_state(), LoadState::Ready);
            let john = db.find_one(&doc! { _id: 1 }, None)?.unwrap();
            assert_eq!(john.get("name"), val!("John"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_in_memory_only_ignores_the_file() {
    run_test(
        create_memory_test_context,
        |ctx| {
            write_datafile(ctx.path(), &[r#"{"_id":1}"#]);
            let db = Datastore::builder()
                .filename(ctx.path())
                .in_memory_only(true)
                .autoload(true)
                .open()?;
            assert!(db.filename().is_none());
            assert_eq!(db.count(&doc! {})?, 0);

            db.insert(doc! { _id: 2 })?;
            assert_eq!(read_datafile(ctx.path()), vec![r#"{"_id":1}"#]);
            Ok(())
        },
        cleanup,
    )
}
