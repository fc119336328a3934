use awaitility::at_most;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tidedb::collection::{RemoveOptions, UpdateOptions};
use tidedb::errors::ErrorKind;
use tidedb::{doc, val, Datastore, LoadState};
use tidedb_int_test::test_util::{
    cleanup, create_memory_test_context, create_test_docs, run_test, write_datafile,
};

fn seed_lines() -> Vec<&'static str> {
    vec![
        r#"{"_id":1,"name":"John","age":20,"role":"Developer"}"#,
        r#"{"_id":2,"name":"Mary","age":25,"role":"Project Manager"}"#,
        r#"{"_id":3,"name":"Emily","age":30,"role":"Developer"}"#,
        r#"{"_id":4,"name":"Peter","age":30,"role":"Business Analyst"}"#,
    ]
}

#[test]
fn test_onload_reports_success() {
    run_test(
        create_memory_test_context,
        |ctx| {
            write_datafile(ctx.path(), &seed_lines());
            let loaded = Arc::new(AtomicBool::new(false));
            let flag = loaded.clone();

            let db = Datastore::builder()
                .filename(ctx.path())
                .autoload(true)
                .onload(move |err| {
                    if err.is_none() {
                        flag.store(true, Ordering::SeqCst);
                    }
                })
                .build()?;

            at_most(Duration::from_secs(5)).until(|| loaded.load(Ordering::SeqCst));
            assert_eq!(db.load_state(), LoadState::Ready);
            assert_eq!(db.get_all_data()?, create_test_docs());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_onload_reports_failure() {
    run_test(
        create_memory_test_context,
        |ctx| {
            write_datafile(ctx.path(), &["garbage"]);
            let reported: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
            let slot = reported.clone();

            let db = Datastore::builder()
                .filename(ctx.path())
                .autoload(true)
                .onload(move |err| {
                    if let Some(err) = err {
                        *slot.lock() = Some(err.kind().to_string());
                    }
                })
                .build()?;

            at_most(Duration::from_secs(5)).until(|| reported.lock().is_some());
            assert_eq!(*reported.lock(), Some(ErrorKind::CorruptRecord.to_string()));
            assert_eq!(db.load_state(), LoadState::Unloaded);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_onload_can_use_the_datastore() {
    run_test(
        create_memory_test_context,
        |ctx| {
            write_datafile(ctx.path(), &seed_lines());
            let (db_sender, db_receiver) = mpsc::channel::<Datastore>();
            let db_receiver = Mutex::new(db_receiver);
            let (count_sender, count_receiver) = mpsc::channel::<usize>();

            let db = Datastore::builder()
                .filename(ctx.path())
                .autoload(true)
                .onload(move |_| {
                    // calls made from the callback must not wait behind it
                    if let Ok(db) = db_receiver.lock().recv() {
                        if let Ok(inserted) = db.insert(doc! { _id: 5, name: "Ann" }) {
                            assert_eq!(inserted.get("name"), val!("Ann"));
                        }
                        if let Ok(count) = db.count(&doc! {}) {
                            let _ = count_sender.send(count);
                        }
                    }
                })
                .build()?;
            db_sender.send(db.clone()).expect("onload is waiting for the datastore");

            let count = count_receiver
                .recv_timeout(Duration::from_secs(5))
                .expect("onload did not report a count");
            assert_eq!(count, 5);
            assert_eq!(db.count(&doc! {})?, 5);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_datastore_methods_flow() {
    run_test(
        create_memory_test_context,
        |ctx| {
            write_datafile(ctx.path(), &seed_lines());
            let db = Datastore::builder()
                .filename(ctx.path())
                .autoload(true)
                .open()?;

            db.insert(doc! { _id: 5, name: "Ann", age: 35, role: "Designer" })?;
            let names: Vec<_> = db
                .find(&doc! {}, Some(&doc! { name: 1, _id: 0 }))?
                .iter()
                .map(|d| d.get("name"))
                .collect();
            assert_eq!(
                names,
                vec![val!("John"), val!("Mary"), val!("Emily"), val!("Peter"), val!("Ann")]
            );

            let ann = db.find_one(&doc! { _id: 5 }, Some(&doc! { name: 1 }))?;
            assert_eq!(ann, Some(doc! { _id: 5, name: "Ann" }));

            db.update(doc! { _id: 1 }, doc! { "$set": { age: 35 } }, UpdateOptions::default())?;
            let john = db
                .find_one_cursor(doc! { age: 35, name: "John" })
                .projection(doc! { _id: 0, age: 1 })
                .exec()?;
            assert_eq!(john, Some(doc! { age: 35 }));

            assert_eq!(db.remove(doc! { _id: 5 }, RemoveOptions::default())?, 1);
            assert_eq!(db.count(&doc! { age: 35 })?, 1);

            let reopened = ctx.reopen()?;
            assert_eq!(reopened.count(&doc! {})?, 4);
            assert_eq!(
                reopened.find_one(&doc! { _id: 1 }, None)?.unwrap().get("age"),
                val!(35)
            );
            Ok(())
        },
        cleanup,
    )
}
