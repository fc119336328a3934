use std::thread;
use tidedb::collection::{multi, UpdateOptions};
use tidedb::index::{non_unique_index, unique_index};
use tidedb::{doc, val};
use tidedb_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_concurrent_writes() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(unique_index("seq"))?;
            db.ensure_index(non_unique_index("worker"))?;

            let handles: Vec<_> = (0..8)
                .map(|worker| {
                    let db = db.clone();
                    thread::spawn(move || {
                        for i in 0..50 {
                            db.insert(doc! { seq: (worker * 1000 + i), worker: worker })?;
                            db.count(&doc! { worker: worker })?;
                        }
                        db.update(
                            doc! { worker: worker },
                            doc! { "$set": { done: true } },
                            multi(),
                        )
                    })
                })
                .collect();

            for handle in handles {
                let result = handle.join().expect("worker panicked")?;
                assert_eq!(result.num_affected(), 50);
            }

            assert_eq!(db.count(&doc! {})?, 400);
            assert_eq!(db.count(&doc! { done: true })?, 400);
            assert_eq!(db.count(&doc! { worker: 3 })?, 50);

            let reopened = ctx.reopen()?;
            assert_eq!(reopened.count(&doc! { done: true })?, 400);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_readers_see_committed_state() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.insert(doc! { _id: "counter", value: 0 })?;

            let writer = {
                let db = db.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        db.update(
                            doc! { _id: "counter" },
                            doc! { "$inc": { value: 1 } },
                            UpdateOptions::default(),
                        )?;
                    }
                    Ok::<(), tidedb::errors::TideError>(())
                })
            };

            let readers: Vec<_> = (0..4)
                .map(|_| {
                    let db = db.clone();
                    thread::spawn(move || {
                        let mut last = 0;
                        for _ in 0..100 {
                            let counter = db.find_one(&doc! { _id: "counter" }, None)?;
                            let value = counter.map(|c| c.get("value").as_i64().unwrap_or(-1));
                            let value = value.unwrap_or(-1);
                            // the counter never goes backwards
                            assert!(value >= last);
                            last = value;
                        }
                        Ok::<(), tidedb::errors::TideError>(())
                    })
                })
                .collect();

            writer.join().expect("writer panicked")?;
            for reader in readers {
                reader.join().expect("reader panicked")?;
            }

            let counter = db.find_one(&doc! { _id: "counter" }, None)?.unwrap();
            assert_eq!(counter.get("value"), val!(100));
            Ok(())
        },
        cleanup,
    )
}
