use tidedb::collection::{multi, remove_all};
use tidedb::errors::TideResult;
use tidedb::index::non_unique_index;
use tidedb::doc;
use tidedb_int_test::test_util::{cleanup, create_test_context};

fn main() -> TideResult<()> {
    println!("Starting stress test...");
    let ctx = create_test_context()?;
    let db = ctx.db();
    db.ensure_index(non_unique_index("failed"))?;

    let count = 100_000;
    let start = std::time::Instant::now();
    for _ in 0..count {
        db.insert(doc! {
            first_name: (uuid::Uuid::new_v4().to_string()),
            last_name: (uuid::Uuid::new_v4().to_string()),
            processed: false,
            failed: false,
        })?;
    }
    println!("Inserted {} records in {:?}", count, start.elapsed());

    let start = std::time::Instant::now();
    let found = db.count(&doc! { failed: false })?;
    println!("Counted {} pending records in {:?}", found, start.elapsed());

    let start = std::time::Instant::now();
    let result = db.update(doc! {}, doc! { "$set": { processed: true } }, multi())?;
    println!("Updated {} records in {:?}", result.num_affected(), start.elapsed());

    let start = std::time::Instant::now();
    db.compact_datafile()?;
    println!("Compacted the datafile in {:?}", start.elapsed());

    let start = std::time::Instant::now();
    let db = ctx.reopen()?;
    println!(
        "Reloaded {} processed records in {:?}",
        db.count(&doc! { processed: true })?,
        start.elapsed()
    );

    db.remove(doc! {}, remove_all())?;
    cleanup(ctx)
}
