use tidedb::collection::{Document, UpdateOptions};
use tidedb::common::{ProcessorProvider, Value};
use tidedb::errors::{ErrorKind, TideError, TideResult};
use tidedb::{doc, val, Datastore};
use tidedb_int_test::test_util::{cleanup, create_memory_test_context, random_path, run_test};

struct KeyTagger;

impl ProcessorProvider for KeyTagger {
    fn name(&self) -> String {
        "KeyTagger".to_string()
    }

    fn before_insert(&self, mut doc: Document) -> TideResult<Document> {
        doc.put("key", "value")?;
        Ok(doc)
    }
}

struct RevisionCounter;

impl ProcessorProvider for RevisionCounter {
    fn name(&self) -> String {
        "RevisionCounter".to_string()
    }

    fn before_update(&self, mut doc: Document) -> TideResult<Document> {
        let revision = doc.get("revision").as_i64().unwrap_or(0);
        doc.put("revision", revision + 1)?;
        Ok(doc)
    }
}

struct NameRequired;

impl ProcessorProvider for NameRequired {
    fn name(&self) -> String {
        "NameRequired".to_string()
    }

    fn before_insert(&self, doc: Document) -> TideResult<Document> {
        if doc.get("name").as_str().is_none() {
            return Err(TideError::new("name is required", ErrorKind::ValidationError));
        }
        Ok(doc)
    }
}

struct Upgrader;

impl ProcessorProvider for Upgrader {
    fn name(&self) -> String {
        "Upgrader".to_string()
    }

    fn after_load(&self, docs: Vec<Document>) -> TideResult<Vec<Document>> {
        docs.into_iter()
            .map(|mut doc| {
                if doc.get("version").is_undefined() {
                    doc.put("version", 2)?;
                }
                Ok(doc)
            })
            .collect()
    }
}

#[test]
fn test_before_insert_transforms_documents() {
    run_test(
        create_memory_test_context,
        |_| {
            let db = Datastore::builder().add_processor(KeyTagger).open()?;
            let inserted = db.insert(doc! { name: "John" })?;
            assert_eq!(inserted.get("key"), val!("value"));
            assert_eq!(db.count(&doc! { key: "value" })?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_before_update_runs_on_each_update() {
    run_test(
        create_memory_test_context,
        |_| {
            let db = Datastore::builder().add_processor(RevisionCounter).open()?;
            db.insert(doc! { _id: 1, name: "John" })?;
            db.update(doc! { _id: 1 }, doc! { "$set": { age: 20 } }, UpdateOptions::default())?;
            db.update(doc! { _id: 1 }, doc! { "$set": { age: 21 } }, UpdateOptions::default())?;

            let john = db.find_one(&doc! { _id: 1 }, None)?.unwrap();
            assert_eq!(john.get("revision"), val!(2));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_processor_error_aborts_the_write() {
    run_test(
        create_memory_test_context,
        |_| {
            let db = Datastore::builder()
                .add_processor(KeyTagger)
                .add_processor(NameRequired)
                .open()?;

            let err = db
                .insert_many(vec![doc! { name: "John" }, doc! { age: 20 }])
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            assert_eq!(err.message(), "name is required");
            assert_eq!(db.count(&doc! {})?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_after_load_rewrites_loaded_documents() {
    run_test(
        create_memory_test_context,
        |_| {
            let path = random_path();
            let db = Datastore::builder().filename(&path).autoload(true).open()?;
            db.insert(doc! { _id: 1, name: "John" })?;
            db.insert(doc! { _id: 2, name: "Mary", version: 1 })?;

            let reopened = Datastore::builder()
                .filename(&path)
                .autoload(true)
                .add_processor(Upgrader)
                .open()?;
            let versions: Vec<Value> = reopened
                .find(&doc! {}, None)?
                .iter()
                .map(|d| d.get("version"))
                .collect();
            assert_eq!(versions, vec![val!(2), val!(1)]);

            std::fs::remove_file(&path).ok();
            Ok(())
        },
        cleanup,
    )
}
