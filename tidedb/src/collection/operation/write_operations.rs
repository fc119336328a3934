use crate::collection::modifier::{is_modifier_update, modify};
use crate::collection::snapshot::Snapshot;
use crate::collection::{Document, RemoveOptions, UpdateOptions, UpdateResult};
use crate::common::util::{generate_id, validate_document};
use crate::common::{ProcessorChain, Value, CREATED_AT, DOC_ID, UPDATED_AT};
use crate::errors::TideResult;
use crate::filter::parse_query;
use crate::store::LogRecord;
use chrono::{SubsecRound, Utc};

/// Insert, update and remove against a scratch snapshot.
///
/// Every operation returns the log records describing its effect. The caller
/// appends them and publishes the snapshot; on error the snapshot is simply
/// dropped.
#[derive(Clone)]
pub(crate) struct WriteOperations {
    processor_chain: ProcessorChain,
    timestamp_data: bool,
}

impl WriteOperations {
    pub fn new(processor_chain: ProcessorChain, timestamp_data: bool) -> Self {
        WriteOperations {
            processor_chain,
            timestamp_data,
        }
    }

    pub fn insert_many(
        &self,
        snapshot: &mut Snapshot,
        documents: Vec<Document>,
    ) -> TideResult<(Vec<Document>, Vec<LogRecord>)> {
        let mut inserted = Vec::with_capacity(documents.len());
        let mut records = Vec::with_capacity(documents.len());
        for document in documents {
            let document = self.insert_one(snapshot, document)?;
            records.push(LogRecord::Document(document.clone()));
            inserted.push(document);
        }
        Ok((inserted, records))
    }

    pub fn update(
        &self,
        snapshot: &mut Snapshot,
        query: &Document,
        update: &Document,
        options: &UpdateOptions,
    ) -> TideResult<(UpdateResult, Vec<LogRecord>)> {
        let filter = parse_query(query)?;
        let modifier_update = is_modifier_update(update)?;

        let mut matched = snapshot.find(&filter)?;
        if !options.is_multi() {
            matched.truncate(1);
        }

        if matched.is_empty() {
            if !options.is_upsert() {
                return Ok((UpdateResult::default(), vec![]));
            }

            let to_insert = if modifier_update {
                modify(&upsert_base(query)?, update)?
            } else {
                update.clone()
            };
            let document = self.insert_one(snapshot, to_insert)?;
            log::debug!("Upserted document {}", document);
            let record = LogRecord::Document(document.clone());
            return Ok((UpdateResult::new(1, true, vec![document]), vec![record]));
        }

        let now = self.now();
        let mut pairs = Vec::with_capacity(matched.len());
        for old in matched {
            let mut new = modify(&old, update)?;
            if let Some(now) = &now {
                match old.field(CREATED_AT) {
                    Some(created_at) => new.put(CREATED_AT, created_at.clone())?,
                    None => {
                        new.remove(CREATED_AT);
                    }
                }
                new.put(UPDATED_AT, now.clone())?;
            }
            let new = self.processor_chain.before_update(new)?;
            validate_document(&new)?;
            pairs.push((old, new.id_first()));
        }

        let updated: Vec<Document> = pairs.iter().map(|(_, new)| new.clone()).collect();
        snapshot.replace_many(pairs)?;

        let records = updated.iter().cloned().map(LogRecord::Document).collect();
        let affected = if options.is_return_updated_docs() {
            updated.clone()
        } else {
            vec![]
        };
        Ok((UpdateResult::new(updated.len(), false, affected), records))
    }

    pub fn remove(
        &self,
        snapshot: &mut Snapshot,
        query: &Document,
        options: &RemoveOptions,
    ) -> TideResult<(usize, Vec<LogRecord>)> {
        let filter = parse_query(query)?;
        let mut matched = snapshot.find(&filter)?;
        if !options.is_multi() {
            matched.truncate(1);
        }

        let mut records = Vec::with_capacity(matched.len());
        for document in matched {
            if let Some(id) = document.id() {
                if snapshot.remove(id)?.is_some() {
                    records.push(LogRecord::Deleted(id.clone()));
                }
            }
        }
        Ok((records.len(), records))
    }

    fn insert_one(&self, snapshot: &mut Snapshot, document: Document) -> TideResult<Document> {
        let mut document = self.processor_chain.before_insert(document)?;

        if !document.has_id() {
            let mut id = Value::from(generate_id());
            while snapshot.contains(&id) {
                id = Value::from(generate_id());
            }
            document.put(DOC_ID, id)?;
        }

        if let Some(now) = self.now() {
            if !document.contains_key(CREATED_AT) {
                document.put(CREATED_AT, now.clone())?;
            }
            if !document.contains_key(UPDATED_AT) {
                document.put(UPDATED_AT, now)?;
            }
        }

        validate_document(&document)?;
        let document = document.id_first();
        snapshot.insert(document.clone())?;
        Ok(document)
    }

    fn now(&self) -> Option<Value> {
        if self.timestamp_data {
            // the datafile keeps milliseconds
            Some(Value::Date(Utc::now().trunc_subsecs(3)))
        } else {
            None
        }
    }
}

/// The plain equality fields of a query, used as the starting point of an
/// upserted document.
fn upsert_base(query: &Document) -> TideResult<Document> {
    let mut base = Document::new();
    for (field, value) in query.iter() {
        if field.starts_with('$') {
            continue;
        }
        match value {
            Value::Regex(_) => continue,
            Value::Document(doc) if doc.keys().any(|k| k.starts_with('$')) => continue,
            _ => base.put(field, value.clone())?,
        }
    }
    Ok(base)
}
