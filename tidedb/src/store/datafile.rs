use crate::collection::Document;
use crate::common::{Value, TEMP_FILE_SUFFIX};
use crate::errors::{ErrorKind, TideError, TideResult};
use crate::index::IndexOptions;
use crate::store::{decode_record, encode_record, LogRecord};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// State replayed from a datafile.
#[derive(Debug, Default)]
pub struct LoadedData {
    /// Live documents in insertion order.
    pub documents: Vec<Document>,
    /// Index definitions, except the implicit `_id` index.
    pub indexes: Vec<IndexOptions>,
}

/// The append-only log backing a datastore.
///
/// Every mutation appends one line per affected document. Loading replays the
/// log from the beginning; compaction rewrites it with one line per live
/// document through a temporary `<file>~` that is renamed over the datafile.
/// A datafile without a path is in-memory: it loads nothing and writes nothing.
pub struct Datafile {
    path: Option<PathBuf>,
    corrupt_alert_threshold: f64,
}

impl Datafile {
    pub fn new(path: Option<PathBuf>, corrupt_alert_threshold: f64) -> Datafile {
        Datafile {
            path,
            corrupt_alert_threshold,
        }
    }

    pub fn in_memory() -> Datafile {
        Datafile::new(None, 0.0)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }

    /// Replays the datafile.
    ///
    /// Corrupt lines are skipped with a warning unless their share of the
    /// non-blank lines exceeds the corruption threshold, in which case
    /// nothing is loaded.
    pub fn load(&self) -> TideResult<LoadedData> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(LoadedData::default()),
        };

        self.ensure_integrity(path)?;
        let content = fs::read_to_string(path)?;

        let mut documents: BTreeMap<Value, (u64, Document)> = BTreeMap::new();
        let mut indexes: IndexMap<String, IndexOptions> = IndexMap::new();
        let mut sequence = 0u64;
        let mut total = 0usize;
        let mut corrupt = 0usize;

        for (line_number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            total += 1;

            let record = match decode_record(line) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!(
                        "Skipping corrupt record at line {} of {}: {}",
                        line_number + 1,
                        path.display(),
                        e
                    );
                    corrupt += 1;
                    continue;
                }
            };

            match record {
                LogRecord::Document(document) => match document.id().cloned() {
                    Some(id) => {
                        // an update keeps the position of the first appearance
                        let seq = match documents.get(&id) {
                            Some((seq, _)) => *seq,
                            None => {
                                sequence += 1;
                                sequence
                            }
                        };
                        documents.insert(id, (seq, document));
                    }
                    None => {
                        log::warn!(
                            "Skipping record without _id at line {} of {}",
                            line_number + 1,
                            path.display()
                        );
                        corrupt += 1;
                    }
                },
                LogRecord::Deleted(id) => {
                    documents.remove(&id);
                }
                LogRecord::IndexCreated(options) => {
                    indexes.insert(options.field_name().to_string(), options);
                }
                LogRecord::IndexRemoved(field_name) => {
                    indexes.shift_remove(&field_name);
                }
            }
        }

        if total > 0 && corrupt as f64 / total as f64 > self.corrupt_alert_threshold {
            log::error!(
                "{} of {} records in {} are corrupt, more than the {} threshold",
                corrupt,
                total,
                path.display(),
                self.corrupt_alert_threshold
            );
            return Err(TideError::new(
                &format!(
                    "More than {}% of the data file is corrupt ({} of {} records), \
                     the wrong file may have been loaded",
                    self.corrupt_alert_threshold * 100.0,
                    corrupt,
                    total
                ),
                ErrorKind::CorruptRecord,
            ));
        }

        let mut ordered: Vec<(u64, Document)> = documents.into_values().collect();
        ordered.sort_by_key(|(seq, _)| *seq);

        Ok(LoadedData {
            documents: ordered.into_iter().map(|(_, doc)| doc).collect(),
            indexes: indexes.into_values().collect(),
        })
    }

    /// Appends records and flushes them to disk before returning.
    pub fn append(&self, records: &[LogRecord]) -> TideResult<()> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };
        if records.is_empty() {
            return Ok(());
        }

        // encode everything first so a bad record writes nothing
        let mut buffer = String::new();
        for record in records {
            buffer.push_str(&encode_record(record)?);
            buffer.push('\n');
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        append_or_rollback(&mut file, buffer.as_bytes(), |file, bytes| {
            file.write_all(bytes)?;
            file.sync_all()
        })
    }

    /// Rewrites the datafile with the given index definitions and documents.
    pub fn compact(&self, indexes: &[IndexOptions], documents: &[Document]) -> TideResult<()> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };

        let mut buffer = String::new();
        for options in indexes {
            buffer.push_str(&encode_record(&LogRecord::IndexCreated(options.clone()))?);
            buffer.push('\n');
        }
        for document in documents {
            buffer.push_str(&encode_record(&LogRecord::Document(document.clone()))?);
            buffer.push('\n');
        }

        let temp_path = temp_path(path);
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(buffer.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path)?;
        sync_parent_dir(path);

        log::debug!(
            "Compacted {} to {} documents",
            path.display(),
            documents.len()
        );
        Ok(())
    }

    fn ensure_integrity(&self, path: &Path) -> TideResult<()> {
        if path.exists() {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = temp_path(path);
        if temp_path.exists() {
            // a compaction was interrupted after the temp file was complete
            log::warn!(
                "Datafile {} missing, recovering from {}",
                path.display(),
                temp_path.display()
            );
            fs::rename(&temp_path, path)?;
        } else {
            File::create(path)?.sync_all()?;
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TEMP_FILE_SUFFIX);
    PathBuf::from(name)
}

fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // not every platform can open or sync a directory
    if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
        log::debug!("Could not sync directory {}: {}", parent.display(), e);
    }
}

/// Runs `write` against the end of `file`. On failure the file is cut back
/// to its previous length, so no partial line is left behind.
fn append_or_rollback<W>(file: &mut File, bytes: &[u8], write: W) -> TideResult<()>
where
    W: FnOnce(&mut File, &[u8]) -> io::Result<()>,
{
    let original_len = file.metadata()?.len();
    if let Err(e) = write(file, bytes) {
        log::error!("Failed to append to the datafile: {}", e);
        if let Err(rollback) = file.set_len(original_len).and_then(|_| file.sync_all()) {
            log::error!("Failed to roll back a partial append: {}", rollback);
        }
        return Err(e.into());
    }
    Ok(())
}
