use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use std::{env, fs, thread};
use tidedb::collection::Document;
use tidedb::errors::TideResult;
use tidedb::{doc, Datastore};

/// Runs a test with retry logic and error handling.
///
/// `after` runs whether the test succeeds or not; a panic inside the test
/// skips it, so every context lives under its own random path.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> TideResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> TideResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> TideResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx)
                        .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        let failure = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_backtrace = Some(bt);
                e
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_backtrace = Some(Backtrace::capture().to_string());
                format!("Panic: {}", err_msg)
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("{}", failure);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(failure);
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    path: PathBuf,
    db: Datastore,
}

impl TestContext {
    pub fn new(path: PathBuf, db: Datastore) -> Self {
        Self { path, db }
    }

    /// Path of the datafile, whether or not the datastore persists to it.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn db(&self) -> Datastore {
        self.db.clone()
    }

    /// Opens a second datastore on the same datafile, as a restart would.
    pub fn reopen(&self) -> TideResult<Datastore> {
        Datastore::builder()
            .filename(&self.path)
            .autoload(true)
            .open()
    }
}

pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir()
        .join("tidedb-int-test")
        .join(format!("{}.db", id))
}

/// A persistent datastore on a fresh datafile, loaded before it is returned.
pub fn create_test_context() -> TideResult<TestContext> {
    let path = random_path();
    let db = Datastore::builder()
        .filename(&path)
        .autoload(true)
        .open()?;
    Ok(TestContext::new(path, db))
}

pub fn create_memory_test_context() -> TideResult<TestContext> {
    let path = random_path();
    let db = Datastore::builder().open()?;
    Ok(TestContext::new(path, db))
}

/// A persistent datastore preloaded with [create_test_docs].
pub fn create_seeded_test_context() -> TideResult<TestContext> {
    let ctx = create_test_context()?;
    ctx.db().insert_many(create_test_docs())?;
    Ok(ctx)
}

pub fn create_test_docs() -> Vec<Document> {
    vec![
        doc! { _id: 1, name: "John", age: 20, role: "Developer" },
        doc! { _id: 2, name: "Mary", age: 25, role: "Project Manager" },
        doc! { _id: 3, name: "Emily", age: 30, role: "Developer" },
        doc! { _id: 4, name: "Peter", age: 30, role: "Business Analyst" },
    ]
}

/// Writes `lines` as a datafile, one per line.
pub fn write_datafile(path: &Path, lines: &[&str]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create test directory");
    }
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(path, content).expect("Failed to write datafile");
}

/// Non-blank lines of a datafile.
pub fn read_datafile(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

pub fn temp_file_of(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push("~");
    PathBuf::from(name)
}

pub fn cleanup(ctx: TestContext) -> TideResult<()> {
    ctx.db().stop_autocompaction();

    for path in [ctx.path().to_path_buf(), temp_file_of(ctx.path())] {
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        if let Err(e) = removed {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove test file {}: {}", path.display(), e);
            }
        }
    }
    Ok(())
}
