use crate::common::EXECUTOR_THREAD_NAME;
use crate::errors::{ErrorKind, TideError, TideResult};
use crossbeam_channel::{Receiver, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::ThreadId;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A strictly ordered, single consumer task queue.
///
/// Tasks are executed one at a time on a dedicated worker thread in the order
/// they were submitted. A task submitted from the worker thread itself (for
/// example by a callback running inside another task) is executed inline, so
/// nested submissions never wait on themselves.
///
/// The worker thread exits once the executor is dropped and the queue drains.
pub(crate) struct Executor {
    sender: Sender<Task>,
    worker: ThreadId,
}

impl Executor {
    pub fn new() -> TideResult<Executor> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Task>();
        let handle = std::thread::Builder::new()
            .name(EXECUTOR_THREAD_NAME.to_string())
            .spawn(move || {
                for task in receiver.iter() {
                    task();
                }
                log::debug!("Executor queue closed, worker thread exiting");
            })
            .map_err(|e| {
                log::error!("Failed to start executor thread: {}", e);
                TideError::new(
                    &format!("Failed to start executor thread: {}", e),
                    ErrorKind::InternalError,
                )
            })?;

        Ok(Executor {
            sender,
            worker: handle.thread().id(),
        })
    }

    /// Whether the calling thread is the worker thread.
    pub fn on_worker(&self) -> bool {
        std::thread::current().id() == self.worker
    }

    /// Enqueues a task without waiting for it; the result is delivered on the
    /// returned receiver.
    pub fn execute<T, F>(&self, f: F) -> TideResult<Receiver<TideResult<T>>>
    where
        T: Send + 'static,
        F: FnOnce() -> TideResult<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let task: Task = Box::new(move || {
            let result = run_guarded(f);
            // the caller may have stopped listening, nothing to do then
            let _ = reply_tx.send(result);
        });

        if self.on_worker() {
            task();
            return Ok(reply_rx);
        }

        self.sender.send(task).map_err(|_| {
            log::error!("Executor queue is closed");
            TideError::new("Executor queue is closed", ErrorKind::InternalError)
        })?;
        Ok(reply_rx)
    }

    /// Enqueues a task and blocks until it completes.
    pub fn submit<T, F>(&self, f: F) -> TideResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> TideResult<T> + Send + 'static,
    {
        let reply = self.execute(f)?;
        reply.recv().map_err(|_| {
            log::error!("Executor dropped the task before completion");
            TideError::new(
                "Executor dropped the task before completion",
                ErrorKind::InternalError,
            )
        })?
    }
}

fn run_guarded<T, F>(f: F) -> TideResult<T>
where
    F: FnOnce() -> TideResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Task panicked on executor thread: {}", reason);
            Err(TideError::new(
                &format!("Task panicked: {}", reason),
                ErrorKind::InternalError,
            ))
        }
    }
}
