use parking_lot::Mutex;
use std::time::Duration;
use timer::{Guard, Timer};

/// Spawn a task on a new thread.
pub fn async_task<OP>(op: OP)
where
    OP: FnOnce() + Send + 'static,
{
    std::thread::spawn(op);
}

/// Runs repeating tasks on a timer thread.
///
/// A task keeps running until [Scheduler::stop] is called or the scheduler is
/// dropped.
pub(crate) struct Scheduler {
    timer: Timer,
    guards: Mutex<Vec<Guard>>,
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler {
            timer: Timer::new(),
            guards: Mutex::from(Vec::with_capacity(1)),
        }
    }

    pub fn schedule<F>(&self, duration: Duration, f: F)
    where
        F: 'static + FnMut() + Send,
    {
        match chrono::Duration::from_std(duration) {
            Ok(chrono_duration) => {
                let guard = self.timer.schedule_repeating(chrono_duration, f);
                self.guards.lock().push(guard);
            }
            Err(e) => {
                log::error!(
                    "Failed to convert duration to chrono::Duration: {}, skipping task scheduling",
                    e
                );
            }
        }
    }

    pub fn stop(&self) {
        self.guards.lock().clear();
    }

    pub fn is_running(&self) -> bool {
        !self.guards.lock().is_empty()
    }
}
