// 定时任务
// Named periodic tasks, each on its own thread.

use log::{debug, info};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to a running periodic task. Dropping it stops the task.
pub struct PeriodicTask {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the task and wait for a tick in progress to finish
    pub fn stop(&mut self) {
        // Dropping the sender wakes the thread
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("task {} panicked", self.name);
            }
            info!("task {} stopped", self.name);
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct Scheduler;

impl Scheduler {
    /// Run `task` every `period` on a dedicated thread, first tick after one
    /// period. A tick that overruns delays the next one; ticks never overlap.
    pub fn spawn<F>(name: &str, period: Duration, task: F) -> std::io::Result<PeriodicTask>
    where
        F: Fn() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread_name = name.to_string();
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            debug!("task {} started, period {:?}", thread_name, period);
            loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => task(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })?;
        info!("task {} scheduled every {:?}", name, period);
        Ok(PeriodicTask {
            name: name.to_string(),
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }
}
