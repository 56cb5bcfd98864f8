//! Handoff of managed-runtime callbacks onto the JavaScript thread
//!
//! JavaScript state may only be touched from the thread that initialized the
//! bridge. A callback arriving on any other thread is queued here and the
//! caller blocks until the JavaScript thread drains the queue and replies.

use std::thread::{self, ThreadId};

use conduit_sdk::{BridgeError, BridgeResult};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::Bridge;

type Job = Box<dyn FnOnce(&Bridge) + Send>;

/// Single-consumer job queue owned by the JavaScript thread
pub struct JsThreadExecutor {
    owner: ThreadId,
    sender: Mutex<Option<Sender<Job>>>,
    receiver: Receiver<Job>,
}

impl JsThreadExecutor {
    /// Create an executor owned by the calling thread
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            owner: thread::current().id(),
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// Whether the caller is the JavaScript thread
    pub fn is_js_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Run `job` on the JavaScript thread and wait for its result
    pub fn run_on_js_thread<T, F>(&self, job: F) -> BridgeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Bridge) -> BridgeResult<T> + Send + 'static,
    {
        let (reply, result) = channel::bounded(1);
        {
            // Enqueue under the lock so `close` cannot miss the job.
            let sender = self.sender.lock();
            sender
                .as_ref()
                .ok_or(BridgeError::ShutDown)?
                .send(Box::new(move |bridge: &Bridge| {
                    let _ = reply.send(job(bridge));
                }))
                .map_err(|_| BridgeError::ShutDown)?;
        }
        result.recv().map_err(|_| BridgeError::ShutDown)?
    }

    /// Run every queued job; returns how many ran
    pub fn drain(&self, bridge: &Bridge) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job(bridge);
            ran += 1;
        }
        ran
    }

    /// Stop accepting jobs. Queued jobs are dropped, which fails their
    /// waiting callers with `ShutDown`.
    pub fn close(&self) {
        self.sender.lock().take();
        while let Ok(job) = self.receiver.try_recv() {
            drop(job);
        }
    }

    /// Number of jobs waiting
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for JsThreadExecutor {
    fn default() -> Self {
        Self::new()
    }
}
