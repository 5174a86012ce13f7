//! Queue decoupling
//!
//! `QueueHandler` is a cheap producer-side handler: it pre-renders the
//! record and enqueues it on a bounded channel. `QueueListener` owns the
//! consumer side: one worker thread that drains the channel and dispatches
//! each record through a fixed set of real handlers. Slow sinks (files,
//! sockets, mail) then cost the logging call site one channel push.

use crate::core::error::{LogError, Result};
use crate::core::handler::{Handler, HandlerCore};
use crate::core::record::LogRecord;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// What `emit` does when the channel is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullQueuePolicy {
    /// Block until space frees up. Couples the caller to consumer speed.
    Block,
    /// Block up to the given duration, then drop the new record.
    BlockWithTimeout(Duration),
    /// Drop the incoming record. The default: the producer fast path never
    /// blocks, and the drop is visible through the error hook.
    #[default]
    DropNewest,
    /// Evict the oldest queued record to make room for the new one.
    DropOldest,
}

enum QueueMessage {
    Record(LogRecord),
    Shutdown,
}

/// Producer half: enqueues pre-rendered records.
pub struct QueueHandler {
    core: HandlerCore,
    sender: Sender<QueueMessage>,
    /// Shared with the listener; `DropOldest` pops through it.
    receiver: Receiver<QueueMessage>,
    policy: FullQueuePolicy,
    capacity: usize,
    stopping: Arc<AtomicBool>,
}

impl QueueHandler {
    pub fn policy(&self) -> FullQueuePolicy {
        self.policy
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn enqueue(&self, message: QueueMessage) -> Result<()> {
        match self.policy {
            FullQueuePolicy::Block => self
                .sender
                .send(message)
                .map_err(|_| LogError::QueueStopped),
            FullQueuePolicy::BlockWithTimeout(timeout) => {
                self.sender.send_timeout(message, timeout).map_err(|e| {
                    if e.is_disconnected() {
                        LogError::QueueStopped
                    } else {
                        LogError::QueueFull {
                            capacity: self.capacity,
                        }
                    }
                })
            }
            FullQueuePolicy::DropNewest => match self.sender.try_send(message) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(LogError::QueueFull {
                    capacity: self.capacity,
                }),
                Err(TrySendError::Disconnected(_)) => Err(LogError::QueueStopped),
            },
            FullQueuePolicy::DropOldest => self.enqueue_dropping_oldest(message),
        }
    }

    fn enqueue_dropping_oldest(&self, message: QueueMessage) -> Result<()> {
        let mut message = message;
        loop {
            message = match self.sender.try_send(message) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Disconnected(_)) => return Err(LogError::QueueStopped),
                Err(TrySendError::Full(returned)) => returned,
            };
            match self.receiver.try_recv() {
                Ok(QueueMessage::Record(_)) => {
                    // Oldest record evicted; retry the push.
                }
                Ok(QueueMessage::Shutdown) => {
                    // Never eat the shutdown sentinel: the worker drains
                    // until it sees it, so it must go back even if racing
                    // producers filled the freed slot.
                    self.restore_shutdown();
                    return Err(LogError::QueueStopped);
                }
                // Consumer raced us and made room; retry the push.
                Err(_) => {}
            }
        }
    }

    /// Re-enqueue the shutdown sentinel after it was popped while making
    /// room. Evicts queued records until the sentinel fits: records are
    /// droppable under this policy, the sentinel is not.
    fn restore_shutdown(&self) {
        let mut sentinel = QueueMessage::Shutdown;
        loop {
            sentinel = match self.sender.try_send(sentinel) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(returned)) => returned,
            };
            let _ = self.receiver.try_recv();
        }
    }
}

impl Handler for QueueHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        if self.stopping.load(Ordering::Acquire) {
            return Err(LogError::QueueStopped);
        }
        // Collapse args into the message now; the consumer runs later, on
        // another thread, and must not re-render.
        let prepared = record.clone().into_prepared();
        self.enqueue(QueueMessage::Record(prepared))
    }
}

/// Consumer half: one worker thread dispatching queued records through the
/// configured handlers.
pub struct QueueListener {
    receiver: Receiver<QueueMessage>,
    sender: Sender<QueueMessage>,
    handlers: Arc<Vec<Arc<dyn Handler>>>,
    stopping: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueueListener {
    /// Spawn the worker thread. Idempotent: a second call while the worker
    /// is alive does nothing.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        let receiver = self.receiver.clone();
        let handlers = Arc::clone(&self.handlers);
        let handle = std::thread::Builder::new()
            .name("logtree-queue-listener".to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    match message {
                        QueueMessage::Record(record) => {
                            for handler in handlers.iter() {
                                handler.handle(&record);
                            }
                        }
                        QueueMessage::Shutdown => break,
                    }
                }
            });
        match handle {
            Ok(handle) => *worker = Some(handle),
            Err(e) => {
                crate::core::handler::report_error(
                    "queue-listener",
                    &LogError::other(format!("cannot spawn worker thread: {}", e)),
                );
            }
        }
    }

    /// Stop accepting records, drain everything already enqueued, and join
    /// the worker. Records enqueued before the call are all dispatched, in
    /// order, before this returns. If the worker was never started, the
    /// queue is drained on the calling thread instead.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::Release);
        let handle = self.worker.lock().take();
        match handle {
            Some(handle) => {
                // The worker is draining, so a blocking send always completes.
                let _ = self.sender.send(QueueMessage::Shutdown);
                let _ = handle.join();
            }
            None => {
                while let Ok(QueueMessage::Record(record)) = self.receiver.try_recv() {
                    for handler in self.handlers.iter() {
                        handler.handle(&record);
                    }
                }
            }
        }
        for handler in self.handlers.iter() {
            if let Err(e) = handler.flush() {
                crate::core::handler::report_error(handler.name(), &e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }
}

impl Drop for QueueListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build a connected producer/consumer pair over one bounded channel.
///
/// # Examples
///
/// ```
/// use logtree::handlers::{queue_pair, FullQueuePolicy, NullHandler};
/// use logtree::{get_logger, Handler};
/// use std::sync::Arc;
///
/// let sink: Arc<dyn Handler> = Arc::new(NullHandler::new());
/// let (handler, listener) = queue_pair(1024, FullQueuePolicy::default(), vec![sink]);
/// listener.start();
/// get_logger("app").add_handler(handler);
/// // ... at shutdown:
/// listener.stop();
/// ```
pub fn queue_pair(
    capacity: usize,
    policy: FullQueuePolicy,
    handlers: Vec<Arc<dyn Handler>>,
) -> (Arc<QueueHandler>, QueueListener) {
    let capacity = capacity.max(1);
    let (sender, receiver) = bounded(capacity);
    let stopping = Arc::new(AtomicBool::new(false));

    let handler = Arc::new(QueueHandler {
        core: HandlerCore::new("queue"),
        sender: sender.clone(),
        receiver: receiver.clone(),
        policy,
        capacity,
        stopping: Arc::clone(&stopping),
    });
    let listener = QueueListener {
        receiver,
        sender,
        handlers: Arc::new(handlers),
        stopping,
        worker: Mutex::new(None),
    };
    (handler, listener)
}
