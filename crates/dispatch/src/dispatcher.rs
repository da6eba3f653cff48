//! FIFO task queue drained on the host update tick.

use agentworld_core::{error_envelope, ErrorCode};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

/// A unit of work executed on the main thread.
pub type TaskFn = Box<dyn FnOnce() -> Value + Send + 'static>;

struct QueuedTask {
    task: TaskFn,
    /// Present for blocking callers; `None` for fire-and-forget submissions.
    reply: Option<oneshot::Sender<Value>>,
}

/// Bridge between HTTP worker tasks and the host's single update thread.
///
/// Workers enqueue closures; the tick thread drains every task pending at
/// the start of the tick and completes each reply, always, even when the
/// task panics. Tasks enqueued while a tick is draining run on the next
/// tick, which prevents starvation under sustained load.
pub struct MainThreadDispatcher {
    sender: mpsc::UnboundedSender<QueuedTask>,
    receiver: Mutex<mpsc::UnboundedReceiver<QueuedTask>>,
    attached: AtomicBool,
    shut_down: AtomicBool,
    fallback_warned: AtomicBool,
}

impl MainThreadDispatcher {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            attached: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            fallback_warned: AtomicBool::new(false),
        }
    }

    /// Mark that a tick loop is draining this dispatcher. Until attached,
    /// `run_on_main` falls back to direct in-thread invocation.
    pub fn attach(&self) {
        self.attached.store(true, Ordering::SeqCst);
    }

    /// Execute `task` on the main thread and wait up to `timeout` for the
    /// result.
    ///
    /// On timeout the caller receives a `TIMEOUT` envelope; the task still
    /// runs on a later tick and its result is discarded. Without an attached
    /// tick loop the task runs directly on the calling thread (warned once).
    pub async fn run_on_main(&self, task: TaskFn, timeout: Duration) -> Value {
        if self.shut_down.load(Ordering::SeqCst) {
            return error_envelope(
                ErrorCode::OperationFailed("DISPATCHER_SHUTDOWN".into()),
                "Main-thread dispatcher is shut down",
            );
        }

        if !self.attached.load(Ordering::SeqCst) {
            if !self.fallback_warned.swap(true, Ordering::SeqCst) {
                warn!("No update-tick subscription; executing main-thread tasks inline");
            }
            return run_task(task);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let queued = QueuedTask {
            task,
            reply: Some(reply_tx),
        };
        if self.sender.send(queued).is_err() {
            return error_envelope(
                ErrorCode::OperationFailed("DISPATCHER_SHUTDOWN".into()),
                "Main-thread dispatcher is shut down",
            );
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => error_envelope(
                ErrorCode::OperationFailed("DISPATCHER_SHUTDOWN".into()),
                "Main-thread dispatcher is shut down",
            ),
            Err(_) => error_envelope(
                ErrorCode::Timeout,
                format!("timeout after {}s", timeout.as_secs_f64()),
            ),
        }
    }

    /// Enqueue a task without waiting for its result (the task itself is
    /// responsible for recording its outcome, e.g. in the request tracker).
    pub fn submit(&self, task: TaskFn) -> bool {
        if self.shut_down.load(Ordering::SeqCst) {
            return false;
        }
        if !self.attached.load(Ordering::SeqCst) {
            run_task(task);
            return true;
        }
        self.sender.send(QueuedTask { task, reply: None }).is_ok()
    }

    /// Drain every task pending at the start of this tick, in enqueue order.
    /// Called from the host update thread.
    pub fn drain(&self) {
        let mut pending = Vec::new();
        {
            let mut receiver = self.receiver.lock().unwrap_or_else(|e| e.into_inner());
            while let Ok(task) = receiver.try_recv() {
                pending.push(task);
            }
        }

        for queued in pending {
            let result = run_task(queued.task);
            if let Some(reply) = queued.reply {
                // The waiter may have timed out; the result is discarded then.
                let _ = reply.send(result);
            }
        }
    }

    /// Complete all remaining waiters with a shutdown error and reject
    /// further submissions.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        let mut receiver = self.receiver.lock().unwrap_or_else(|e| e.into_inner());
        while let Ok(queued) = receiver.try_recv() {
            if let Some(reply) = queued.reply {
                let _ = reply.send(error_envelope(
                    ErrorCode::OperationFailed("DISPATCHER_SHUTDOWN".into()),
                    "Main-thread dispatcher is shut down",
                ));
            }
        }
    }
}

impl Default for MainThreadDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn run_task(task: TaskFn) -> Value {
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(value) => value,
        Err(panic) => {
            let message = panic_message(&panic);
            error!(error = %message, "Main-thread task panicked");
            error_envelope(ErrorCode::OperationFailed("TASK_FAILED".into()), message)
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn attached() -> Arc<MainThreadDispatcher> {
        let dispatcher = Arc::new(MainThreadDispatcher::new());
        dispatcher.attach();
        dispatcher
    }

    /// Drive drains on a background thread until the guard drops.
    fn spawn_drain_loop(dispatcher: Arc<MainThreadDispatcher>) -> Arc<AtomicBool> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        std::thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                dispatcher.drain();
                std::thread::sleep(Duration::from_millis(5));
            }
        });
        stop
    }

    #[tokio::test]
    async fn run_on_main_returns_task_result() {
        let dispatcher = attached();
        let stop = spawn_drain_loop(dispatcher.clone());

        let result = dispatcher
            .run_on_main(
                Box::new(|| json!({"success": true, "answer": 42})),
                Duration::from_secs(1),
            )
            .await;
        assert_eq!(result["answer"], 42);
        stop.store(true, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn timeout_releases_waiter_and_task_still_runs() {
        let dispatcher = attached();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_flag = ran.clone();

        let result = dispatcher
            .run_on_main(
                Box::new(move || {
                    ran_flag.store(true, Ordering::SeqCst);
                    json!({"success": true})
                }),
                Duration::from_millis(100),
            )
            .await;
        assert_eq!(result["success"], false);
        assert_eq!(result["error_code"], "TIMEOUT");
        assert_eq!(result["error"], "timeout after 0.1s");
        assert!(!ran.load(Ordering::SeqCst));

        // The late drain still executes the task; the result is discarded.
        dispatcher.drain();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn tasks_execute_in_enqueue_order() {
        let dispatcher = attached();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = order.clone();
            dispatcher.submit(Box::new(move || {
                order.lock().unwrap().push(i);
                json!({"success": true})
            }));
        }
        dispatcher.drain();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn tasks_enqueued_mid_tick_run_next_tick() {
        let dispatcher = attached();
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_dispatcher = dispatcher.clone();
        let inner_counter = counter.clone();
        dispatcher.submit(Box::new(move || {
            let counter = inner_counter.clone();
            inner_dispatcher.submit(Box::new(move || {
                counter.fetch_add(10, Ordering::SeqCst);
                json!({"success": true})
            }));
            inner_counter.fetch_add(1, Ordering::SeqCst);
            json!({"success": true})
        }));

        dispatcher.drain();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        dispatcher.drain();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn panicking_task_yields_error_envelope() {
        let dispatcher = attached();
        let stop = spawn_drain_loop(dispatcher.clone());

        let result = dispatcher
            .run_on_main(
                Box::new(|| panic!("stage detached")),
                Duration::from_secs(1),
            )
            .await;
        assert_eq!(result["success"], false);
        assert_eq!(result["error_code"], "TASK_FAILED");
        assert!(result["error"].as_str().unwrap().contains("stage detached"));
        stop.store(true, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn detached_dispatcher_runs_inline() {
        let dispatcher = MainThreadDispatcher::new();
        let result = dispatcher
            .run_on_main(Box::new(|| json!({"success": true})), Duration::from_secs(1))
            .await;
        assert_eq!(result["success"], true);
    }

    #[tokio::test]
    async fn shutdown_completes_pending_waiters() {
        let dispatcher = attached();
        let waiter = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .run_on_main(Box::new(|| json!({"success": true})), Duration::from_secs(5))
                    .await
            })
        };
        // Let the waiter enqueue before shutting down.
        tokio::time::sleep(Duration::from_millis(50)).await;
        dispatcher.shutdown();

        let result = waiter.await.unwrap();
        assert_eq!(result["success"], false);
        assert_eq!(result["error_code"], "DISPATCHER_SHUTDOWN");

        let after = dispatcher
            .run_on_main(Box::new(|| json!({"success": true})), Duration::from_secs(1))
            .await;
        assert_eq!(after["error_code"], "DISPATCHER_SHUTDOWN");
    }
}
