//! Background task registry.
//!
//! [`TaskRegistry::submit`] hands a future to a bounded worker pool and returns
//! a [`TaskId`] at once. Callers later poll with [`TaskRegistry::get_status`] or
//! block with [`TaskRegistry::wait`].
//!
//! # Ownership
//!
//! The task table lives inside a single owner task spawned by
//! [`TaskRegistry::new`]. Submitters, workers, and readers talk to it over an
//! unbounded channel, so every mutation is applied in message order and no lock
//! guards the table. Each record carries a `watch` sender; waiters subscribe to
//! it and are woken when the owner publishes the terminal snapshot.
//!
//! # Lifecycle
//!
//! ```text
//! submit ──► Register(id) ──► Running ──► Complete(id, Ok)  ──► Completed
//!                                     └─► Complete(id, Err) ──► Failed
//! ```
//!
//! A record is written once on completion and never removed. There is no
//! cancellation: a timed-out [`TaskRegistry::wait`] leaves the task running.

use super::TaskId;
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

pub const DEFAULT_WORKERS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Point-in-time copy of a task record.
///
/// `result` is set only for [`TaskStatus::Completed`], `error` only for
/// [`TaskStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSnapshot<T> {
    pub id: TaskId,
    pub status: TaskStatus,
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> TaskSnapshot<T> {
    fn running(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::Running,
            result: None,
            error: None,
        }
    }
}

/// Counts reported by [`TaskRegistry::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

type Outcome<T> = std::result::Result<T, String>;

struct TaskRecord<T> {
    snapshot: watch::Sender<TaskSnapshot<T>>,
}

enum Command<T> {
    Register(TaskId),
    Complete(TaskId, Outcome<T>),
    Snapshot(TaskId, oneshot::Sender<Option<TaskSnapshot<T>>>),
    Subscribe(TaskId, oneshot::Sender<Option<watch::Receiver<TaskSnapshot<T>>>>),
    Stats(oneshot::Sender<RegistryStats>),
    Flush(oneshot::Sender<()>),
}

/// Registry of background tasks producing values of type `T`.
///
/// Must be created inside a Tokio runtime.
pub struct TaskRegistry<T> {
    commands: mpsc::UnboundedSender<Command<T>>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    next_id: AtomicU64,
    /// Submitters hold the read side from the check through the spawn;
    /// shutdown takes the write side to flip it.
    accepting: RwLock<bool>,
    workers: usize,
}

impl<T> fmt::Debug for TaskRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("workers", &self.workers)
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("accepting", &*read_flag(&self.accepting))
            .finish()
    }
}

impl<T> TaskRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a registry running at most `workers` tasks at once, clamped to
    /// `1..=Semaphore::MAX_PERMITS`.
    pub fn new(workers: usize) -> Self {
        let workers = workers.clamp(1, Semaphore::MAX_PERMITS);
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_owner(rx));

        Self {
            commands,
            permits: Arc::new(Semaphore::new(workers)),
            tracker: TaskTracker::new(),
            next_id: AtomicU64::new(0),
            accepting: RwLock::new(true),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Submit a future. Returns its id without waiting for a worker slot.
    pub fn submit<F, E>(&self, work: F) -> Result<TaskId>
    where
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.dispatch(move || tokio::spawn(async move { work.await.map_err(|e| e.to_string()) }))
    }

    /// Submit a synchronous closure to run on the blocking thread pool.
    pub fn submit_blocking<F, E>(&self, work: F) -> Result<TaskId>
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.dispatch(move || tokio::task::spawn_blocking(move || work().map_err(|e| e.to_string())))
    }

    fn dispatch<S>(&self, start: S) -> Result<TaskId>
    where
        S: FnOnce() -> JoinHandle<Outcome<T>> + Send + 'static,
    {
        let accepting = read_flag(&self.accepting);
        if !*accepting {
            return Err(Error::ShuttingDown);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.commands
            .send(Command::Register(id))
            .map_err(|_| Error::ShuttingDown)?;

        let permits = Arc::clone(&self.permits);
        let commands = self.commands.clone();
        self.tracker.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(permit) => {
                    debug!(task_id = id, "Task started");
                    let outcome = start().await.unwrap_or_else(|e| Err(join_error_message(e)));
                    drop(permit);
                    outcome
                }
                Err(_) => Err("worker pool closed".to_string()),
            };
            if let Err(error) = &outcome {
                warn!(task_id = id, error = %error, "Task failed");
            } else {
                debug!(task_id = id, "Task completed");
            }
            // Owner outlives every worker: the registry and each worker hold senders.
            let _ = commands.send(Command::Complete(id, outcome));
        });

        drop(accepting);

        debug!(task_id = id, "Task submitted");
        Ok(id)
    }

    /// Current snapshot of task `id`.
    pub async fn get_status(&self, id: TaskId) -> Result<TaskSnapshot<T>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(id, reply))?;
        rx.await
            .map_err(|_| Error::ShuttingDown)?
            .ok_or(Error::TaskNotFound(id))
    }

    /// Wait until task `id` is terminal, or until `timeout` elapses.
    ///
    /// On timeout the task keeps running; a later call can still observe it.
    pub async fn wait(&self, id: TaskId, timeout: Option<Duration>) -> Result<TaskSnapshot<T>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe(id, reply))?;
        let mut updates = rx
            .await
            .map_err(|_| Error::ShuttingDown)?
            .ok_or(Error::TaskNotFound(id))?;

        let terminal = async {
            updates
                .wait_for(|s| s.status.is_terminal())
                .await
                .map(|s| (*s).clone())
                .map_err(|_| Error::ShuttingDown)
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, terminal)
                .await
                .map_err(|_| Error::DeadlineExceeded {
                    task_id: id,
                    timeout: limit,
                })?,
            None => terminal.await,
        }
    }

    pub async fn stats(&self) -> Result<RegistryStats> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats(reply))?;
        rx.await.map_err(|_| Error::ShuttingDown)
    }

    /// Tasks not yet terminal, queued ones included.
    pub async fn running_count(&self) -> Result<usize> {
        Ok(self.stats().await?.running)
    }

    /// Number of tasks ever submitted.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.stats().await?.total)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Stop accepting work. With `wait_for_pending`, return only after every
    /// submitted task has finished and its record has been updated.
    pub async fn shutdown(&self, wait_for_pending: bool) {
        {
            let mut accepting = self
                .accepting
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *accepting = false;
            self.tracker.close();
        }
        info!(
            pending = self.tracker.len(),
            wait_for_pending, "Task registry shutting down"
        );

        if wait_for_pending {
            self.tracker.wait().await;
            let (reply, rx) = oneshot::channel();
            if self.send(Command::Flush(reply)).is_ok() {
                let _ = rx.await;
            }
            info!("Task registry drained");
        }
    }

    fn send(&self, command: Command<T>) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::ShuttingDown)
    }
}

async fn run_owner<T>(mut rx: mpsc::UnboundedReceiver<Command<T>>)
where
    T: Clone + Send + Sync + 'static,
{
    let mut tasks: HashMap<TaskId, TaskRecord<T>> = HashMap::new();

    while let Some(command) = rx.recv().await {
        match command {
            Command::Register(id) => {
                let (snapshot, _) = watch::channel(TaskSnapshot::running(id));
                tasks.insert(id, TaskRecord { snapshot });
            }
            Command::Complete(id, outcome) => {
                let Some(record) = tasks.get(&id) else {
                    warn!(task_id = id, "Completion for unregistered task");
                    continue;
                };
                record.snapshot.send_modify(|s| {
                    if s.status.is_terminal() {
                        return;
                    }
                    match outcome {
                        Ok(value) => {
                            s.status = TaskStatus::Completed;
                            s.result = Some(value);
                        }
                        Err(error) => {
                            s.status = TaskStatus::Failed;
                            s.error = Some(error);
                        }
                    }
                });
            }
            Command::Snapshot(id, reply) => {
                let _ = reply.send(tasks.get(&id).map(|r| r.snapshot.borrow().clone()));
            }
            Command::Subscribe(id, reply) => {
                let _ = reply.send(tasks.get(&id).map(|r| r.snapshot.subscribe()));
            }
            Command::Stats(reply) => {
                let mut stats = RegistryStats {
                    total: tasks.len(),
                    ..RegistryStats::default()
                };
                for record in tasks.values() {
                    match record.snapshot.borrow().status {
                        TaskStatus::Running => stats.running += 1,
                        TaskStatus::Completed => stats.completed += 1,
                        TaskStatus::Failed => stats.failed += 1,
                    }
                }
                let _ = reply.send(stats);
            }
            Command::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }
}

fn read_flag(flag: &RwLock<bool>) -> std::sync::RwLockReadGuard<'_, bool> {
    flag.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn join_error_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked".to_string()
    }
}
