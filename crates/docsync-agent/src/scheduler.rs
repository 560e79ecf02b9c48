//! Flush scheduling: debounce, periodic safety net, and backoff, all as
//! deadlines in one tokio task. Nothing here sleeps inside a flush.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::engine::{FlushOutcome, SyncAgent};
use crate::source::DocumentSource;
use crate::transport::SyncTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Something was enqueued; flush after the quiet period.
    Changed,
    /// Flush right away, ignoring the debounce (not the backoff).
    FlushNow,
    Shutdown,
}

/// Cheap handle for feeding the scheduler from event callbacks.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Returns false once the scheduler has stopped.
    pub fn notify_changed(&self) -> bool {
        self.tx.send(SchedulerCommand::Changed).is_ok()
    }

    pub fn flush_now(&self) -> bool {
        self.tx.send(SchedulerCommand::FlushNow).is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.tx.send(SchedulerCommand::Shutdown).is_ok()
    }
}

pub struct SyncScheduler<S, T> {
    agent: Arc<SyncAgent<S, T>>,
    rx: mpsc::UnboundedReceiver<SchedulerCommand>,
    next_flush: Option<Instant>,
    backoff_until: Option<Instant>,
}

impl<S, T> SyncScheduler<S, T>
where
    S: DocumentSource + 'static,
    T: SyncTransport + 'static,
{
    /// Start the scheduler on the current tokio runtime. It performs a full
    /// scan and a flush immediately, then runs until shut down or every
    /// handle is dropped.
    pub fn spawn(agent: Arc<SyncAgent<S, T>>) -> (SchedulerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            agent,
            rx,
            next_flush: None,
            backoff_until: None,
        };
        let task = tokio::spawn(scheduler.run());
        (SchedulerHandle { tx }, task)
    }

    async fn run(mut self) {
        tracing::info!(scope = %self.agent.settings().scope_id(), "sync scheduler started");
        self.scan().await;
        self.flush().await;

        let period = self
            .agent
            .settings()
            .periodic_flush()
            .max(Duration::from_secs(1));
        let mut periodic = tokio::time::interval_at(Instant::now() + period, period);
        periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let deadline = self.next_flush;
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(SchedulerCommand::Changed) => self.debounce(),
                    Some(SchedulerCommand::FlushNow) => {
                        if self.backing_off() {
                            self.debounce();
                        } else {
                            self.flush().await;
                        }
                    }
                    Some(SchedulerCommand::Shutdown) | None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush().await;
                }
                _ = periodic.tick() => {
                    self.scan().await;
                    if self.backing_off() {
                        self.debounce();
                    } else {
                        self.flush().await;
                    }
                }
            }
        }

        tracing::info!("sync scheduler stopped");
    }

    fn backing_off(&self) -> bool {
        self.backoff_until
            .is_some_and(|until| until > Instant::now())
    }

    /// Push the flush deadline to the end of the quiet period, never before
    /// the backoff deadline.
    fn debounce(&mut self) {
        let mut at = Instant::now() + self.agent.settings().debounce();
        if let Some(until) = self.backoff_until {
            at = at.max(until);
        }
        self.next_flush = Some(at);
    }

    /// Directory walk and SQLite writes run on the blocking pool.
    async fn scan(&self) {
        let agent = Arc::clone(&self.agent);
        match tokio::task::spawn_blocking(move || agent.full_scan()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "full scan failed"),
            Err(e) => tracing::error!(error = %e, "full scan task failed"),
        }
    }

    async fn flush(&mut self) {
        self.next_flush = None;
        loop {
            match self.agent.flush().await {
                FlushOutcome::Delivered(summary) if summary.remaining > 0 && summary.progressed() => {
                    self.backoff_until = None;
                }
                FlushOutcome::BatchRejected {
                    dropped, remaining, ..
                } if remaining > 0 && dropped > 0 => {}
                FlushOutcome::Delivered(_) | FlushOutcome::Idle | FlushOutcome::BatchRejected { .. } => {
                    self.backoff_until = None;
                    break;
                }
                FlushOutcome::RetryAfter(delay) => {
                    let until = Instant::now() + delay;
                    self.backoff_until = Some(until);
                    self.next_flush = Some(until);
                    break;
                }
                FlushOutcome::AuthRequired | FlushOutcome::Paused => break,
                FlushOutcome::AlreadyRunning => {
                    self.debounce();
                    break;
                }
            }
        }
    }
}
