//! Cancel-and-reschedule task scheduling for autosave.
//!
//! A [`Debouncer`] runs a task once a quiet interval has passed with no
//! newer [`schedule`](Debouncer::schedule) call. Every schedule supersedes
//! the previous one; a superseded task never runs. The task receives a
//! [`Ticket`] so it can re-check, after waiting on any lock of its own,
//! that nothing newer has been scheduled since it fired. Together this
//! gives last-write-wins: bursts of edits collapse into one write of the
//! final state, and a write queued behind an in-flight one is dropped if a
//! newer write is already coming.
//!
//! Timing uses `tokio::time`, so tests drive it with a paused clock.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Generations {
    /// Bumped by every schedule and cancel.
    latest: AtomicU64,
    /// Generation that most recently fired or was cancelled.
    settled: AtomicU64,
}

/// Proof that a scheduled task fired; see [`Ticket::is_current`].
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    generations: Arc<Generations>,
}

impl Ticket {
    /// `false` once a newer schedule or a cancel has happened.
    pub fn is_current(&self) -> bool {
        self.generations.latest.load(Ordering::SeqCst) == self.generation
    }
}

#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    generations: Arc<Generations>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            generations: Arc::new(Generations::default()),
        }
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet
    }

    /// Schedules `task` to run after the quiet interval, superseding any
    /// pending task.
    ///
    /// Needs a Tokio runtime. Outside one nothing is scheduled, any pending
    /// task is superseded as usual, and `false` is returned.
    #[must_use = "a dropped task is reported only through the return value"]
    pub fn schedule<F, Fut>(&self, task: F) -> bool
    where
        F: FnOnce(Ticket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generations.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let ticket = Ticket {
            generation,
            generations: Arc::clone(&self.generations),
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                self.generations
                    .settled
                    .fetch_max(generation, Ordering::SeqCst);
                tracing::warn!("no tokio runtime, debounced task dropped");
                return false;
            }
        };

        // The deadline is fixed now, not when the task is first polled.
        let deadline = tokio::time::Instant::now() + self.quiet;
        runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if !ticket.is_current() {
                return;
            }
            ticket
                .generations
                .settled
                .fetch_max(ticket.generation, Ordering::SeqCst);
            task(ticket).await;
        });
        true
    }

    /// Drops the pending task, if any.
    pub fn cancel(&self) {
        let generation = self.generations.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.generations
            .settled
            .fetch_max(generation, Ordering::SeqCst);
    }

    /// `true` while a scheduled task is still waiting out its interval.
    pub fn is_pending(&self) -> bool {
        self.generations.settled.load(Ordering::SeqCst)
            < self.generations.latest.load(Ordering::SeqCst)
    }
}
