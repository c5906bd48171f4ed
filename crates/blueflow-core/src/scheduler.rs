//! Deferred task scheduling.
//!
//! A scheduled task is a future plus a delay. Once the delay has elapsed the
//! future is driven to completion and its output, a completion event, is
//! handed back to whoever owns the session. The session state machine only
//! ever sees completion events, so swapping the simulated delays for a real
//! transport does not touch it.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Runs tasks after a delay and reports their completion events.
pub trait Scheduler<E>: Send + Sync {
    /// Run `task` once `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, E>);
}

/// Scheduler backed by the tokio timer.
///
/// Each task is spawned onto the current runtime, sleeps for its delay, and
/// then sends its event down an unbounded channel. [`Scheduler::schedule`]
/// must be called from within a tokio runtime.
#[derive(Debug)]
pub struct TokioScheduler<E> {
    events: mpsc::UnboundedSender<E>,
}

impl<E> TokioScheduler<E> {
    /// Deliver completion events to `events`.
    #[must_use]
    pub const fn new(events: mpsc::UnboundedSender<E>) -> Self {
        Self { events }
    }
}

impl<E: Send + 'static> Scheduler<E> for TokioScheduler<E> {
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, E>) {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let event = task.await;
            if events.send(event).is_err() {
                debug!("Session closed before deferred task completed");
            }
        });
    }
}

struct Pending<E> {
    due: Duration,
    seq: u64,
    task: BoxFuture<'static, E>,
}

struct ManualState<E> {
    now: Duration,
    next_seq: u64,
    pending: Vec<Pending<E>>,
}

/// Scheduler driven by an explicit virtual clock.
///
/// Nothing runs until [`ManualScheduler::advance`] moves the clock past a
/// task's due time. Due tasks are executed on the calling thread in due-time
/// order (ties broken by scheduling order), so the tasks themselves must not
/// depend on a tokio runtime.
pub struct ManualScheduler<E> {
    state: Mutex<ManualState<E>>,
}

impl<E> Default for ManualScheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ManualScheduler<E> {
    /// Create a scheduler with its clock at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Duration::ZERO,
                next_seq: 0,
                pending: Vec::new(),
            }),
        }
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.lock().now
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Move the clock forward and run every task that became due.
    pub fn advance(&self, by: Duration) -> Vec<E> {
        let due = {
            let mut state = self.lock();
            state.now += by;
            let now = state.now;
            let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
                .into_iter()
                .partition(|pending| pending.due <= now);
            state.pending = rest;
            due.sort_by_key(|pending| (pending.due, pending.seq));
            due
        };

        trace!(count = due.len(), "Running due tasks");
        due.into_iter()
            .map(|pending| futures::executor::block_on(pending.task))
            .collect()
    }

    /// Advance just far enough to run every pending task.
    pub fn run_all(&self) -> Vec<E> {
        let remaining = {
            let state = self.lock();
            state
                .pending
                .iter()
                .map(|pending| pending.due)
                .max()
                .map_or(Duration::ZERO, |latest| latest.saturating_sub(state.now))
        };
        self.advance(remaining)
    }

    fn lock(&self) -> MutexGuard<'_, ManualState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Send> Scheduler<E> for ManualScheduler<E> {
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, E>) {
        let mut state = self.lock();
        let due = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.push(Pending { due, seq, task });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_runs_only_due_tasks() {
        let scheduler = ManualScheduler::new();
        scheduler.schedule(Duration::from_secs(3), Box::pin(async { "scan" }));
        scheduler.schedule(Duration::from_millis(1500), Box::pin(async { "connect" }));

        assert!(scheduler.advance(Duration::from_secs(1)).is_empty());
        assert_eq!(scheduler.advance(Duration::from_millis(500)), vec!["connect"]);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.advance(Duration::from_secs(2)), vec!["scan"]);
        assert_eq!(scheduler.elapsed(), Duration::from_millis(3500));
    }

    #[test]
    fn test_manual_orders_by_due_then_schedule_order() {
        let scheduler = ManualScheduler::new();
        scheduler.schedule(Duration::from_secs(2), Box::pin(async { 1 }));
        scheduler.schedule(Duration::from_secs(1), Box::pin(async { 2 }));
        scheduler.schedule(Duration::from_secs(2), Box::pin(async { 3 }));

        assert_eq!(scheduler.run_all(), vec![2, 1, 3]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_run_all_on_empty_is_noop() {
        let scheduler: ManualScheduler<()> = ManualScheduler::new();
        assert!(scheduler.run_all().is_empty());
        assert_eq!(scheduler.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_delivers_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);
        scheduler.schedule(Duration::from_secs(3), Box::pin(async { 7_u8 }));

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(rx.try_recv().is_err());

        assert_eq!(rx.recv().await, Some(7));
    }
}
