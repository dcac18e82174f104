use std::collections::VecDeque;

use tokio::sync::Notify;
use tokio::time::Instant;

use super::*;

// Fallback horizon for delays that overflow the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// In-memory unit of work for one claimed record.
#[derive(Debug)]
pub(super) struct RenewalJob {
    pub(super) record: AccountRecord,
    pub(super) counters: RetryCounters,
    _capacity: CapacityToken,
}

impl RenewalJob {
    pub(super) fn new(record: AccountRecord, capacity: CapacityToken) -> Self {
        Self {
            record,
            counters: RetryCounters::default(),
            _capacity: capacity,
        }
    }

    /// One-based attempt number of the next execution.
    pub(super) fn attempt(&self) -> u32 {
        self.counters.total().saturating_add(1)
    }
}

#[derive(Debug)]
struct DelayedJob {
    due: Instant,
    job: RenewalJob,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<RenewalJob>,
    delayed: Vec<DelayedJob>,
}

impl QueueState {
    fn promote_due(&mut self, now: Instant) {
        if self.delayed.is_empty() {
            return;
        }

        self.delayed.sort_by_key(|delayed| delayed.due);
        let due_count = self
            .delayed
            .iter()
            .take_while(|delayed| delayed.due <= now)
            .count();
        for delayed in self.delayed.drain(..due_count) {
            self.ready.push_front(delayed.job);
        }
    }

    fn next_due(&self) -> Option<Instant> {
        self.delayed.iter().map(|delayed| delayed.due).min()
    }
}

/// Ready jobs plus retries waiting out a delay before going to the head.
#[derive(Debug, Default)]
pub(super) struct JobQueue {
    state: Mutex<QueueState>,
    ready: Notify,
}

impl JobQueue {
    pub(super) async fn push_back(&self, job: RenewalJob) {
        self.state.lock().await.ready.push_back(job);
        self.ready.notify_one();
    }

    pub(super) async fn push_front(&self, job: RenewalJob) {
        self.state.lock().await.ready.push_front(job);
        self.ready.notify_one();
    }

    /// Parks `job` until `delay` has elapsed, then re-inserts it at the head.
    pub(super) async fn push_front_after(&self, job: RenewalJob, delay: Duration) {
        let now = Instant::now();
        let due = now
            .checked_add(delay)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        self.state.lock().await.delayed.push(DelayedJob { due, job });
        self.ready.notify_one();
    }

    pub(super) async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.ready.len() + state.delayed.len()
    }

    /// Waits for the next ready job.
    pub(super) async fn next(&self) -> RenewalJob {
        loop {
            match self.try_next().await {
                Ok(job) => return job,
                Err(wake_at) => self.wait(wake_at).await,
            }
        }
    }

    /// Like [`JobQueue::next`], but returns `None` once nothing is queued or
    /// delayed.
    pub(super) async fn next_pending(&self) -> Option<RenewalJob> {
        loop {
            match self.try_next().await {
                Ok(job) => return Some(job),
                Err(None) => return None,
                Err(wake_at) => self.wait(wake_at).await,
            }
        }
    }

    /// Removes every ready and delayed job.
    pub(super) async fn drain(&self) -> Vec<RenewalJob> {
        let mut state = self.state.lock().await;
        let mut jobs: Vec<RenewalJob> = state.ready.drain(..).collect();
        jobs.extend(state.delayed.drain(..).map(|delayed| delayed.job));
        jobs
    }

    async fn try_next(&self) -> Result<RenewalJob, Option<Instant>> {
        let mut state = self.state.lock().await;
        state.promote_due(Instant::now());
        match state.ready.pop_front() {
            Some(job) => Ok(job),
            None => Err(state.next_due()),
        }
    }

    async fn wait(&self, wake_at: Option<Instant>) {
        match wake_at {
            Some(deadline) => {
                tokio::select! {
                    () = self.ready.notified() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.ready.notified().await,
        }
    }
}
