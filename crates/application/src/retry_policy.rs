//! Failure classification and requeue decisions for renewal jobs.
//!
//! Each retry class keeps its own counter and budget. Proxy scarcity waits a
//! fixed delay before going back to the head of the queue; workflow and soft
//! failures go back to the head immediately.

use std::time::Duration;

/// Why one renewal attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// No proxy could be leased within the acquisition budget.
    NoProxy,
    /// The executor reported a non-success outcome.
    Definite,
    /// Unclassified failure: executor error, deadline, or restore mismatch.
    Soft,
}

impl FailureClass {
    /// Returns stable log value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoProxy => "no_proxy",
            Self::Definite => "definite",
            Self::Soft => "soft",
        }
    }
}

/// Per-class retry budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryLimits {
    /// Budget for proxy acquisition failures.
    pub proxy: u32,
    /// Budget for definite workflow failures.
    pub definite: u32,
    /// Budget for soft failures.
    pub soft: u32,
}

impl Default for RetryLimits {
    fn default() -> Self {
        Self {
            proxy: 10,
            definite: 3,
            soft: 10,
        }
    }
}

/// Retries already spent by one job, per class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryCounters {
    /// Proxy-class retries spent.
    pub proxy: u32,
    /// Definite-class retries spent.
    pub definite: u32,
    /// Soft-class retries spent.
    pub soft: u32,
}

impl RetryCounters {
    /// Returns the counter for one class.
    #[must_use]
    pub fn get(&self, class: FailureClass) -> u32 {
        match class {
            FailureClass::NoProxy => self.proxy,
            FailureClass::Definite => self.definite,
            FailureClass::Soft => self.soft,
        }
    }

    fn increment(&mut self, class: FailureClass) -> u32 {
        let counter = match class {
            FailureClass::NoProxy => &mut self.proxy,
            FailureClass::Definite => &mut self.definite,
            FailureClass::Soft => &mut self.soft,
        };
        *counter = counter.saturating_add(1);
        *counter
    }

    /// Total retries across classes.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.proxy
            .saturating_add(self.definite)
            .saturating_add(self.soft)
    }
}

/// What the dispatcher does with a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-insert at the head of the queue right away.
    RequeueNow {
        /// Retry number within the class, starting at 1.
        retry: u32,
    },
    /// Re-insert at the head of the queue after a delay.
    RequeueAfter {
        /// Retry number within the class, starting at 1.
        retry: u32,
        /// Delay before re-insertion.
        delay: Duration,
    },
    /// Budget exhausted; the job terminates.
    Abandon {
        /// Retries spent in the class.
        retries: u32,
    },
}

/// Retry policy engine shared by all renewal jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    limits: RetryLimits,
    proxy_retry_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(limits: RetryLimits, proxy_retry_delay: Duration) -> Self {
        Self {
            limits,
            proxy_retry_delay,
        }
    }

    /// Returns the budget for one class.
    #[must_use]
    pub fn limit_for(&self, class: FailureClass) -> u32 {
        match class {
            FailureClass::NoProxy => self.limits.proxy,
            FailureClass::Definite => self.limits.definite,
            FailureClass::Soft => self.limits.soft,
        }
    }

    /// Decides the requeue shape for one failure and spends budget when retrying.
    pub fn decide(&self, class: FailureClass, counters: &mut RetryCounters) -> RetryDecision {
        let spent = counters.get(class);
        if spent >= self.limit_for(class) {
            return RetryDecision::Abandon { retries: spent };
        }

        let retry = counters.increment(class);
        match class {
            FailureClass::NoProxy => RetryDecision::RequeueAfter {
                retry,
                delay: self.proxy_retry_delay,
            },
            FailureClass::Definite | FailureClass::Soft => RetryDecision::RequeueNow { retry },
        }
    }
}
