/// Result reported by the session renewal executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// Fresh session artifacts were produced and stored.
    Success,
    /// The executor could not get traffic through the leased proxy.
    NoProxy,
    /// The renewal failed for any other reported reason.
    GenericFailure {
        /// Executor-supplied failure description.
        reason: String,
    },
}

impl RenewalOutcome {
    /// Wire marker for a successful renewal.
    pub const SUCCESS_MARKER: &'static str = "SUCCESS";
    /// Wire marker for an unusable proxy.
    pub const NO_PROXY_MARKER: &'static str = "NO_AVAILABLE_PROXY";
    /// Wire marker for a generic failure.
    pub const FAILURE_MARKER: &'static str = "ERROR";

    /// Maps an executor marker to an outcome.
    ///
    /// Returns `None` for markers outside the closed set so callers can treat
    /// them as an unexpected response shape.
    #[must_use]
    pub fn from_marker(marker: &str, reason: Option<String>) -> Option<Self> {
        match marker.trim() {
            Self::SUCCESS_MARKER => Some(Self::Success),
            Self::NO_PROXY_MARKER => Some(Self::NoProxy),
            Self::FAILURE_MARKER => Some(Self::GenericFailure {
                reason: reason.unwrap_or_else(|| "renewal executor reported failure".to_owned()),
            }),
            _ => None,
        }
    }

    /// Returns the stable wire marker.
    #[must_use]
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Success => Self::SUCCESS_MARKER,
            Self::NoProxy => Self::NO_PROXY_MARKER,
            Self::GenericFailure { .. } => Self::FAILURE_MARKER,
        }
    }
}

/// Stage of one renewal job inside its workflow state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStage {
    /// Record marked `updating` and capacity reserved.
    Claimed,
    /// Proxy leased for the attempt.
    ProxyAcquired,
    /// Executor call in flight.
    WorkflowRunning,
    /// Record persisted as `free`.
    Succeeded,
    /// Executor reported a non-success outcome.
    FailedDefinite,
    /// No proxy could be leased.
    FailedNoProxy,
    /// Unclassified failure, record missing, or deadline elapsed.
    FailedSoft,
}

impl JobStage {
    /// Returns stable log value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claimed => "claimed",
            Self::ProxyAcquired => "proxy_acquired",
            Self::WorkflowRunning => "workflow_running",
            Self::Succeeded => "succeeded",
            Self::FailedDefinite => "failed_definite",
            Self::FailedNoProxy => "failed_no_proxy",
            Self::FailedSoft => "failed_soft",
        }
    }

    /// Returns whether the stage ends an attempt.
    #[must_use]
    pub fn is_attempt_end(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::FailedDefinite | Self::FailedNoProxy | Self::FailedSoft
        )
    }
}
