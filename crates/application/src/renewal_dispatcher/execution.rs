use super::*;

/// How a job left the dispatcher for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTermination {
    /// Session renewed and record persisted as `free`.
    Succeeded,
    /// A retry class ran out of budget.
    Abandoned {
        /// Class that exhausted its budget.
        class: FailureClass,
        /// Retries spent in that class.
        retries: u32,
    },
    /// The record category has no renewal handler.
    Unsupported,
    /// The record disappeared from the store.
    RecordMissing,
    /// Another actor took the record between attempts.
    RecordLost,
}

/// What happened to a job after one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobDisposition {
    /// The job went back to the queue.
    Requeued {
        /// Class of the failure that caused the retry.
        class: FailureClass,
        /// Retry number within the class.
        retry: u32,
        /// Delay before the job reaches the queue head again.
        delay: Option<Duration>,
    },
    /// The job ended and released its capacity.
    Terminated(JobTermination),
}

/// Result of one job attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    /// Record the job renews.
    pub record_id: AccountId,
    /// Record category.
    pub category: String,
    /// One-based attempt number.
    pub attempt: u32,
    /// Last stage the attempt reached.
    pub stage: JobStage,
    /// What happened to the job afterwards.
    pub disposition: JobDisposition,
}

impl JobReport {
    /// Returns whether the job ended with a renewed session.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.disposition == JobDisposition::Terminated(JobTermination::Succeeded)
    }
}

enum AttemptResult {
    Succeeded,
    Failed(FailureClass, JobStage),
    Ended(JobTermination),
}

impl RenewalDispatcher {
    /// Runs one attempt of `job` and routes it to its next state.
    ///
    /// Unexpected failures restore the record to `used`, are reported, and
    /// come back as `Err`; the job and its capacity are released either way.
    pub(super) async fn execute(&self, job: RenewalJob) -> AppResult<JobReport> {
        let attempt = job.attempt();

        let Some(category) = job.record.supported_category() else {
            return Ok(self.abandon_unsupported(job, attempt).await);
        };

        debug!(
            record_id = %job.record.id,
            category = category.as_str(),
            attempt,
            stage = JobStage::Claimed.as_str(),
            "starting renewal attempt"
        );

        match self.run_attempt(&job.record).await {
            Ok(AttemptResult::Succeeded) => {
                info!(
                    record_id = %job.record.id,
                    category = category.as_str(),
                    attempt,
                    "session renewed"
                );
                Ok(report(
                    &job.record,
                    attempt,
                    JobStage::Succeeded,
                    JobDisposition::Terminated(JobTermination::Succeeded),
                ))
            }
            Ok(AttemptResult::Failed(class, stage)) => {
                Ok(self.apply_retry(job, attempt, class, stage).await)
            }
            Ok(AttemptResult::Ended(termination)) => {
                Ok(self.end_early(job, attempt, termination).await)
            }
            Err(error) => {
                error!(
                    record_id = %job.record.id,
                    category = %job.record.category,
                    attempt,
                    error = %error,
                    "renewal job failed unexpectedly"
                );
                self.restore_used(&job.record, "execute_renewal_job").await;
                let message = format!(
                    "renewal of record '{}' in '{}' failed: {error}",
                    job.record.id, job.record.category
                );
                self.operator
                    .report(message.as_str(), "execute_renewal_job")
                    .await;
                Err(error)
            }
        }
    }

    async fn run_attempt(&self, record: &AccountRecord) -> AppResult<AttemptResult> {
        let Some(current) = self
            .records
            .find_record(record.category.as_str(), record.id)
            .await?
        else {
            return Ok(AttemptResult::Ended(JobTermination::RecordMissing));
        };

        match current.status {
            AccountStatus::Updating => {}
            AccountStatus::Used => {
                let matched = self
                    .records
                    .compare_and_set_status(
                        record.category.as_str(),
                        record.id,
                        Some(AccountStatus::Used),
                        AccountStatus::Updating,
                    )
                    .await?;
                if matched != 1 {
                    return Ok(AttemptResult::Ended(JobTermination::RecordLost));
                }
            }
            AccountStatus::Free => return Ok(AttemptResult::Ended(JobTermination::RecordLost)),
        }

        let lease = match self.proxies.acquire().await {
            Ok(lease) => lease,
            Err(AppError::NoProxyAvailable(reason)) => {
                info!(record_id = %record.id, reason = %reason, "no proxy available");
                return Ok(AttemptResult::Failed(
                    FailureClass::NoProxy,
                    JobStage::FailedNoProxy,
                ));
            }
            Err(error) => return Err(error),
        };

        debug!(
            record_id = %record.id,
            proxy = %lease.address(),
            stage = JobStage::ProxyAcquired.as_str(),
            "proxy acquired"
        );

        let result = self
            .run_workflow(record, current.identity.as_str(), lease.address())
            .await;
        self.proxies.release(lease).await;
        result
    }

    async fn run_workflow(
        &self,
        record: &AccountRecord,
        identity: &str,
        proxy: &ProxyAddress,
    ) -> AppResult<AttemptResult> {
        debug!(
            record_id = %record.id,
            stage = JobStage::WorkflowRunning.as_str(),
            "running renewal workflow"
        );

        let outcome = match tokio::time::timeout(
            self.config.job_timeout,
            self.executor.renew(identity, proxy),
        )
        .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(error)) => {
                warn!(record_id = %record.id, error = %error, "renewal executor failed");
                return Ok(AttemptResult::Failed(
                    FailureClass::Soft,
                    JobStage::FailedSoft,
                ));
            }
            Err(_) => {
                warn!(
                    record_id = %record.id,
                    timeout_ms = self.config.job_timeout.as_millis(),
                    "renewal workflow timed out"
                );
                return Ok(AttemptResult::Failed(
                    FailureClass::Soft,
                    JobStage::FailedSoft,
                ));
            }
        };

        match outcome {
            RenewalOutcome::Success => {
                let matched = self
                    .records
                    .compare_and_set_status(
                        record.category.as_str(),
                        record.id,
                        Some(AccountStatus::Updating),
                        AccountStatus::Free,
                    )
                    .await?;
                if matched != 1 {
                    return Err(AppError::Conflict(format!(
                        "record '{}' in '{}' was not updating when its renewal succeeded",
                        record.id, record.category
                    )));
                }
                Ok(AttemptResult::Succeeded)
            }
            RenewalOutcome::NoProxy | RenewalOutcome::GenericFailure { .. } => {
                warn!(
                    record_id = %record.id,
                    outcome = outcome.marker(),
                    "renewal workflow reported failure"
                );
                let matched = self
                    .records
                    .compare_and_set_status(
                        record.category.as_str(),
                        record.id,
                        Some(AccountStatus::Updating),
                        AccountStatus::Used,
                    )
                    .await?;
                if matched == 0 {
                    return Ok(AttemptResult::Failed(
                        FailureClass::Soft,
                        JobStage::FailedSoft,
                    ));
                }
                Ok(AttemptResult::Failed(
                    FailureClass::Definite,
                    JobStage::FailedDefinite,
                ))
            }
        }
    }

    async fn apply_retry(
        &self,
        mut job: RenewalJob,
        attempt: u32,
        class: FailureClass,
        stage: JobStage,
    ) -> JobReport {
        let decision = self.policy.decide(class, &mut job.counters);
        match decision {
            RetryDecision::RequeueNow { retry } => {
                info!(
                    record_id = %job.record.id,
                    class = class.as_str(),
                    retry,
                    limit = self.policy.limit_for(class),
                    "requeueing renewal job"
                );
                let report = report(
                    &job.record,
                    attempt,
                    stage,
                    JobDisposition::Requeued {
                        class,
                        retry,
                        delay: None,
                    },
                );
                self.queue.push_front(job).await;
                report
            }
            RetryDecision::RequeueAfter { retry, delay } => {
                info!(
                    record_id = %job.record.id,
                    class = class.as_str(),
                    retry,
                    limit = self.policy.limit_for(class),
                    delay_ms = delay.as_millis(),
                    "requeueing renewal job after delay"
                );
                let report = report(
                    &job.record,
                    attempt,
                    stage,
                    JobDisposition::Requeued {
                        class,
                        retry,
                        delay: Some(delay),
                    },
                );
                self.queue.push_front_after(job, delay).await;
                report
            }
            RetryDecision::Abandon { retries } => {
                warn!(
                    record_id = %job.record.id,
                    category = %job.record.category,
                    class = class.as_str(),
                    retries,
                    "renewal retries exhausted"
                );
                if class != FailureClass::Definite {
                    self.restore_used(&job.record, "abandon_renewal_job").await;
                }
                let message = format!(
                    "renewal of record '{}' in '{}' abandoned after {retries} {} retries",
                    job.record.id,
                    job.record.category,
                    class.as_str()
                );
                self.operator
                    .report(message.as_str(), "abandon_renewal_job")
                    .await;
                report(
                    &job.record,
                    attempt,
                    stage,
                    JobDisposition::Terminated(JobTermination::Abandoned { class, retries }),
                )
            }
        }
    }

    async fn abandon_unsupported(&self, job: RenewalJob, attempt: u32) -> JobReport {
        warn!(
            record_id = %job.record.id,
            category = %job.record.category,
            "no renewal handler for category"
        );
        self.restore_used(&job.record, "route_renewal_job").await;
        let message = format!(
            "record '{}' has unsupported category '{}'",
            job.record.id, job.record.category
        );
        self.operator
            .report(message.as_str(), "route_renewal_job")
            .await;
        report(
            &job.record,
            attempt,
            JobStage::Claimed,
            JobDisposition::Terminated(JobTermination::Unsupported),
        )
    }

    async fn end_early(
        &self,
        job: RenewalJob,
        attempt: u32,
        termination: JobTermination,
    ) -> JobReport {
        match &termination {
            JobTermination::RecordMissing => {
                warn!(
                    record_id = %job.record.id,
                    category = %job.record.category,
                    "claimed record no longer exists"
                );
                let message = format!(
                    "record '{}' in '{}' disappeared during renewal",
                    job.record.id, job.record.category
                );
                self.operator
                    .report(message.as_str(), "execute_renewal_job")
                    .await;
            }
            _ => {
                info!(
                    record_id = %job.record.id,
                    category = %job.record.category,
                    "record was taken over by another actor"
                );
            }
        }

        report(
            &job.record,
            attempt,
            JobStage::Claimed,
            JobDisposition::Terminated(termination),
        )
    }
}

fn report(
    record: &AccountRecord,
    attempt: u32,
    stage: JobStage,
    disposition: JobDisposition,
) -> JobReport {
    JobReport {
        record_id: record.id,
        category: record.category.clone(),
        attempt,
        stage,
        disposition,
    }
}
