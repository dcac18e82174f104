use super::*;

impl RenewalDispatcher {
    /// Claims records as renewal jobs and returns how many were claimed.
    ///
    /// Input beyond the remaining capacity is ignored. Records another actor
    /// already moved out of `used`, or whose job is still alive, are skipped.
    pub async fn enqueue(&self, records: Vec<AccountRecord>) -> AppResult<usize> {
        let _claim_guard = self.claim_lock.lock().await;

        let remaining = self.capacity.remaining();
        if remaining == 0 {
            debug!(offered = records.len(), "no capacity left for new renewal jobs");
            return Ok(0);
        }

        let mut claimed = 0;
        for mut record in records.into_iter().take(remaining) {
            let Some(token) = self.capacity.try_acquire(record.id) else {
                debug!(record_id = %record.id, "record already has a live renewal job");
                continue;
            };

            match self
                .records
                .compare_and_set_status(
                    record.category.as_str(),
                    record.id,
                    Some(AccountStatus::Used),
                    AccountStatus::Updating,
                )
                .await
            {
                Ok(1) => {
                    record.status = AccountStatus::Updating;
                    info!(
                        record_id = %record.id,
                        category = %record.category,
                        active_jobs = self.capacity.active(),
                        "claimed record for renewal"
                    );
                    self.queue.push_back(RenewalJob::new(record, token)).await;
                    claimed += 1;
                }
                Ok(_) => {
                    debug!(
                        record_id = %record.id,
                        category = %record.category,
                        "record was claimed elsewhere"
                    );
                }
                Err(error) => {
                    warn!(
                        record_id = %record.id,
                        category = %record.category,
                        error = %error,
                        "failed to claim record"
                    );
                    let message = format!(
                        "failed to claim record '{}' in '{}': {error}",
                        record.id, record.category
                    );
                    self.operator.report(message.as_str(), "claim_record").await;
                }
            }
        }

        Ok(claimed)
    }

    /// Polls for eligible records and claims them.
    pub async fn run_poll_cycle(&self) -> AppResult<usize> {
        let active_jobs = self.capacity.active();
        if active_jobs >= self.config.max_parallel {
            debug!(active_jobs, "renewal capacity full, skipping poll cycle");
            return Ok(0);
        }

        let records = self.poller.poll(active_jobs).await?;
        if records.is_empty() {
            return Ok(0);
        }

        self.enqueue(records).await
    }

    /// Removes every queued job and hands its record back as `used`.
    ///
    /// Returns the number of jobs drained.
    pub async fn drain_pending(&self) -> usize {
        let jobs = self.queue.drain().await;
        for job in &jobs {
            self.restore_used(&job.record, "drain_pending").await;
        }

        if !jobs.is_empty() {
            info!(drained = jobs.len(), "drained pending renewal jobs");
        }
        jobs.len()
    }
}
