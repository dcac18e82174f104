use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;

use super::*;

impl RenewalDispatcher {
    /// Runs the next ready job inline.
    ///
    /// Waits out delayed retries. Returns `None` once nothing is queued or
    /// delayed.
    pub async fn process_next(&self) -> Option<AppResult<JobReport>> {
        let job = self.queue.next_pending().await?;
        Some(self.execute(job).await)
    }

    /// Polls and works the queue until `shutdown` resolves.
    ///
    /// On shutdown, polling stops, in-flight jobs run to completion and queued
    /// jobs are drained back to `used`.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: JoinSet<AppResult<JobReport>> = JoinSet::new();
        tokio::pin!(shutdown);

        info!(
            max_parallel = self.config.max_parallel,
            poll_interval_ms = self.config.poll_interval.as_millis(),
            categories = ?self.config.categories,
            "renewal dispatcher started"
        );

        loop {
            let has_slot = in_flight.len() < self.config.max_parallel;

            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(error) = self.run_poll_cycle().await {
                        warn!(error = %error, "renewal poll cycle failed");
                    }
                }
                job = self.queue.next(), if has_slot => {
                    let dispatcher = self.clone();
                    in_flight.spawn(async move { dispatcher.execute(job).await });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_joined(joined);
                }
            }
        }

        info!(in_flight = in_flight.len(), "shutdown requested, waiting for in-flight renewal jobs");
        while let Some(joined) = in_flight.join_next().await {
            log_joined(joined);
        }

        let drained = self.drain_pending().await;
        info!(drained, "renewal dispatcher stopped");
    }
}

fn log_joined(joined: Result<AppResult<JobReport>, JoinError>) {
    match joined {
        Ok(Ok(report)) if report.stage.is_attempt_end() => {
            debug!(
                record_id = %report.record_id,
                attempt = report.attempt,
                stage = report.stage.as_str(),
                "renewal attempt finished"
            );
        }
        Ok(Ok(report)) => {
            debug!(
                record_id = %report.record_id,
                stage = report.stage.as_str(),
                "renewal job ended before an attempt"
            );
        }
        Ok(Err(error)) => {
            error!(error_code = error.code(), error = %error, "renewal job ended with error");
        }
        Err(error) => {
            error!(error = %error, "renewal job task panicked or was cancelled");
        }
    }
}
