use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sessionkeeper_core::{AppError, AppResult};
use sessionkeeper_domain::{
    AccountId, AccountRecord, AccountStatus, Proxy, ProxyAddress, ProxyHealth, ProxyStatus,
    RenewalOutcome,
};
use tokio::sync::Mutex;

use crate::renewal_ports::{
    AccountRecordRepository, OperatorNotifier, ProxyHealthProbe, ProxyPoolRepository,
    SessionRenewalExecutor,
};

pub fn record(category: &str, status: AccountStatus) -> AccountRecord {
    AccountRecord::new(AccountId::new(), category, status, "+15550100")
}

pub fn proxy(octet: u8) -> Proxy {
    let address = ProxyAddress::new(format!("10.0.0.{octet}:8080:user:pass"))
        .unwrap_or_else(|error| panic!("test proxy address rejected: {error}"));
    Proxy::free(address)
}

#[derive(Default)]
struct RecordState {
    records: Vec<AccountRecord>,
    find_by_status_calls: usize,
    fail_queries: bool,
    fail_writes: bool,
}

#[derive(Default)]
pub struct FakeRecordRepository {
    state: Mutex<RecordState>,
}

impl FakeRecordRepository {
    pub fn with_records(records: Vec<AccountRecord>) -> Self {
        Self {
            state: Mutex::new(RecordState {
                records,
                ..RecordState::default()
            }),
        }
    }

    pub async fn find_by_status_calls(&self) -> usize {
        self.state.lock().await.find_by_status_calls
    }

    pub async fn snapshot(&self) -> Vec<AccountRecord> {
        self.state.lock().await.records.clone()
    }

    pub async fn status_of(&self, id: AccountId) -> Option<AccountStatus> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .find(|record| record.id == id)
            .map(|record| record.status)
    }

    pub async fn set_status(&self, id: AccountId, status: AccountStatus) {
        let mut state = self.state.lock().await;
        if let Some(record) = state.records.iter_mut().find(|record| record.id == id) {
            record.status = status;
        }
    }

    pub async fn remove(&self, id: AccountId) {
        self.state.lock().await.records.retain(|record| record.id != id);
    }

    pub async fn fail_queries(&self, fail: bool) {
        self.state.lock().await.fail_queries = fail;
    }

    pub async fn fail_writes(&self, fail: bool) {
        self.state.lock().await.fail_writes = fail;
    }
}

#[async_trait]
impl AccountRecordRepository for FakeRecordRepository {
    async fn find_by_status(
        &self,
        category: &str,
        status: AccountStatus,
    ) -> AppResult<Vec<AccountRecord>> {
        let mut state = self.state.lock().await;
        state.find_by_status_calls += 1;
        if state.fail_queries {
            return Err(AppError::Unavailable("record store offline".to_owned()));
        }

        Ok(state
            .records
            .iter()
            .filter(|record| record.category == category && record.status == status)
            .cloned()
            .collect())
    }

    async fn find_record(&self, category: &str, id: AccountId) -> AppResult<Option<AccountRecord>> {
        let state = self.state.lock().await;
        if state.fail_queries {
            return Err(AppError::Unavailable("record store offline".to_owned()));
        }

        Ok(state
            .records
            .iter()
            .find(|record| record.category == category && record.id == id)
            .cloned())
    }

    async fn compare_and_set_status(
        &self,
        category: &str,
        id: AccountId,
        expected: Option<AccountStatus>,
        status: AccountStatus,
    ) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        if state.fail_writes {
            return Err(AppError::Unavailable("record store offline".to_owned()));
        }

        let Some(record) = state.records.iter_mut().find(|record| {
            record.category == category
                && record.id == id
                && expected.is_none_or(|expected| record.status == expected)
        }) else {
            return Ok(0);
        };

        record.status = status;
        Ok(1)
    }
}

#[derive(Default)]
struct ProxyPoolState {
    proxies: Vec<Proxy>,
    steal_next_lease: bool,
    fail_scans: bool,
    lease_count: usize,
}

#[derive(Default)]
pub struct FakeProxyPool {
    state: Mutex<ProxyPoolState>,
}

impl FakeProxyPool {
    pub fn with_proxies(proxies: Vec<Proxy>) -> Self {
        Self {
            state: Mutex::new(ProxyPoolState {
                proxies,
                ..ProxyPoolState::default()
            }),
        }
    }

    pub async fn snapshot(&self) -> Vec<Proxy> {
        self.state.lock().await.proxies.clone()
    }

    pub async fn leased_count(&self) -> usize {
        self.state
            .lock()
            .await
            .proxies
            .iter()
            .filter(|proxy| proxy.status == ProxyStatus::Leased)
            .count()
    }

    pub async fn lease_count(&self) -> usize {
        self.state.lock().await.lease_count
    }

    /// Makes the next free-to-leased transition lose to a competing worker.
    pub async fn steal_next_lease(&self) {
        self.state.lock().await.steal_next_lease = true;
    }

    pub async fn fail_scans(&self, fail: bool) {
        self.state.lock().await.fail_scans = fail;
    }

    pub async fn remove_all(&self) {
        self.state.lock().await.proxies.clear();
    }
}

#[async_trait]
impl ProxyPoolRepository for FakeProxyPool {
    async fn find_free_proxy(&self) -> AppResult<Option<Proxy>> {
        let state = self.state.lock().await;
        if state.fail_scans {
            return Err(AppError::Unavailable("proxy pool offline".to_owned()));
        }

        Ok(state
            .proxies
            .iter()
            .find(|proxy| proxy.status == ProxyStatus::Free)
            .cloned())
    }

    async fn compare_and_set_status(
        &self,
        address: &ProxyAddress,
        expected: Option<ProxyStatus>,
        status: ProxyStatus,
        health: Option<&ProxyHealth>,
    ) -> AppResult<u64> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let steal = state.steal_next_lease && status == ProxyStatus::Leased;
        let Some(proxy) = state
            .proxies
            .iter_mut()
            .find(|proxy| &proxy.address == address)
        else {
            return Ok(0);
        };

        if steal {
            proxy.status = ProxyStatus::Leased;
            state.steal_next_lease = false;
            return Ok(0);
        }

        if expected.is_some_and(|expected| proxy.status != expected) {
            return Ok(0);
        }

        proxy.status = status;
        if let Some(health) = health {
            proxy.last_used_ip = health.exit_ip.clone();
            proxy.last_checked_at = Some(health.observed_at);
        }
        if status == ProxyStatus::Leased {
            state.lease_count += 1;
        }
        Ok(1)
    }
}

pub enum ProbeBehavior {
    Reachable(String),
    Unreachable,
    Fail,
}

pub struct FakeProbe {
    behavior: ProbeBehavior,
    calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new(behavior: ProbeBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeProbe {
    fn default() -> Self {
        Self::new(ProbeBehavior::Reachable("203.0.113.7".to_owned()))
    }
}

#[async_trait]
impl ProxyHealthProbe for FakeProbe {
    async fn probe(&self, _address: &ProxyAddress) -> AppResult<ProxyHealth> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            ProbeBehavior::Reachable(ip) => Ok(ProxyHealth::reachable(ip.as_str())),
            ProbeBehavior::Unreachable => Ok(ProxyHealth::unreachable()),
            ProbeBehavior::Fail => Err(AppError::Unavailable("probe endpoint down".to_owned())),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Outcome(RenewalOutcome),
    Error(String),
    Hang,
}

impl ScriptStep {
    pub fn failure() -> Self {
        Self::Outcome(RenewalOutcome::GenericFailure {
            reason: "login challenge".to_owned(),
        })
    }
}

pub struct ScriptedExecutor {
    steps: Mutex<VecDeque<ScriptStep>>,
    fallback: ScriptStep,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExecutor {
    /// Returns `fallback` once the scripted steps run out.
    pub fn new(steps: Vec<ScriptStep>, fallback: ScriptStep) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn always(step: ScriptStep) -> Self {
        Self::new(Vec::new(), step)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionRenewalExecutor for ScriptedExecutor {
    async fn renew(&self, _identity: &str, _proxy: &ProxyAddress) -> AppResult<RenewalOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let step = self
            .steps
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match step {
            ScriptStep::Outcome(outcome) => Ok(outcome),
            ScriptStep::Error(message) => Err(AppError::Unavailable(message)),
            ScriptStep::Hang => {
                std::future::pending::<()>().await;
                Err(AppError::Internal("unreachable".to_owned()))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            messages: Mutex::default(),
            fail: true,
        }
    }

    pub async fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().await.clone()
    }

    pub async fn contexts(&self) -> Vec<String> {
        self.messages
            .lock()
            .await
            .iter()
            .map(|(_, context)| context.clone())
            .collect()
    }
}

#[async_trait]
impl OperatorNotifier for RecordingNotifier {
    async fn notify(&self, message: &str, context: &str) -> AppResult<()> {
        self.messages
            .lock()
            .await
            .push((message.to_owned(), context.to_owned()));
        if self.fail {
            return Err(AppError::Unavailable("operator channel down".to_owned()));
        }
        Ok(())
    }
}
