//! Session keeper renewal worker runtime.

#![forbid(unsafe_code)]

mod worker_config;

use std::sync::Arc;
use std::time::Duration;

use sessionkeeper_application::{
    OperatorNotifier, ProxyPoolRepository, RenewalDispatcher, RenewalPorts,
};
use sessionkeeper_core::{AppError, AppResult};
use sessionkeeper_domain::AccountCategory;
use sessionkeeper_infrastructure::{
    HttpProxyHealthProbe, HttpSessionRenewalExecutor, PostgresAccountRecordRepository,
    PostgresProxyPoolRepository, RedisProxyPoolRepository, TelegramOperatorNotifier,
    TracingOperatorNotifier, run_migrations,
};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::worker_config::{ProxyPoolBackend, WorkerConfig};

const REDIS_KEY_PREFIX: &str = "sessionkeeper";
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);
const NOTIFIER_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = WorkerConfig::load()?;
    for category in &config.dispatcher.categories {
        if AccountCategory::parse(category).is_none() {
            warn!(
                category = %category,
                "configured category has no renewal routine, its records will be reported and left used"
            );
        }
    }

    let pool = connect_pool(&config.database_url).await?;
    if config.run_migrations {
        run_migrations(&pool).await?;
    }

    let dispatcher = build_dispatcher(&config, pool).await?;
    info!(
        max_parallel = config.dispatcher.max_parallel,
        poll_interval = ?config.dispatcher.poll_interval,
        categories = ?config.dispatcher.categories,
        "renewal worker started"
    );

    dispatcher.run(shutdown_signal()).await;
    info!("renewal worker stopped");

    Ok(())
}

async fn build_dispatcher(config: &WorkerConfig, pool: PgPool) -> AppResult<RenewalDispatcher> {
    let executor_client = reqwest::Client::builder()
        .connect_timeout(PROBE_TIMEOUT)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build http client: {error}")))?;

    let proxies: Arc<dyn ProxyPoolRepository> = match &config.proxy_pool_backend {
        ProxyPoolBackend::Postgres => {
            let repository = PostgresProxyPoolRepository::new(pool.clone());
            for address in &config.proxy_seed {
                repository.register_proxy(address).await?;
            }
            Arc::new(repository)
        }
        ProxyPoolBackend::Redis { url } => {
            let client = redis::Client::open(url.as_str()).map_err(|error| {
                AppError::Validation(format!("invalid REDIS_URL value: {error}"))
            })?;
            let repository = RedisProxyPoolRepository::new(client, REDIS_KEY_PREFIX);
            for address in &config.proxy_seed {
                repository.register_proxy(address).await?;
            }
            Arc::new(repository)
        }
    };
    if !config.proxy_seed.is_empty() {
        info!(count = config.proxy_seed.len(), "proxy seed registered");
    }

    let ports = RenewalPorts {
        records: Arc::new(PostgresAccountRecordRepository::new(pool)),
        proxies,
        probe: Arc::new(HttpProxyHealthProbe::new(
            config.proxy_health_check_url.as_str(),
            PROBE_TIMEOUT,
        )),
        executor: Arc::new(HttpSessionRenewalExecutor::new(
            executor_client,
            config.executor_url.as_str(),
            config.executor_secret.clone(),
        )),
        notifier: build_notifier(config)?,
    };

    RenewalDispatcher::new(config.dispatcher.clone(), ports)
}

fn build_notifier(config: &WorkerConfig) -> AppResult<Arc<dyn OperatorNotifier>> {
    let Some(telegram) = &config.telegram else {
        info!("telegram credentials not configured, operator notifications go to the log");
        return Ok(Arc::new(TracingOperatorNotifier::new()));
    };

    let client = reqwest::Client::builder()
        .timeout(NOTIFIER_TIMEOUT)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build http client: {error}")))?;

    Ok(Arc::new(TelegramOperatorNotifier::new(
        client,
        telegram.bot_token.clone(),
        telegram.chat_id.clone(),
    )))
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested, draining renewal jobs"),
        Err(error) => error!(error = %error, "failed to listen for shutdown signal"),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
