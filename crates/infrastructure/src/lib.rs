//! Infrastructure adapters for session renewal ports.

#![forbid(unsafe_code)]

mod http_proxy_health_probe;
mod http_session_renewal_executor;
mod in_memory_account_record_repository;
mod in_memory_proxy_pool_repository;
mod postgres_account_record_repository;
mod postgres_migrations;
mod postgres_proxy_pool_repository;
mod redis_proxy_pool_repository;
mod telegram_operator_notifier;
mod tracing_operator_notifier;

pub use http_proxy_health_probe::HttpProxyHealthProbe;
pub use http_session_renewal_executor::HttpSessionRenewalExecutor;
pub use in_memory_account_record_repository::InMemoryAccountRecordRepository;
pub use in_memory_proxy_pool_repository::InMemoryProxyPoolRepository;
pub use postgres_account_record_repository::PostgresAccountRecordRepository;
pub use postgres_migrations::run_migrations;
pub use postgres_proxy_pool_repository::PostgresProxyPoolRepository;
pub use redis_proxy_pool_repository::RedisProxyPoolRepository;
pub use telegram_operator_notifier::TelegramOperatorNotifier;
pub use tracing_operator_notifier::TracingOperatorNotifier;
