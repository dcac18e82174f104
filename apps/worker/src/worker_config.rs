use std::time::Duration;

use sessionkeeper_application::{DispatcherConfig, ProxyLeaseConfig, RetryLimits};
use sessionkeeper_core::{AppError, AppResult, NonEmptyString};
use sessionkeeper_domain::ProxyAddress;

/// Where the proxy pool lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyPoolBackend {
    Postgres,
    Redis { url: String },
}

/// Telegram credentials for operator notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: NonEmptyString,
    pub chat_id: NonEmptyString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub database_url: String,
    pub run_migrations: bool,
    pub executor_url: String,
    pub executor_secret: Option<String>,
    pub proxy_pool_backend: ProxyPoolBackend,
    pub proxy_health_check_url: String,
    pub proxy_seed: Vec<ProxyAddress>,
    pub telegram: Option<TelegramConfig>,
    pub dispatcher: DispatcherConfig,
}

impl WorkerConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let env = EnvReader { lookup };

        let database_url = env.required("DATABASE_URL")?;
        let executor_url = env.required("RENEWAL_EXECUTOR_URL")?;
        let executor_secret = env.optional("RENEWAL_EXECUTOR_SECRET");
        let run_migrations = env.parse_bool("RENEWAL_RUN_MIGRATIONS", true)?;

        let proxy_pool_backend = match env
            .optional("PROXY_POOL_BACKEND")
            .as_deref()
            .unwrap_or("postgres")
        {
            "postgres" => ProxyPoolBackend::Postgres,
            "redis" => ProxyPoolBackend::Redis {
                url: env.required("REDIS_URL")?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "invalid PROXY_POOL_BACKEND value '{other}': expected postgres or redis"
                )));
            }
        };
        let proxy_health_check_url = env
            .optional("PROXY_HEALTH_CHECK_URL")
            .unwrap_or_else(|| "https://api.ipify.org?format=json".to_owned());
        let proxy_seed = env
            .optional("PROXY_SEED")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|address| !address.is_empty())
                    .map(ProxyAddress::new)
                    .collect::<AppResult<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let telegram = match (
            env.optional("TELEGRAM_BOT_TOKEN"),
            env.optional("TELEGRAM_CHAT_ID"),
        ) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                bot_token: NonEmptyString::new(bot_token)?,
                chat_id: NonEmptyString::new(chat_id)?,
            }),
            (None, None) => None,
            _ => {
                return Err(AppError::Validation(
                    "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together".to_owned(),
                ));
            }
        };

        let categories = env
            .optional("RENEWAL_CATEGORIES")
            .map(|value| {
                value
                    .split(',')
                    .map(|category| category.trim().to_owned())
                    .filter(|category| !category.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| DispatcherConfig::default().categories);

        let dispatcher = DispatcherConfig {
            max_parallel: env.parse_usize("RENEWAL_MAX_PARALLEL", 1)?,
            poll_interval: env.parse_millis("RENEWAL_POLL_INTERVAL_MS", 20_000)?,
            retry_limits: RetryLimits {
                proxy: env.parse_u32("RENEWAL_PROXY_RETRY_LIMIT", 10)?,
                definite: env.parse_u32("RENEWAL_RETRY_LIMIT", 3)?,
                soft: env.parse_u32("RENEWAL_READD_RETRY_LIMIT", 10)?,
            },
            proxy_retry_delay: env.parse_millis("RENEWAL_PROXY_RETRY_DELAY_MS", 180_000)?,
            proxy_lease: ProxyLeaseConfig {
                acquire_attempts: env.parse_u32("RENEWAL_PROXY_ACQUIRE_ATTEMPTS", 5)?,
                acquire_backoff: env.parse_millis("RENEWAL_PROXY_ACQUIRE_BACKOFF_MS", 2_000)?,
            },
            job_timeout: env.parse_millis("RENEWAL_JOB_TIMEOUT_MS", 900_000)?,
            categories,
        };
        dispatcher.validate()?;

        Ok(Self {
            database_url,
            run_migrations,
            executor_url,
            executor_secret,
            proxy_pool_backend,
            proxy_health_check_url,
            proxy_seed,
            telegram,
            dispatcher,
        })
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> AppResult<String> {
        self.optional(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn parse_usize(&self, name: &str, default: usize) -> AppResult<usize> {
        match self.optional(name) {
            Some(value) => value.parse::<usize>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }

    fn parse_u32(&self, name: &str, default: u32) -> AppResult<u32> {
        match self.optional(name) {
            Some(value) => value.parse::<u32>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }

    fn parse_millis(&self, name: &str, default: u64) -> AppResult<Duration> {
        let millis = match self.optional(name) {
            Some(value) => value.parse::<u64>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            })?,
            None => default,
        };

        Ok(Duration::from_millis(millis))
    }

    fn parse_bool(&self, name: &str, default: bool) -> AppResult<bool> {
        match self.optional(name).as_deref() {
            Some("true" | "1") => Ok(true),
            Some("false" | "0") => Ok(false),
            Some(value) => Err(AppError::Validation(format!(
                "invalid {name} value '{value}': expected true or false"
            ))),
            None => Ok(default),
        }
    }
}
