//! Redis-backed proxy pool.
//!
//! Each proxy lives in a hash keyed by its address; free proxies are also
//! members of one set so a free proxy can be found in O(1).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Script};
use sessionkeeper_application::ProxyPoolRepository;
use sessionkeeper_core::{AppError, AppResult};
use sessionkeeper_domain::{Proxy, ProxyAddress, ProxyHealth, ProxyStatus};
use tracing::debug;

const COMPARE_AND_SET_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return 0
end
if ARGV[1] ~= '' and redis.call('HGET', KEYS[1], 'status') ~= ARGV[1] then
  return 0
end
redis.call('HSET', KEYS[1], 'status', ARGV[2])
if ARGV[4] ~= '' then
  redis.call('HSET', KEYS[1], 'last_used_ip', ARGV[4])
end
if ARGV[5] ~= '' then
  redis.call('HSET', KEYS[1], 'last_checked_at', ARGV[5])
end
if ARGV[2] == 'free' then
  redis.call('SADD', KEYS[2], ARGV[3])
else
  redis.call('SREM', KEYS[2], ARGV[3])
end
return 1
"#;

const REGISTER_SCRIPT: &str = r#"
if redis.call('HSETNX', KEYS[1], 'status', 'free') == 1 then
  redis.call('SADD', KEYS[2], ARGV[1])
end
return 1
"#;

/// Redis implementation of the proxy pool.
#[derive(Clone)]
pub struct RedisProxyPoolRepository {
    client: redis::Client,
    key_prefix: String,
}

impl RedisProxyPoolRepository {
    /// Creates one pool adapter.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    /// Adds a proxy to the pool as free, leaving existing entries untouched.
    pub async fn register_proxy(&self, address: &ProxyAddress) -> AppResult<()> {
        let mut connection = self.connection().await?;

        Script::new(REGISTER_SCRIPT)
            .key(self.proxy_key(address))
            .key(self.free_set_key())
            .arg(address.as_str())
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to register proxy '{address}': {error}"))
            })?;

        Ok(())
    }

    fn proxy_key(&self, address: &ProxyAddress) -> String {
        format!("{}:proxy:{}", self.key_prefix, address.as_str())
    }

    fn free_set_key(&self) -> String {
        format!("{}:free", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

fn proxy_from_fields(address: ProxyAddress, fields: &HashMap<String, String>) -> AppResult<Proxy> {
    let status = fields
        .get("status")
        .map(|value| ProxyStatus::parse(value.as_str()))
        .transpose()?
        .unwrap_or(ProxyStatus::Free);
    let last_checked_at = fields
        .get("last_checked_at")
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|value| value.with_timezone(&Utc));

    Ok(Proxy {
        address,
        status,
        last_used_ip: fields.get("last_used_ip").cloned(),
        last_checked_at,
    })
}

#[async_trait]
impl ProxyPoolRepository for RedisProxyPoolRepository {
    async fn find_free_proxy(&self) -> AppResult<Option<Proxy>> {
        let mut connection = self.connection().await?;

        let member: Option<String> = connection
            .srandmember(self.free_set_key())
            .await
            .map_err(|error| AppError::Internal(format!("failed to find free proxy: {error}")))?;
        let Some(member) = member else {
            return Ok(None);
        };

        let address = ProxyAddress::new(member)?;
        let fields: HashMap<String, String> = connection
            .hgetall(self.proxy_key(&address))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to load proxy '{address}': {error}"))
            })?;

        if fields.is_empty() {
            debug!(proxy = %address, "free set points at a missing proxy");
            return Ok(None);
        }

        proxy_from_fields(address, &fields).map(Some)
    }

    async fn compare_and_set_status(
        &self,
        address: &ProxyAddress,
        expected: Option<ProxyStatus>,
        status: ProxyStatus,
        health: Option<&ProxyHealth>,
    ) -> AppResult<u64> {
        let mut connection = self.connection().await?;

        let matched = Script::new(COMPARE_AND_SET_SCRIPT)
            .key(self.proxy_key(address))
            .key(self.free_set_key())
            .arg(expected.map_or("", |expected| expected.as_str()))
            .arg(status.as_str())
            .arg(address.as_str())
            .arg(
                health
                    .and_then(|health| health.exit_ip.clone())
                    .unwrap_or_default(),
            )
            .arg(
                health
                    .map(|health| health.observed_at.to_rfc3339())
                    .unwrap_or_default(),
            )
            .invoke_async::<u64>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to set proxy '{address}' to '{}': {error}",
                    status.as_str()
                ))
            })?;

        Ok(matched)
    }
}
