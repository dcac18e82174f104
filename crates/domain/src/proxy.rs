use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sessionkeeper_core::{AppError, AppResult};

/// Validated proxy connection string in `host:port:user:password` form.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProxyAddress {
    raw: String,
    port: u16,
}

impl ProxyAddress {
    /// Parses and validates one proxy connection string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let raw = value.into().trim().to_owned();
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() != 4 {
            return Err(AppError::Validation(
                "proxy address must have the form host:port:user:password".to_owned(),
            ));
        }

        if parts.iter().any(|part| part.is_empty()) {
            return Err(AppError::Validation(
                "proxy address segments must not be empty".to_owned(),
            ));
        }

        let port = parts[1].parse::<u16>().map_err(|error| {
            AppError::Validation(format!("invalid proxy port '{}': {error}", parts[1]))
        })?;
        if port == 0 {
            return Err(AppError::Validation(
                "proxy port must be greater than zero".to_owned(),
            ));
        }

        Ok(Self { raw, port })
    }

    /// Returns the full connection string used as the pool key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// Returns the proxy host.
    #[must_use]
    pub fn host(&self) -> &str {
        self.segment(0)
    }

    /// Returns the proxy port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the proxy auth username.
    #[must_use]
    pub fn username(&self) -> &str {
        self.segment(2)
    }

    /// Returns the proxy auth password.
    #[must_use]
    pub fn password(&self) -> &str {
        self.segment(3)
    }

    /// Returns the `http://host:port` endpoint without credentials.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("http://{}:{}", self.host(), self.port)
    }

    fn segment(&self, index: usize) -> &str {
        self.raw.split(':').nth(index).unwrap_or_default()
    }
}

impl TryFrom<String> for ProxyAddress {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProxyAddress> for String {
    fn from(value: ProxyAddress) -> Self {
        value.raw
    }
}

// Credentials never reach logs.
impl std::fmt::Display for ProxyAddress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.host(), self.port)
    }
}

impl std::fmt::Debug for ProxyAddress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "ProxyAddress({}:{}:{}:***)",
            self.host(),
            self.port,
            self.username()
        )
    }
}

/// Lease status of one proxy in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyStatus {
    /// Proxy can be leased.
    Free,
    /// Proxy is held by one renewal job.
    Leased,
}

impl ProxyStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Leased => "leased",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "free" => Ok(Self::Free),
            "leased" => Ok(Self::Leased),
            _ => Err(AppError::Validation(format!(
                "unknown proxy status '{value}'"
            ))),
        }
    }
}

/// Post-use observation of one proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyHealth {
    /// Exit IP reported through the proxy, when it answered.
    pub exit_ip: Option<String>,
    /// Observation timestamp.
    pub observed_at: DateTime<Utc>,
}

impl ProxyHealth {
    /// Records a successful probe.
    #[must_use]
    pub fn reachable(exit_ip: impl Into<String>) -> Self {
        Self {
            exit_ip: Some(exit_ip.into()),
            observed_at: Utc::now(),
        }
    }

    /// Records a probe that got no answer through the proxy.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            exit_ip: None,
            observed_at: Utc::now(),
        }
    }

    /// Returns whether the proxy answered.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.exit_ip.is_some()
    }
}

/// One leasable proxy descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    /// Connection string.
    pub address: ProxyAddress,
    /// Lease status.
    pub status: ProxyStatus,
    /// Last exit IP observed after a release.
    pub last_used_ip: Option<String>,
    /// When the last health observation was taken.
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Proxy {
    /// Creates a free proxy with no health history.
    #[must_use]
    pub fn free(address: ProxyAddress) -> Self {
        Self {
            address,
            status: ProxyStatus::Free,
            last_used_ip: None,
            last_checked_at: None,
        }
    }
}
