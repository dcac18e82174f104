use serde::{Deserialize, Serialize};
use sessionkeeper_core::{AppError, AppResult};
use uuid::Uuid;

/// Account record identifier, stable for the lifetime of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Creates a new random account identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an account identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Session lifecycle status of one account record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Session is fresh and the account can be handed out.
    Free,
    /// Session was consumed and needs renewal.
    Used,
    /// A renewal job currently owns the record.
    Updating,
}

impl AccountStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Used => "used",
            Self::Updating => "updating",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "free" => Ok(Self::Free),
            "used" => Ok(Self::Used),
            "updating" => Ok(Self::Updating),
            _ => Err(AppError::Validation(format!(
                "unknown account status '{value}'"
            ))),
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Account categories the renewal worker knows how to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    /// Desktop web accounts.
    Accounts,
    /// Mobile app accounts.
    MobileAccounts,
}

impl AccountCategory {
    /// All supported categories in polling order.
    pub const ALL: [Self; 2] = [Self::Accounts, Self::MobileAccounts];

    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::MobileAccounts => "mobileaccounts",
        }
    }

    /// Maps a stored category tag to a supported category.
    ///
    /// Returns `None` for tags that have no renewal handler.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "accounts" => Some(Self::Accounts),
            "mobileaccounts" => Some(Self::MobileAccounts),
            _ => None,
        }
    }
}

/// One persisted account whose session may need renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Stable record identifier.
    pub id: AccountId,
    /// Sub-collection tag the record lives in.
    pub category: String,
    /// Current lifecycle status.
    pub status: AccountStatus,
    /// Opaque contact handle handed to the renewal executor.
    pub identity: String,
}

impl AccountRecord {
    /// Creates a record snapshot.
    #[must_use]
    pub fn new(
        id: AccountId,
        category: impl Into<String>,
        status: AccountStatus,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            id,
            category: category.into(),
            status,
            identity: identity.into(),
        }
    }

    /// Returns the supported category for this record, if any.
    #[must_use]
    pub fn supported_category(&self) -> Option<AccountCategory> {
        AccountCategory::parse(self.category.as_str())
    }
}
