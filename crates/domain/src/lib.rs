//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod account;
mod proxy;
mod renewal;

pub use account::{AccountCategory, AccountId, AccountRecord, AccountStatus};
pub use proxy::{Proxy, ProxyAddress, ProxyHealth, ProxyStatus};
pub use renewal::{JobStage, RenewalOutcome};
