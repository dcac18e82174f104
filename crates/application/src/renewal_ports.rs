mod executor;
mod notifier;
mod proxies;
mod records;

pub use executor::SessionRenewalExecutor;
pub use notifier::{OperatorChannel, OperatorNotifier};
pub use proxies::{ProxyHealthProbe, ProxyPoolRepository};
pub use records::AccountRecordRepository;
