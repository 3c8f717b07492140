//! Data models for finance resources served through the gateway.
//!
//! - `Transaction`, `NewTransaction`: ledger entries
//! - `Account`, `AccountCompact`: the accounts transactions belong to

pub mod account;
pub mod transaction;

pub use account::{Account, AccountCompact};
pub use transaction::{NewTransaction, Transaction};

use serde::{Deserialize, Deserializer};

/// Monetary amounts arrive either as JSON numbers or as decimal strings.
pub(crate) fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
