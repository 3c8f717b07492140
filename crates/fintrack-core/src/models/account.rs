use serde::{Deserialize, Serialize};

/// Account summary embedded in a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCompact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default, deserialize_with = "super::de_amount")]
    pub balance: f64,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Account {
    pub fn display_balance(&self) -> String {
        format!("{:.2}", self.balance)
    }
}
