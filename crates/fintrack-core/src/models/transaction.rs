use serde::{Deserialize, Serialize};

use super::AccountCompact;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(deserialize_with = "super::de_amount")]
    pub amount: f64,
    pub date: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub account: Option<AccountCompact>,
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Transaction {
    /// Merchant if known, otherwise the description
    pub fn payee(&self) -> &str {
        self.merchant
            .as_deref()
            .filter(|m| !m.is_empty())
            .or(self.description.as_deref())
            .unwrap_or("")
    }
}

/// Body for creating a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: String,
    pub amount: f64,
    pub date: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_pending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transaction_with_decimal_string() {
        let json = r#"{"id":"t-1","amount":"-42.50","date":"2024-03-01","description":"Groceries",
            "merchant":"","category":"Food","account":{"id":"a-1","name":"Checking","account_type":"checking"},
            "created_at":"2024-03-01T10:00:00","updated_at":"2024-03-01T10:00:00"}"#;

        let tx: Transaction = serde_json::from_str(json).expect("Failed to parse transaction");
        assert_eq!(tx.amount, -42.5);
        assert_eq!(tx.payee(), "Groceries");
        assert_eq!(tx.account.as_ref().map(|a| a.name.as_str()), Some("Checking"));
        assert!(!tx.is_pending);
    }

    #[test]
    fn test_parse_transaction_numeric_amount() {
        let json = r#"{"id":"t-2","amount":12,"date":"2024-03-02","merchant":"Cafe"}"#;
        let tx: Transaction = serde_json::from_str(json).expect("Failed to parse transaction");
        assert_eq!(tx.amount, 12.0);
        assert_eq!(tx.payee(), "Cafe");
    }

    #[test]
    fn test_bad_amount_rejected() {
        let json = r#"{"id":"t-3","amount":"twelve","date":"2024-03-02"}"#;
        assert!(serde_json::from_str::<Transaction>(json).is_err());
    }

    #[test]
    fn test_new_transaction_omits_empty_optionals() {
        let new = NewTransaction {
            account_id: "a-1".to_string(),
            amount: 10.0,
            date: "2024-03-03".to_string(),
            description: "Lunch".to_string(),
            merchant: None,
            category_id: None,
            notes: None,
            is_pending: false,
        };
        let value = serde_json::to_value(&new).expect("serialize");
        assert!(value.get("merchant").is_none());
        assert_eq!(value["account_id"], "a-1");
    }
}
