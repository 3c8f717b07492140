//! Typed wrappers over `AuthGateway::proxy` for the finance resources.

use serde_json::{json, Value};

use crate::auth::SessionStore;
use crate::models::{Account, NewTransaction, Transaction};

use super::{ApiError, AuthGateway, RequestOptions};

const TRANSACTIONS: &str = "transactions";
const ACCOUNTS: &str = "accounts";

impl AuthGateway {
    /// Fetch all transactions visible to the session's user
    pub async fn list_transactions(&self, store: &SessionStore) -> Result<Vec<Transaction>, ApiError> {
        self.proxy_as(store, TRANSACTIONS, RequestOptions::get()).await
    }

    /// Create a transaction and return the backend's representation of it
    pub async fn create_transaction(
        &self,
        store: &SessionStore,
        transaction: &NewTransaction,
    ) -> Result<Value, ApiError> {
        let body = serde_json::to_value(transaction)
            .map_err(|e| ApiError::Network(format!("Failed to encode transaction: {}", e)))?;
        self.proxy(store, TRANSACTIONS, RequestOptions::post(body)).await
    }

    pub async fn delete_transaction(&self, store: &SessionStore, transaction_id: &str) -> Result<Value, ApiError> {
        let id = transaction_id.trim().trim_matches('/');
        if id.is_empty() {
            return Err(ApiError::Upstream {
                status: 400,
                message: "Transaction ID is required".to_string(),
                details: json!({}),
            });
        }
        self.proxy(store, &format!("{}/{}", TRANSACTIONS, id), RequestOptions::delete())
            .await
    }

    /// Fetch all accounts visible to the session's user
    pub async fn list_accounts(&self, store: &SessionStore) -> Result<Vec<Account>, ApiError> {
        self.proxy_as(store, ACCOUNTS, RequestOptions::get()).await
    }
}
