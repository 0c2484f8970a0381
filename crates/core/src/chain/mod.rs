//! Chain state queries and transaction submission.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::{coin::Coin, msg::ExecuteMsg};

mod relay;
mod rest;

pub use relay::SignerRelay;
pub use rest::RestQuery;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query to {address} failed: {reason}")]
    Failed { address: String, reason: String },

    #[error("unexpected query response")]
    Decode(#[from] serde_json::Error),

    #[error("chain endpoint unavailable")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("signing relay unavailable")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
}

/// Read-only smart contract queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainQuery: Send + Sync {
    async fn query_contract_state(&self, address: &str, query: &Value) -> Result<Value, QueryError>;
}

/// Signs and broadcasts execute messages.
///
/// `account` selects the signing key. Account 0 belongs to the orchestrator,
/// which pays fees on behalf of the others.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn submit(
        &self,
        account: u32,
        contract: &str,
        msg: &ExecuteMsg,
        funds: &[Coin],
    ) -> Result<TxReceipt, SubmitError>;
}

#[derive(Deserialize)]
struct PendingSwaps {
    balances: Vec<Coin>,
}

/// Balances a unifier contract is holding for conversion.
pub async fn pending_swaps(chain: &dyn ChainQuery, address: &str) -> Result<Vec<Coin>, QueryError> {
    let res = chain
        .query_contract_state(address, &json!({ "pending_swaps": {} }))
        .await?;
    let PendingSwaps { balances } = serde_json::from_value(res)?;
    Ok(balances)
}
