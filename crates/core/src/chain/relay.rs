use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{Broadcaster, SubmitError, TxReceipt};
use crate::{coin::Coin, msg::ExecuteMsg};

/// Client for the signing relay holding the keeper's accounts.
///
/// The relay derives account `n` from its key material, attaches the
/// orchestrator as fee granter and broadcasts the signed transaction.
#[derive(Debug, Clone)]
pub struct SignerRelay {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    account: u32,
    contract: &'a str,
    msg: &'a ExecuteMsg,
    funds: &'a [Coin],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExecuteResponse {
    Error { error: String },
    Ok(TxReceipt),
}

impl SignerRelay {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Broadcaster for SignerRelay {
    #[instrument(skip(self, msg, funds))]
    async fn submit(
        &self,
        account: u32,
        contract: &str,
        msg: &ExecuteMsg,
        funds: &[Coin],
    ) -> Result<TxReceipt, SubmitError> {
        let res = self
            .client
            .post(format!("{}/execute", self.url))
            .json(&ExecuteRequest {
                account,
                contract,
                msg,
                funds,
            })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await?;
            return Err(SubmitError::Rejected(format!("{status}: {body}")));
        }

        match res.json::<ExecuteResponse>().await? {
            ExecuteResponse::Ok(receipt) => Ok(receipt),
            ExecuteResponse::Error { error } => Err(SubmitError::Rejected(error)),
        }
    }
}
