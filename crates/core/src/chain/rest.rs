use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, trace};

use super::{ChainQuery, QueryError};

/// Smart queries over the chain's REST (LCD) endpoint.
#[derive(Debug, Clone)]
pub struct RestQuery {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct SmartQueryResponse {
    data: Value,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

impl RestQuery {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
        }
    }

    fn smart_query_url(&self, address: &str, query: &Value) -> String {
        let encoded = URL_SAFE.encode(query.to_string());
        format!(
            "{}/cosmwasm/wasm/v1/contract/{address}/smart/{encoded}",
            self.url
        )
    }
}

#[async_trait]
impl ChainQuery for RestQuery {
    #[instrument(skip(self, query))]
    async fn query_contract_state(&self, address: &str, query: &Value) -> Result<Value, QueryError> {
        let res = self
            .client
            .get(self.smart_query_url(address, query))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        trace!(%status, %body, "smart query response");

        if !status.is_success() {
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .map(|err| err.message)
                .unwrap_or_else(|_| format!("{status}: {body}"));
            return Err(QueryError::Failed {
                address: address.to_string(),
                reason,
            });
        }

        let SmartQueryResponse { data } = serde_json::from_str(&body)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_is_url_safe_base64() {
        let rest = RestQuery::new(reqwest::Client::new(), "http://localhost:1317/");
        let url = rest.smart_query_url("kujira1abc", &json!({ "pending_swaps": {} }));
        assert_eq!(
            url,
            "http://localhost:1317/cosmwasm/wasm/v1/contract/kujira1abc/smart/eyJwZW5kaW5nX3N3YXBzIjp7fX0="
        );
    }
}
