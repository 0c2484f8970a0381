use std::collections::HashSet;

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Hop, Route, RouteError, RouteProvider};

/// HTTP client for the MantaSwap routing API.
#[derive(Debug, Clone)]
pub struct MantaSwap {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct RouteRequest<'a> {
    input: RouteInput<'a>,
    output: RouteOutput<'a>,
}

#[derive(Serialize)]
struct RouteInput<'a> {
    denom: &'a str,
    amount: String,
    slippage: &'a str,
}

#[derive(Serialize)]
struct RouteOutput<'a> {
    denom: &'a str,
}

// The API reports failures as `{"error": "..."}` with a 200 status.
#[derive(Deserialize)]
#[serde(untagged)]
enum ApiResponse<T> {
    Error { error: String },
    Ok(T),
}

#[derive(Deserialize)]
struct RouteResponse {
    routes: Vec<QuotedRoute>,
}

#[derive(Deserialize)]
struct QuotedRoute {
    tx: QuotedTx,
}

#[derive(Deserialize)]
struct QuotedTx {
    swap: SwapMsg,
}

#[derive(Deserialize)]
struct SwapMsg {
    stages: Vec<Vec<(String, String)>>,
}

#[derive(Deserialize)]
struct WhitelistEntry {
    denom: String,
}

impl MantaSwap {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RouteProvider for MantaSwap {
    #[instrument(skip(self, amount), fields(%amount))]
    async fn resolve_route(
        &self,
        input: &str,
        amount: &BigUint,
        output: &str,
        slippage: &str,
    ) -> Result<Route, RouteError> {
        let body = RouteRequest {
            input: RouteInput {
                denom: input,
                amount: amount.to_str_radix(10),
                slippage,
            },
            output: RouteOutput { denom: output },
        };

        let res: ApiResponse<RouteResponse> = self
            .client
            .post(format!("{}/route", self.url))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        let quoted = match res {
            ApiResponse::Error { error } => return Err(RouteError::Rejected(error)),
            ApiResponse::Ok(res) => res.routes.into_iter().next(),
        };
        let Some(quoted) = quoted else {
            return Err(RouteError::NotFound {
                input: input.to_string(),
                output: output.to_string(),
            });
        };

        let hops = hops_from_stages(quoted.tx.swap.stages, output)?;
        debug!(hops = hops.len(), "resolved route");
        Ok(Route::new(input, hops))
    }

    async fn list_swappable_denoms(&self) -> Result<HashSet<String>, RouteError> {
        let res: ApiResponse<Vec<WhitelistEntry>> = self
            .client
            .get(format!("{}/whitelist", self.url))
            .send()
            .await?
            .json()
            .await?;

        match res {
            ApiResponse::Error { error } => Err(RouteError::Rejected(error)),
            ApiResponse::Ok(entries) => Ok(entries.into_iter().map(|e| e.denom).collect()),
        }
    }
}

/// Converts swap-contract stages into input-ordered hops.
///
/// The contract pops its stages, so the last stage is the first hop. Each
/// stage names the pool and the denom it is offered; the produced denom is the
/// offer denom of the following hop, or `output` for the final one.
fn hops_from_stages(
    stages: Vec<Vec<(String, String)>>,
    output: &str,
) -> Result<Vec<Hop>, RouteError> {
    let offers = stages
        .into_iter()
        .rev()
        .map(|stage| {
            stage
                .into_iter()
                .next()
                .ok_or_else(|| RouteError::Rejected("route contains an empty stage".into()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let produced = offers
        .iter()
        .skip(1)
        .map(|(_, offer)| offer.clone())
        .chain(std::iter::once(output.to_string()));

    Ok(offers
        .iter()
        .zip(produced)
        .map(|((pool, _), denom)| Hop::new(pool.clone(), denom))
        .collect())
}
