//! HTTP client for the Superform REST API

use super::types::{PortfolioResponse, SafariTournament};
use super::{
    Calculation, ClaimRequest, DepositRequest, RouterSimulationRequest, SafariReward,
    SimulationRequest, SimulationResult, TransactionDescriptor, VaultApi, VaultPosition,
    WithdrawalRequest,
};
use crate::config::ApiSettings;
use crate::{Error, Result};
use alloy::primitives::Address;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

const APP_ORIGIN: &str = "https://app.superform.xyz";
const APP_REFERER: &str = "https://app.superform.xyz/";

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// Longest body excerpt carried in an error message
const BODY_EXCERPT: usize = 300;

/// Stateless facade over the Superform REST endpoints
#[derive(Clone)]
pub struct VaultApiClient {
    client: Client,
    base_url: url::Url,
}

impl VaultApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let mut base = settings.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url: url::Url = base
            .parse()
            .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", base, e)))?;

        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
        headers.insert(ORIGIN, HeaderValue::from_static(APP_ORIGIN));
        headers.insert(REFERER, HeaderValue::from_static(APP_REFERER));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<url::Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid API path '{}': {}", path, e)))
    }

    async fn get<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: Option<&Q>,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        tracing::debug!(url = %url, "GET");

        let mut request = self.client.get(url);
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_body(status, &body)
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path)?;
        tracing::debug!(url = %url, "POST");

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_body(status, &body)
    }

    /// Chains the protocol is deployed on
    pub async fn supported_chains(&self) -> Result<Vec<Value>> {
        self.get::<_, ()>("supported/chains", None).await
    }

    /// Current data of one vault
    pub async fn vault(&self, vault_id: &str) -> Result<Value> {
        self.get(&format!("vault/{}", vault_id), Some(&[("timestamp", "false")]))
            .await
    }

    pub async fn protocols(&self) -> Result<Vec<Value>> {
        self.get::<_, ()>("protocols", None).await
    }

    /// Safari XP of one address for a season
    pub async fn safari_points(&self, address: Address, season: u32) -> Result<Value> {
        self.get(
            &format!("superrewards/tournamentXP/{}", season),
            Some(&[("user", address.to_checksum(None))]),
        )
        .await
    }

    pub async fn safari_tournaments(&self) -> Result<Vec<SafariTournament>> {
        self.get::<_, ()>("superrewards/tournaments", None).await
    }

    pub async fn live_safari_tournaments(&self) -> Result<Vec<SafariTournament>> {
        Ok(self
            .safari_tournaments()
            .await?
            .into_iter()
            .filter(SafariTournament::is_live)
            .collect())
    }

    /// Protocol reward totals of one address
    pub async fn protocol_rewards(&self, address: Address) -> Result<Value> {
        self.get::<_, ()>(&format!("protocolRewards/{}", address.to_checksum(None)), None)
            .await
    }
}

/// Validate status and decode a response body
pub(crate) fn parse_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    if !status.is_success() {
        return Err(Error::Api(format!(
            "Invalid response ({}): {}",
            status,
            excerpt(body)
        )));
    }
    serde_json::from_str(body).map_err(|e| {
        Error::Api(format!("Invalid response: {} in {}", e, excerpt(body)))
    })
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Per-position entries from a simulation envelope
///
/// A missing `data` field or an empty list yields a single failed entry.
fn simulation_entries(envelope: Value) -> Vec<SimulationResult> {
    let entries = match envelope.get("data") {
        Some(Value::Array(entries)) => entries.clone(),
        Some(entry @ Value::Object(_)) => vec![entry.clone()],
        _ => Vec::new(),
    };
    if entries.is_empty() {
        return vec![SimulationResult::failed(envelope)];
    }
    entries.into_iter().map(SimulationResult::from_entry).collect()
}

fn router_simulation_entry(envelope: Value) -> SimulationResult {
    match envelope.get("data") {
        Some(entry @ Value::Object(_)) => SimulationResult::from_entry(entry.clone()),
        _ => SimulationResult::failed(envelope),
    }
}

#[async_trait]
impl VaultApi for VaultApiClient {
    async fn calculate_deposit(&self, request: &DepositRequest) -> Result<Calculation> {
        self.get("deposit/calculate", Some(request)).await
    }

    async fn calculate_withdrawal(&self, request: &WithdrawalRequest) -> Result<Calculation> {
        self.get("withdraw/calculate", Some(request)).await
    }

    async fn start_deposit(&self, calculation: &Calculation) -> Result<TransactionDescriptor> {
        self.post("deposit/start", calculation).await
    }

    async fn start_withdrawal(&self, calculation: &Calculation) -> Result<TransactionDescriptor> {
        self.post("withdraw/start", calculation).await
    }

    async fn simulate_operation(
        &self,
        request: &SimulationRequest,
    ) -> Result<Vec<SimulationResult>> {
        let envelope: Value = self.get("simulation/superform", Some(request)).await?;
        Ok(simulation_entries(envelope))
    }

    async fn simulate_router(&self, request: &RouterSimulationRequest) -> Result<SimulationResult> {
        let envelope: Value = self.post("simulation/router", request).await?;
        Ok(router_simulation_entry(envelope))
    }

    async fn get_portfolio(&self, address: Address) -> Result<HashMap<String, VaultPosition>> {
        let response: PortfolioResponse = self
            .get(
                &format!("token/superpositions/balances/{}", address.to_checksum(None)),
                Some(&[("fetch_erc20s", "true")]),
            )
            .await?;

        Ok(response
            .superpositions
            .unwrap_or_default()
            .into_iter()
            .map(VaultPosition::from)
            .map(|position| (position.vault_id.clone(), position))
            .collect())
    }

    async fn get_safari_rewards(&self, address: Address, season: u32) -> Result<Vec<SafariReward>> {
        self.get::<_, ()>(
            &format!("superrewards/rewards/{}/{}", season, address.to_checksum(None)),
            None,
        )
        .await
    }

    async fn claim_rewards(&self, request: &ClaimRequest) -> Result<TransactionDescriptor> {
        self.post("superrewards/start/claim", request).await
    }
}
