//! Request and response types for the Superform REST API

use crate::chain::ContractCall;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

fn checksummed<S: Serializer>(address: &Address, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_checksum(None))
}

/// Query parameters of `deposit/calculate`
#[derive(Debug, Clone, Serialize)]
pub struct DepositRequest {
    #[serde(serialize_with = "checksummed")]
    pub user_address: Address,
    #[serde(serialize_with = "checksummed")]
    pub from_token_address: Address,
    pub from_chain_id: u64,
    /// Human-readable amount
    pub amount_in: f64,
    #[serde(serialize_with = "checksummed")]
    pub refund_address: Address,
    pub vault_id: String,
    pub bridge_slippage: u32,
    pub swap_slippage: u32,
    pub route_type: String,
    pub is_part_of_multivault: bool,
    /// Unix timestamp after which the quote expires
    pub force: i64,
}

/// Query parameters of `withdraw/calculate`
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalRequest {
    #[serde(serialize_with = "checksummed")]
    pub user_address: Address,
    #[serde(serialize_with = "checksummed")]
    pub refund_address: Address,
    pub vault_id: String,
    pub bridge_slippage: u32,
    pub swap_slippage: u32,
    pub route_type: String,
    #[serde(serialize_with = "checksummed")]
    pub to_token_address: Address,
    pub to_chain_id: u64,
    /// Minor units, decimal string
    pub superpositions_amount_in: String,
    pub superpositions_chain_id: u64,
    pub is_part_of_multivault: bool,
    pub force: i64,
    pub is_erc20: bool,
    pub retain_4626: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationKind {
    Smart,
    Withdrawal,
}

/// Query parameters of `simulation/superform`
#[derive(Debug, Clone, Serialize)]
pub struct SimulationRequest {
    #[serde(serialize_with = "checksummed")]
    pub user_address: Address,
    pub superform_id: String,
    /// Minor units, decimal string
    pub amount_in: String,
    #[serde(rename = "type")]
    pub kind: SimulationKind,
    pub override_state: bool,
    pub include_approval: bool,
    pub retain_4626: bool,
}

/// JSON body of `simulation/router`
#[derive(Debug, Clone, Serialize)]
pub struct RouterSimulationRequest {
    #[serde(serialize_with = "checksummed")]
    pub user_address: Address,
    pub chain_id: u64,
    pub tx_data: Bytes,
    /// Wei, decimal string
    pub value: String,
    pub is_router: bool,
}

impl RouterSimulationRequest {
    /// Simulate exactly what `descriptor` would submit
    pub fn for_descriptor(
        user_address: Address,
        chain_id: u64,
        descriptor: &TransactionDescriptor,
        is_router: bool,
    ) -> Self {
        Self {
            user_address,
            chain_id,
            tx_data: descriptor.data.clone(),
            value: descriptor.value.to_string(),
            is_router,
        }
    }
}

/// JSON body of `superrewards/start/claim`
#[derive(Debug, Clone, Serialize)]
pub struct ClaimRequest {
    #[serde(rename = "tournamentID")]
    pub tournament_id: u32,
    #[serde(serialize_with = "checksummed")]
    pub user: Address,
}

/// Opaque quote returned by a calculate endpoint and posted back unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Calculation(pub Value);

impl Calculation {
    /// `in.superFormId`, which the API sends either as a string or a number
    pub fn superform_id(&self) -> Result<String> {
        match self.0.pointer("/in/superFormId") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(Error::Api(
                "Calculation is missing in.superFormId".to_string(),
            )),
        }
    }
}

/// Approval sub-call attached to a transaction descriptor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApprovalCall {
    pub to: Address,
    pub data: Bytes,
    #[serde(default, deserialize_with = "lenient_u256")]
    pub value: U256,
}

impl From<ApprovalCall> for ContractCall {
    fn from(call: ApprovalCall) -> Self {
        ContractCall {
            to: call.to,
            data: call.data,
            value: call.value,
        }
    }
}

/// Transaction payload produced by a start endpoint
///
/// Not `Clone`: [`TransactionDescriptor::into_call`] consumes it.
#[derive(Debug, Deserialize)]
pub struct TransactionDescriptor {
    pub to: Address,
    #[serde(alias = "transactionData")]
    pub data: Bytes,
    #[serde(default, deserialize_with = "lenient_u256")]
    pub value: U256,
    #[serde(default, rename = "approvalData", deserialize_with = "approval_object")]
    pub approval: Option<ApprovalCall>,
    /// Router method name, informational
    #[serde(default)]
    pub method: Option<String>,
}

impl TransactionDescriptor {
    /// Detach the approval sub-call, if any
    pub fn take_approval(&mut self) -> Option<ApprovalCall> {
        self.approval.take()
    }

    pub fn into_call(self) -> ContractCall {
        ContractCall {
            to: self.to,
            data: self.data,
            value: self.value,
        }
    }
}

/// Outcome of one simulation entry
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub success: bool,
    pub payload: Value,
}

impl SimulationResult {
    /// Only an explicit `"success": true` counts as success
    pub fn from_entry(entry: Value) -> Self {
        let success = entry
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Self {
            success,
            payload: entry,
        }
    }

    pub fn failed(payload: Value) -> Self {
        Self {
            success: false,
            payload,
        }
    }
}

/// One vault position of an account
#[derive(Debug, Clone, PartialEq)]
pub struct VaultPosition {
    pub vault_id: String,
    pub chain_id: u64,
    /// Superposition balance in minor units
    pub balance: U256,
    pub is_erc20: bool,
    pub usd_value: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PortfolioResponse {
    #[serde(default)]
    pub superpositions: Option<Vec<Superposition>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Superposition {
    pub vault: SuperpositionVault,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub superposition_usd_value: f64,
    pub chain_id: u64,
    #[serde(deserialize_with = "lenient_u256")]
    pub superposition_balance: U256,
    #[serde(default)]
    pub is_erc20: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuperpositionVault {
    pub id: String,
}

impl From<Superposition> for VaultPosition {
    fn from(raw: Superposition) -> Self {
        VaultPosition {
            vault_id: raw.vault.id,
            chain_id: raw.chain_id,
            balance: raw.superposition_balance,
            is_erc20: raw.is_erc20,
            usd_value: raw.superposition_usd_value,
        }
    }
}

/// A season reward and its status for one account
#[derive(Debug, Clone, Deserialize)]
pub struct SafariReward {
    /// `claimable`, `non-claimable` or `claimed`
    pub status: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl SafariReward {
    pub fn is_claimable(&self) -> bool {
        self.status == "claimable"
    }
}

/// A rewards season
#[derive(Debug, Clone, Deserialize)]
pub struct SafariTournament {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    /// `live` or `finished`
    pub state: String,
}

impl SafariTournament {
    pub fn is_live(&self) -> bool {
        self.state == "live"
    }
}

fn parse_u256(value: &Value) -> std::result::Result<U256, String> {
    match value {
        Value::Null => Ok(U256::ZERO),
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| format!("expected an unsigned integer, got {}", n)),
        Value::String(s) if s.is_empty() => Ok(U256::ZERO),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16),
            None => U256::from_str_radix(s, 10),
        }
        .map_err(|e| format!("invalid amount {:?}: {}", s, e)),
        other => Err(format!("expected an amount, got {}", other)),
    }
}

/// Amounts arrive as decimal strings, hex strings, numbers or null
fn lenient_u256<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<U256, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse_u256(&value).map_err(serde::de::Error::custom)
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("expected a number, got {}", other))),
    }
}

/// Only an object counts as approval data; `""`, `null` and friends mean none
fn approval_object<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<ApprovalCall>, D::Error> {
    match Value::deserialize(deserializer)? {
        obj @ Value::Object(_) => serde_json::from_value(obj)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
