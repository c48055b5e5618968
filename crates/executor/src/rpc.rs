//! JSON-RPC ledger client.

use crate::{
    Ledger, RpcConfig, SubmitError, Transaction, TransactionFailure, TransactionStatus,
    TransportError,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use solanoid_core::InstructionErrorKind;
use solanoid_types::{Account, Hash, Pubkey, Signature};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// [`Ledger`] over a JSON-RPC 2.0 HTTP endpoint.
pub struct RpcLedger {
    client: reqwest::Client,
    endpoint: String,
    commitment: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    slot: u64,
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    lamports: u64,
    owner: String,
    data: (String, String),
    executable: bool,
}

impl RpcLedger {
    pub fn new(config: &RpcConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            commitment: config.commitment.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<RpcResponse<T>, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "RPC request");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, TransportError> {
        let response = self.request(method, params).await?;
        if let Some(error) = response.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        response
            .result
            .ok_or_else(|| TransportError::InvalidResponse(format!("{method}: missing result")))
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn latest_blockhash(&self) -> Result<Hash, TransportError> {
        let result: WithContext<BlockhashValue> = self
            .call("getLatestBlockhash", json!([{ "commitment": self.commitment }]))
            .await?;
        result
            .value
            .blockhash
            .parse()
            .map_err(|e| TransportError::InvalidResponse(format!("blockhash: {e}")))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, SubmitError> {
        let encoded = BASE64.encode(transaction.to_bytes());
        let response: RpcResponse<String> = self
            .request(
                "sendTransaction",
                json!([encoded, { "encoding": "base64", "preflightCommitment": self.commitment }]),
            )
            .await?;

        if let Some(error) = response.error {
            // Preflight simulation failures carry the transaction error in data.err
            if let Some(err) = error.data.as_ref().and_then(|d| d.get("err")).filter(|e| !e.is_null()) {
                return Err(SubmitError::Rejected(parse_transaction_failure(err)));
            }
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            }
            .into());
        }
        let signature = response
            .result
            .ok_or_else(|| TransportError::InvalidResponse("sendTransaction: missing result".into()))?;
        signature
            .parse()
            .map_err(|e| TransportError::InvalidResponse(format!("signature: {e}")).into())
    }

    async fn transaction_status(&self, signature: &Signature) -> Result<TransactionStatus, TransportError> {
        let result: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": true }]),
            )
            .await?;
        let status = result.value.into_iter().next().flatten();
        Ok(classify_status(status, &self.commitment))
    }

    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, TransportError> {
        let result: WithContext<Option<AccountInfo>> = self
            .call(
                "getAccountInfo",
                json!([pubkey.to_string(), { "encoding": "base64", "commitment": self.commitment }]),
            )
            .await?;
        result.value.map(decode_account).transpose()
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, TransportError> {
        let result: WithContext<u64> = self
            .call(
                "getBalance",
                json!([pubkey.to_string(), { "commitment": self.commitment }]),
            )
            .await?;
        Ok(result.value)
    }
}

fn commitment_rank(level: &str) -> u8 {
    match level {
        "processed" => 0,
        "confirmed" => 1,
        "finalized" => 2,
        _ => 0,
    }
}

fn classify_status(status: Option<SignatureStatus>, commitment: &str) -> TransactionStatus {
    let Some(status) = status else {
        return TransactionStatus::Pending;
    };
    if let Some(err) = status.err.as_ref().filter(|e| !e.is_null()) {
        return TransactionStatus::Failed {
            slot: status.slot,
            failure: parse_transaction_failure(err),
        };
    }
    let reached = status
        .confirmation_status
        .as_deref()
        .map(commitment_rank)
        .unwrap_or(0);
    if reached >= commitment_rank(commitment) {
        TransactionStatus::Confirmed { slot: status.slot }
    } else {
        TransactionStatus::Pending
    }
}

fn decode_account(info: AccountInfo) -> Result<Account, TransportError> {
    let owner = info
        .owner
        .parse()
        .map_err(|e| TransportError::InvalidResponse(format!("account owner: {e}")))?;
    let data = BASE64
        .decode(info.data.0)
        .map_err(|e| TransportError::InvalidResponse(format!("account data: {e}")))?;
    Ok(Account {
        lamports: info.lamports,
        data,
        owner,
        executable: info.executable,
    })
}

/// Interpret a ledger transaction error value.
///
/// Either a bare name (`"BlockhashNotFound"`) or
/// `{"InstructionError": [index, detail]}` where detail is a builtin name or
/// `{"Custom": code}`.
fn parse_transaction_failure(err: &Value) -> TransactionFailure {
    match err {
        Value::String(name) => TransactionFailure::from_name(name),
        Value::Object(map) => match map.get("InstructionError").and_then(Value::as_array) {
            Some(parts) if parts.len() == 2 => {
                let index = parts[0].as_u64().unwrap_or(0) as u8;
                let kind = match &parts[1] {
                    Value::String(name) => InstructionErrorKind::from_name(name),
                    Value::Object(detail) => match detail.get("Custom").and_then(Value::as_u64) {
                        Some(code) => InstructionErrorKind::Custom(code as u32),
                        None => InstructionErrorKind::Other(parts[1].to_string()),
                    },
                    other => InstructionErrorKind::Other(other.to_string()),
                };
                TransactionFailure::Instruction { index, kind }
            }
            _ => TransactionFailure::Other(err.to_string()),
        },
        other => TransactionFailure::Other(other.to_string()),
    }
}
