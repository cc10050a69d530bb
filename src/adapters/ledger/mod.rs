//! EVM JSON-RPC ledger adapter.
//!
//! Implements [`LedgerPort`] with one of two signers:
//!
//! * [`Signer::Local`] builds an EIP-155 transaction, signs it with the
//!   configured wallet key and submits the raw bytes.
//! * [`Signer::Node`] lets the endpoint sign for a configured account.
//!
//! Either way the endpoint may be authenticated with a bearer token.
//!
//! | Port operation          | JSON-RPC method                                 |
//! |-------------------------|-------------------------------------------------|
//! | `sequence_number`       | `eth_getTransactionCount(…, pending)`           |
//! | `submit_incident` local | `eth_chainId`\*, `eth_gasPrice`, `eth_estimateGas`\*, `eth_sendRawTransaction` |
//! | `submit_incident` node  | `eth_sendTransaction`                           |
//! | `wait_for_confirmation` | `eth_getTransactionReceipt` (polled)            |
//!
//! \* skipped when `chain_id` / `gas_limit` are configured.  The chain id is
//! fetched once and cached.

pub mod abi;
pub mod tx;
pub mod wallet;

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::{Value, json};

use crate::app::ports::{LedgerError, LedgerPort};
use crate::app::records::{Address, IncidentRecord, Receipt, TxHash};
use crate::config::LedgerConfig;

use super::offload::run_blocking;
use super::utils::{parse_quantity, to_quantity};

use tx::LegacyTx;
use wallet::Wallet;

#[derive(Serialize)]
struct Payload<'a> {
    jsonrpc: &'static str,
    id: u32,
    method: &'a str,
    params: Value,
}

/// Connection settings shared with the worker threads.
struct Endpoint {
    http: Client,
    url: String,
    bearer: Option<String>,
}

impl Endpoint {
    fn call(&self, id: u32, method: &str, params: Value) -> Result<Value, LedgerError> {
        let payload = Payload {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let mut req = self.http.post(&self.url).json(&payload);
        if let Some(token) = &self.bearer {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LedgerError::Transport(format!("HTTP {}", status.as_u16())));
        }
        let body: Value = resp
            .json()
            .map_err(|_| LedgerError::BadResponse("body is not JSON"))?;
        parse_rpc_response(body)
    }
}

/// Who signs incident transactions.
#[derive(Debug)]
pub enum Signer {
    /// Sign in-process and submit with `eth_sendRawTransaction`.
    Local(Wallet),
    /// The node signs for this account (`eth_sendTransaction`).
    Node(Address),
}

impl Signer {
    /// A wallet key wins; otherwise the node signs for `sender_address`.
    pub fn from_config(cfg: &LedgerConfig) -> Result<Self, LedgerError> {
        match &cfg.wallet_key {
            Some(key) => Wallet::from_hex(key).map(Self::Local),
            None => cfg
                .sender_address
                .parse()
                .map(Self::Node)
                .map_err(LedgerError::Signing),
        }
    }

    /// The account transactions are sent from.
    pub fn address(&self) -> Address {
        match self {
            Self::Local(wallet) => wallet.address(),
            Self::Node(sender) => *sender,
        }
    }
}

/// [`LedgerPort`] over HTTP JSON-RPC.
pub struct JsonRpcLedger {
    endpoint: Arc<Endpoint>,
    signer: Signer,
    contract: Address,
    chain_id: Cell<Option<u64>>,
    gas_limit: Option<u64>,
    poll: Duration,
    confirm_timeout: Duration,
    next_id: AtomicU32,
}

impl JsonRpcLedger {
    pub fn new(cfg: &LedgerConfig, contract: Address) -> Result<Self, LedgerError> {
        let signer = Signer::from_config(cfg)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(u64::from(cfg.request_timeout_secs)))
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self {
            endpoint: Arc::new(Endpoint {
                http,
                url: cfg.rpc_url.clone(),
                bearer: cfg.signer_token.clone(),
            }),
            signer,
            contract,
            chain_id: Cell::new(cfg.chain_id),
            gas_limit: cfg.gas_limit,
            poll: Duration::from_millis(u64::from(cfg.confirm_poll_ms)),
            confirm_timeout: Duration::from_secs(u64::from(cfg.confirm_timeout_secs)),
            next_id: AtomicU32::new(1),
        })
    }

    async fn call(&self, method: &'static str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let endpoint = Arc::clone(&self.endpoint);
        debug!("LEDGER | -> {} (id={})", method, id);
        run_blocking("ledger-rpc", move || endpoint.call(id, method, params))
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?
    }

    /// The account incidents are submitted from.
    pub fn sender(&self) -> Address {
        self.signer.address()
    }

    async fn quantity(&self, method: &'static str, params: Value, what: &'static str) -> Result<u64, LedgerError> {
        let result = self.call(method, params).await?;
        result
            .as_str()
            .and_then(parse_quantity)
            .ok_or(LedgerError::BadResponse(what))
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        if let Some(id) = self.chain_id.get() {
            return Ok(id);
        }
        let id = self
            .quantity("eth_chainId", json!([]), "chain id is not a quantity")
            .await?;
        debug!("LEDGER | chain id {}", id);
        self.chain_id.set(Some(id));
        Ok(id)
    }

    /// Price, size and sign the incident transaction.  Returns the raw
    /// transaction as `0x` hex.
    async fn sign_locally(&self, wallet: &Wallet, record: &IncidentRecord, nonce: u64) -> Result<String, LedgerError> {
        let chain_id = self.chain_id().await?;
        let gas_price = self
            .quantity("eth_gasPrice", json!([]), "gas price is not a quantity")
            .await?;
        let gas_limit = match self.gas_limit {
            Some(gas) => gas,
            None => {
                let call = transaction_object(&wallet.address(), &self.contract, record, nonce, None);
                self.quantity("eth_estimateGas", json!([call]), "gas estimate is not a quantity")
                    .await?
            }
        };
        let tx = incident_transaction(&self.contract, record, nonce, u128::from(gas_price), gas_limit, chain_id);
        let raw = wallet.sign(&tx)?;
        Ok(format!("0x{}", hex::encode(raw)))
    }
}

impl LedgerPort for JsonRpcLedger {
    async fn sequence_number(&self, address: &Address) -> Result<u64, LedgerError> {
        let result = self
            .call("eth_getTransactionCount", json!([address.to_string(), "pending"]))
            .await?;
        result
            .as_str()
            .and_then(parse_quantity)
            .ok_or(LedgerError::BadResponse("nonce is not a quantity"))
    }

    async fn submit_incident(&self, record: &IncidentRecord, nonce: u64) -> Result<TxHash, LedgerError> {
        let result = match &self.signer {
            Signer::Local(wallet) => {
                let raw = self.sign_locally(wallet, record, nonce).await?;
                self.call("eth_sendRawTransaction", json!([raw])).await?
            }
            Signer::Node(sender) => {
                let tx = transaction_object(sender, &self.contract, record, nonce, self.gas_limit);
                self.call("eth_sendTransaction", json!([tx])).await?
            }
        };
        result
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or(LedgerError::BadResponse("tx hash is not 32 bytes of hex"))
    }

    async fn wait_for_confirmation(&self, tx: &TxHash) -> Result<Receipt, LedgerError> {
        let deadline = Instant::now() + self.confirm_timeout;
        loop {
            let result = self
                .call("eth_getTransactionReceipt", json!([tx.as_str()]))
                .await?;
            if let Some(receipt) = parse_receipt(tx, &result)? {
                return Ok(receipt);
            }
            if Instant::now() >= deadline {
                warn!("LEDGER | no receipt for {} after {:?}", tx, self.confirm_timeout);
                return Err(LedgerError::ConfirmationTimeout(tx.clone()));
            }
            async_io_mini::Timer::after(self.poll).await;
        }
    }
}

// ── Wire helpers ──────────────────────────────────────────────

/// The `mintIncidentReport` call as an unsigned legacy transaction.
fn incident_transaction(
    contract: &Address,
    record: &IncidentRecord,
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    chain_id: u64,
) -> LegacyTx {
    LegacyTx {
        nonce,
        gas_price,
        gas_limit,
        to: *contract,
        value: 0,
        data: abi::encode_mint_incident(record),
        chain_id,
    }
}

/// Build the `eth_sendTransaction` / `eth_estimateGas` parameter object.
fn transaction_object(
    from: &Address,
    to: &Address,
    record: &IncidentRecord,
    nonce: u64,
    gas_limit: Option<u64>,
) -> Value {
    let mut tx = json!({
        "from": from.to_string(),
        "to": to.to_string(),
        "data": abi::mint_incident_calldata(record),
        "nonce": to_quantity(nonce),
    });
    if let (Some(gas), Some(obj)) = (gas_limit, tx.as_object_mut()) {
        obj.insert("gas".into(), Value::String(to_quantity(gas)));
    }
    tx
}

/// Split a JSON-RPC response into its `result` or its `error`.
fn parse_rpc_response(mut body: Value) -> Result<Value, LedgerError> {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        return Err(LedgerError::Rpc {
            code: err.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_owned(),
        });
    }
    body.get_mut("result")
        .map(Value::take)
        .ok_or(LedgerError::BadResponse("missing result"))
}

/// Interpret an `eth_getTransactionReceipt` result.  `Ok(None)` while the
/// transaction is still pending.
fn parse_receipt(tx: &TxHash, result: &Value) -> Result<Option<Receipt>, LedgerError> {
    if result.is_null() {
        return Ok(None);
    }
    match result.get("status").and_then(Value::as_str) {
        Some("0x1") => {}
        Some("0x0") => return Err(LedgerError::Reverted(tx.clone())),
        _ => return Err(LedgerError::BadResponse("receipt status missing")),
    }
    let block_number = result
        .get("blockNumber")
        .and_then(Value::as_str)
        .and_then(parse_quantity)
        .ok_or(LedgerError::BadResponse("receipt block number missing"))?;
    Ok(Some(Receipt {
        tx: tx.clone(),
        block_number,
    }))
}
