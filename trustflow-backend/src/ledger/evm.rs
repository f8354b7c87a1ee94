//! Local-key EVM ledger.
//!
//! Signs legacy EIP-155 transactions with an ethers `LocalWallet` and ships
//! them through [`EvmRpc`].

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use tokio::sync::Mutex;

use super::{EvmRpc, Ledger};
use crate::error::LedgerError;

pub struct EvmLedger {
    rpc: EvmRpc,
    wallet: LocalWallet,
    chain_id: u64,
    /// Held from nonce lookup until broadcast so concurrent intents never share a nonce
    send_lock: Mutex<()>,
}

impl EvmLedger {
    /// Connect to the node and bind the signing key to its chain id
    pub async fn connect(rpc_url: &str, private_key: &str) -> Result<Self, String> {
        let rpc = EvmRpc::new(rpc_url)?;
        let chain_id = rpc
            .chain_id()
            .await
            .map_err(|e| format!("Failed to get chain ID: {}", e))?;

        let wallet = crate::config::wallet_from_private_key(private_key)?.with_chain_id(chain_id);

        log::info!(
            "[evm_ledger] Connected to chain {} as {:?}",
            chain_id,
            wallet.address()
        );

        Ok(Self {
            rpc,
            wallet,
            chain_id,
            send_lock: Mutex::new(()),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

#[async_trait]
impl Ledger for EvmLedger {
    fn account_address(&self) -> Address {
        self.wallet.address()
    }

    async fn balance(&self) -> Result<U256, LedgerError> {
        self.rpc.get_balance(self.wallet.address()).await
    }

    async fn suggested_fee_rate(&self) -> Result<U256, LedgerError> {
        self.rpc.gas_price().await
    }

    async fn estimate_cost(
        &self,
        to: Address,
        value: U256,
        data: Option<&Bytes>,
    ) -> Result<U256, LedgerError> {
        self.rpc.estimate_gas(self.wallet.address(), to, value, data).await
    }

    async fn sign_and_broadcast(
        &self,
        to: Address,
        value: U256,
        data: Option<&Bytes>,
        gas_limit: U256,
    ) -> Result<String, LedgerError> {
        let _guard = self.send_lock.lock().await;
        let from = self.wallet.address();

        let nonce = self.rpc.get_transaction_count(from).await?;
        let gas_price = self.rpc.gas_price().await?;

        let mut tx = TransactionRequest::new()
            .from(from)
            .to(to)
            .value(value)
            .nonce(nonce)
            .gas(gas_limit)
            .gas_price(gas_price)
            .chain_id(self.chain_id);
        if let Some(data) = data {
            tx = tx.data(data.clone());
        }

        log::info!(
            "[evm_ledger] Signing transfer: to={:?}, value={}, gas={}, gas_price={}, nonce={}",
            to, value, gas_limit, gas_price, nonce
        );

        let typed_tx: TypedTransaction = tx.into();
        let signature = self
            .wallet
            .sign_transaction(&typed_tx)
            .await
            .map_err(|e| LedgerError::Signing(e.to_string()))?;
        let signed_tx = typed_tx.rlp_signed(&signature);

        let tx_hash = self.rpc.send_raw_transaction(&signed_tx).await?;
        let tx_hash = format!("{:?}", tx_hash);

        log::info!("[evm_ledger] Broadcast accepted: {}", tx_hash);
        Ok(tx_hash)
    }
}
