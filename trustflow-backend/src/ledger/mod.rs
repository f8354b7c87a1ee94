//! Ledger collaborator
//!
//! The intent pipeline only talks to the ledger through the [`Ledger`] trait:
//! balance and fee-rate reads, a dry-run cost estimate, and sign-and-broadcast.
//! [`EvmLedger`] is the production implementation over JSON-RPC.

mod evm;
#[cfg(test)]
pub mod mock;
mod rpc;

pub use evm::EvmLedger;
use rpc::EvmRpc;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};

use crate::error::LedgerError;

/// Operations the pipeline needs from the ledger. Shared across all intents.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// The system account that pays for and signs every transaction
    fn account_address(&self) -> Address;

    /// Current balance of the system account, in wei
    async fn balance(&self) -> Result<U256, LedgerError>;

    /// Suggested price per unit of gas, in wei
    async fn suggested_fee_rate(&self) -> Result<U256, LedgerError>;

    /// Dry-run gas estimate for a transaction from the system account
    async fn estimate_cost(
        &self,
        to: Address,
        value: U256,
        data: Option<&Bytes>,
    ) -> Result<U256, LedgerError>;

    /// Sign and broadcast a transaction; `gas_limit` caps what it may spend.
    /// Returns the transaction hash.
    async fn sign_and_broadcast(
        &self,
        to: Address,
        value: U256,
        data: Option<&Bytes>,
        gas_limit: U256,
    ) -> Result<String, LedgerError>;
}
