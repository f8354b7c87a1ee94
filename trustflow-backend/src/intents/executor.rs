use ethers::types::U256;
use std::sync::Arc;

use super::parser::TransferCandidate;
use crate::error::IntentError;
use crate::ledger::Ledger;

/// Commits a simulated transfer to the ledger. One attempt, no retry.
pub struct Executor {
    ledger: Arc<dyn Ledger>,
}

impl Executor {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Sign and broadcast `candidate` capped at `gas_limit`; returns the tx hash
    pub async fn execute(
        &self,
        candidate: &TransferCandidate,
        gas_limit: U256,
    ) -> Result<String, IntentError> {
        log::info!(
            "[executor] Broadcasting {} wei to {:?} (gas_limit={})",
            candidate.value, candidate.to, gas_limit
        );

        let tx_hash = self
            .ledger
            .sign_and_broadcast(candidate.to, candidate.value, candidate.data.as_ref(), gas_limit)
            .await
            .map_err(|e| {
                log::error!("[executor] Broadcast to {:?} failed: {}", candidate.to, e);
                IntentError::ExecutionFailed(e)
            })?;

        log::info!("[executor] Broadcast accepted: {}", tx_hash);
        Ok(tx_hash)
    }
}
