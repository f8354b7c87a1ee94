//! Intent orchestration
//!
//! Drives one intent through its steps: every step is recorded `pending`,
//! parsed, dry-run against the ledger, broadcast, then recorded with its
//! outcome. The first failing step halts the workflow and the intent ends
//! `failed`; otherwise it ends `success`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ethers::types::U256;
use tokio_util::sync::CancellationToken;

use super::executor::Executor;
use super::parser::ActionRegistry;
use super::simulator::Simulator;
use crate::db::IntentStore;
use crate::error::IntentError;
use crate::ledger::Ledger;
use crate::models::{
    Intent, IntentRecord, IntentResponse, IntentState, IntentStatus, IntentStep,
    SimulationResponse,
};

/// How the step loop ended
#[derive(Debug)]
pub enum WorkflowOutcome {
    Completed {
        tx_hashes: Vec<String>,
    },
    Halted {
        step_index: usize,
        /// Hashes of the steps that succeeded before the halt
        tx_hashes: Vec<String>,
        cause: IntentError,
    },
}

pub struct Orchestrator {
    store: Arc<dyn IntentStore>,
    registry: Arc<ActionRegistry>,
    simulator: Simulator,
    executor: Executor,
    settlement_delay: Duration,
}

impl Orchestrator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn IntentStore>,
        registry: Arc<ActionRegistry>,
        settlement_delay: Duration,
    ) -> Self {
        Self {
            simulator: Simulator::new(ledger.clone()),
            executor: Executor::new(ledger),
            store,
            registry,
            settlement_delay,
        }
    }

    /// Run an intent to a terminal state.
    ///
    /// Step failures produce an `Ok` response with status `failed`. `Err` is
    /// reserved for intents that cannot be accepted or recorded.
    pub async fn process_intent(
        &self,
        mut intent: Intent,
        cancel: &CancellationToken,
    ) -> Result<IntentResponse, IntentError> {
        if intent.id.trim().is_empty() {
            intent.id = uuid::Uuid::new_v4().to_string();
        }
        if intent.created_at <= 0 {
            intent.created_at = chrono::Utc::now().timestamp();
        }

        let steps = intent.normalized_steps();
        if steps.is_empty() {
            return Err(IntentError::NoActionsFound);
        }

        let raw_intent = serde_json::to_string(&intent)
            .map_err(|e| IntentError::InvalidIntent(format!("unserializable intent: {}", e)))?;
        self.store.save_intent(&IntentRecord {
            id: intent.id.clone(),
            status: IntentStatus::Pending,
            created_at: intent.created_at,
            message: String::new(),
            raw_intent: Some(raw_intent),
        })?;

        log::info!(
            "[orchestrator] Processing intent {} ({} step(s))",
            intent.id,
            steps.len()
        );

        let outcome = self.run_steps(&intent.id, &steps, cancel).await?;
        Ok(self.finish(&intent.id, steps.len(), outcome))
    }

    /// Like [`process_intent`](Self::process_intent), cancelled once `timeout` elapses
    pub async fn process_intent_with_timeout(
        &self,
        intent: Intent,
        timeout: Duration,
    ) -> Result<IntentResponse, IntentError> {
        let cancel = CancellationToken::new();
        let timer = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                cancel.cancel();
            })
        };

        let result = self.process_intent(intent, &cancel).await;
        timer.abort();
        result
    }

    pub fn get_intent_status(&self, id: &str) -> Result<Option<IntentState>, IntentError> {
        self.store.get_intent(id)
    }

    pub fn list_intents(&self, limit: usize) -> Result<Vec<IntentState>, IntentError> {
        self.store.get_recent_intents(limit)
    }

    /// Dry-run the first step of `intent` without persisting or broadcasting anything
    pub async fn dry_run_intent(&self, intent: &Intent) -> SimulationResponse {
        let Some(step) = intent.normalized_steps().into_iter().next() else {
            return SimulationResponse::invalid(IntentError::NoActionsFound.to_string());
        };

        let candidate = match self.registry.parse(&step.action, &step.params) {
            Ok(candidate) => candidate,
            Err(e) => return SimulationResponse::invalid(format!("parsing failed: {}", e)),
        };

        let cost = match self.simulator.dry_run(&candidate).await {
            Ok(cost) => cost,
            Err(e) => return SimulationResponse::invalid(e.to_string()),
        };
        if cost.gas_limit > U256::from(u64::MAX) {
            return SimulationResponse::invalid(format!(
                "gas estimate {} out of range",
                cost.gas_limit
            ));
        }

        SimulationResponse {
            valid: true,
            gas_limit: Some(cost.gas_limit.as_u64()),
            gas_price: Some(cost.gas_price.to_string()),
            total_cost: Some(cost.fee_cost.to_string()),
            message: Some("simulation successful".to_string()),
            error: None,
        }
    }

    async fn run_steps(
        &self,
        intent_id: &str,
        steps: &[IntentStep],
        cancel: &CancellationToken,
    ) -> Result<WorkflowOutcome, IntentError> {
        let mut tx_hashes: Vec<String> = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let settled = index == 0 || self.wait_settlement(cancel).await;

            if let Err(e) = self.store.save_step(intent_id, index, &step.action) {
                log::error!(
                    "[orchestrator] Failed to record step {} of intent {}: {}",
                    index, intent_id, e
                );
                // Earlier steps are already on the ledger; report them as a halt
                if index > 0 {
                    return Ok(WorkflowOutcome::Halted {
                        step_index: index,
                        tx_hashes,
                        cause: e,
                    });
                }
                let message = halt_message(index, &e);
                if let Err(update_err) =
                    self.store
                        .update_intent_status(intent_id, IntentStatus::Failed, &message)
                {
                    log::error!(
                        "[orchestrator] Failed to mark intent {} failed: {}",
                        intent_id, update_err
                    );
                }
                return Err(e);
            }

            let result = if settled {
                self.run_step(step, cancel).await
            } else {
                Err(IntentError::Cancelled)
            };

            match result {
                Ok(tx_hash) => {
                    log::info!(
                        "[orchestrator] Intent {} step {} succeeded: {}",
                        intent_id, index, tx_hash
                    );
                    self.record_step(intent_id, index, IntentStatus::Success, Some(&tx_hash), None);
                    tx_hashes.push(tx_hash);
                }
                Err(cause) => {
                    log::warn!(
                        "[orchestrator] Intent {} halted at step {}: {}",
                        intent_id, index, cause
                    );
                    let error_msg = cause.to_string();
                    self.record_step(intent_id, index, IntentStatus::Failed, None, Some(&error_msg));
                    return Ok(WorkflowOutcome::Halted {
                        step_index: index,
                        tx_hashes,
                        cause,
                    });
                }
            }
        }

        Ok(WorkflowOutcome::Completed { tx_hashes })
    }

    async fn run_step(
        &self,
        step: &IntentStep,
        cancel: &CancellationToken,
    ) -> Result<String, IntentError> {
        let candidate = self.registry.parse(&step.action, &step.params)?;
        let cost = cancellable(cancel, self.simulator.dry_run(&candidate)).await?;
        cancellable(cancel, self.executor.execute(&candidate, cost.gas_limit)).await
    }

    /// Sleep the settlement delay. Returns false if cancelled first.
    async fn wait_settlement(&self, cancel: &CancellationToken) -> bool {
        if self.settlement_delay.is_zero() {
            return !cancel.is_cancelled();
        }
        log::debug!(
            "[orchestrator] Waiting {:?} for settlement",
            self.settlement_delay
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.settlement_delay) => true,
        }
    }

    fn record_step(
        &self,
        intent_id: &str,
        index: usize,
        status: IntentStatus,
        tx_hash: Option<&str>,
        error_msg: Option<&str>,
    ) {
        match self
            .store
            .update_step_status(intent_id, index, status, tx_hash, error_msg)
        {
            Ok(true) => {}
            Ok(false) => log::warn!(
                "[orchestrator] Step {} of intent {} was not pending",
                index, intent_id
            ),
            Err(e) => log::error!(
                "[orchestrator] Failed to record step {} of intent {} as {}: {}",
                index, intent_id, status, e
            ),
        }
    }

    fn finish(&self, intent_id: &str, step_count: usize, outcome: WorkflowOutcome) -> IntentResponse {
        let (status, message, tx_hashes, failed_step_index, error) = match outcome {
            WorkflowOutcome::Completed { tx_hashes } => (
                IntentStatus::Success,
                format!("Successfully executed {} steps", step_count),
                tx_hashes,
                None,
                None,
            ),
            WorkflowOutcome::Halted {
                step_index,
                tx_hashes,
                cause,
            } => (
                IntentStatus::Failed,
                halt_message(step_index, &cause),
                tx_hashes,
                Some(step_index),
                Some(cause.to_string()),
            ),
        };

        match self.store.update_intent_status(intent_id, status, &message) {
            Ok(true) => {}
            Ok(false) => log::warn!("[orchestrator] Intent {} was already terminal", intent_id),
            Err(e) => log::error!(
                "[orchestrator] Failed to record intent {} as {}: {}",
                intent_id, status, e
            ),
        }

        log::info!("[orchestrator] Intent {} finished: {}", intent_id, message);

        IntentResponse {
            status,
            intent_id: intent_id.to_string(),
            message,
            tx_hash: tx_hashes.last().cloned(),
            tx_hashes,
            failed_step_index,
            error,
        }
    }
}

fn halt_message(step_index: usize, cause: &IntentError) -> String {
    format!("Execution halted at step {}: {}", step_index + 1, cause)
}

async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, IntentError>
where
    F: Future<Output = Result<T, IntentError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(IntentError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod orchestrator_tests;
