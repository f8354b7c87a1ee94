//! Dry-run simulation and solvency check. Read-only against the ledger.

use ethers::types::U256;
use std::sync::Arc;

use super::parser::TransferCandidate;
use crate::error::{IntentError, LedgerError};
use crate::ledger::Ledger;

/// Everything the solvency check looked at, all in wei
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostBreakdown {
    pub gas_limit: U256,
    pub gas_price: U256,
    pub fee_cost: U256,
    pub value: U256,
    pub total_required: U256,
    pub balance: U256,
}

pub struct Simulator {
    ledger: Arc<dyn Ledger>,
}

impl Simulator {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Estimate the gas limit for `candidate`. A revert or estimation error
    /// fails the simulation.
    pub async fn simulate(&self, candidate: &TransferCandidate) -> Result<U256, IntentError> {
        let gas_limit = self
            .ledger
            .estimate_cost(candidate.to, candidate.value, candidate.data.as_ref())
            .await
            .map_err(IntentError::SimulationFailed)?;

        log::debug!(
            "[simulator] to={:?} value={} gas_limit={}",
            candidate.to, candidate.value, gas_limit
        );
        Ok(gas_limit)
    }

    /// Verify the system account can pay `value` plus `gas_limit` at the
    /// current fee rate.
    pub async fn check_solvency(
        &self,
        gas_limit: U256,
        value: U256,
    ) -> Result<CostBreakdown, IntentError> {
        let gas_price = self
            .ledger
            .suggested_fee_rate()
            .await
            .map_err(IntentError::SimulationFailed)?;
        let balance = self
            .ledger
            .balance()
            .await
            .map_err(IntentError::SimulationFailed)?;

        let fee_cost = gas_limit
            .checked_mul(gas_price)
            .ok_or_else(|| overflow("gas cost"))?;
        let total_required = value
            .checked_add(fee_cost)
            .ok_or_else(|| overflow("total cost"))?;

        if balance < total_required {
            log::warn!(
                "[simulator] Insufficient funds: balance={} required={}",
                balance, total_required
            );
            return Err(IntentError::InsufficientFunds {
                balance,
                required: total_required,
                fee_cost,
                value,
            });
        }

        Ok(CostBreakdown {
            gas_limit,
            gas_price,
            fee_cost,
            value,
            total_required,
            balance,
        })
    }

    /// Simulate then check solvency
    pub async fn dry_run(&self, candidate: &TransferCandidate) -> Result<CostBreakdown, IntentError> {
        let gas_limit = self.simulate(candidate).await?;
        self.check_solvency(gas_limit, candidate.value).await
    }
}

fn overflow(what: &str) -> IntentError {
    IntentError::SimulationFailed(LedgerError::Rpc(format!("{} overflows 256 bits", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mock::MockLedger;
    use ethers::types::Address;

    fn candidate(value: U256) -> TransferCandidate {
        TransferCandidate {
            to: Address::from_low_u64_be(0xbeef),
            value,
            data: None,
        }
    }

    #[tokio::test]
    async fn test_dry_run_breakdown() {
        let ledger = Arc::new(MockLedger::funded());
        let simulator = Simulator::new(ledger);

        let cost = simulator.dry_run(&candidate(U256::exp10(17))).await.unwrap();
        assert_eq!(cost.gas_limit, U256::from(21_000u64));
        assert_eq!(cost.gas_price, U256::from(1_000_000_000u64));
        assert_eq!(cost.fee_cost, U256::from(21_000_000_000_000u64));
        assert_eq!(cost.total_required, U256::exp10(17) + cost.fee_cost);
        assert_eq!(cost.balance, U256::exp10(19));
    }

    #[tokio::test]
    async fn test_revert_fails_simulation() {
        let to = Address::from_low_u64_be(0xbeef);
        let simulator = Simulator::new(Arc::new(MockLedger::funded().reverting_for(to)));

        let err = simulator.simulate(&candidate(U256::one())).await.unwrap_err();
        assert!(matches!(err, IntentError::SimulationFailed(LedgerError::Reverted(_))));
    }

    #[tokio::test]
    async fn test_exactly_enough_is_solvent() {
        // 1 ETH value + 21000 gas at 1 gwei
        let balance = U256::exp10(18) + U256::from(21_000_000_000_000u64);
        let simulator = Simulator::new(Arc::new(MockLedger::new(balance)));

        let cost = simulator.dry_run(&candidate(U256::exp10(18))).await.unwrap();
        assert_eq!(cost.total_required, balance);
    }

    #[tokio::test]
    async fn test_one_wei_short_is_insolvent() {
        let balance = U256::exp10(18) + U256::from(21_000_000_000_000u64) - U256::one();
        let simulator = Simulator::new(Arc::new(MockLedger::new(balance)));

        let err = simulator.dry_run(&candidate(U256::exp10(18))).await.unwrap_err();
        match err {
            IntentError::InsufficientFunds {
                balance: have,
                required,
                fee_cost,
                value,
            } => {
                assert_eq!(have, balance);
                assert_eq!(required, balance + U256::one());
                assert_eq!(fee_cost, U256::from(21_000_000_000_000u64));
                assert_eq!(value, U256::exp10(18));
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fee_overflow_is_simulation_failure() {
        let ledger = MockLedger::funded()
            .with_fee_rate(U256::MAX)
            .with_gas_estimate(U256::from(2u64));
        let simulator = Simulator::new(Arc::new(ledger));

        let err = simulator.dry_run(&candidate(U256::one())).await.unwrap_err();
        assert!(matches!(err, IntentError::SimulationFailed(_)));
        assert!(err.to_string().contains("overflows"));
    }
}
