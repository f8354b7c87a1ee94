//! In-memory ledger for tests.
//!
//! Holds a balance that successful broadcasts debit (value + gas * fee rate),
//! and can be told to revert transfers to given recipients, reject
//! broadcasts, or stall broadcasts to exercise cancellation.

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;

use super::Ledger;
use crate::error::LedgerError;

/// A transaction the mock accepted
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub to: Address,
    pub value: U256,
    pub gas_limit: U256,
    pub tx_hash: String,
}

struct MockState {
    balance: U256,
    fee_rate: U256,
    gas_estimate: U256,
    reverting: HashSet<Address>,
    /// Reject broadcasts once this many have been accepted
    fail_broadcast: Option<(usize, String)>,
    broadcast_delay: Option<Duration>,
    calls: usize,
    broadcasts: Vec<Broadcast>,
}

pub struct MockLedger {
    address: Address,
    state: Mutex<MockState>,
}

impl MockLedger {
    /// 21000 gas at 1 gwei, funded with `balance` wei
    pub fn new(balance: U256) -> Self {
        Self {
            address: Address::from_low_u64_be(0xfeed),
            state: Mutex::new(MockState {
                balance,
                fee_rate: U256::from(1_000_000_000u64),
                gas_estimate: U256::from(21_000u64),
                reverting: HashSet::new(),
                fail_broadcast: None,
                broadcast_delay: None,
                calls: 0,
                broadcasts: Vec::new(),
            }),
        }
    }

    /// 10 ETH
    pub fn funded() -> Self {
        Self::new(U256::exp10(19))
    }

    pub fn with_fee_rate(self, fee_rate: U256) -> Self {
        self.state.lock().fee_rate = fee_rate;
        self
    }

    pub fn with_gas_estimate(self, gas: U256) -> Self {
        self.state.lock().gas_estimate = gas;
        self
    }

    /// Gas estimation for transfers to `to` reports a revert
    pub fn reverting_for(self, to: Address) -> Self {
        self.state.lock().reverting.insert(to);
        self
    }

    pub fn failing_broadcast(self, reason: &str) -> Self {
        self.failing_broadcast_after(0, reason)
    }

    /// Accept the first `accepted` broadcasts, reject every later one
    pub fn failing_broadcast_after(self, accepted: usize, reason: &str) -> Self {
        self.state.lock().fail_broadcast = Some((accepted, reason.to_string()));
        self
    }

    pub fn with_broadcast_delay(self, delay: Duration) -> Self {
        self.state.lock().broadcast_delay = Some(delay);
        self
    }

    /// Total number of ledger calls made so far
    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }

    pub fn broadcasts(&self) -> Vec<Broadcast> {
        self.state.lock().broadcasts.clone()
    }

    pub fn current_balance(&self) -> U256 {
        self.state.lock().balance
    }
}

#[async_trait]
impl Ledger for MockLedger {
    fn account_address(&self) -> Address {
        self.address
    }

    async fn balance(&self) -> Result<U256, LedgerError> {
        let mut state = self.state.lock();
        state.calls += 1;
        Ok(state.balance)
    }

    async fn suggested_fee_rate(&self) -> Result<U256, LedgerError> {
        let mut state = self.state.lock();
        state.calls += 1;
        Ok(state.fee_rate)
    }

    async fn estimate_cost(
        &self,
        to: Address,
        _value: U256,
        _data: Option<&Bytes>,
    ) -> Result<U256, LedgerError> {
        let mut state = self.state.lock();
        state.calls += 1;
        if state.reverting.contains(&to) {
            return Err(LedgerError::Reverted("execution reverted".to_string()));
        }
        Ok(state.gas_estimate)
    }

    async fn sign_and_broadcast(
        &self,
        to: Address,
        value: U256,
        _data: Option<&Bytes>,
        gas_limit: U256,
    ) -> Result<String, LedgerError> {
        let delay = {
            let mut state = self.state.lock();
            state.calls += 1;
            state.broadcast_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if let Some((accepted, reason)) = &state.fail_broadcast {
            if state.broadcasts.len() >= *accepted {
                return Err(LedgerError::Broadcast(reason.clone()));
            }
        }

        let spent = value + gas_limit * state.fee_rate;
        state.balance = state.balance.saturating_sub(spent);

        let tx_hash = format!("0x{:064x}", state.broadcasts.len() + 1);
        state.broadcasts.push(Broadcast {
            to,
            value,
            gas_limit,
            tx_hash: tx_hash.clone(),
        });
        Ok(tx_hash)
    }
}
