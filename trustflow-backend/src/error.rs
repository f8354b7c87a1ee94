//! Error types for the intent pipeline and the ledger collaborator.

use ethers::types::U256;

/// Failure reported by the ledger collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    /// The node reports the transaction would revert.
    #[error("transaction would revert: {0}")]
    Reverted(String),
    /// Transport or JSON-RPC level failure.
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("failed to sign transaction: {0}")]
    Signing(String),
    #[error("failed to broadcast transaction: {0}")]
    Broadcast(String),
}

/// Errors produced while parsing, simulating, executing or recording an intent.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    #[error("no actions found in intent")]
    NoActionsFound,

    #[error("unknown action type: {0}")]
    UnsupportedAction(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("simulation failed: {0}")]
    SimulationFailed(#[source] LedgerError),

    /// All amounts are wei, rendered as exact decimal integers.
    #[error(
        "insufficient funds: have {balance} wei, want {required} wei (gas cost: {fee_cost}, value: {value})"
    )]
    InsufficientFunds {
        balance: U256,
        required: U256,
        fee_cost: U256,
        value: U256,
    },

    #[error("execution failed: {0}")]
    ExecutionFailed(#[source] LedgerError),

    #[error("execution cancelled")]
    Cancelled,

    #[error("intent {0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A store write that would break record invariants
    #[error("storage integrity error: {0}")]
    Integrity(String),
}

impl IntentError {
    /// True when the caller sent something unusable, as opposed to a server-side fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IntentError::InvalidIntent(_)
                | IntentError::NoActionsFound
                | IntentError::UnsupportedAction(_)
                | IntentError::InvalidParameter(_)
        )
    }
}
