mod sqlite;
pub mod tables;

pub use sqlite::Database;

use crate::error::IntentError;
use crate::models::{IntentRecord, IntentState, IntentStatus};

/// Persistence used by the orchestrator.
///
/// Implementations must be safe to share between concurrently running
/// intents; every call is a single atomic write or a consistent read.
/// Status updates only apply to rows that are still `pending`, so a terminal
/// state is never overwritten.
pub trait IntentStore: Send + Sync {
    /// Insert a new intent row (normally `pending`)
    fn save_intent(&self, record: &IntentRecord) -> Result<(), IntentError>;

    /// Move a pending intent to `status`. Returns false if it was not pending.
    fn update_intent_status(
        &self,
        id: &str,
        status: IntentStatus,
        message: &str,
    ) -> Result<bool, IntentError>;

    /// Insert step `step_index` as `pending`; indices must be contiguous from 0
    fn save_step(&self, intent_id: &str, step_index: usize, action: &str) -> Result<(), IntentError>;

    /// Move a pending step to `status`. Returns false if it was not pending.
    fn update_step_status(
        &self,
        intent_id: &str,
        step_index: usize,
        status: IntentStatus,
        tx_hash: Option<&str>,
        error_msg: Option<&str>,
    ) -> Result<bool, IntentError>;

    /// Intent with its ordered steps, `None` when unknown
    fn get_intent(&self, id: &str) -> Result<Option<IntentState>, IntentError>;

    /// Most recent intents first, without steps or raw payload
    fn get_recent_intents(&self, limit: usize) -> Result<Vec<IntentState>, IntentError>;
}
