//! Database methods for the intents and intent_steps tables

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{ErrorCode, OptionalExtension, ToSql};

use crate::db::{Database, IntentStore};
use crate::error::IntentError;
use crate::models::{IntentRecord, IntentState, IntentStatus, IntentStepRecord};

impl ToSql for IntentStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for IntentStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        IntentStatus::from_str(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown status '{}'", s).into()))
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn map_step_row(row: &rusqlite::Row) -> rusqlite::Result<IntentStepRecord> {
    Ok(IntentStepRecord {
        intent_id: row.get(0)?,
        step_index: row.get(1)?,
        action: row.get(2)?,
        status: row.get(3)?,
        tx_hash: row.get(4)?,
        error_msg: row.get(5)?,
    })
}

impl IntentStore for Database {
    fn save_intent(&self, record: &IntentRecord) -> Result<(), IntentError> {
        log::debug!("[db] Saving intent {}", record.id);
        let conn = self.conn();
        conn.execute(
            "INSERT INTO intents (id, status, created_at, message, raw_intent) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                record.id,
                record.status,
                record.created_at,
                record.message,
                record.raw_intent
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                IntentError::InvalidIntent(format!("intent {} already exists", record.id))
            } else {
                IntentError::Storage(e)
            }
        })?;
        Ok(())
    }

    fn update_intent_status(
        &self,
        id: &str,
        status: IntentStatus,
        message: &str,
    ) -> Result<bool, IntentError> {
        log::debug!("[db] Updating intent {} -> {}", id, status);
        if !status.is_terminal() {
            return Err(IntentError::Integrity(format!(
                "intent {} cannot move back to {}",
                id, status
            )));
        }
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE intents SET status = ?1, message = ?2 WHERE id = ?3 AND status = 'pending'",
            rusqlite::params![status, message, id],
        )?;
        Ok(rows > 0)
    }

    fn save_step(&self, intent_id: &str, step_index: usize, action: &str) -> Result<(), IntentError> {
        log::debug!("[db] Saving step {} of intent {} ({})", step_index, intent_id, action);
        let conn = self.conn();

        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM intent_steps WHERE intent_id = ?1",
            [intent_id],
            |row| row.get(0),
        )?;
        if existing != step_index as i64 {
            return Err(IntentError::Integrity(format!(
                "step {} of intent {} out of order ({} steps recorded)",
                step_index, intent_id, existing
            )));
        }

        conn.execute(
            "INSERT INTO intent_steps (intent_id, step_index, action, status) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![intent_id, step_index as i64, action, IntentStatus::Pending],
        )?;
        Ok(())
    }

    fn update_step_status(
        &self,
        intent_id: &str,
        step_index: usize,
        status: IntentStatus,
        tx_hash: Option<&str>,
        error_msg: Option<&str>,
    ) -> Result<bool, IntentError> {
        log::debug!(
            "[db] Updating step {} of intent {} -> {} (tx_hash={:?})",
            step_index, intent_id, status, tx_hash
        );
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE intent_steps SET status = ?1, tx_hash = ?2, error_msg = ?3
             WHERE intent_id = ?4 AND step_index = ?5 AND status = 'pending'",
            rusqlite::params![status, tx_hash, error_msg, intent_id, step_index as i64],
        )?;
        Ok(rows > 0)
    }

    fn get_intent(&self, id: &str) -> Result<Option<IntentState>, IntentError> {
        let conn = self.conn();

        let record = conn
            .query_row(
                "SELECT id, status, created_at, message, raw_intent FROM intents WHERE id = ?1",
                [id],
                |row| {
                    Ok(IntentRecord {
                        id: row.get(0)?,
                        status: row.get(1)?,
                        created_at: row.get(2)?,
                        message: row.get(3)?,
                        raw_intent: row.get(4)?,
                    })
                },
            )
            .optional()?;

        let Some(record) = record else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT intent_id, step_index, action, status, tx_hash, error_msg
             FROM intent_steps WHERE intent_id = ?1 ORDER BY step_index ASC",
        )?;
        let steps = stmt
            .query_map([id], map_step_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(IntentState { record, steps }))
    }

    fn get_recent_intents(&self, limit: usize) -> Result<Vec<IntentState>, IntentError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, status, created_at, message FROM intents
             ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;
        let intents = stmt
            .query_map([limit as i64], |row| {
                Ok(IntentState {
                    record: IntentRecord {
                        id: row.get(0)?,
                        status: row.get(1)?,
                        created_at: row.get(2)?,
                        message: row.get(3)?,
                        raw_intent: None,
                    },
                    steps: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(intents)
    }
}
