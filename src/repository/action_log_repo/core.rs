use super::TIMESTAMP_FORMAT;
use crate::domain::action_log::LogEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ActionLogRepository
// ==========================================
// Data mapping only, no business rules.
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // Writes
    // ==========================================

    fn insert_in(tx: &Transaction<'_>, entry: &mut LogEntry) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO action_log (
                log_id, timestamp, action_type, user_id,
                item_id, container_id, details
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.log_id,
                entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                entry.action_type.as_str(),
                entry.user_id,
                entry.item_id,
                entry.container_id,
                entry.details.to_string(),
            ],
        )?;
        entry.seq = tx.last_insert_rowid();
        Ok(())
    }

    /// Append one entry; sets `entry.seq` and returns it.
    pub fn insert(&self, entry: &mut LogEntry) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        Self::insert_in(&tx, entry)?;
        tx.commit()?;
        Ok(entry.seq)
    }

    /// Append entries in one transaction: all or none.
    pub fn batch_insert(&self, entries: &mut [LogEntry]) -> RepositoryResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for entry in entries.iter_mut() {
            Self::insert_in(&tx, entry)?;
        }

        tx.commit()?;
        Ok(entries.len())
    }
}
