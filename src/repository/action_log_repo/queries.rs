use super::core::ActionLogRepository;
use super::TIMESTAMP_FORMAT;
use crate::domain::action_log::{ActionType, LogEntry, LogFilter};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT seq, log_id, timestamp, action_type, user_id,
           item_id, container_id, details
    FROM action_log
"#;

impl ActionLogRepository {
    // ==========================================
    // Queries
    // ==========================================

    pub fn find_by_id(&self, log_id: &str) -> RepositoryResult<Option<LogEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE log_id = ?1", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![log_id], |row| self.map_row(row)) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Entries matching every set criterion, in append order.
    /// Date bounds are inclusive.
    pub fn query(&self, filter: &LogFilter) -> RepositoryResult<Vec<LogEntry>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(start) = filter.start_date {
            clauses.push("timestamp >= ?");
            args.push(start.format(TIMESTAMP_FORMAT).to_string());
        }
        if let Some(end) = filter.end_date {
            clauses.push("timestamp <= ?");
            args.push(end.format(TIMESTAMP_FORMAT).to_string());
        }
        if let Some(item_id) = &filter.item_id {
            clauses.push("item_id = ?");
            args.push(item_id.clone());
        }
        if let Some(user_id) = &filter.user_id {
            clauses.push("user_id = ?");
            args.push(user_id.clone());
        }
        if let Some(action_type) = filter.action_type {
            clauses.push("action_type = ?");
            args.push(action_type.as_str().to_string());
        }

        let mut sql = SELECT_COLUMNS.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY seq ASC");

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(args.iter()), |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(entries)
    }

    /// Most recent entries, newest first.
    pub fn list_recent(&self, limit: u32) -> RepositoryResult<Vec<LogEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY seq DESC LIMIT ?1", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![limit], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM action_log", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_by_action_type(&self, action_type: ActionType) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM action_log WHERE action_type = ?1",
            params![action_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // Helpers
    // ==========================================

    fn map_row(&self, row: &Row) -> SqliteResult<LogEntry> {
        let seq: i64 = row.get(0)?;
        let log_id: String = row.get(1)?;
        let timestamp_str: String = row.get(2)?;
        let action_type_str: String = row.get(3)?;
        let user_id: String = row.get(4)?;
        let item_id: Option<String> = row.get(5)?;
        let container_id: Option<String> = row.get(6)?;
        let details_str: String = row.get(7)?;

        let timestamp = NaiveDateTime::parse_from_str(&timestamp_str, "%Y-%m-%d %H:%M:%S%.f")
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
            })?;

        let action_type = action_type_str.parse::<ActionType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?;

        let details = serde_json::from_str(&details_str).unwrap_or(serde_json::Value::Null);

        Ok(LogEntry {
            log_id,
            seq,
            timestamp,
            action_type,
            user_id,
            item_id,
            container_id,
            details,
        })
    }
}
