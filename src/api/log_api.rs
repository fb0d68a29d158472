// ==========================================
// Space Stowage - Audit log API
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{LogEntry, LogFilter};
use crate::repository::action_log_repo::ActionLogRepository;

/// Upper bound for `recent`.
pub const MAX_RECENT_LOGS: u32 = 1000;

pub struct LogApi {
    action_log_repo: Arc<ActionLogRepository>,
}

impl LogApi {
    pub fn new(action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self { action_log_repo }
    }

    /// Entries matching every given filter, in append order.
    /// Both ends of the date range are inclusive.
    pub fn query(&self, filter: LogFilter) -> ApiResult<Vec<LogEntry>> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(ApiError::InvalidRange(format!(
                    "startDate {} is after endDate {}",
                    start, end
                )));
            }
        }
        Ok(self.action_log_repo.query(&filter)?)
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: u32) -> ApiResult<Vec<LogEntry>> {
        if limit == 0 || limit > MAX_RECENT_LOGS {
            return Err(ApiError::ValidationError(format!(
                "limit must be within [1, {}], got {}",
                MAX_RECENT_LOGS, limit
            )));
        }
        Ok(self.action_log_repo.list_recent(limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action_log::ActionType;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn api() -> LogApi {
        let conn = crate::db::open_in_memory().unwrap();
        LogApi::new(Arc::new(ActionLogRepository::new(Arc::new(Mutex::new(conn)))))
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let err = api()
            .query(LogFilter {
                start_date: Some(day(5)),
                end_date: Some(day(1)),
                ..LogFilter::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_RANGE_ERROR");
    }

    #[test]
    fn test_query_filters_by_action_type() {
        let api = api();
        let mut entries = vec![
            LogEntry::new(ActionType::Placement, "crew").with_item("I1"),
            LogEntry::new(ActionType::Retrieval, "crew").with_item("I1"),
        ];
        api.action_log_repo.batch_insert(&mut entries).unwrap();

        let found = api
            .query(LogFilter {
                action_type: Some(ActionType::Retrieval),
                ..LogFilter::default()
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(api.recent(10).unwrap().len(), 2);
        assert!(api.recent(0).is_err());
    }
}
