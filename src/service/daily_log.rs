//! Slot log submission and the per-day sheet.

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use super::slots::{slot_on, time_slots};
use crate::error::{AppError, AppResult};
use crate::model::daily_log::{DailyLog, LogStatus, LogUpsert};
use crate::store::LogStore;

#[derive(Debug, Clone)]
pub struct LogSubmission {
    pub date: NaiveDate,
    pub time_interval: String,
    pub description: String,
    pub status: LogStatus,
}

/// Creates or overwrites the caller's log for one slot.
///
/// Past days are read-only; that check runs before anything touches storage.
/// `now` supplies both the local "today" for the guard and the write timestamp.
pub async fn submit(
    store: &dyn LogStore,
    employee_id: u64,
    submission: LogSubmission,
    now: DateTime<Local>,
) -> AppResult<DailyLog> {
    let today = now.date_naive();
    if submission.date < today {
        info!(employee_id, date = %submission.date, "Rejected write to past day");
        return Err(AppError::PastDateReadOnly);
    }

    let slot = slot_on(submission.date, &submission.time_interval).ok_or_else(|| {
        AppError::InvalidSlot {
            slot: submission.time_interval.clone(),
            date: submission.date,
        }
    })?;

    let description = submission.description.trim();
    if description.is_empty() {
        return Err(AppError::Validation("Description is required".to_string()));
    }

    let entry = LogUpsert {
        employee_id,
        date: submission.date,
        time_interval: slot.label(),
        description: description.to_string(),
        status: submission.status,
        at: now.naive_utc(),
    };
    debug!(employee_id, date = %entry.date, slot = %entry.time_interval, "Upserting log");

    store.upsert(&entry).await
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SlotEntry {
    #[schema(example = "09:00 - 09:30")]
    pub time_interval: String,
    pub log: Option<DailyLog>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DaySheet {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "01 January, 2026")]
    pub display_date: String,
    /// True for days before today; such days can be viewed but not edited
    pub read_only: bool,
    pub slots: Vec<SlotEntry>,
}

/// Every slot of `date` paired with the employee's log for it.
///
/// Logs stored under labels that are not slots of that day are kept at the end.
pub async fn day_sheet(
    store: &dyn LogStore,
    employee_id: u64,
    date: NaiveDate,
    today: NaiveDate,
) -> AppResult<DaySheet> {
    let mut logs = store.logs_for_day(employee_id, date).await?;

    let mut slots: Vec<SlotEntry> = time_slots(date)
        .map(|slot| {
            let label = slot.label();
            let log = logs
                .iter()
                .position(|l| l.time_interval == label)
                .map(|i| logs.swap_remove(i));
            SlotEntry { time_interval: label, log }
        })
        .collect();

    logs.sort_by(|a, b| a.time_interval.cmp(&b.time_interval));
    slots.extend(logs.into_iter().map(|log| SlotEntry {
        time_interval: log.time_interval.clone(),
        log: Some(log),
    }));

    Ok(DaySheet {
        date,
        display_date: date.format("%d %B, %Y").to_string(),
        read_only: date < today,
        slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockLogStore;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, s).single().unwrap()
    }

    fn saturday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn submission(slot: &str, description: &str, status: LogStatus) -> LogSubmission {
        LogSubmission {
            date: saturday(),
            time_interval: slot.to_string(),
            description: description.to_string(),
            status,
        }
    }

    #[actix_web::test]
    async fn resubmission_updates_the_same_record() {
        let store = MemoryStore::new();
        let first_at = at(2026, 10, 17, 9, 5, 0);

        let created = submit(
            &store,
            1,
            submission("09:00 - 09:30", "Standup", LogStatus::Ongoing),
            first_at,
        )
        .await
        .unwrap();

        let updated = submit(
            &store,
            1,
            submission("09:00 - 09:30", "Standup notes sent", LogStatus::Completed),
            first_at + Duration::minutes(20),
        )
        .await
        .unwrap();

        assert_eq!(store.log_count(), 1);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.description, "Standup notes sent");
        assert_eq!(updated.status, LogStatus::Completed);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > updated.created_at);
    }

    #[actix_web::test]
    async fn concurrent_submissions_share_one_record() {
        let store = MemoryStore::new();
        let start = at(2026, 10, 17, 9, 0, 0);
        let statuses = [LogStatus::Ongoing, LogStatus::Pending, LogStatus::Completed];

        let writes = (0..6).map(|i| {
            submit(
                &store,
                4,
                submission("11:00 - 11:30", &format!("draft {i}"), statuses[i % 3]),
                start + Duration::seconds(i as i64),
            )
        });
        let saved: Vec<DailyLog> = futures::future::join_all(writes)
            .await
            .into_iter()
            .collect::<AppResult<_>>()
            .unwrap();

        assert_eq!(store.log_count(), 1);
        assert!(saved.iter().all(|log| log.id == saved[0].id));

        let stored = store.logs_for_day(4, saturday()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].description, "draft 5");
        assert_eq!(stored[0].status, LogStatus::Completed);
    }

    #[actix_web::test]
    async fn past_days_are_read_only() {
        let store = MemoryStore::new();
        let sunday_morning = at(2026, 10, 18, 8, 0, 0);

        let err = submit(
            &store,
            1,
            submission("09:00 - 09:30", "Late entry", LogStatus::Pending),
            sunday_morning,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::PastDateReadOnly));
        assert_eq!(store.log_count(), 0);
    }

    #[actix_web::test]
    async fn past_day_guard_runs_before_storage() {
        // a mock with no expectations panics if touched
        let store = MockLogStore::new();
        let err = submit(
            &store,
            1,
            submission("09:00 - 09:30", "x", LogStatus::Ongoing),
            at(2026, 10, 20, 12, 0, 0),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::PastDateReadOnly));
    }

    #[actix_web::test]
    async fn past_day_leaves_existing_record_untouched() {
        let store = MemoryStore::new();
        let original = submit(
            &store,
            3,
            submission("10:00 - 10:30", "Review", LogStatus::Ongoing),
            at(2026, 10, 17, 10, 0, 0),
        )
        .await
        .unwrap();

        let result = submit(
            &store,
            3,
            submission("10:00 - 10:30", "Rewritten", LogStatus::Completed),
            at(2026, 10, 18, 9, 0, 0),
        )
        .await;
        assert!(matches!(result, Err(AppError::PastDateReadOnly)));

        let logs = store.logs_for_day(3, saturday()).await.unwrap();
        assert_eq!(logs, vec![original]);
    }

    #[actix_web::test]
    async fn rejects_slots_outside_the_day() {
        let store = MemoryStore::new();
        let err = submit(
            &store,
            1,
            submission("08:00 - 08:30", "Too early on Saturday", LogStatus::Ongoing),
            at(2026, 10, 17, 8, 0, 0),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidSlot { .. }));
        assert_eq!(store.log_count(), 0);
    }

    #[actix_web::test]
    async fn rejects_blank_descriptions() {
        let store = MemoryStore::new();
        let err = submit(
            &store,
            1,
            submission("09:00 - 09:30", "   ", LogStatus::Ongoing),
            at(2026, 10, 17, 9, 0, 0),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn future_days_accept_entries() {
        let store = MemoryStore::new();
        let log = submit(
            &store,
            1,
            submission("13:30 - 14:00", "Planned handover", LogStatus::Pending),
            at(2026, 10, 16, 17, 0, 0),
        )
        .await
        .unwrap();
        assert_eq!(log.date, saturday());
    }

    #[actix_web::test]
    async fn storage_failures_surface_as_their_own_kind() {
        let mut store = MockLogStore::new();
        store
            .expect_upsert()
            .returning(|_| Err(AppError::StorageUnavailable(sqlx::Error::PoolTimedOut)));

        let err = submit(
            &store,
            1,
            submission("09:00 - 09:30", "Standup", LogStatus::Ongoing),
            at(2026, 10, 17, 9, 0, 0),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::StorageUnavailable(_)));
    }

    #[actix_web::test]
    async fn day_sheet_matches_logs_to_slots() {
        let store = MemoryStore::new();
        let now = at(2026, 10, 17, 9, 0, 0);
        submit(&store, 1, submission("09:30 - 10:00", "Email", LogStatus::Completed), now)
            .await
            .unwrap();
        submit(&store, 2, submission("09:30 - 10:00", "Someone else", LogStatus::Ongoing), now)
            .await
            .unwrap();

        let sheet = day_sheet(&store, 1, saturday(), saturday()).await.unwrap();

        assert!(!sheet.read_only);
        assert_eq!(sheet.display_date, "17 October, 2026");
        assert_eq!(sheet.slots.len(), 10);
        let filled: Vec<&str> = sheet
            .slots
            .iter()
            .filter_map(|s| s.log.as_ref().map(|l| l.description.as_str()))
            .collect();
        assert_eq!(filled, vec!["Email"]);
        assert_eq!(sheet.slots[1].time_interval, "09:30 - 10:00");
        assert!(sheet.slots[1].log.is_some());
    }

    #[actix_web::test]
    async fn day_sheet_marks_past_days_read_only() {
        let store = MemoryStore::new();
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let sheet = day_sheet(&store, 1, saturday(), sunday).await.unwrap();
        assert!(sheet.read_only);
        assert!(sheet.slots.iter().all(|s| s.log.is_none()));
    }
}
