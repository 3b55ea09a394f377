//! Storage seams.
//!
//! Handlers and services talk to [`LogStore`] and [`IdentityStore`]; the
//! production implementation is [`mysql::MySqlStore`].

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

#[cfg(test)]
use mockall::automock;

use crate::error::{AppResult, IdentityField};
use crate::model::daily_log::{DailyLog, LogFilter, LogRecord, LogStatus, LogUpsert};
use crate::model::employee_profile::EmployeeProfile;
use crate::model::user::{NewUser, User};

#[cfg(test)]
pub mod memory;
pub mod mysql;

/// A log row carried over from the legacy store, inserted only if its slot is free.
#[derive(Debug, Clone)]
pub struct ImportedLog {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub time_interval: String,
    pub description: String,
    pub status: LogStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Create or overwrite the single log for `(employee_id, date, time_interval)`.
    /// Must be atomic with respect to that triple.
    async fn upsert(&self, entry: &LogUpsert) -> AppResult<DailyLog>;

    /// Logs of one employee for one day, ordered by slot label.
    async fn logs_for_day(&self, employee_id: u64, date: NaiveDate) -> AppResult<Vec<DailyLog>>;

    /// Ordered by date descending, then slot label ascending.
    async fn search(&self, filter: &LogFilter) -> AppResult<Vec<LogRecord>>;

    /// Returns false when a log already occupies the slot.
    async fn import(&self, entry: &ImportedLog) -> AppResult<bool>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn user_by_id(&self, id: u64) -> AppResult<Option<User>>;

    async fn user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Reports which of `username` / `email` is already in use, username first.
    async fn identity_taken(&self, username: &str, email: &str)
    -> AppResult<Option<IdentityField>>;

    async fn profile_by_card(&self, id_card_number: &str) -> AppResult<Option<EmployeeProfile>>;

    async fn profile_for_user(&self, user_id: u64) -> AppResult<Option<EmployeeProfile>>;

    /// Writes the user and its profile in one transaction.
    async fn create_staff(
        &self,
        user: &NewUser,
        id_card_number: &str,
    ) -> AppResult<(User, EmployeeProfile)>;

    /// Returns the user named `user.username`, inserting it first if absent.
    async fn ensure_user(&self, user: &NewUser) -> AppResult<User>;

    /// Returns false when the card is already assigned.
    async fn attach_profile(&self, user_id: u64, id_card_number: &str) -> AppResult<bool>;

    async fn record_login(&self, user_id: u64, at: NaiveDateTime) -> AppResult<()>;

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<()>;

    /// Revokes a live refresh token and returns its owner; `None` if unknown or already revoked.
    async fn consume_refresh_token(&self, jti: &str) -> AppResult<Option<u64>>;

    async fn revoke_refresh_token(&self, jti: &str) -> AppResult<()>;
}
