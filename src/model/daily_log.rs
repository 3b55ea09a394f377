use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
    AsRefStr, ToSchema,
)]
pub enum LogStatus {
    #[default]
    Ongoing,
    Pending,
    Completed,
}

impl TryFrom<String> for LogStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
pub struct DailyLog {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "09:00 - 09:30")]
    pub time_interval: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: LogStatus,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: NaiveDateTime,
}

/// A log joined with the identity it belongs to, as shown on dashboards and exports.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct LogRecord {
    pub id: u64,
    pub employee_id: u64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub id_card_number: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub time_interval: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: LogStatus,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: NaiveDateTime,
}

impl LogRecord {
    pub fn staff_name(&self) -> String {
        super::user::display_name(&self.first_name, &self.last_name, &self.username)
    }
}

/// Write payload for the slot upsert. `at` stamps `updated_at`, and `created_at` on insert.
#[derive(Debug, Clone)]
pub struct LogUpsert {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub time_interval: String,
    pub description: String,
    pub status: LogStatus,
    pub at: NaiveDateTime,
}

/// Criteria shared by the admin dashboard and both export paths.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub employee_id: Option<u64>,
    pub staff_name: Option<String>,
    pub id_card: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
