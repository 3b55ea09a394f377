use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;
use tracing::debug;

use super::{IdentityStore, ImportedLog, LogStore};
use crate::error::{AppError, AppResult, IdentityField};
use crate::model::daily_log::{DailyLog, LogFilter, LogRecord, LogUpsert};
use crate::model::employee_profile::EmployeeProfile;
use crate::model::user::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, password, first_name, last_name, \
                            is_active, is_staff, is_superuser, date_joined";

const LOG_COLUMNS: &str =
    "id, employee_id, date, time_interval, description, status, created_at, updated_at";

/// MySQL-backed implementation of both storage traits.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn is_duplicate_key(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000") => {
            Some(db_err.message().to_string())
        }
        _ => None,
    }
}

/// Maps a unique-index violation raised while provisioning to the identity kind it hit.
fn provisioning_error(e: sqlx::Error) -> AppError {
    match is_duplicate_key(&e) {
        Some(message) => duplicate_kind(&message),
        None => AppError::StorageUnavailable(e),
    }
}

// The message reads "Duplicate entry '<value>' for key '<table>.<constraint>'";
// only the key part is inspected since the value is user input.
fn duplicate_kind(message: &str) -> AppError {
    let key = message
        .rsplit_once(" for key ")
        .map_or("", |(_, key)| key)
        .trim_matches(|c| c == '\'' || c == '`');
    let constraint = key.rsplit('.').next().unwrap_or(key);

    match constraint {
        "uq_profiles_id_card" => AppError::DuplicateCardNumber,
        "uq_users_email" => AppError::DuplicateUsernameOrEmail(IdentityField::Email),
        _ => AppError::DuplicateUsernameOrEmail(IdentityField::Username),
    }
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
}

#[async_trait]
impl LogStore for MySqlStore {
    async fn upsert(&self, entry: &LogUpsert) -> AppResult<DailyLog> {
        sqlx::query(
            r#"
            INSERT INTO daily_logs
                (employee_id, date, time_interval, description, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?) AS new
            ON DUPLICATE KEY UPDATE
                description = new.description,
                status = new.status,
                updated_at = new.updated_at
            "#,
        )
        .bind(entry.employee_id)
        .bind(entry.date)
        .bind(&entry.time_interval)
        .bind(&entry.description)
        .bind(entry.status.as_ref())
        .bind(entry.at)
        .bind(entry.at)
        .execute(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM daily_logs \
             WHERE employee_id = ? AND date = ? AND time_interval = ?"
        );
        let log = sqlx::query_as::<_, DailyLog>(&sql)
            .bind(entry.employee_id)
            .bind(entry.date)
            .bind(&entry.time_interval)
            .fetch_one(&self.pool)
            .await?;

        Ok(log)
    }

    async fn logs_for_day(&self, employee_id: u64, date: NaiveDate) -> AppResult<Vec<DailyLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM daily_logs \
             WHERE employee_id = ? AND date = ? ORDER BY time_interval"
        );
        let logs = sqlx::query_as::<_, DailyLog>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        Ok(logs)
    }

    async fn search(&self, filter: &LogFilter) -> AppResult<Vec<LogRecord>> {
        // ---------- build WHERE clause dynamically ----------
        let mut conditions = Vec::new();
        let mut bindings = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            conditions.push("l.employee_id = ?");
            bindings.push(FilterValue::U64(employee_id));
        }

        if let Some(name) = filter.staff_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            conditions.push("(u.username LIKE ? OR u.first_name LIKE ? OR u.last_name LIKE ?)");
            let like = like_pattern(name);
            bindings.push(FilterValue::Str(like.clone()));
            bindings.push(FilterValue::Str(like.clone()));
            bindings.push(FilterValue::Str(like));
        }

        if let Some(card) = filter.id_card.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            conditions.push("p.id_card_number = ?");
            bindings.push(FilterValue::Str(card.to_string()));
        }

        if let Some(date) = filter.date {
            conditions.push("l.date = ?");
            bindings.push(FilterValue::Date(date));
        }

        if let Some(start) = filter.start_date {
            conditions.push("l.date >= ?");
            bindings.push(FilterValue::Date(start));
        }

        if let Some(end) = filter.end_date {
            conditions.push("l.date <= ?");
            bindings.push(FilterValue::Date(end));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            r#"
            SELECT l.id, l.employee_id, u.username, u.first_name, u.last_name,
                   p.id_card_number, l.date, l.time_interval, l.description, l.status,
                   l.created_at, l.updated_at
            FROM daily_logs l
            JOIN users u ON u.id = l.employee_id
            LEFT JOIN employee_profiles p ON p.user_id = u.id
            {where_clause}
            ORDER BY l.date DESC, l.time_interval ASC
            "#
        );
        debug!(sql = %sql, "Searching daily logs");

        let mut query = sqlx::query_as::<_, LogRecord>(&sql);
        for value in bindings {
            query = match value {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(v) => query.bind(v),
                FilterValue::Date(v) => query.bind(v),
            };
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn import(&self, entry: &ImportedLog) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT IGNORE INTO daily_logs
                (employee_id, date, time_interval, description, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.employee_id)
        .bind(entry.date)
        .bind(&entry.time_interval)
        .bind(&entry.description)
        .bind(entry.status.as_ref())
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl IdentityStore for MySqlStore {
    async fn user_by_id(&self, id: u64) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn identity_taken(
        &self,
        username: &str,
        email: &str,
    ) -> AppResult<Option<IdentityField>> {
        let (username_taken, email_taken) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                CAST(EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1) AS SIGNED),
                CAST(EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1) AS SIGNED)
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(if username_taken > 0 {
            Some(IdentityField::Username)
        } else if email_taken > 0 {
            Some(IdentityField::Email)
        } else {
            None
        })
    }

    async fn profile_by_card(&self, id_card_number: &str) -> AppResult<Option<EmployeeProfile>> {
        Ok(sqlx::query_as::<_, EmployeeProfile>(
            "SELECT id, user_id, id_card_number FROM employee_profiles WHERE id_card_number = ?",
        )
        .bind(id_card_number)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn profile_for_user(&self, user_id: u64) -> AppResult<Option<EmployeeProfile>> {
        Ok(sqlx::query_as::<_, EmployeeProfile>(
            "SELECT id, user_id, id_card_number FROM employee_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_staff(
        &self,
        user: &NewUser,
        id_card_number: &str,
    ) -> AppResult<(User, EmployeeProfile)> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query(
            r#"
            INSERT INTO users
                (username, email, password, first_name, last_name,
                 is_active, is_staff, is_superuser, date_joined)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.date_joined)
        .execute(&mut *tx)
        .await
        .map_err(provisioning_error)?
        .last_insert_id();

        let profile_id = sqlx::query(
            "INSERT INTO employee_profiles (user_id, id_card_number) VALUES (?, ?)",
        )
        .bind(user_id)
        .bind(id_card_number)
        .execute(&mut *tx)
        .await
        .map_err(provisioning_error)?
        .last_insert_id();

        // dropping `tx` on any error above rolls both inserts back
        tx.commit().await?;

        let created = User {
            id: user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            date_joined: user.date_joined,
        };
        let profile = EmployeeProfile {
            id: profile_id,
            user_id,
            id_card_number: id_card_number.to_string(),
        };

        Ok((created, profile))
    }

    async fn ensure_user(&self, user: &NewUser) -> AppResult<User> {
        sqlx::query(
            r#"
            INSERT IGNORE INTO users
                (username, email, password, first_name, last_name,
                 is_active, is_staff, is_superuser, date_joined)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.date_joined)
        .execute(&self.pool)
        .await?;

        // an ignored insert with no matching username means the email collided
        self.user_by_username(&user.username)
            .await?
            .ok_or(AppError::DuplicateUsernameOrEmail(IdentityField::Email))
    }

    async fn attach_profile(&self, user_id: u64, id_card_number: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT IGNORE INTO employee_profiles (user_id, id_card_number) VALUES (?, ?)",
        )
        .bind(user_id)
        .bind(id_card_number)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_login(&self, user_id: u64, at: NaiveDateTime) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<()> {
        sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(jti)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn consume_refresh_token(&self, jti: &str) -> AppResult<Option<u64>> {
        // the conditional update is the claim; only one caller can flip `revoked`
        let claimed = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE",
        )
        .bind(jti)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if claimed == 0 {
            return Ok(None);
        }

        let user_id = sqlx::query_scalar::<_, u64>("SELECT user_id FROM refresh_tokens WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user_id)
    }

    async fn revoke_refresh_token(&self, jti: &str) -> AppResult<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
