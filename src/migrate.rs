//! One-time import of a legacy relational dump (Django `dumpdata` JSON).
//!
//! Users are matched by username, profiles by card number and logs by their
//! (employee, date, slot) triple, so re-running an import never duplicates rows.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::password::{hash_password, is_argon2_hash};
use crate::model::daily_log::LogStatus;
use crate::model::user::NewUser;
use crate::service::slots::is_valid_slot;
use crate::store::{IdentityStore, ImportedLog, LogStore};

#[derive(Debug, Deserialize)]
#[serde(tag = "model")]
enum DumpRecord {
    #[serde(rename = "auth.user")]
    User { pk: u64, fields: LegacyUser },
    #[serde(rename = "logs.employeeprofile")]
    Profile { fields: LegacyProfile },
    #[serde(rename = "logs.dailylog")]
    Log { fields: LegacyLog },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct LegacyUser {
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    is_staff: bool,
    #[serde(default)]
    is_superuser: bool,
    date_joined: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct LegacyProfile {
    user: u64,
    id_card_number: String,
}

#[derive(Debug, Deserialize)]
struct LegacyLog {
    employee: u64,
    date: String,
    time_interval: String,
    description: String,
    #[serde(default)]
    status: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub users_migrated: usize,
    pub users_existing: usize,
    pub users_skipped: usize,
    pub profiles_migrated: usize,
    pub profiles_existing: usize,
    pub logs_migrated: usize,
    pub logs_existing: usize,
    pub logs_skipped: usize,
}

fn parse_timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(Some(raw)).map(|dt| dt.date()))
}

fn valid_email(email: &str) -> bool {
    matches!(email.split_once('@'), Some((local, domain)) if !local.is_empty() && !domain.is_empty())
}

pub async fn run_from_file<S>(store: &S, dump: &Path, default_password: &str) -> Result<MigrationReport>
where
    S: IdentityStore + LogStore,
{
    let raw = std::fs::read_to_string(dump)
        .with_context(|| format!("reading legacy dump {}", dump.display()))?;
    // dumps written on Windows often carry a BOM
    let records: Vec<DumpRecord> = serde_json::from_str(raw.trim_start_matches('\u{feff}'))
        .with_context(|| format!("parsing legacy dump {}", dump.display()))?;
    import(store, records, default_password, Utc::now().naive_utc()).await
}

async fn import<S>(
    store: &S,
    records: Vec<DumpRecord>,
    default_password: &str,
    now: NaiveDateTime,
) -> Result<MigrationReport>
where
    S: IdentityStore + LogStore,
{
    let mut report = MigrationReport::default();
    let mut users = Vec::new();
    let mut profiles = Vec::new();
    let mut logs = Vec::new();

    for record in records {
        match record {
            DumpRecord::User { pk, fields } => users.push((pk, fields)),
            DumpRecord::Profile { fields } => profiles.push(fields),
            DumpRecord::Log { fields } => logs.push(fields),
            DumpRecord::Other => {}
        }
    }

    // legacy pk => new user id
    let mut user_map: HashMap<u64, u64> = HashMap::new();
    let placeholder = hash_password(default_password)?;

    for (pk, legacy) in users {
        if !valid_email(&legacy.email) {
            warn!(username = %legacy.username, "Skipping user: invalid email");
            report.users_skipped += 1;
            continue;
        }

        if let Some(existing) = store.user_by_username(&legacy.username).await? {
            info!(username = %legacy.username, "User already exists");
            user_map.insert(pk, existing.id);
            report.users_existing += 1;
            continue;
        }

        let password = if is_argon2_hash(&legacy.password) {
            legacy.password.clone()
        } else {
            warn!(username = %legacy.username, "Legacy hash not reusable, assigning placeholder password");
            placeholder.clone()
        };

        let new_user = NewUser {
            username: legacy.username.clone(),
            email: legacy.email.clone(),
            password,
            first_name: legacy.first_name,
            last_name: legacy.last_name,
            is_active: legacy.is_active,
            is_staff: legacy.is_staff,
            is_superuser: legacy.is_superuser,
            date_joined: parse_timestamp(legacy.date_joined.as_deref()).unwrap_or(now),
        };

        match store.ensure_user(&new_user).await {
            Ok(user) => {
                user_map.insert(pk, user.id);
                report.users_migrated += 1;
                info!(username = %user.username, "Migrated user");
            }
            Err(e) => {
                warn!(username = %legacy.username, error = %e, "Skipping user");
                report.users_skipped += 1;
            }
        }
    }

    for legacy in profiles {
        let Some(&user_id) = user_map.get(&legacy.user) else {
            continue;
        };
        if store.attach_profile(user_id, legacy.id_card_number.trim()).await? {
            report.profiles_migrated += 1;
            info!(card = %legacy.id_card_number, "Migrated profile");
        } else {
            info!(card = %legacy.id_card_number, "Profile already exists");
            report.profiles_existing += 1;
        }
    }

    for legacy in logs {
        let Some(&employee_id) = user_map.get(&legacy.employee) else {
            continue;
        };
        let Some(date) = parse_date(&legacy.date) else {
            warn!(date = %legacy.date, "Skipping log: unreadable date");
            report.logs_skipped += 1;
            continue;
        };
        let status = legacy
            .status
            .as_deref()
            .and_then(|s| s.parse::<LogStatus>().ok())
            .unwrap_or_default();
        let created_at = parse_timestamp(legacy.created_at.as_deref()).unwrap_or(now);
        let updated_at = parse_timestamp(legacy.updated_at.as_deref()).unwrap_or(created_at);

        let time_interval = legacy.time_interval.trim().to_string();
        if !is_valid_slot(date, &time_interval) {
            // kept anyway; day sheets list such logs after the regular slots
            warn!(%date, slot = %time_interval, "Imported log outside the day's slots");
        }

        let entry = ImportedLog {
            employee_id,
            date,
            time_interval,
            description: legacy.description,
            status,
            created_at,
            updated_at,
        };

        if store.import(&entry).await? {
            report.logs_migrated += 1;
        } else {
            info!(date = %entry.date, slot = %entry.time_interval, "Log already exists");
            report.logs_existing += 1;
        }
    }

    info!(?report, "Legacy import finished");
    Ok(report)
}
