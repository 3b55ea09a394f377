//! In-process store with the same uniqueness rules as the MySQL schema.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::{IdentityStore, ImportedLog, LogStore};
use crate::error::{AppError, AppResult, IdentityField};
use crate::model::daily_log::{DailyLog, LogFilter, LogRecord, LogUpsert};
use crate::model::employee_profile::EmployeeProfile;
use crate::model::user::{NewUser, User};

#[derive(Default)]
struct State {
    users: Vec<User>,
    profiles: Vec<EmployeeProfile>,
    logs: Vec<DailyLog>,
    // (user_id, jti, revoked)
    refresh_tokens: Vec<(u64, String, bool)>,
    last_logins: Vec<(u64, NaiveDateTime)>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn profile_count(&self) -> usize {
        self.lock().profiles.len()
    }

    pub fn log_count(&self) -> usize {
        self.lock().logs.len()
    }

    pub fn last_login(&self, user_id: u64) -> Option<NaiveDateTime> {
        self.lock()
            .last_logins
            .iter()
            .rev()
            .find(|(id, _)| *id == user_id)
            .map(|(_, at)| *at)
    }
}

impl State {
    fn insert_user(&mut self, user: &NewUser) -> User {
        let created = User {
            id: self.users.len() as u64 + 1,
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
        self.users.push(created.clone());
        created
    }

    fn insert_profile(&mut self, user_id: u64, id_card_number: &str) -> EmployeeProfile {
        let profile = EmployeeProfile {
            id: self.profiles.len() as u64 + 1,
            user_id,
            id_card_number: id_card_number.to_string(),
        };
        self.profiles.push(profile.clone());
        profile
    }

    fn taken(&self, username: &str, email: &str) -> Option<IdentityField> {
        if self.users.iter().any(|u| u.username == username) {
            Some(IdentityField::Username)
        } else if self.users.iter().any(|u| u.email == email) {
            Some(IdentityField::Email)
        } else {
            None
        }
    }

    fn find_log(&mut self, employee_id: u64, date: NaiveDate, slot: &str) -> Option<&mut DailyLog> {
        self.logs
            .iter_mut()
            .find(|l| l.employee_id == employee_id && l.date == date && l.time_interval == slot)
    }
}

fn matches_date(filter: &LogFilter, date: NaiveDate) -> bool {
    filter.date.is_none_or(|d| d == date)
        && filter.start_date.is_none_or(|s| date >= s)
        && filter.end_date.is_none_or(|e| date <= e)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn upsert(&self, entry: &LogUpsert) -> AppResult<DailyLog> {
        let mut state = self.lock();

        if let Some(existing) = state.find_log(entry.employee_id, entry.date, &entry.time_interval) {
            existing.description = entry.description.clone();
            existing.status = entry.status;
            existing.updated_at = entry.at;
            return Ok(existing.clone());
        }

        let log = DailyLog {
            id: state.logs.len() as u64 + 1,
            employee_id: entry.employee_id,
            date: entry.date,
            time_interval: entry.time_interval.clone(),
            description: entry.description.clone(),
            status: entry.status,
            created_at: entry.at,
            updated_at: entry.at,
        };
        state.logs.push(log.clone());
        Ok(log)
    }

    async fn logs_for_day(&self, employee_id: u64, date: NaiveDate) -> AppResult<Vec<DailyLog>> {
        let mut logs: Vec<DailyLog> = self
            .lock()
            .logs
            .iter()
            .filter(|l| l.employee_id == employee_id && l.date == date)
            .cloned()
            .collect();
        logs.sort_by(|a, b| a.time_interval.cmp(&b.time_interval));
        Ok(logs)
    }

    async fn search(&self, filter: &LogFilter) -> AppResult<Vec<LogRecord>> {
        let state = self.lock();
        let name = filter.staff_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let card = filter.id_card.as_deref().map(str::trim).filter(|c| !c.is_empty());

        let mut records: Vec<LogRecord> = state
            .logs
            .iter()
            .filter(|l| filter.employee_id.is_none_or(|id| id == l.employee_id))
            .filter(|l| matches_date(filter, l.date))
            .filter_map(|l| {
                let user = state.users.iter().find(|u| u.id == l.employee_id)?;
                let profile = state.profiles.iter().find(|p| p.user_id == user.id);
                Some((l, user, profile))
            })
            .filter(|(_, user, _)| {
                name.is_none_or(|n| {
                    contains_ignore_case(&user.username, n)
                        || contains_ignore_case(&user.first_name, n)
                        || contains_ignore_case(&user.last_name, n)
                })
            })
            .filter(|(_, _, profile)| {
                card.is_none_or(|c| profile.is_some_and(|p| p.id_card_number == c))
            })
            .map(|(l, user, profile)| LogRecord {
                id: l.id,
                employee_id: l.employee_id,
                username: user.username.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                id_card_number: profile.map(|p| p.id_card_number.clone()),
                date: l.date,
                time_interval: l.time_interval.clone(),
                description: l.description.clone(),
                status: l.status,
                created_at: l.created_at,
                updated_at: l.updated_at,
            })
            .collect();

        records.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.time_interval.cmp(&b.time_interval)));
        Ok(records)
    }

    async fn import(&self, entry: &ImportedLog) -> AppResult<bool> {
        let mut state = self.lock();
        if state.find_log(entry.employee_id, entry.date, &entry.time_interval).is_some() {
            return Ok(false);
        }
        let id = state.logs.len() as u64 + 1;
        state.logs.push(DailyLog {
            id,
            employee_id: entry.employee_id,
            date: entry.date,
            time_interval: entry.time_interval.clone(),
            description: entry.description.clone(),
            status: entry.status,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        });
        Ok(true)
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn user_by_id(&self, id: u64) -> AppResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.username == username).cloned())
    }

    async fn identity_taken(
        &self,
        username: &str,
        email: &str,
    ) -> AppResult<Option<IdentityField>> {
        Ok(self.lock().taken(username, email))
    }

    async fn profile_by_card(&self, id_card_number: &str) -> AppResult<Option<EmployeeProfile>> {
        Ok(self
            .lock()
            .profiles
            .iter()
            .find(|p| p.id_card_number == id_card_number)
            .cloned())
    }

    async fn profile_for_user(&self, user_id: u64) -> AppResult<Option<EmployeeProfile>> {
        Ok(self.lock().profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn create_staff(
        &self,
        user: &NewUser,
        id_card_number: &str,
    ) -> AppResult<(User, EmployeeProfile)> {
        let mut state = self.lock();
        if let Some(field) = state.taken(&user.username, &user.email) {
            return Err(AppError::DuplicateUsernameOrEmail(field));
        }
        if state.profiles.iter().any(|p| p.id_card_number == id_card_number) {
            return Err(AppError::DuplicateCardNumber);
        }
        let created = state.insert_user(user);
        let profile = state.insert_profile(created.id, id_card_number);
        Ok((created, profile))
    }

    async fn ensure_user(&self, user: &NewUser) -> AppResult<User> {
        let mut state = self.lock();
        if let Some(existing) = state.users.iter().find(|u| u.username == user.username) {
            return Ok(existing.clone());
        }
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::DuplicateUsernameOrEmail(IdentityField::Email));
        }
        Ok(state.insert_user(user))
    }

    async fn attach_profile(&self, user_id: u64, id_card_number: &str) -> AppResult<bool> {
        let mut state = self.lock();
        let occupied = state
            .profiles
            .iter()
            .any(|p| p.id_card_number == id_card_number || p.user_id == user_id);
        if occupied {
            return Ok(false);
        }
        state.insert_profile(user_id, id_card_number);
        Ok(true)
    }

    async fn record_login(&self, user_id: u64, at: NaiveDateTime) -> AppResult<()> {
        self.lock().last_logins.push((user_id, at));
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        _expires_at: NaiveDateTime,
    ) -> AppResult<()> {
        self.lock().refresh_tokens.push((user_id, jti.to_string(), false));
        Ok(())
    }

    async fn consume_refresh_token(&self, jti: &str) -> AppResult<Option<u64>> {
        let mut state = self.lock();
        Ok(state
            .refresh_tokens
            .iter_mut()
            .find(|(_, id, revoked)| id == jti && !*revoked)
            .map(|token| {
                token.2 = true;
                token.0
            }))
    }

    async fn revoke_refresh_token(&self, jti: &str) -> AppResult<()> {
        for token in self.lock().refresh_tokens.iter_mut().filter(|t| t.1 == jti) {
            token.2 = true;
        }
        Ok(())
    }
}
