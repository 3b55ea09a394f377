//! Staff provisioning and login resolution.
//!
//! One `users` row carries both the profile data and the password hash;
//! `employee_profiles` links it to a badge number. Provisioning writes both in
//! a single transaction, so a failed step never leaves half an account behind.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::user::{NewUser, User};
use crate::store::IdentityStore;
use crate::utils::card_cache::CardCache;
use crate::utils::identity_filter::IdentityFilter;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewStaff {
    #[validate(length(min = 1, max = 150))]
    #[schema(example = "jdoe")]
    pub username: String,
    #[validate(email)]
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(length(min = 1, max = 30))]
    #[schema(example = "John")]
    pub first_name: String,
    #[validate(length(min = 1, max = 30))]
    #[schema(example = "Doe")]
    pub last_name: String,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "C-1001")]
    pub id_card_number: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StaffAccount {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub id_card_number: String,
    #[schema(format = "date-time", value_type = String)]
    pub date_joined: chrono::NaiveDateTime,
}

impl NewStaff {
    fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.id_card_number = self.id_card_number.trim().to_string();
        self
    }
}

/// Provisions a staff account and its badge.
///
/// Rejected with no writes when the username, email or card is already in use.
#[instrument(name = "add_staff", skip_all, fields(username = %staff.username))]
pub async fn add_staff(
    store: &dyn IdentityStore,
    filter: &IdentityFilter,
    staff: NewStaff,
    now: DateTime<Local>,
) -> AppResult<StaffAccount> {
    let staff = staff.normalized();
    staff.validate()?;

    // filter misses are definite, hits still need the exact check
    if filter.might_exist(&staff.username) || filter.might_exist(&staff.email) {
        debug!("Identity filter hit, checking store");
        if let Some(field) = store.identity_taken(&staff.username, &staff.email).await? {
            info!(%field, "Provisioning rejected: identity taken");
            return Err(AppError::DuplicateUsernameOrEmail(field));
        }
    }

    let new_user = NewUser {
        username: staff.username.clone(),
        email: staff.email.clone(),
        password: hash_password(&staff.password)?,
        first_name: staff.first_name.clone(),
        last_name: staff.last_name.clone(),
        is_active: true,
        is_staff: false,
        is_superuser: false,
        date_joined: now.naive_utc(),
    };

    // the store inserts the user before the profile, so username and email
    // collisions are reported ahead of a taken card
    let (user, profile) = store.create_staff(&new_user, &staff.id_card_number).await?;
    filter.insert(&user.username);
    filter.insert(&user.email);

    info!(user_id = user.id, "Staff added");

    Ok(StaffAccount {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        id_card_number: profile.id_card_number,
        date_joined: user.date_joined,
    })
}

/// Card + password login.
#[instrument(name = "employee_login", skip(store, cache, password))]
pub async fn login_employee(
    store: &dyn IdentityStore,
    cache: &CardCache,
    id_card: &str,
    password: &str,
) -> AppResult<User> {
    let id_card = id_card.trim();
    if id_card.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "ID card and password are required".to_string(),
        ));
    }

    let user_id = match cache.get(id_card).await {
        Some(user_id) => user_id,
        None => {
            let profile = store
                .profile_by_card(id_card)
                .await?
                .ok_or(AppError::ProfileNotFound)?;
            cache.remember(id_card, profile.user_id).await;
            profile.user_id
        }
    };

    let user = store
        .user_by_id(user_id)
        .await?
        .ok_or(AppError::IdentityNotFound)?;

    if !user.is_active {
        info!(user_id, "Login refused: inactive account");
        return Err(AppError::InvalidCredentials);
    }

    verify_password(password, &user.password)?;
    Ok(user)
}

/// Fixed-credential administrator login; provisions the administrator on first use.
#[instrument(name = "admin_login", skip(store, config, password))]
pub async fn login_admin(
    store: &dyn IdentityStore,
    config: &Config,
    admin_id: &str,
    password: &str,
    now: DateTime<Local>,
) -> AppResult<User> {
    if admin_id != config.admin_username || password != config.admin_password {
        info!("Invalid admin credentials");
        return Err(AppError::InvalidCredentials);
    }

    let admin = match store.user_by_username(&config.admin_username).await? {
        Some(existing) => existing,
        None => {
            info!("Bootstrapping administrator account");
            store
                .ensure_user(&NewUser {
                    username: config.admin_username.clone(),
                    email: format!("{}@example.com", config.admin_username),
                    password: hash_password(&config.admin_password)?,
                    first_name: String::new(),
                    last_name: String::new(),
                    is_active: true,
                    is_staff: true,
                    is_superuser: true,
                    date_joined: now.naive_utc(),
                })
                .await?
        }
    };

    if !admin.is_superuser || !admin.is_active {
        warn!(user_id = admin.id, "Admin username belongs to a non-admin account");
        return Err(AppError::InvalidCredentials);
    }

    verify_password(password, &admin.password)?;
    Ok(admin)
}
