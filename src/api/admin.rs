use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::daily_log::{LogFilter, LogRecord};
use crate::service::export::checked_filter;
use crate::service::identity::{self, NewStaff, StaffAccount};
use crate::store::{IdentityStore, LogStore};
use crate::utils::identity_filter::IdentityFilter;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// Case-insensitive match on username, first or last name
    #[param(example = "john")]
    pub staff_name: Option<String>,
    /// Exact ID card number
    #[param(example = "C-1001")]
    pub id_card: Option<String>,
    /// Defaults to today when no range is given
    #[param(value_type = Option<String>, format = "date", example = "2026-01-01")]
    pub date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

impl DashboardQuery {
    pub(crate) fn into_filter(self) -> LogFilter {
        LogFilter {
            staff_name: self.staff_name,
            id_card: self.id_card,
            date: self.date,
            start_date: self.start_date,
            end_date: self.end_date,
            ..LogFilter::default()
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StaffCreatedResponse {
    #[schema(example = "Staff added successfully!")]
    pub message: String,
    pub staff: StaffAccount,
}

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    #[schema(example = 2)]
    pub total: usize,
    pub logs: Vec<LogRecord>,
}

/// Logs of all staff
#[utoipa::path(
    get,
    path = "/api/admin/logs",
    params(DashboardQuery),
    responses(
        (status = 200, body = DashboardResponse),
        (status = 400, description = "start_date after end_date"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn dashboard(
    auth: AuthUser,
    store: web::Data<dyn LogStore>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let today = Local::now().date_naive();
    let filter = checked_filter(query.into_inner().into_filter(), Some(today))?;
    let logs = store.search(&filter).await?;

    Ok(HttpResponse::Ok().json(DashboardResponse {
        date: filter.date,
        total: logs.len(),
        logs,
    }))
}

/// Provision a staff account with its ID card
#[utoipa::path(
    post,
    path = "/api/admin/staff",
    request_body = NewStaff,
    responses(
        (status = 201, description = "Staff added", body = StaffCreatedResponse),
        (status = 400, description = "Invalid field(s)"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Username, email or ID card number already exists", body = Object, example = json!({
            "error": "duplicate_username_or_email",
            "message": "Username already exists."
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn add_staff(
    auth: AuthUser,
    store: web::Data<dyn IdentityStore>,
    filter: web::Data<IdentityFilter>,
    payload: web::Json<NewStaff>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let staff = identity::add_staff(
        store.get_ref(),
        filter.get_ref(),
        payload.into_inner(),
        Local::now(),
    )
    .await?;

    Ok(HttpResponse::Created().json(StaffCreatedResponse {
        message: "Staff added successfully!".to_string(),
        staff,
    }))
}
