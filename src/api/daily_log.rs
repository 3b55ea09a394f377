use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::daily_log::LogStatus;
use crate::service::daily_log::{self, LogSubmission};
use crate::store::LogStore;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DayQuery {
    /// Defaults to today
    #[param(value_type = Option<String>, format = "date", example = "2026-01-01")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LogSubmissionReq {
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    #[schema(example = "09:00 - 09:30")]
    pub time_interval: String,
    #[schema(example = "Sprint planning")]
    pub description: String,
    pub status: Option<LogStatus>,
}

/// Day sheet of the current user
#[utoipa::path(
    get,
    path = "/api/logs",
    params(DayQuery),
    responses(
        (status = 200, body = crate::service::daily_log::DaySheet),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Daily Log"
)]
pub async fn day_sheet(
    auth: AuthUser,
    store: web::Data<dyn LogStore>,
    query: web::Query<DayQuery>,
) -> Result<HttpResponse, AppError> {
    let today = Local::now().date_naive();
    let date = query.date.unwrap_or(today);

    let sheet = daily_log::day_sheet(store.get_ref(), auth.user_id, date, today).await?;
    Ok(HttpResponse::Ok().json(sheet))
}

/// Create or update the current user's log for one slot
#[utoipa::path(
    post,
    path = "/api/logs",
    request_body = LogSubmissionReq,
    responses(
        (status = 200, description = "Log saved", body = Object, example = json!({
            "message": "Log entry saved successfully",
            "log": {
                "id": 1,
                "employee_id": 2,
                "date": "2026-01-01",
                "time_interval": "09:00 - 09:30",
                "description": "Sprint planning",
                "status": "Ongoing"
            }
        })),
        (status = 400, description = "Unknown slot or empty description"),
        (status = 403, description = "Logs for past dates are read-only")
    ),
    security(("bearer_auth" = [])),
    tag = "Daily Log"
)]
pub async fn submit_log(
    auth: AuthUser,
    store: web::Data<dyn LogStore>,
    payload: web::Json<LogSubmissionReq>,
) -> Result<HttpResponse, AppError> {
    let now = Local::now();
    let payload = payload.into_inner();

    let submission = LogSubmission {
        date: payload.date.unwrap_or_else(|| now.date_naive()),
        time_interval: payload.time_interval,
        description: payload.description,
        status: payload.status.unwrap_or_default(),
    };

    let log = daily_log::submit(store.get_ref(), auth.user_id, submission, now).await?;
    info!(user_id = auth.user_id, log_id = log.id, "Log entry saved");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Log entry saved successfully",
        "log": log,
    })))
}
