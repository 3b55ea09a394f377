use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

use super::admin::DashboardQuery;
use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::daily_log::LogRecord;
use crate::service::export::{
    SheetLayout, XLSX_CONTENT_TYPE, build_workbook, checked_filter, own_logs_filename,
    own_logs_filter, staff_logs_filename,
};
use crate::store::LogStore;

#[derive(Debug, Deserialize, IntoParams)]
pub struct OwnExportQuery {
    /// Single day; overrides the range
    #[param(value_type = Option<String>, format = "date", example = "2026-01-01")]
    pub date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

fn xlsx_attachment(
    records: &[LogRecord],
    layout: SheetLayout,
    filename: String,
) -> Result<HttpResponse, AppError> {
    let bytes = build_workbook(records, layout)?;
    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(bytes))
}

/// Export the current user's logs as a spreadsheet
#[utoipa::path(
    get,
    path = "/api/logs/export",
    params(OwnExportQuery),
    responses(
        (status = 200, description = "Spreadsheet attachment", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 400, description = "start_date after end_date")
    ),
    security(("bearer_auth" = [])),
    tag = "Export"
)]
pub async fn export_own_logs(
    auth: AuthUser,
    store: web::Data<dyn LogStore>,
    query: web::Query<OwnExportQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = own_logs_filter(auth.user_id, query.date, query.start_date, query.end_date)?;
    let records = store.search(&filter).await?;
    info!(user_id = auth.user_id, rows = records.len(), "Exporting own logs");

    xlsx_attachment(
        &records,
        SheetLayout::OwnLogs,
        own_logs_filename(&auth.username, &filter),
    )
}

/// Export staff logs as a spreadsheet
#[utoipa::path(
    get,
    path = "/api/admin/logs/export",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Spreadsheet attachment", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Export"
)]
pub async fn export_staff_logs(
    auth: AuthUser,
    store: web::Data<dyn LogStore>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let filter = checked_filter(query.into_inner().into_filter(), None)?;
    let records = store.search(&filter).await?;
    info!(rows = records.len(), "Exporting staff logs");

    xlsx_attachment(
        &records,
        SheetLayout::AllStaff,
        staff_logs_filename(filter.date, Local::now().date_naive()),
    )
}
