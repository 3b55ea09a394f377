use crate::api::admin::{DashboardResponse, StaffCreatedResponse};
use crate::api::daily_log::LogSubmissionReq;
use crate::auth::handlers::MeResponse;
use crate::model::daily_log::{DailyLog, LogRecord, LogStatus};
use crate::models::{LoginReqDto, LoginResponse};
use crate::service::daily_log::{DaySheet, SlotEntry};
use crate::service::identity::{NewStaff, StaffAccount};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Staff Daily Log API",
        version = "1.0.0",
        description = r#"
## Staff Daily Log

Staff record what they worked on in fixed 30-minute slots of the working day.

### 🔹 Key Features
- **Daily logs**
  - One entry per staff member, day and slot; resubmitting a slot updates it
  - Saturdays run 09:00 - 14:00, other days 08:00 - 17:00
  - Past days are read-only
- **Administration**
  - Provision staff accounts with their ID card number
  - Browse and filter everyone's logs
- **Export**
  - `.xlsx` download of your own logs or, for admins, of all staff logs

### 🔐 Security
Log in at `/auth/login` with an ID card (staff) or the administrator credentials.
Every `/api` endpoint needs `Authorization: Bearer <access_token>`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::daily_log::day_sheet,
        crate::api::daily_log::submit_log,

        crate::api::admin::dashboard,
        crate::api::admin::add_staff,

        crate::api::export::export_own_logs,
        crate::api::export::export_staff_logs
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            MeResponse,
            LogStatus,
            DailyLog,
            LogRecord,
            LogSubmissionReq,
            SlotEntry,
            DaySheet,
            DashboardResponse,
            NewStaff,
            StaffAccount,
            StaffCreatedResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and logout"),
        (name = "Daily Log", description = "Slot logs of the current user"),
        (name = "Admin", description = "Staff provisioning and the all-staff dashboard"),
        (name = "Export", description = "Spreadsheet downloads"),
    )
)]
pub struct ApiDoc;
