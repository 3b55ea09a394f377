//! Spreadsheet export of log records.

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::{AppError, AppResult};
use crate::model::daily_log::{LogFilter, LogRecord};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "Staff Logs";

/// Column set of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetLayout {
    /// Admin export across all staff
    AllStaff,
    /// A staff member's own logs, with their card number
    OwnLogs,
}

impl SheetLayout {
    pub fn header(self) -> &'static [&'static str] {
        match self {
            SheetLayout::AllStaff => &["Staff Name", "Date", "Time Interval", "Description", "Status"],
            SheetLayout::OwnLogs => &[
                "Staff Name",
                "ID Card Number",
                "Date",
                "Time Interval",
                "Description",
                "Status",
            ],
        }
    }

    fn row(self, record: &LogRecord) -> Vec<String> {
        let mut row = vec![record.staff_name()];
        if self == SheetLayout::OwnLogs {
            row.push(record.id_card_number.clone().unwrap_or_default());
        }
        row.extend([
            record.date.format("%Y-%m-%d").to_string(),
            record.time_interval.clone(),
            record.description.clone(),
            record.status.to_string(),
        ]);
        row
    }
}

/// Header followed by one row per record, in record order.
pub fn sheet_rows(records: &[LogRecord], layout: SheetLayout) -> Vec<Vec<String>> {
    std::iter::once(layout.header().iter().map(|h| h.to_string()).collect::<Vec<String>>())
        .chain(records.iter().map(|r| layout.row(r)))
        .collect()
}

fn write_workbook(rows: &[Vec<String>]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                if r == 0 {
                    worksheet.write_string_with_format(r, c, value, &bold)?;
                } else {
                    worksheet.write_string(r, c, value)?;
                }
            }
        }
    }

    workbook.save_to_buffer()
}

pub fn build_workbook(records: &[LogRecord], layout: SheetLayout) -> AppResult<Vec<u8>> {
    write_workbook(&sheet_rows(records, layout))
        .map_err(|e| AppError::Internal(format!("Error generating Excel file: {e}")))
}

/// Checks the date criteria of `filter`. A single `date` wins over a range;
/// range bounds are inclusive and either side may be open. `default_date`
/// applies when neither a date nor a range was given.
pub fn checked_filter(mut filter: LogFilter, default_date: Option<NaiveDate>) -> AppResult<LogFilter> {
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        if start > end {
            return Err(AppError::Validation(
                "start_date cannot be after end_date".to_string(),
            ));
        }
    }

    if filter.date.is_some() {
        filter.start_date = None;
        filter.end_date = None;
    } else if filter.start_date.is_none() && filter.end_date.is_none() {
        filter.date = default_date;
    }

    Ok(filter)
}

/// Filter for a staff member's own export.
pub fn own_logs_filter(
    employee_id: u64,
    date: Option<NaiveDate>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> AppResult<LogFilter> {
    checked_filter(
        LogFilter {
            employee_id: Some(employee_id),
            date,
            start_date,
            end_date,
            ..LogFilter::default()
        },
        None,
    )
}

pub fn own_logs_filename(username: &str, filter: &LogFilter) -> String {
    let span = match (filter.date, filter.start_date, filter.end_date) {
        (Some(date), _, _) => date.to_string(),
        (None, Some(start), Some(end)) => format!("{start}_to_{end}"),
        (None, Some(start), None) => format!("from_{start}"),
        (None, None, Some(end)) => format!("until_{end}"),
        (None, None, None) => "all".to_string(),
    };
    format!("{}_logs_{span}.xlsx", sanitize(username))
}

pub fn staff_logs_filename(date: Option<NaiveDate>, today: NaiveDate) -> String {
    format!("staff_logs_{}.xlsx", date.unwrap_or(today))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::daily_log::{LogStatus, LogUpsert};
    use crate::model::user::NewUser;
    use crate::store::memory::MemoryStore;
    use crate::store::{IdentityStore, LogStore};
    use chrono::NaiveDateTime;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn stamp() -> NaiveDateTime {
        day(1).and_hms_opt(8, 0, 0).unwrap()
    }

    async fn seed() -> MemoryStore {
        let store = MemoryStore::new();
        for (username, first, card) in [("ann", "Ann", "C-1"), ("bob", "", "C-2")] {
            let user = NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: "x".to_string(),
                first_name: first.to_string(),
                last_name: String::new(),
                is_active: true,
                is_staff: false,
                is_superuser: false,
                date_joined: stamp(),
            };
            store.create_staff(&user, card).await.unwrap();
        }
        for employee_id in [1, 2] {
            for d in [12, 13, 14, 15] {
                store
                    .upsert(&LogUpsert {
                        employee_id,
                        date: day(d),
                        time_interval: "09:00 - 09:30".to_string(),
                        description: format!("day {d}"),
                        status: LogStatus::Pending,
                        at: stamp(),
                    })
                    .await
                    .unwrap();
            }
        }
        store
    }

    #[actix_web::test]
    async fn own_range_export_is_inclusive_and_scoped() {
        let store = seed().await;
        let filter = own_logs_filter(1, None, Some(day(13)), Some(day(14))).unwrap();
        let records = store.search(&filter).await.unwrap();

        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(14), day(13)]);
        assert!(records.iter().all(|r| r.employee_id == 1));

        let rows = sheet_rows(&records, SheetLayout::OwnLogs);
        assert_eq!(
            rows[0],
            vec!["Staff Name", "ID Card Number", "Date", "Time Interval", "Description", "Status"]
        );
        assert_eq!(rows[1], vec!["Ann", "C-1", "2026-10-14", "09:00 - 09:30", "day 14", "Pending"]);
    }

    #[actix_web::test]
    async fn staff_export_falls_back_to_username() {
        let store = seed().await;
        let filter = LogFilter { date: Some(day(12)), ..LogFilter::default() };
        let records = store.search(&filter).await.unwrap();

        let rows = sheet_rows(&records, SheetLayout::AllStaff);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 5);
        let names: Vec<&str> = rows[1..].iter().map(|r| r[0].as_str()).collect();
        assert!(names.contains(&"Ann"));
        assert!(names.contains(&"bob"));
    }

    #[test]
    fn rejects_inverted_ranges() {
        let err = own_logs_filter(1, None, Some(day(15)), Some(day(12))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn single_date_overrides_range() {
        let filter = own_logs_filter(1, Some(day(12)), Some(day(1)), None).unwrap();
        assert_eq!(filter.date, Some(day(12)));
        assert_eq!(filter.start_date, None);
        assert_eq!(own_logs_filename("ann", &filter), "ann_logs_2026-10-12.xlsx");
    }

    #[test]
    fn dashboard_defaults_to_the_given_day() {
        let filter = checked_filter(LogFilter::default(), Some(day(18))).unwrap();
        assert_eq!(filter.date, Some(day(18)));

        let ranged = LogFilter { start_date: Some(day(1)), ..LogFilter::default() };
        let filter = checked_filter(ranged, Some(day(18))).unwrap();
        assert_eq!(filter.date, None);
        assert_eq!(filter.start_date, Some(day(1)));
    }

    #[test]
    fn filenames_embed_their_context() {
        let range = own_logs_filter(1, None, Some(day(1)), Some(day(7))).unwrap();
        assert_eq!(own_logs_filename("a.b", &range), "a_b_logs_2026-10-01_to_2026-10-07.xlsx");
        let all = own_logs_filter(1, None, None, None).unwrap();
        assert_eq!(own_logs_filename("ann", &all), "ann_logs_all.xlsx");
        assert_eq!(staff_logs_filename(None, day(18)), "staff_logs_2026-10-18.xlsx");
    }

    #[test]
    fn workbook_is_a_zip_container() {
        let bytes = build_workbook(&[], SheetLayout::AllStaff).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
