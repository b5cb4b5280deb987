//! File download responses (CSV and JSON exports).

use agronomy::export::CsvTable;
use chrono::NaiveDate;
use rocket::Responder;
use rocket::http::{ContentType, Header};
use serde::Serialize;

/// A body served as an attachment.
#[derive(Responder)]
pub struct Download {
    body: String,
    content_type: ContentType,
    disposition: Header<'static>,
}

impl Download {
    fn attachment(body: String, content_type: ContentType, filename: String) -> Self {
        Download {
            body,
            content_type,
            disposition: Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename),
            ),
        }
    }

    pub fn csv(filename: String, table: &CsvTable) -> Self {
        Download::attachment(table.render(), ContentType::CSV, filename)
    }

    pub fn json<T: Serialize>(filename: String, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_string_pretty(value)?;
        Ok(Download::attachment(body, ContentType::JSON, filename))
    }
}

/// `<stem>_<YYYY-MM-DD>.<ext>`
pub fn dated_filename(stem: &str, date: NaiveDate, ext: &str) -> String {
    format!("{}_{}.{}", stem, date.format("%Y-%m-%d"), ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dated_filename() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(dated_filename("alerts", d, "csv"), "alerts_2025-03-09.csv");
    }
}
