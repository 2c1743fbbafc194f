//! Report file naming conventions.
//!
//! Two names exist for every generated report: the storage name used on
//! disk (stable, ASCII, unique per engagement and version) and the
//! download name shown to the user.

use chrono::NaiveDate;

use crate::types::DbId;

/// Generate the on-disk filename for a report version.
///
/// Convention: `engagement-{id}-v{version}.{ext}`
///
/// # Examples
///
/// ```
/// use vantage_core::naming::report_storage_filename;
///
/// assert_eq!(report_storage_filename(12, 3, "md"), "engagement-12-v3.md");
/// ```
pub fn report_storage_filename(engagement_id: DbId, version: i32, extension: &str) -> String {
    format!("engagement-{engagement_id}-v{version}.{extension}")
}

/// Generate the user-facing download filename.
///
/// Convention: `{company} - {reportType} - {YYYY-MM-DD} - DRAFT_v{version}.{ext}`
///
/// Characters that are not valid in filenames on common platforms are
/// replaced with `-`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use vantage_core::naming::report_download_filename;
///
/// let date = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
/// assert_eq!(
///     report_download_filename("Acme Corp", "409A", date, 2, "md"),
///     "Acme Corp - 409A - 2026-03-31 - DRAFT_v2.md"
/// );
/// ```
pub fn report_download_filename(
    company_name: &str,
    report_type: &str,
    valuation_date: NaiveDate,
    version: i32,
    extension: &str,
) -> String {
    let stem = format!(
        "{} - {} - {} - DRAFT_v{version}",
        sanitize(company_name),
        sanitize(report_type),
        valuation_date.format("%Y-%m-%d"),
    );
    if extension.is_empty() {
        stem
    } else {
        format!("{stem}.{extension}")
    }
}

fn sanitize(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    #[test]
    fn storage_name() {
        assert_eq!(report_storage_filename(1, 1, "md"), "engagement-1-v1.md");
    }

    #[test]
    fn download_name_replaces_path_separators() {
        assert_eq!(
            report_download_filename("Smith & Sons / Holdings", "FMV: Gift", date(), 1, "md"),
            "Smith & Sons - Holdings - FMV- Gift - 2026-01-15 - DRAFT_v1.md"
        );
    }

    #[test]
    fn download_name_without_extension() {
        assert_eq!(
            report_download_filename("Acme", "409A", date(), 4, ""),
            "Acme - 409A - 2026-01-15 - DRAFT_v4"
        );
    }
}
