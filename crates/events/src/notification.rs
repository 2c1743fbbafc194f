//! Report notification emails.
//!
//! Each notification renders to an [`EmailContent`] with matching HTML and
//! plain-text bodies. Values interpolated into HTML are escaped.

use vantage_core::report::MAX_NOTIFIED_WARNINGS;
use vantage_core::types::DbId;

/// A rendered email ready for a [`crate::Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

fn engagement_url(base_url: &str, engagement_id: DbId) -> String {
    format!("{}/engagements/{engagement_id}", base_url.trim_end_matches('/'))
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Report ready
// ---------------------------------------------------------------------------

/// Sent after a report version was saved.
#[derive(Debug, Clone)]
pub struct ReportReady<'a> {
    pub engagement_id: DbId,
    pub company_name: &'a str,
    pub report_type: &'a str,
    pub version: i32,
    /// All warnings of the run; only the first [`MAX_NOTIFIED_WARNINGS`] are quoted.
    pub warnings: &'a [String],
    pub base_url: &'a str,
}

impl ReportReady<'_> {
    pub fn render(&self) -> EmailContent {
        let url = engagement_url(self.base_url, self.engagement_id);
        let subject = format!(
            "Your {} report for {} is ready",
            self.report_type, self.company_name
        );

        let quoted = &self.warnings[..self.warnings.len().min(MAX_NOTIFIED_WARNINGS)];
        let omitted = self.warnings.len() - quoted.len();

        let mut text = format!(
            "Draft v{} of the {} report for {} has been generated.\n\nDownload it at {url}\n",
            self.version, self.report_type, self.company_name
        );
        let mut html = format!(
            "<p>Draft v{} of the {} report for <strong>{}</strong> has been generated.</p>\
             <p><a href=\"{}\">Open the engagement</a> to download it.</p>",
            self.version,
            escape_html(self.report_type),
            escape_html(self.company_name),
            escape_html(&url),
        );

        if !quoted.is_empty() {
            text.push_str("\nSome sections need review:\n");
            html.push_str("<p>Some sections need review:</p><ul>");
            for warning in quoted {
                text.push_str(&format!("- {warning}\n"));
                html.push_str(&format!("<li>{}</li>", escape_html(warning)));
            }
            html.push_str("</ul>");
            if omitted > 0 {
                text.push_str(&format!("...and {omitted} more.\n"));
                html.push_str(&format!("<p>...and {omitted} more.</p>"));
            }
        }

        EmailContent { subject, html, text }
    }
}

// ---------------------------------------------------------------------------
// Report failed
// ---------------------------------------------------------------------------

/// Sent when a run aborted on a hard failure.
#[derive(Debug, Clone)]
pub struct ReportFailed<'a> {
    pub engagement_id: DbId,
    pub company_name: &'a str,
    pub report_type: &'a str,
    pub error: &'a str,
    pub base_url: &'a str,
}

impl ReportFailed<'_> {
    pub fn render(&self) -> EmailContent {
        let url = engagement_url(self.base_url, self.engagement_id);
        let subject = format!(
            "Report generation failed for {}",
            self.company_name
        );
        let text = format!(
            "The {} report for {} could not be generated.\n\nReason: {}\n\n\
             You can retry from {url}\n",
            self.report_type, self.company_name, self.error
        );
        let html = format!(
            "<p>The {} report for <strong>{}</strong> could not be generated.</p>\
             <p>Reason: {}</p>\
             <p><a href=\"{}\">Open the engagement</a> to retry.</p>",
            escape_html(self.report_type),
            escape_html(self.company_name),
            escape_html(self.error),
            escape_html(&url),
        );
        EmailContent { subject, html, text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warnings(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("warning {i}")).collect()
    }

    #[test]
    fn ready_without_warnings_has_no_review_list() {
        let content = ReportReady {
            engagement_id: 4,
            company_name: "Acme Corp",
            report_type: "409A",
            version: 2,
            warnings: &[],
            base_url: "https://app.example.com/",
        }
        .render();

        assert_eq!(content.subject, "Your 409A report for Acme Corp is ready");
        assert!(content.text.contains("Draft v2"));
        assert!(content.text.contains("https://app.example.com/engagements/4"));
        assert!(!content.text.contains("need review"));
        assert!(!content.html.contains("<ul>"));
    }

    #[test]
    fn ready_quotes_at_most_five_warnings() {
        let all = warnings(7);
        let content = ReportReady {
            engagement_id: 1,
            company_name: "Acme",
            report_type: "409A",
            version: 1,
            warnings: &all,
            base_url: "http://localhost:5173",
        }
        .render();

        assert!(content.text.contains("warning 5"));
        assert!(!content.text.contains("warning 6"));
        assert!(content.text.contains("and 2 more"));
        assert_eq!(content.html.matches("<li>").count(), MAX_NOTIFIED_WARNINGS);
    }

    #[test]
    fn failed_escapes_html() {
        let content = ReportFailed {
            engagement_id: 9,
            company_name: "Smith & Sons",
            report_type: "FMV",
            error: "Spreadsheet <model.xlsx> unreadable",
            base_url: "http://localhost:5173",
        }
        .render();

        assert!(content.html.contains("Smith &amp; Sons"));
        assert!(content.html.contains("&lt;model.xlsx&gt;"));
        assert!(content.text.contains("Spreadsheet <model.xlsx> unreadable"));
    }
}
