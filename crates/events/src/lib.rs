//! Outbound notifications for report generation.
//!
//! - [`Mailer`] is the delivery seam: SMTP through [`EmailDelivery`], or
//!   [`LogMailer`] when no SMTP server is configured.
//! - [`notification`] composes the report-ready and report-failed emails.
//!
//! Delivery is best-effort. Callers log an [`EmailError`] and move on.

pub mod delivery;
pub mod notification;

pub use delivery::email::{EmailConfig, EmailDelivery, EmailError, LogMailer, Mailer};
pub use notification::{EmailContent, ReportFailed, ReportReady};
