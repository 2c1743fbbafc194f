//! Best-effort notification of the engagement owner.
//!
//! Nothing here returns an error: a missing recipient, a store failure or
//! an SMTP failure is logged and the run's outcome stands.

use std::sync::Arc;

use vantage_db::models::engagement::Engagement;
use vantage_events::{EmailContent, Mailer, ReportFailed, ReportReady};

use crate::store::ReportStore;

#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn ReportStore>,
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl Notifier {
    pub fn new(store: Arc<dyn ReportStore>, mailer: Arc<dyn Mailer>, base_url: String) -> Self {
        Self {
            store,
            mailer,
            base_url,
        }
    }

    pub async fn report_ready(&self, engagement: &Engagement, version: i32, warnings: &[String]) {
        let content = ReportReady {
            engagement_id: engagement.id,
            company_name: &engagement.company_name,
            report_type: &engagement.report_type,
            version,
            warnings,
            base_url: &self.base_url,
        }
        .render();
        self.deliver(engagement, content).await;
    }

    pub async fn report_failed(&self, engagement: &Engagement, error: &str) {
        let content = ReportFailed {
            engagement_id: engagement.id,
            company_name: &engagement.company_name,
            report_type: &engagement.report_type,
            error,
            base_url: &self.base_url,
        }
        .render();
        self.deliver(engagement, content).await;
    }

    async fn deliver(&self, engagement: &Engagement, content: EmailContent) {
        let recipient = match self.store.find_user_email(engagement.owner_id).await {
            Ok(Some(email)) => email,
            Ok(None) => {
                tracing::warn!(
                    engagement_id = engagement.id,
                    owner_id = engagement.owner_id,
                    "Engagement owner has no email address, skipping notification",
                );
                return;
            }
            Err(e) => {
                tracing::warn!(
                    engagement_id = engagement.id,
                    error = %e,
                    "Failed to look up notification recipient",
                );
                return;
            }
        };

        if let Err(e) = self
            .mailer
            .send_email(&recipient, &content.subject, &content.html, &content.text)
            .await
        {
            tracing::warn!(
                engagement_id = engagement.id,
                error = %e,
                "Failed to send notification email",
            );
        }
    }
}
