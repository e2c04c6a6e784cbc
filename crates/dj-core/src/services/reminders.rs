//! Daily reminder for users who have not logged in recently.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::traits::{JournalRepo, Notifier};

pub const REMINDER_SUBJECT: &str = "Daily Journal Reminder";

pub const REMINDER_BODY: &str = "Hi there, it looks like you haven't filled in your journal in the last 24 hours. \
Don't forget to log in and keep your journal updated!";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct ReminderJob {
    repo: Arc<dyn JournalRepo>,
    notifier: Arc<dyn Notifier>,
}

impl ReminderJob {
    pub fn new(repo: Arc<dyn JournalRepo>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repo, notifier }
    }

    /// One pass over every user. A failed notification is logged and the
    /// scan moves on.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ReminderReport> {
        let mut report = ReminderReport::default();
        for user in self.repo.list_users().await? {
            if user.logged_in_within(now, Duration::hours(24)) {
                report.skipped += 1;
                continue;
            }
            match self.notifier.notify(&user.email, REMINDER_SUBJECT, REMINDER_BODY).await {
                Ok(()) => {
                    debug!(user_id = %user.id, "reminder sent");
                    report.sent += 1;
                }
                Err(err) => {
                    warn!(user_id = %user.id, error = %err, "reminder failed");
                    report.failed += 1;
                }
            }
        }
        info!(sent = report.sent, failed = report.failed, skipped = report.skipped, "reminder pass finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::recents::RecentJournals;
    use crate::traits::{MockJournalRepo, MockNotifier};
    use uuid::Uuid;

    fn user(email: &str, last_login: Option<DateTime<Utc>>) -> User {
        User {
            id: Uuid::new_v4(),
            username: format!("@{}", email.split('@').next().unwrap_or("user")),
            email: email.into(),
            first_name: "A".into(),
            last_name: "B".into(),
            password_hash: String::new(),
            recently_accessed: RecentJournals::new(),
            last_login,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn reminds_stale_and_never_logged_in_users_only() {
        let now = Utc::now();
        let users = vec![
            user("fresh@example.org", Some(now - Duration::hours(2))),
            user("stale@example.org", Some(now - Duration::hours(30))),
            user("never@example.org", None),
            user("broken@example.org", None),
        ];

        let mut repo = MockJournalRepo::new();
        repo.expect_list_users().returning(move || Ok(users.clone()));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|to, subject, body| to != "fresh@example.org" && subject == REMINDER_SUBJECT && body == REMINDER_BODY)
            .times(3)
            .returning(|to, _, _| {
                if to.starts_with("broken") {
                    Err(anyhow::anyhow!("mailbox unavailable"))
                } else {
                    Ok(())
                }
            });

        let job = ReminderJob::new(Arc::new(repo), Arc::new(notifier));
        let report = job.run(now).await.unwrap();
        assert_eq!(
            report,
            ReminderReport {
                sent: 2,
                failed: 1,
                skipped: 1
            }
        );
    }
}
