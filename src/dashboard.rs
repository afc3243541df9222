use anyhow::Result;

use crate::db::Database;
use crate::models::{format_date, RecruitApplication, UserProfile};
use crate::review::StatusCounts;

/// One applicant's own applications, newest first.
pub struct ApplicantDashboard {
    applications: Vec<RecruitApplication>,
}

impl ApplicantDashboard {
    /// Fetches only records whose `user_id` equals the profile's uid.
    pub fn load(db: &Database, profile: &UserProfile) -> Result<Self> {
        let mut applications = db.list_applications_for_user(&profile.uid)?;
        applications.retain(|a| a.user_id == profile.uid);
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Self { applications })
    }

    pub fn applications(&self) -> &[RecruitApplication] {
        &self.applications
    }

    pub fn summary(&self) -> StatusCounts {
        StatusCounts::tally(&self.applications)
    }

    /// Printable status card for each application.
    pub fn cards(&self) -> Vec<String> {
        self.applications.iter().map(status_card).collect()
    }
}

fn status_card(app: &RecruitApplication) -> String {
    format!(
        "[{}] {}\n  {} 제출 · 희망급여: {}만원\n  {}",
        app.status.as_str().to_uppercase(),
        app.desired_field,
        format_date(app.created_at),
        if app.expected_salary.is_empty() { "-" } else { app.expected_salary.as_str() },
        app.status.display_label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{sample_application, test_db};
    use crate::models::{Role, Status};

    fn profile(uid: &str) -> UserProfile {
        UserProfile {
            uid: uid.to_string(),
            email: format!("{}@example.com", uid),
            display_name: uid.to_string(),
            role: Role::User,
            created_at: 0,
        }
    }

    #[test]
    fn test_shows_only_own_records_newest_first() {
        let db = test_db();
        db.insert_application(&sample_application("a1", "me", "Me", 10)).unwrap();
        db.insert_application(&sample_application("a2", "other", "Other", 20)).unwrap();
        db.insert_application(&sample_application("a3", "me", "Me", 30)).unwrap();
        db.insert_application(&sample_application("a4", "me2", "Me2", 40)).unwrap();

        let dash = ApplicantDashboard::load(&db, &profile("me")).unwrap();
        let ids: Vec<&str> = dash.applications().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a3", "a1"]);
        assert!(dash.applications().iter().all(|a| a.user_id == "me"));

        let other = ApplicantDashboard::load(&db, &profile("other")).unwrap();
        assert_eq!(other.applications().len(), 1);
        assert_eq!(other.applications()[0].id, "a2");
    }

    #[test]
    fn test_summary_counts() {
        let db = test_db();
        let mut accepted = sample_application("a1", "me", "Me", 1);
        accepted.status = Status::Accepted;
        db.insert_application(&accepted).unwrap();
        db.insert_application(&sample_application("a2", "me", "Me", 2)).unwrap();
        let mut rejected = sample_application("a3", "me", "Me", 3);
        rejected.status = Status::Rejected;
        db.insert_application(&rejected).unwrap();

        let dash = ApplicantDashboard::load(&db, &profile("me")).unwrap();
        let summary = dash.summary();
        assert_eq!((summary.total, summary.pending, summary.accepted), (3, 1, 1));

        let cards = dash.cards();
        assert!(cards[0].starts_with("[REJECTED] 바리스타"));
        assert!(cards[2].contains("최종 합격"));
        assert!(cards[1].contains("희망급여: 3000만원"));
    }

    #[test]
    fn test_no_applications() {
        let db = test_db();
        let dash = ApplicantDashboard::load(&db, &profile("nobody")).unwrap();
        assert!(dash.applications().is_empty());
        assert_eq!(dash.summary(), StatusCounts::default());
    }
}
