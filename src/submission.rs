use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::consent;
use crate::db::Database;
use crate::error::RecruitError;
use crate::local::LocalStore;
use crate::models::{
    now_millis, EducationEntry, ExperienceEntry, Gender, RecruitApplication, Status, UserProfile,
};

pub const MAX_EDUCATION: usize = 3;
pub const MAX_EXPERIENCE: usize = 3;

/// Desired fields offered on the application form, grouped by department.
pub const JOB_CATEGORIES: &[(&str, &[&str])] = &[
    ("기술", &["디자인", "F&B(조리)"]),
    (
        "고객서비스",
        &["유기시설 운영", "하강레저시설 운영", "바리스타", "판매서비스", "F&B(서비스)"],
    ),
    ("호텔", &["접객서비스", "객실서비스"]),
    ("선박승무", &["선박 운항 및 기관 담당", "고객안내 및 승무서비스"]),
];

/// What the applicant fills in. Edited as JSON and handed to [`submit`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationDraft {
    pub user_name: String,
    pub email: String,
    pub gender: Gender,
    pub birth_date: String,
    pub address: String,
    pub detail_address: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub self_intro: String,
    pub desired_field: String,
    pub expected_salary: String,
}

impl ApplicationDraft {
    /// An empty form for `profile`, with three blank rows in each history
    /// section.
    pub fn template(profile: &UserProfile) -> Self {
        Self {
            user_name: profile.display_name.clone(),
            email: profile.email.clone(),
            education: vec![EducationEntry::default(); MAX_EDUCATION],
            experience: vec![ExperienceEntry::default(); MAX_EXPERIENCE],
            ..Default::default()
        }
    }

    fn filled_education(&self) -> Vec<EducationEntry> {
        self.education
            .iter()
            .filter(|e| !e.school_major.trim().is_empty())
            .cloned()
            .collect()
    }

    fn filled_experience(&self) -> Vec<ExperienceEntry> {
        self.experience
            .iter()
            .filter(|e| !e.company_dept.trim().is_empty())
            .cloned()
            .collect()
    }
}

pub fn is_known_field(field: &str) -> bool {
    JOB_CATEGORIES
        .iter()
        .any(|(_, options)| options.contains(&field.trim()))
}

/// Checks everything that must hold before a write is attempted.
fn validate(draft: &ApplicationDraft, local: &LocalStore) -> Result<(), RecruitError> {
    if draft.desired_field.trim().is_empty() {
        return Err(RecruitError::MissingDesiredField);
    }
    if !consent::is_agreed(local) {
        return Err(RecruitError::ConsentRequired);
    }
    let education = draft.filled_education().len();
    if education > MAX_EDUCATION {
        return Err(RecruitError::TooManyEntries {
            kind: "education",
            max: MAX_EDUCATION,
            got: education,
        });
    }
    let experience = draft.filled_experience().len();
    if experience > MAX_EXPERIENCE {
        return Err(RecruitError::TooManyEntries {
            kind: "experience",
            max: MAX_EXPERIENCE,
            got: experience,
        });
    }
    Ok(())
}

/// Writes `draft` as a new pending application owned by `profile`. Nothing
/// reaches the store unless a desired field is chosen and consent was given.
/// The consent flag is cleared only after the write succeeds.
pub fn submit(
    db: &Database,
    local: &mut LocalStore,
    profile: &UserProfile,
    draft: &ApplicationDraft,
) -> Result<RecruitApplication> {
    validate(draft, local)?;

    let user_name = if draft.user_name.trim().is_empty() {
        profile.display_name.clone()
    } else {
        draft.user_name.trim().to_string()
    };
    let email = if draft.email.trim().is_empty() {
        profile.email.clone()
    } else {
        draft.email.trim().to_string()
    };

    let app = RecruitApplication {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: profile.uid.clone(),
        user_name,
        email,
        gender: draft.gender,
        birth_date: draft.birth_date.clone(),
        address: draft.address.clone(),
        detail_address: draft.detail_address.clone(),
        phone: draft.phone.clone(),
        photo_url: draft.photo_url.clone().filter(|url| !url.is_empty()),
        education: draft.filled_education(),
        experience: draft.filled_experience(),
        self_intro: draft.self_intro.clone(),
        desired_field: draft.desired_field.trim().to_string(),
        expected_salary: draft.expected_salary.clone(),
        status: Status::Pending,
        created_at: now_millis(),
    };

    if let Err(e) = db.insert_application(&app) {
        error!("Failed to submit application: {:#}", e);
        return Err(e).context("An error occurred while submitting the application");
    }
    consent::clear(local)?;
    info!(id = %app.id, field = %app.desired_field, "application submitted");
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;
    use crate::models::Role;

    fn applicant() -> UserProfile {
        UserProfile {
            uid: "u1".to_string(),
            email: "kim@example.com".to_string(),
            display_name: "Kim".to_string(),
            role: Role::User,
            created_at: 0,
        }
    }

    fn filled_draft() -> ApplicationDraft {
        let mut draft = ApplicationDraft::template(&applicant());
        draft.desired_field = "바리스타".to_string();
        draft.expected_salary = "3200".to_string();
        draft.education[0].school_major = "나미대학교 관광학".to_string();
        draft
    }

    fn local(dir: &tempfile::TempDir) -> LocalStore {
        LocalStore::open(&dir.path().join("local.json")).unwrap()
    }

    #[test]
    fn test_missing_desired_field_writes_nothing() {
        let db = test_db();
        let dir = tempfile::tempdir().unwrap();
        let mut local = local(&dir);
        consent::record_choice(&mut local, true).unwrap();

        let mut draft = filled_draft();
        draft.desired_field = "   ".to_string();
        let err = submit(&db, &mut local, &applicant(), &draft).unwrap_err();

        assert_eq!(err.downcast_ref::<RecruitError>(), Some(&RecruitError::MissingDesiredField));
        assert_eq!(db.count_applications().unwrap(), 0);
        assert!(consent::is_agreed(&local));
    }

    #[test]
    fn test_missing_consent_writes_nothing() {
        let db = test_db();
        let dir = tempfile::tempdir().unwrap();
        let mut local = local(&dir);

        let err = submit(&db, &mut local, &applicant(), &filled_draft()).unwrap_err();
        assert_eq!(err.downcast_ref::<RecruitError>(), Some(&RecruitError::ConsentRequired));

        consent::record_choice(&mut local, false).unwrap();
        let err = submit(&db, &mut local, &applicant(), &filled_draft()).unwrap_err();
        assert_eq!(err.downcast_ref::<RecruitError>(), Some(&RecruitError::ConsentRequired));

        assert_eq!(db.count_applications().unwrap(), 0);
    }

    #[test]
    fn test_successful_submit_is_pending_and_clears_consent() {
        let db = test_db();
        let dir = tempfile::tempdir().unwrap();
        let mut local = local(&dir);
        consent::record_choice(&mut local, true).unwrap();
        consent::remember_applicant_name(&mut local, "Kim").unwrap();

        let before = now_millis();
        let app = submit(&db, &mut local, &applicant(), &filled_draft()).unwrap();

        assert_eq!(app.status, Status::Pending);
        assert_eq!(app.user_id, "u1");
        assert!(app.created_at >= before);
        // Blank history rows are dropped.
        assert_eq!(app.education.len(), 1);
        assert!(app.experience.is_empty());
        assert_eq!(db.get_application(&app.id).unwrap(), Some(app));

        assert!(!consent::is_agreed(&local));
        assert_eq!(local.get(crate::local::KEY_APPLY_NAME), None);
    }

    #[test]
    fn test_more_than_three_entries_rejected() {
        let db = test_db();
        let dir = tempfile::tempdir().unwrap();
        let mut local = local(&dir);
        consent::record_choice(&mut local, true).unwrap();

        let mut draft = filled_draft();
        draft.experience = (0..4)
            .map(|i| ExperienceEntry {
                period: "2020".to_string(),
                company_dept: format!("Company {}", i),
                duties: String::new(),
            })
            .collect();
        let err = submit(&db, &mut local, &applicant(), &draft).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecruitError>(),
            Some(RecruitError::TooManyEntries { kind: "experience", .. })
        ));
        assert_eq!(db.count_applications().unwrap(), 0);
    }

    #[test]
    fn test_blank_name_and_email_fall_back_to_profile() {
        let db = test_db();
        let dir = tempfile::tempdir().unwrap();
        let mut local = local(&dir);
        consent::record_choice(&mut local, true).unwrap();

        let mut draft = filled_draft();
        draft.user_name.clear();
        draft.email.clear();
        draft.photo_url = Some(String::new());
        let app = submit(&db, &mut local, &applicant(), &draft).unwrap();
        assert_eq!(app.user_name, "Kim");
        assert_eq!(app.email, "kim@example.com");
        assert_eq!(app.photo_url, None);
    }

    #[test]
    fn test_draft_json_uses_form_field_names() {
        let draft: ApplicationDraft = serde_json::from_str(
            r#"{"userName":"Lee","desiredField":"바리스타","gender":"female",
                "education":[{"schoolMajor":"Hotel Mgmt"}]}"#,
        )
        .unwrap();
        assert_eq!(draft.user_name, "Lee");
        assert_eq!(draft.gender, Gender::Female);
        assert_eq!(draft.education[0].school_major, "Hotel Mgmt");
        assert!(is_known_field(&draft.desired_field));
        assert!(!is_known_field("Astronaut"));
    }
}
