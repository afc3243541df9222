use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RecruitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = RecruitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" | "applicant" => Ok(Role::User),
            "admin" | "administrator" => Ok(Role::Admin),
            other => Err(RecruitError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl FromStr for Gender {
    type Err = RecruitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(RecruitError::UnknownGender(other.to_string())),
        }
    }
}

/// Review state of an application. The listed order is only how the board
/// presents it; any status can be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::Reviewed,
        Status::Accepted,
        Status::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Reviewed => "reviewed",
            Status::Accepted => "accepted",
            Status::Rejected => "rejected",
        }
    }

    /// Label used in the spreadsheet export.
    pub fn export_label(&self) -> &'static str {
        match self {
            Status::Pending => "심사대기",
            Status::Reviewed => "검토완료",
            Status::Accepted => "합격",
            Status::Rejected => "불합격",
        }
    }

    /// Label shown on the review board and the applicant dashboard.
    pub fn display_label(&self) -> &'static str {
        match self {
            Status::Pending => "서류 심사중",
            Status::Reviewed => "검토 완료",
            Status::Accepted => "최종 합격",
            Status::Rejected => "불합격",
        }
    }
}

impl FromStr for Status {
    type Err = RecruitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "reviewed" => Ok(Status::Reviewed),
            "accepted" => Ok(Status::Accepted),
            "rejected" => Ok(Status::Rejected),
            other => Err(RecruitError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: i64,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationEntry {
    pub admission_year: String,
    pub graduation_year: String,
    pub school_major: String,
    pub certificates: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperienceEntry {
    pub period: String,
    pub company_dept: String,
    pub duties: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruitApplication {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub gender: Gender,
    pub birth_date: String,
    pub address: String,
    pub detail_address: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub self_intro: String,
    pub desired_field: String,
    pub expected_salary: String,
    pub status: Status,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub content: String,
    pub instructor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub created_at: i64,
}

/// Milliseconds since the Unix epoch, the timestamp unit of every record.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Formats a record timestamp as a local calendar date.
pub fn format_date(millis: i64) -> String {
    use chrono::TimeZone;
    match chrono::Local.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d").to_string(),
        chrono::LocalResult::Ambiguous(dt, _) => dt.format("%Y-%m-%d").to_string(),
        chrono::LocalResult::None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_labels() {
        assert_eq!("Accepted".parse::<Status>().unwrap(), Status::Accepted);
        assert_eq!(" pending ".parse::<Status>().unwrap(), Status::Pending);
        assert!("hired".parse::<Status>().is_err());

        assert_eq!(Status::Pending.export_label(), "심사대기");
        assert_eq!(Status::Reviewed.export_label(), "검토완료");
        assert_eq!(Status::Accepted.export_label(), "합격");
        assert_eq!(Status::Rejected.export_label(), "불합격");
        assert_eq!(Status::Accepted.display_label(), "최종 합격");
    }

    #[test]
    fn test_application_serializes_with_document_field_names() {
        let app = RecruitApplication {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            user_name: "홍길동".to_string(),
            email: "hong@example.com".to_string(),
            gender: Gender::Male,
            birth_date: "1995-05-15".to_string(),
            address: String::new(),
            detail_address: String::new(),
            phone: "010-1234-5678".to_string(),
            photo_url: None,
            education: vec![],
            experience: vec![],
            self_intro: String::new(),
            desired_field: "바리스타".to_string(),
            expected_salary: "3200".to_string(),
            status: Status::Pending,
            created_at: 1,
        };
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["desiredField"], "바리스타");
        assert_eq!(json["status"], "pending");
        assert!(json.get("photoUrl").is_none());
    }

    #[test]
    fn test_role_and_gender_parse() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("applicant".parse::<Role>().unwrap(), Role::User);
        assert_eq!("f".parse::<Gender>().unwrap(), Gender::Female);
        assert!("other".parse::<Gender>().is_err());
    }
}
