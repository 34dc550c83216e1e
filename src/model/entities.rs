use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::levels::{OrgLevel, Proficiency, Requirements, SkillLevels};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Employee => "EMPLOYEE",
        }
    }
}

impl FromStr for Role {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "EMPLOYEE" => Ok(Role::Employee),
            other => Err(StoreError::Invalid(format!("unknown role: {other}"))),
        }
    }
}

/// Account lifecycle: self-registered users start `Pending`, an admin moves
/// them to `Active`; `Rejected` blocks login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Active,
    Pending,
    Rejected,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Pending => "PENDING",
            UserStatus::Rejected => "REJECTED",
        }
    }
}

impl FromStr for UserStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(UserStatus::Active),
            "PENDING" => Ok(UserStatus::Pending),
            "REJECTED" => Ok(UserStatus::Rejected),
            other => Err(StoreError::Invalid(format!("unknown status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_question: Option<String>,
    #[serde(default)]
    pub levels: SkillLevels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProfile {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub description: String,
    pub department_id: String,
    #[serde(default)]
    pub requirements: Requirements,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_level: Option<OrgLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_profile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>, // direct reporting line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Empty reference ids mean "not assigned".
    pub fn clear_blank_refs(&mut self) {
        for field in [
            &mut self.department_id,
            &mut self.job_profile_id,
            &mut self.manager_id,
        ] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssessmentType {
    #[serde(rename = "SELF")]
    SelfReview,
    Peer,
    Manager,
}

impl AssessmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentType::SelfReview => "SELF",
            AssessmentType::Peer => "PEER",
            AssessmentType::Manager => "MANAGER",
        }
    }
}

impl FromStr for AssessmentType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SELF" => Ok(AssessmentType::SelfReview),
            "PEER" => Ok(AssessmentType::Peer),
            "MANAGER" => Ok(AssessmentType::Manager),
            other => Err(StoreError::Invalid(format!("unknown assessment type: {other}"))),
        }
    }
}

impl fmt::Display for AssessmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rating of one user's skill by another (or by themselves).
/// Never updated or deleted once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub rater_id: String,
    pub subject_id: String,
    pub skill_id: String,
    pub score: Proficiency,
    #[serde(default)]
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(rename = "type")]
    pub kind: AssessmentType,
}

/// Assessment as submitted, before the store assigns id and date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssessment {
    pub rater_id: String,
    pub subject_id: String,
    pub skill_id: String,
    pub score: Proficiency,
    pub comment: String,
    pub kind: AssessmentType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub action: String,
    pub target: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_wire_format_is_camel_case() {
        let json = r#"{
            "id":"u9","name":"Nora","email":"nora@example.com",
            "role":"MANAGER","status":"ACTIVE","departmentId":"d2",
            "orgLevel":"DH","jobProfileId":"j1","managerId":"u2"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.org_level, Some(OrgLevel::DepartmentHead));
        assert_eq!(user.manager_id.as_deref(), Some("u2"));
        assert!(user.avatar_url.is_none());

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["jobProfileId"], "j1");
        assert!(value.get("avatarUrl").is_none());
    }

    #[test]
    fn assessment_type_uses_self_peer_manager() {
        let value = serde_json::to_value(AssessmentType::SelfReview).unwrap();
        assert_eq!(value, "SELF");
        assert_eq!("peer".parse::<AssessmentType>().unwrap(), AssessmentType::Peer);
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!("pending".parse::<UserStatus>().unwrap(), UserStatus::Pending);
        assert!("archived".parse::<UserStatus>().is_err());
    }
}
