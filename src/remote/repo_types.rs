use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use tracing::warn;

use crate::model::{
    ActivityLog, Assessment, AssessmentType, Department, JobProfile, OrgLevel, Proficiency, Role,
    Skill, User, UserStatus,
};

/// Row in `user_profiles`.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: Option<String>, // may be lower case in older rows
    pub department_id: Option<String>,
    pub job_profile_id: Option<String>,
    pub manager_id: Option<String>,
    pub org_level: Option<String>,
    pub avatar_url: Option<String>,
}

/// Row in `job_profiles`; requirements are JSONB keyed by org level.
#[derive(Debug, Clone, FromRow)]
pub struct JobProfileRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub department_id: String,
    pub requirements: Json<serde_json::Value>,
}

/// Row in `skills`; levels are JSONB keyed by proficiency.
#[derive(Debug, Clone, FromRow)]
pub struct SkillRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub assessment_question: Option<String>,
    pub levels: Json<serde_json::Value>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DepartmentRow {
    pub id: String,
    pub name: String,
    pub manager_id: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AssessmentRow {
    pub id: String,
    pub rater_id: String,
    pub subject_id: String,
    pub skill_id: String,
    pub score: i16,
    pub comment: String,
    pub date: OffsetDateTime,
    #[sqlx(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct LogRow {
    pub id: String,
    pub action: String,
    pub target: String,
    pub timestamp: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let status = match r.status.as_deref() {
            Some(s) if !s.trim().is_empty() => s.parse::<UserStatus>()?,
            _ => UserStatus::Active,
        };
        let mut user = User {
            role: r.role.parse::<Role>()?,
            org_level: r.org_level.as_deref().map(str::parse::<OrgLevel>).transpose()?,
            id: r.id,
            name: r.name,
            email: r.email,
            status,
            department_id: r.department_id,
            job_profile_id: r.job_profile_id,
            manager_id: r.manager_id,
            avatar_url: r.avatar_url,
        };
        user.clear_blank_refs();
        Ok(user)
    }
}

impl TryFrom<JobProfileRow> for JobProfile {
    type Error = anyhow::Error;

    fn try_from(r: JobProfileRow) -> Result<Self, Self::Error> {
        Ok(JobProfile {
            requirements: serde_json::from_value(r.requirements.0)?,
            id: r.id,
            title: r.title,
            description: r.description,
            department_id: r.department_id,
        })
    }
}

impl TryFrom<SkillRow> for Skill {
    type Error = anyhow::Error;

    fn try_from(r: SkillRow) -> Result<Self, Self::Error> {
        Ok(Skill {
            levels: serde_json::from_value(r.levels.0)?,
            id: r.id,
            name: r.name,
            category: r.category,
            assessment_question: r.assessment_question,
        })
    }
}

impl From<DepartmentRow> for Department {
    fn from(r: DepartmentRow) -> Self {
        Department {
            id: r.id,
            name: r.name,
            manager_id: r.manager_id,
        }
    }
}

impl TryFrom<AssessmentRow> for Assessment {
    type Error = anyhow::Error;

    fn try_from(r: AssessmentRow) -> Result<Self, Self::Error> {
        let score = u8::try_from(r.score)?;
        Ok(Assessment {
            score: Proficiency::new(score)?,
            kind: r.kind.parse::<AssessmentType>()?,
            id: r.id,
            rater_id: r.rater_id,
            subject_id: r.subject_id,
            skill_id: r.skill_id,
            comment: r.comment,
            date: r.date,
        })
    }
}

impl From<LogRow> for ActivityLog {
    fn from(r: LogRow) -> Self {
        ActivityLog {
            id: r.id,
            action: r.action,
            target: r.target,
            timestamp: r.timestamp,
        }
    }
}

/// Converts rows, dropping (and logging) the ones that do not map onto the
/// domain model instead of failing the whole load.
pub fn convert_rows<R, T>(table: &str, rows: Vec<R>) -> Vec<T>
where
    R: TryInto<T, Error = anyhow::Error>,
{
    rows.into_iter()
        .filter_map(|row| match row.try_into() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(table, error = %e, "skipping malformed row");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_row(status: Option<&str>) -> UserRow {
        UserRow {
            id: "u1".into(),
            name: "Lina".into(),
            email: "lina@example.com".into(),
            role: "employee".into(),
            status: status.map(Into::into),
            department_id: Some(String::new()),
            job_profile_id: None,
            manager_id: Some("u2".into()),
            org_level: Some("FP".into()),
            avatar_url: None,
        }
    }

    #[test]
    fn user_status_is_normalized_and_defaults_to_active() {
        let pending: User = user_row(Some("pending")).try_into().unwrap();
        assert_eq!(pending.status, UserStatus::Pending);
        assert_eq!(pending.role, Role::Employee);
        assert_eq!(pending.org_level, Some(OrgLevel::FirstPosition));
        assert!(pending.department_id.is_none());

        let unset: User = user_row(None).try_into().unwrap();
        assert_eq!(unset.status, UserStatus::Active);
    }

    #[test]
    fn blank_references_are_unassigned() {
        let mut row = user_row(None);
        row.manager_id = Some(String::new());
        row.job_profile_id = Some("  ".into());
        let user: User = row.try_into().unwrap();
        assert!(user.manager_id.is_none());
        assert!(user.job_profile_id.is_none());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let mut bad = user_row(Some("ACTIVE"));
        bad.role = "overlord".into();
        let users: Vec<User> = convert_rows("user_profiles", vec![bad, user_row(None)]);
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn job_profile_with_bad_requirements_is_rejected() {
        let row = JobProfileRow {
            id: "j1".into(),
            title: "Track".into(),
            description: String::new(),
            department_id: "d1".into(),
            requirements: Json(serde_json::json!({"XX": []})),
        };
        assert!(JobProfile::try_from(row).is_err());
    }

    #[test]
    fn assessment_score_out_of_scale_is_rejected() {
        let row = AssessmentRow {
            id: "a1".into(),
            rater_id: "u1".into(),
            subject_id: "u1".into(),
            skill_id: "s1".into(),
            score: 9,
            comment: String::new(),
            date: OffsetDateTime::UNIX_EPOCH,
            kind: "SELF".into(),
        };
        assert!(Assessment::try_from(row).is_err());
    }
}
