use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{ActivityLog, Assessment, Department, JobProfile, Skill, User};

mod pg;
mod repo_types;

pub use pg::PgRemote;

/// Entity collections mirrored to the remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    JobProfiles,
    Skills,
    Departments,
    Assessments,
    Logs,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Users => "user_profiles",
            Collection::JobProfiles => "job_profiles",
            Collection::Skills => "skills",
            Collection::Departments => "departments",
            Collection::Assessments => "assessments",
            Collection::Logs => "system_logs",
        }
    }
}

/// One entity to write to the remote, tagged with its collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    User(User),
    JobProfile(JobProfile),
    Skill(Skill),
    Department(Department),
    Assessment(Assessment),
    Log(ActivityLog),
}

impl Record {
    pub fn collection(&self) -> Collection {
        match self {
            Record::User(_) => Collection::Users,
            Record::JobProfile(_) => Collection::JobProfiles,
            Record::Skill(_) => Collection::Skills,
            Record::Department(_) => Collection::Departments,
            Record::Assessment(_) => Collection::Assessments,
            Record::Log(_) => Collection::Logs,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Record::User(u) => &u.id,
            Record::JobProfile(j) => &j.id,
            Record::Skill(s) => &s.id,
            Record::Department(d) => &d.id,
            Record::Assessment(a) => &a.id,
            Record::Log(l) => &l.id,
        }
    }
}

/// Everything the store holds, as loaded in bulk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub job_profiles: Vec<JobProfile>,
    pub skills: Vec<Skill>,
    pub departments: Vec<Department>,
    pub assessments: Vec<Assessment>,
    pub logs: Vec<ActivityLog>,
}

/// An authenticated session held by the remote auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSession {
    pub id: Uuid,
    pub user_id: String,
}

#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn load(&self) -> anyhow::Result<Snapshot>;
    async fn upsert(&self, record: &Record) -> anyhow::Result<()>;
    async fn delete(&self, collection: Collection, id: &str) -> anyhow::Result<()>;

    /// Creates a credential account and returns its user id.
    async fn sign_up(&self, email: &str, password: &str) -> anyhow::Result<String>;
    /// Opens a session, or `None` when the credentials do not match.
    async fn sign_in(&self, email: &str, password: &str)
        -> anyhow::Result<Option<RemoteSession>>;
    async fn sign_out(&self, session_id: Uuid) -> anyhow::Result<()>;
}
