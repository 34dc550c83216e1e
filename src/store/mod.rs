//! Single source of truth for all entities.
//!
//! Reads are synchronous snapshots. Writes land in memory first, are
//! announced to subscribers, recorded in the activity log and then handed to
//! the write-behind [`Mirror`] when a remote backend is attached. The remote
//! is a best-effort copy: a failed remote write never undoes a local change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockWriteGuard};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, DataSource};
use crate::error::StoreError;
use crate::gaps::CompetencyCatalog;
use crate::model::{
    ActivityLog, Assessment, Department, JobProfile, NewAssessment, Skill, User,
};
use crate::remote::{Collection, PgRemote, Record, RemoteBackend, Snapshot};

mod accounts;
pub mod sample;
mod writer;

use writer::Mirror;

const EVENT_CAPACITY: usize = 64;
const RELOAD_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
}

/// Change notification emitted after every local mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Changed {
        collection: Collection,
        id: String,
        kind: ChangeKind,
    },
    /// All collections were replaced by a fresh remote load.
    Reloaded,
}

/// Optional filters for [`DataStore::assessments`]; unset fields match all.
#[derive(Debug, Clone, Default)]
pub struct AssessmentFilter {
    pub rater_id: Option<String>,
    pub subject_id: Option<String>,
}

pub struct DataStore {
    data: RwLock<Snapshot>,
    /// Bumped before every local write; lets `reload` detect writes that
    /// landed while the remote load was in flight.
    writes: AtomicU64,
    /// Password hashes of users registered locally, keyed by user id.
    credentials: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StoreEvent>,
    remote: Option<Arc<dyn RemoteBackend>>,
    mirror: Option<Mirror>,
    log_retention: usize,
}

trait Entity {
    fn id(&self) -> &str;
}

macro_rules! impl_entity {
    ($($t:ty),*) => {
        $(impl Entity for $t {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

impl_entity!(User, JobProfile, Skill, Department);

fn insert<T: Entity>(items: &mut Vec<T>, item: T, what: &str) -> Result<(), StoreError> {
    if items.iter().any(|x| x.id() == item.id()) {
        return Err(StoreError::Conflict(format!("{what} {} already exists", item.id())));
    }
    items.push(item);
    Ok(())
}

fn replace<T: Entity>(items: &mut [T], item: T, what: &str) -> Result<(), StoreError> {
    let slot = items
        .iter_mut()
        .find(|x| x.id() == item.id())
        .ok_or_else(|| StoreError::NotFound(format!("{what} {}", item.id())))?;
    *slot = item;
    Ok(())
}

fn take<T: Entity>(items: &mut Vec<T>, id: &str, what: &str) -> Result<T, StoreError> {
    let idx = items
        .iter()
        .position(|x| x.id() == id)
        .ok_or_else(|| StoreError::NotFound(format!("{what} {id}")))?;
    Ok(items.remove(idx))
}

fn ensure_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = new_id();
    }
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Mean rounded half-up, computed exactly on integers; 0 for no samples.
fn rounded_mean(sum: u32, count: u32) -> u8 {
    if count == 0 {
        return 0;
    }
    u8::try_from((2 * sum + count) / (2 * count)).unwrap_or(u8::MAX)
}

impl DataStore {
    fn from_snapshot(
        snapshot: Snapshot,
        remote: Option<Arc<dyn RemoteBackend>>,
        log_retention: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mirror = remote.clone().map(Mirror::spawn);
        Self {
            data: RwLock::new(snapshot),
            writes: AtomicU64::new(0),
            credentials: RwLock::new(HashMap::new()),
            events,
            remote,
            mirror,
            log_retention,
        }
    }

    /// Store over the bundled sample dataset, with no remote.
    pub fn sample(log_retention: usize) -> Self {
        Self::from_snapshot(sample::snapshot(), None, log_retention)
    }

    /// Store over `snapshot`, mirroring writes to `remote`. Spawns the
    /// write-behind worker, so it needs a tokio runtime.
    pub fn with_remote(
        snapshot: Snapshot,
        remote: Arc<dyn RemoteBackend>,
        log_retention: usize,
    ) -> Self {
        Self::from_snapshot(snapshot, Some(remote), log_retention)
    }

    /// Builds the store the configuration asks for. Never fails: any problem
    /// reaching the remote degrades to the sample dataset.
    pub async fn initialize(config: &AppConfig) -> Self {
        let retention = config.activity_log_retention;
        info!(source = ?config.data_source, "initializing data store");

        if config.data_source == DataSource::Sample {
            return Self::sample(retention);
        }
        let Some(url) = config.usable_database_url() else {
            warn!("remote credentials not set; falling back to sample data");
            return Self::sample(retention);
        };

        let remote = match PgRemote::connect(url).await {
            Ok(r) => Arc::new(r) as Arc<dyn RemoteBackend>,
            Err(e) => {
                warn!(error = %e, "remote connection failed; falling back to sample data");
                return Self::sample(retention);
            }
        };
        match remote.load().await {
            Ok(snapshot) => Self::with_remote(snapshot, remote, retention),
            Err(e) => {
                warn!(error = %e, "remote load failed; falling back to sample data");
                Self::sample(retention)
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Waits until every remote write queued so far was attempted.
    pub async fn flush(&self) {
        if let Some(mirror) = &self.mirror {
            mirror.flush().await;
        }
    }

    /// Replaces local state with a fresh remote load.
    ///
    /// A local write that lands while the load is in flight would be lost by
    /// the swap, so the load is redone (after flushing that write) until it
    /// completes undisturbed. After `RELOAD_ATTEMPTS` tries local state is
    /// left untouched and an error is returned.
    pub async fn reload(&self) -> anyhow::Result<()> {
        let Some(remote) = &self.remote else {
            return Ok(());
        };
        for attempt in 1..=RELOAD_ATTEMPTS {
            let generation = self.writes.load(Ordering::Acquire);
            self.flush().await;
            let snapshot = remote.load().await?;
            {
                let mut data = self.data.write();
                if self.writes.load(Ordering::Acquire) == generation {
                    *data = snapshot;
                    drop(data);
                    self.emit(StoreEvent::Reloaded);
                    return Ok(());
                }
            }
            debug!(attempt, "local write raced the reload; loading again");
        }
        anyhow::bail!("local writes kept racing the reload; local state kept")
    }

    /// Write access for local mutations. Bumps the write generation first,
    /// so a concurrent `reload` either sees the bump or runs before the write.
    /// Queuing a mirror write bumps it again, since the queue may be fed after
    /// the reload's flush.
    fn write_data(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.writes.fetch_add(1, Ordering::AcqRel);
        self.data.write()
    }

    fn emit(&self, event: StoreEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn changed(&self, collection: Collection, id: &str, kind: ChangeKind) {
        self.emit(StoreEvent::Changed {
            collection,
            id: id.to_string(),
            kind,
        });
    }

    fn mirror_upsert(&self, record: Record) {
        if let Some(mirror) = &self.mirror {
            self.writes.fetch_add(1, Ordering::AcqRel);
            mirror.upsert(record);
        }
    }

    fn mirror_delete(&self, collection: Collection, id: &str) {
        if let Some(mirror) = &self.mirror {
            self.writes.fetch_add(1, Ordering::AcqRel);
            mirror.delete(collection, id.to_string());
        }
    }

    // --- getters ---

    pub fn all_users(&self) -> Vec<User> {
        self.data.read().users.clone()
    }

    pub fn all_job_profiles(&self) -> Vec<JobProfile> {
        self.data.read().job_profiles.clone()
    }

    pub fn all_skills(&self) -> Vec<Skill> {
        self.data.read().skills.clone()
    }

    pub fn all_departments(&self) -> Vec<Department> {
        self.data.read().departments.clone()
    }

    /// Activity log, newest first.
    pub fn system_logs(&self) -> Vec<ActivityLog> {
        self.data.read().logs.clone()
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.data.read().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        let email = email.trim();
        self.data
            .read()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    pub fn job_profile(&self, id: &str) -> Option<JobProfile> {
        self.data.read().job_profiles.iter().find(|j| j.id == id).cloned()
    }

    pub fn skill(&self, id: &str) -> Option<Skill> {
        self.data.read().skills.iter().find(|s| s.id == id).cloned()
    }

    pub fn department(&self, id: &str) -> Option<Department> {
        self.data.read().departments.iter().find(|d| d.id == id).cloned()
    }

    pub fn subordinates(&self, manager_id: &str) -> Vec<User> {
        self.data
            .read()
            .users
            .iter()
            .filter(|u| u.manager_id.as_deref() == Some(manager_id))
            .cloned()
            .collect()
    }

    /// Users sharing `user_id`'s manager; without a manager, users in the
    /// same department at the same hierarchy level. Never includes the user.
    pub fn peers(&self, user_id: &str) -> Vec<User> {
        let data = self.data.read();
        let Some(user) = data.users.iter().find(|u| u.id == user_id) else {
            return Vec::new();
        };

        let is_peer = |u: &&User| -> bool {
            if u.id == user_id {
                return false;
            }
            match user.manager_id.as_deref() {
                Some(manager) if !manager.is_empty() => u.manager_id.as_deref() == Some(manager),
                _ => u.department_id == user.department_id && u.org_level == user.org_level,
            }
        };
        data.users.iter().filter(is_peer).cloned().collect()
    }

    /// Current competency: mean of all scores the user received on the
    /// skill, rounded half-up; 0 without assessments.
    pub fn user_skill_score(&self, user_id: &str, skill_id: &str) -> u8 {
        let (sum, count) = self
            .data
            .read()
            .assessments
            .iter()
            .filter(|a| a.subject_id == user_id && a.skill_id == skill_id)
            .fold((0u32, 0u32), |(sum, count), a| {
                (sum + u32::from(a.score.get()), count + 1)
            });
        rounded_mean(sum, count)
    }

    /// Assessments matching every set filter, newest first.
    pub fn assessments(&self, filter: &AssessmentFilter) -> Vec<Assessment> {
        let mut found: Vec<Assessment> = self
            .data
            .read()
            .assessments
            .iter()
            .filter(|a| filter.rater_id.as_ref().map_or(true, |r| &a.rater_id == r))
            .filter(|a| filter.subject_id.as_ref().map_or(true, |s| &a.subject_id == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.date.cmp(&a.date));
        found
    }

    // --- activity log ---

    pub fn log_activity(&self, action: &str, target: &str) -> ActivityLog {
        let entry = ActivityLog {
            id: new_id(),
            action: action.to_string(),
            target: target.to_string(),
            timestamp: OffsetDateTime::now_utc(),
        };
        {
            let mut data = self.write_data();
            data.logs.insert(0, entry.clone());
            data.logs.truncate(self.log_retention);
        }
        self.changed(Collection::Logs, &entry.id, ChangeKind::Added);
        self.mirror_upsert(Record::Log(entry.clone()));
        entry
    }

    // --- users ---

    fn check_email_free(users: &[User], email: &str, except_id: &str) -> Result<(), StoreError> {
        if users
            .iter()
            .any(|u| u.id != except_id && u.email.eq_ignore_ascii_case(email.trim()))
        {
            return Err(StoreError::Conflict(format!("email {email} is already in use")));
        }
        Ok(())
    }

    pub fn add_user(&self, mut user: User) -> Result<User, StoreError> {
        ensure_id(&mut user.id);
        user.clear_blank_refs();
        {
            let mut data = self.write_data();
            Self::check_email_free(&data.users, &user.email, &user.id)?;
            insert(&mut data.users, user.clone(), "user")?;
        }
        self.changed(Collection::Users, &user.id, ChangeKind::Added);
        self.mirror_upsert(Record::User(user.clone()));
        self.log_activity("Onboarded Employee", &user.name);
        Ok(user)
    }

    pub fn update_user(&self, mut user: User) -> Result<User, StoreError> {
        user.clear_blank_refs();
        {
            let mut data = self.write_data();
            Self::check_email_free(&data.users, &user.email, &user.id)?;
            replace(&mut data.users, user.clone(), "user")?;
        }
        self.changed(Collection::Users, &user.id, ChangeKind::Updated);
        self.mirror_upsert(Record::User(user.clone()));
        self.log_activity("Updated Profile", &user.name);
        Ok(user)
    }

    pub fn remove_user(&self, id: &str) -> Result<User, StoreError> {
        let user = take(&mut self.write_data().users, id, "user")?;
        self.credentials.write().remove(id);
        self.changed(Collection::Users, id, ChangeKind::Removed);
        self.mirror_delete(Collection::Users, id);
        self.log_activity("Removed Employee", &user.name);
        Ok(user)
    }

    // --- job profiles ---

    /// Dangling skill references are tolerated; the gap report shows them
    /// without a name.
    fn warn_unknown_skills(&self, job: &JobProfile) {
        let data = self.data.read();
        for level in job.requirements.levels() {
            for req in job.requirements.for_level(level) {
                if !data.skills.iter().any(|s| s.id == req.skill_id) {
                    warn!(
                        job_id = %job.id,
                        level = level.code(),
                        skill_id = %req.skill_id,
                        "requirement references unknown skill"
                    );
                }
            }
        }
    }

    pub fn add_job_profile(&self, mut job: JobProfile) -> Result<JobProfile, StoreError> {
        ensure_id(&mut job.id);
        self.warn_unknown_skills(&job);
        insert(&mut self.write_data().job_profiles, job.clone(), "job profile")?;
        self.changed(Collection::JobProfiles, &job.id, ChangeKind::Added);
        self.mirror_upsert(Record::JobProfile(job.clone()));
        self.log_activity("Created Job Profile", &job.title);
        Ok(job)
    }

    pub fn update_job_profile(&self, job: JobProfile) -> Result<JobProfile, StoreError> {
        self.warn_unknown_skills(&job);
        replace(&mut self.write_data().job_profiles, job.clone(), "job profile")?;
        self.changed(Collection::JobProfiles, &job.id, ChangeKind::Updated);
        self.mirror_upsert(Record::JobProfile(job.clone()));
        self.log_activity("Modified Job Profile", &job.title);
        Ok(job)
    }

    pub fn remove_job_profile(&self, id: &str) -> Result<JobProfile, StoreError> {
        let job = take(&mut self.write_data().job_profiles, id, "job profile")?;
        self.changed(Collection::JobProfiles, id, ChangeKind::Removed);
        self.mirror_delete(Collection::JobProfiles, id);
        self.log_activity("Removed Job Profile", &job.title);
        Ok(job)
    }

    // --- skills ---

    fn warn_incomplete_levels(skill: &Skill) {
        if !skill.levels.is_complete() {
            let defined: Vec<u8> = skill.levels.iter().map(|l| l.level.get()).collect();
            warn!(skill_id = %skill.id, ?defined, "skill does not describe all five levels");
        }
    }

    pub fn add_skill(&self, mut skill: Skill) -> Result<Skill, StoreError> {
        ensure_id(&mut skill.id);
        Self::warn_incomplete_levels(&skill);
        insert(&mut self.write_data().skills, skill.clone(), "skill")?;
        self.changed(Collection::Skills, &skill.id, ChangeKind::Added);
        self.mirror_upsert(Record::Skill(skill.clone()));
        self.log_activity("Defined New Skill", &skill.name);
        Ok(skill)
    }

    pub fn update_skill(&self, skill: Skill) -> Result<Skill, StoreError> {
        Self::warn_incomplete_levels(&skill);
        replace(&mut self.write_data().skills, skill.clone(), "skill")?;
        self.changed(Collection::Skills, &skill.id, ChangeKind::Updated);
        self.mirror_upsert(Record::Skill(skill.clone()));
        self.log_activity("Updated Skill Standard", &skill.name);
        Ok(skill)
    }

    pub fn remove_skill(&self, id: &str) -> Result<Skill, StoreError> {
        let skill = take(&mut self.write_data().skills, id, "skill")?;
        self.changed(Collection::Skills, id, ChangeKind::Removed);
        self.mirror_delete(Collection::Skills, id);
        self.log_activity("Removed Skill", &skill.name);
        Ok(skill)
    }

    // --- departments ---

    pub fn add_department(&self, mut dept: Department) -> Result<Department, StoreError> {
        ensure_id(&mut dept.id);
        insert(&mut self.write_data().departments, dept.clone(), "department")?;
        self.changed(Collection::Departments, &dept.id, ChangeKind::Added);
        self.mirror_upsert(Record::Department(dept.clone()));
        self.log_activity("Created Department", &dept.name);
        Ok(dept)
    }

    pub fn update_department(&self, dept: Department) -> Result<Department, StoreError> {
        replace(&mut self.write_data().departments, dept.clone(), "department")?;
        self.changed(Collection::Departments, &dept.id, ChangeKind::Updated);
        self.mirror_upsert(Record::Department(dept.clone()));
        self.log_activity("Updated Department", &dept.name);
        Ok(dept)
    }

    pub fn remove_department(&self, id: &str) -> Result<Department, StoreError> {
        let dept = take(&mut self.write_data().departments, id, "department")?;
        self.changed(Collection::Departments, id, ChangeKind::Removed);
        self.mirror_delete(Collection::Departments, id);
        self.log_activity("Removed Department", &dept.name);
        Ok(dept)
    }

    // --- assessments ---

    /// Records an assessment with a fresh id and the current time.
    pub fn add_assessment(&self, new: NewAssessment) -> Assessment {
        let assessment = Assessment {
            id: new_id(),
            rater_id: new.rater_id,
            subject_id: new.subject_id,
            skill_id: new.skill_id,
            score: new.score,
            comment: new.comment,
            date: OffsetDateTime::now_utc(),
            kind: new.kind,
        };
        let subject = {
            let mut data = self.write_data();
            data.assessments.push(assessment.clone());
            data.users
                .iter()
                .find(|u| u.id == assessment.subject_id)
                .map(|u| u.name.clone())
        };
        self.changed(Collection::Assessments, &assessment.id, ChangeKind::Added);
        self.mirror_upsert(Record::Assessment(assessment.clone()));
        let subject = subject.unwrap_or_else(|| "Employee".to_string());
        self.log_activity("Submitted Assessment", &format!("For {subject}"));
        assessment
    }
}

impl CompetencyCatalog for DataStore {
    fn job_profile(&self, id: &str) -> Option<JobProfile> {
        DataStore::job_profile(self, id)
    }

    fn skill(&self, id: &str) -> Option<Skill> {
        DataStore::skill(self, id)
    }

    fn skill_score(&self, user_id: &str, skill_id: &str) -> u8 {
        self.user_skill_score(user_id, skill_id)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::model::{AssessmentType, OrgLevel, Proficiency, Role, UserStatus};
    use crate::remote::fake::{Call, RecordingRemote};

    fn store() -> DataStore {
        DataStore::sample(50)
    }

    fn employee(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            name: format!("Employee {id}"),
            email: email.into(),
            role: Role::Employee,
            status: UserStatus::Active,
            department_id: Some("d2".into()),
            org_level: Some(OrgLevel::Fresh),
            job_profile_id: Some("j1".into()),
            manager_id: None,
            avatar_url: None,
        }
    }

    fn rate(store: &DataStore, subject: &str, skill: &str, score: u8) {
        store.add_assessment(NewAssessment {
            rater_id: "u1".into(),
            subject_id: subject.into(),
            skill_id: skill.into(),
            score: Proficiency::new(score).unwrap(),
            comment: String::new(),
            kind: AssessmentType::Peer,
        });
    }

    #[test]
    fn score_is_zero_without_assessments() {
        let store = store();
        assert_eq!(store.user_skill_score("u4", "s1"), 0);
        assert_eq!(store.user_skill_score("nobody", "s2"), 0);
    }

    #[test]
    fn score_is_mean_rounded_half_up() {
        let store = store();
        // sample data: u3 has 2 and 3 on s1
        assert_eq!(store.user_skill_score("u3", "s1"), 3);
        assert_eq!(store.user_skill_score("u3", "s2"), 3);

        rate(&store, "u4", "s3", 1);
        rate(&store, "u4", "s3", 2);
        rate(&store, "u4", "s3", 2);
        // 5 / 3 = 1.67
        assert_eq!(store.user_skill_score("u4", "s3"), 2);

        rate(&store, "u4", "s2", 4);
        rate(&store, "u4", "s2", 4);
        rate(&store, "u4", "s2", 5);
        rate(&store, "u4", "s2", 4);
        // 17 / 4 = 4.25
        assert_eq!(store.user_skill_score("u4", "s2"), 4);
    }

    #[test]
    fn rounded_mean_tie_breaks_upwards() {
        assert_eq!(rounded_mean(0, 0), 0);
        assert_eq!(rounded_mean(5, 2), 3);
        assert_eq!(rounded_mean(7, 2), 4);
        assert_eq!(rounded_mean(9, 2), 5);
    }

    #[test]
    fn peers_follow_the_shared_manager() {
        let store = store();
        let peers: Vec<_> = store.peers("u3").into_iter().map(|u| u.id).collect();
        assert_eq!(peers, ["u4"]);
        assert!(store.peers("u4").iter().all(|u| u.id != "u4"));
    }

    #[test]
    fn peers_without_manager_use_department_and_level() {
        let store = store();
        store.add_user(employee("x1", "x1@example.com")).unwrap();
        store.add_user(employee("x2", "x2@example.com")).unwrap();
        let mut other_level = employee("x3", "x3@example.com");
        other_level.org_level = Some(OrgLevel::FirstPosition);
        store.add_user(other_level).unwrap();
        let mut other_dept = employee("x4", "x4@example.com");
        other_dept.department_id = Some("d1".into());
        store.add_user(other_dept).unwrap();

        let peers: Vec<_> = store.peers("x1").into_iter().map(|u| u.id).collect();
        assert_eq!(peers, ["x2"]);
    }

    #[test]
    fn peers_of_unknown_user_are_empty() {
        assert!(store().peers("ghost").is_empty());
    }

    #[test]
    fn blank_manager_counts_as_no_manager() {
        let mut p1 = employee("p1", "p1@example.com");
        p1.department_id = Some("d9".into());
        p1.manager_id = Some(String::new());
        let mut p2 = employee("p2", "p2@example.com");
        p2.department_id = Some("d9".into());
        let snapshot = Snapshot {
            users: vec![p1, p2],
            ..Default::default()
        };
        let store = DataStore::from_snapshot(snapshot, None, 50);

        let peers: Vec<_> = store.peers("p1").into_iter().map(|u| u.id).collect();
        assert_eq!(peers, ["p2"]);
    }

    #[test]
    fn blank_references_are_cleared_on_write() {
        let store = store();
        let mut user = employee("x1", "x1@example.com");
        user.manager_id = Some("".into());
        user.job_profile_id = Some(" ".into());
        let added = store.add_user(user).unwrap();
        assert!(added.manager_id.is_none() && added.job_profile_id.is_none());

        let mut user = added;
        user.department_id = Some(String::new());
        store.update_user(user).unwrap();
        assert!(store.user("x1").unwrap().department_id.is_none());
    }

    #[test]
    fn subordinates_match_manager_reference() {
        let ids: Vec<_> = store().subordinates("u2").into_iter().map(|u| u.id).collect();
        assert_eq!(ids, ["u3", "u4"]);
    }

    #[test]
    fn assessments_filter_and_sort_newest_first() {
        let store = store();
        let by_subject = store.assessments(&AssessmentFilter {
            subject_id: Some("u3".into()),
            ..Default::default()
        });
        assert_eq!(by_subject.len(), 3);
        assert_eq!(by_subject[0].id, "a2");

        let both = store.assessments(&AssessmentFilter {
            rater_id: Some("u3".into()),
            subject_id: Some("u3".into()),
        });
        assert_eq!(both.len(), 2);
        assert!(both.iter().all(|a| a.rater_id == "u3"));

        rate(&store, "u3", "s3", 4);
        let all = store.assessments(&AssessmentFilter::default());
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].skill_id, "s3");
    }

    #[test]
    fn added_entities_read_back_unchanged() {
        let store = store();
        let user = employee("x9", "x9@example.com");
        store.add_user(user.clone()).unwrap();
        assert_eq!(store.all_users().into_iter().find(|u| u.id == "x9"), Some(user));

        let dept = Department {
            id: "d9".into(),
            name: "Maintenance".into(),
            manager_id: Some("u2".into()),
        };
        store.add_department(dept.clone()).unwrap();
        assert!(store.all_departments().contains(&dept));

        let mut skill = store.skill("s1").unwrap();
        skill.id = "s9".into();
        skill.name = "Confined Space Entry".into();
        store.add_skill(skill.clone()).unwrap();
        assert!(store.all_skills().contains(&skill));

        let mut job = store.job_profile("j2").unwrap();
        job.id = "j9".into();
        store.add_job_profile(job.clone()).unwrap();
        assert!(store.all_job_profiles().contains(&job));
    }

    #[test]
    fn add_assigns_id_when_missing() {
        let store = store();
        let dept = store
            .add_department(Department {
                id: String::new(),
                name: "Legal".into(),
                manager_id: None,
            })
            .unwrap();
        assert!(!dept.id.is_empty());
        assert_eq!(store.department(&dept.id).unwrap().name, "Legal");
    }

    #[test]
    fn duplicate_ids_and_emails_conflict() {
        let store = store();
        let err = store.add_user(employee("u1", "fresh@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let err = store.add_user(employee("x1", "SARA@erpom.com")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn update_and_remove_unknown_ids_are_not_found() {
        let store = store();
        assert!(matches!(
            store.update_user(employee("ghost", "g@example.com")),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.remove_skill("ghost"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn mutations_are_logged_newest_first() {
        let store = store();
        let mut dept = store.department("d1").unwrap();
        dept.name = "Field Operations".into();
        store.update_department(dept).unwrap();
        store.remove_job_profile("j2").unwrap();

        let logs = store.system_logs();
        assert_eq!(logs[0].action, "Removed Job Profile");
        assert_eq!(logs[0].target, "Safety Specialist Track");
        assert_eq!(logs[1].action, "Updated Department");
        assert_eq!(logs[1].target, "Field Operations");
    }

    #[test]
    fn assessment_log_names_the_subject() {
        let store = store();
        rate(&store, "u3", "s3", 2);
        rate(&store, "ghost", "s3", 2);
        let logs = store.system_logs();
        assert_eq!(logs[0].target, "For Employee");
        assert_eq!(logs[1].target, "For Sara Engineer");
    }

    #[test]
    fn activity_log_is_capped() {
        let store = DataStore::sample(5);
        for i in 0..10 {
            store.log_activity("Ping", &i.to_string());
        }
        let logs = store.system_logs();
        assert_eq!(logs.len(), 5);
        assert_eq!(logs[0].target, "9");
    }

    #[test]
    fn subscribers_see_changes() {
        let store = store();
        let mut rx = store.subscribe();
        store.remove_user("u5").unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::Changed {
                collection: Collection::Users,
                id: "u5".into(),
                kind: ChangeKind::Removed,
            }
        );
    }

    #[tokio::test]
    async fn writes_are_mirrored_in_order() {
        let remote = RecordingRemote::with_snapshot(sample::snapshot());
        let store = DataStore::with_remote(sample::snapshot(), remote.clone(), 50);

        store.remove_department("d3").unwrap();
        store.flush().await;

        let calls = remote.calls();
        assert_eq!(calls[0], Call::Delete(Collection::Departments, "d3".into()));
        assert!(matches!(&calls[1], Call::Upsert(Collection::Logs, _)));
    }

    #[tokio::test]
    async fn remote_failures_keep_local_changes() {
        let remote = Arc::new(RecordingRemote {
            snapshot: Mutex::new(sample::snapshot()),
            fail_writes: true,
            ..Default::default()
        });
        let store = DataStore::with_remote(sample::snapshot(), remote.clone(), 50);

        let user = store.add_user(employee("x1", "x1@example.com")).unwrap();
        store.flush().await;

        assert!(!remote.calls().is_empty());
        assert_eq!(store.user("x1"), Some(user));
    }

    #[tokio::test]
    async fn sample_source_never_touches_remote() {
        let config = crate::state::test_config();
        let store = DataStore::initialize(&config).await;
        assert!(!store.is_remote());
        assert_eq!(store.all_users().len(), 5);
    }

    async fn initialize_remote(database_url: Option<&str>) -> DataStore {
        let mut config = crate::state::test_config();
        config.data_source = DataSource::Remote;
        config.database_url = database_url.map(str::to_string);
        DataStore::initialize(&config).await
    }

    #[tokio::test]
    async fn remote_source_without_url_falls_back_to_sample() {
        let store = initialize_remote(None).await;
        assert!(!store.is_remote());
        assert_eq!(store.all_users().len(), 5);
    }

    #[tokio::test]
    async fn remote_source_with_placeholder_url_falls_back_to_sample() {
        let store =
            initialize_remote(Some("postgres://postgres:pw@db.your-project.example.com/app")).await;
        assert!(!store.is_remote());
        assert_eq!(store.all_users().len(), 5);
    }

    #[tokio::test]
    async fn unreachable_remote_falls_back_to_sample() {
        let store = initialize_remote(Some("postgres://u:p@127.0.0.1:1/x")).await;
        assert!(!store.is_remote());
        assert_eq!(store.all_users().len(), 5);
    }

    #[tokio::test]
    async fn reload_loads_again_when_a_write_races_it() {
        let remote = Arc::new(RecordingRemote {
            snapshot: Mutex::new(sample::snapshot()),
            load_gate: Some(Semaphore::new(0)),
            ..Default::default()
        });
        let store = DataStore::with_remote(sample::snapshot(), remote.clone(), 50);

        let write = async {
            remote.load_started.notified().await;
            store.add_user(employee("x1", "x1@example.com")).unwrap();
            if let Some(gate) = &remote.load_gate {
                gate.add_permits(2);
            }
        };
        let (reloaded, ()) = tokio::join!(store.reload(), write);

        reloaded.unwrap();
        assert_eq!(*remote.loads.lock(), 2);
        assert!(store.user("x1").is_some());
    }

    #[tokio::test]
    async fn reload_without_writes_loads_once() {
        let remote = RecordingRemote::with_snapshot(sample::snapshot());
        let store = DataStore::with_remote(Snapshot::default(), remote.clone(), 50);
        let mut events = store.subscribe();

        store.reload().await.unwrap();
        assert_eq!(*remote.loads.lock(), 1);
        assert_eq!(store.all_users().len(), 5);
        assert!(matches!(events.try_recv(), Ok(StoreEvent::Reloaded)));
    }
}
