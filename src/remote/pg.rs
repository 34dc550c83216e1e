use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::repo_types::{
    convert_rows, AssessmentRow, DepartmentRow, JobProfileRow, LogRow, SkillRow, UserRow,
};
use super::{Collection, Record, RemoteBackend, RemoteSession, Snapshot};
use crate::auth::password::{hash_password, verify_password};

/// How many log entries a bulk load pulls, newest first.
const LOG_LOAD_LIMIT: i64 = 20;

/// PostgreSQL-backed table store.
#[derive(Clone)]
pub struct PgRemote {
    db: PgPool,
}

impl PgRemote {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .context("connect to remote database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            warn!(error = %e, "migration failed; continuing");
        }

        info!("connected to remote database");
        Ok(Self { db })
    }
}

#[async_trait]
impl RemoteBackend for PgRemote {
    async fn load(&self) -> anyhow::Result<Snapshot> {
        let users = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, status, department_id, job_profile_id,
                   manager_id, org_level, avatar_url
            FROM user_profiles
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("load user_profiles")?;

        let job_profiles = sqlx::query_as::<_, JobProfileRow>(
            r#"SELECT id, title, description, department_id, requirements FROM job_profiles"#,
        )
        .fetch_all(&self.db)
        .await
        .context("load job_profiles")?;

        let skills = sqlx::query_as::<_, SkillRow>(
            r#"SELECT id, name, category, assessment_question, levels FROM skills"#,
        )
        .fetch_all(&self.db)
        .await
        .context("load skills")?;

        let departments =
            sqlx::query_as::<_, DepartmentRow>(r#"SELECT id, name, manager_id FROM departments"#)
                .fetch_all(&self.db)
                .await
                .context("load departments")?;

        let assessments = sqlx::query_as::<_, AssessmentRow>(
            r#"
            SELECT id, rater_id, subject_id, skill_id, score, comment, date, type
            FROM assessments
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("load assessments")?;

        let logs = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT id, action, target, timestamp
            FROM system_logs
            ORDER BY timestamp DESC
            LIMIT $1
            "#,
        )
        .bind(LOG_LOAD_LIMIT)
        .fetch_all(&self.db)
        .await
        .context("load system_logs")?;

        Ok(Snapshot {
            users: convert_rows(Collection::Users.table(), users),
            job_profiles: convert_rows(Collection::JobProfiles.table(), job_profiles),
            skills: convert_rows(Collection::Skills.table(), skills),
            departments: departments.into_iter().map(Into::into).collect(),
            assessments: convert_rows(Collection::Assessments.table(), assessments),
            logs: logs.into_iter().map(Into::into).collect(),
        })
    }

    async fn upsert(&self, record: &Record) -> anyhow::Result<()> {
        let query = match record {
            Record::User(u) => sqlx::query(
                r#"
                INSERT INTO user_profiles (id, name, email, role, status, department_id,
                                           job_profile_id, manager_id, org_level, avatar_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name, email = EXCLUDED.email, role = EXCLUDED.role,
                    status = EXCLUDED.status, department_id = EXCLUDED.department_id,
                    job_profile_id = EXCLUDED.job_profile_id, manager_id = EXCLUDED.manager_id,
                    org_level = EXCLUDED.org_level, avatar_url = EXCLUDED.avatar_url
                "#,
            )
            .bind(&u.id)
            .bind(&u.name)
            .bind(&u.email)
            .bind(u.role.as_str())
            .bind(u.status.as_str())
            .bind(&u.department_id)
            .bind(&u.job_profile_id)
            .bind(&u.manager_id)
            .bind(u.org_level.map(|l| l.code()))
            .bind(&u.avatar_url),
            Record::JobProfile(j) => sqlx::query(
                r#"
                INSERT INTO job_profiles (id, title, description, department_id, requirements)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id) DO UPDATE SET
                    title = EXCLUDED.title, description = EXCLUDED.description,
                    department_id = EXCLUDED.department_id, requirements = EXCLUDED.requirements
                "#,
            )
            .bind(&j.id)
            .bind(&j.title)
            .bind(&j.description)
            .bind(&j.department_id)
            .bind(Json(&j.requirements)),
            Record::Skill(s) => sqlx::query(
                r#"
                INSERT INTO skills (id, name, category, assessment_question, levels)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name, category = EXCLUDED.category,
                    assessment_question = EXCLUDED.assessment_question, levels = EXCLUDED.levels
                "#,
            )
            .bind(&s.id)
            .bind(&s.name)
            .bind(&s.category)
            .bind(&s.assessment_question)
            .bind(Json(&s.levels)),
            Record::Department(d) => sqlx::query(
                r#"
                INSERT INTO departments (id, name, manager_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name, manager_id = EXCLUDED.manager_id
                "#,
            )
            .bind(&d.id)
            .bind(&d.name)
            .bind(&d.manager_id),
            Record::Assessment(a) => sqlx::query(
                r#"
                INSERT INTO assessments (id, rater_id, subject_id, skill_id, score, comment, date, type)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&a.id)
            .bind(&a.rater_id)
            .bind(&a.subject_id)
            .bind(&a.skill_id)
            .bind(i16::from(a.score.get()))
            .bind(&a.comment)
            .bind(a.date)
            .bind(a.kind.as_str()),
            Record::Log(l) => sqlx::query(
                r#"
                INSERT INTO system_logs (id, action, target, timestamp)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&l.id)
            .bind(&l.action)
            .bind(&l.target)
            .bind(l.timestamp),
        };

        let table = record.collection().table();
        query
            .execute(&self.db)
            .await
            .with_context(|| format!("upsert into {table}"))?;
        debug!(table, id = %record.id(), "remote upsert");
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> anyhow::Result<()> {
        let table = collection.table();
        // table names come from a closed enum
        sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(&self.db)
            .await
            .with_context(|| format!("delete from {table}"))?;
        debug!(table, id, "remote delete");
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> anyhow::Result<String> {
        let hash = hash_password(password)?;
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO auth_users (id, email, password_hash)
            VALUES ($1, lower($2), $3)
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(&hash)
        .execute(&self.db)
        .await
        .context("create auth user")?;
        Ok(id)
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> anyhow::Result<Option<RemoteSession>> {
        let account = sqlx::query_as::<_, (String, String)>(
            r#"SELECT id, password_hash FROM auth_users WHERE email = lower($1)"#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find auth user")?;

        let Some((user_id, password_hash)) = account else {
            return Ok(None);
        };
        if !verify_password(password, &password_hash)? {
            return Ok(None);
        }

        let session_id = Uuid::new_v4();
        sqlx::query(r#"INSERT INTO auth_sessions (id, user_id) VALUES ($1, $2)"#)
            .bind(session_id)
            .bind(&user_id)
            .execute(&self.db)
            .await
            .context("open session")?;

        Ok(Some(RemoteSession {
            id: session_id,
            user_id,
        }))
    }

    async fn sign_out(&self, session_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM auth_sessions WHERE id = $1"#)
            .bind(session_id)
            .execute(&self.db)
            .await
            .context("close session")?;
        Ok(())
    }
}
