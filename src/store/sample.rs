//! Bundled dataset used when no remote backend is configured or reachable.

use time::{macros::datetime, Duration, OffsetDateTime};

use crate::model::{
    ActivityLog, Assessment, AssessmentType, Department, JobProfile, JobProfileSkill, OrgLevel,
    Proficiency, Requirements, Role, Skill, SkillLevel, SkillLevels, User, UserStatus,
};
use crate::remote::Snapshot;

pub fn snapshot() -> Snapshot {
    Snapshot {
        users: users(),
        job_profiles: job_profiles(),
        skills: skills(),
        departments: departments(),
        assessments: assessments(),
        logs: logs(OffsetDateTime::now_utc()),
    }
}

fn p(level: u8) -> Proficiency {
    Proficiency::new(level).unwrap_or(Proficiency::MIN)
}

fn levels(descriptors: [(&str, &[&str]); 5]) -> SkillLevels {
    descriptors
        .into_iter()
        .zip(1u8..)
        .map(|((description, certs), level)| SkillLevel {
            level: p(level),
            description: description.to_string(),
            required_certificates: certs.iter().map(|c| c.to_string()).collect(),
        })
        .collect()
}

fn skills() -> Vec<Skill> {
    vec![
        Skill {
            id: "s1".into(),
            name: "HSE Risk Assessment".into(),
            category: "Safety".into(),
            assessment_question: Some(
                "How effectively does the employee identify, evaluate, and mitigate safety risks in their daily work?".into(),
            ),
            levels: levels([
                ("Has basic awareness of safety protocols but requires guidance.", &["HSE Intro"]),
                ("Can perform standard risk assessments with supervision.", &["Risk Level 1"]),
                ("Independently executes risk assessments and identifies hazards.", &["NEBOSH IGC"]),
                ("Acts as a safety trainer/expert; leads safety audits.", &["Advanced Safety Audit"]),
                ("Develops strategic safety policies and industry-wide standards.", &["Master Safety Director"]),
            ]),
        },
        Skill {
            id: "s2".into(),
            name: "Process Engineering".into(),
            category: "Technical".into(),
            assessment_question: Some(
                "What is the employee's capability regarding chemical process design, simulation, and optimization?".into(),
            ),
            levels: levels([
                ("Understands basic concepts but cannot apply them independently.", &[]),
                ("Performs basic calculations and follows established procedures.", &["ChemEng 101"]),
                ("Designs systems and runs simulations for standard projects.", &["Process Simulation Cert"]),
                ("Troubleshoots complex system failures and optimizes plant performance.", &["Senior Process Eng License"]),
                ("Innovates new processing technologies for the industry.", &["PhD or Equivalent"]),
            ]),
        },
        Skill {
            id: "s3".into(),
            name: "Project Management".into(),
            category: "Management".into(),
            assessment_question: Some(
                "How does the employee demonstrate ability in managing project scope, timelines, and resources?".into(),
            ),
            levels: levels([
                ("Tracks personal tasks and reports progress accurately.", &[]),
                ("Leads small projects or workstreams with defined scope.", &["CAPM"]),
                ("Manages large projects involving cross-functional teams.", &["PMP"]),
                ("Oversees multiple related projects (Program Management).", &["PgMP"]),
                ("Defines portfolio strategy aligned with organizational goals.", &["PfMP"]),
            ]),
        },
    ]
}

fn departments() -> Vec<Department> {
    [("d1", "Operations"), ("d2", "Engineering"), ("d3", "HR")]
        .into_iter()
        .map(|(id, name)| Department {
            id: id.into(),
            name: name.into(),
            manager_id: None,
        })
        .collect()
}

fn reqs(pairs: &[(&str, u8)]) -> Vec<JobProfileSkill> {
    pairs
        .iter()
        .map(|(skill_id, level)| JobProfileSkill {
            skill_id: skill_id.to_string(),
            required_level: p(*level),
        })
        .collect()
}

fn job_profiles() -> Vec<JobProfile> {
    let mut process = Requirements::default();
    process.set(OrgLevel::DepartmentManager, reqs(&[("s1", 4), ("s2", 5), ("s3", 4)]));
    process.set(OrgLevel::FirstPosition, reqs(&[("s1", 3), ("s2", 4), ("s3", 2)]));
    process.set(OrgLevel::Fresh, reqs(&[("s1", 2), ("s2", 2), ("s3", 1)]));

    let mut safety = Requirements::default();
    safety.set(OrgLevel::DepartmentHead, reqs(&[("s1", 5), ("s3", 3)]));
    safety.set(OrgLevel::Fresh, reqs(&[("s1", 2)]));

    vec![
        JobProfile {
            id: "j1".into(),
            title: "Process Engineer Track".into(),
            description: "Career path for process engineering from Fresh to Manager.".into(),
            department_id: "d2".into(),
            requirements: process,
        },
        JobProfile {
            id: "j2".into(),
            title: "Safety Specialist Track".into(),
            description: "Ensures workplace safety compliance.".into(),
            department_id: "d1".into(),
            requirements: safety,
        },
    ]
}

fn users() -> Vec<User> {
    let user = |id: &str, name: &str, email: &str, role, status| User {
        id: id.into(),
        name: name.into(),
        email: email.into(),
        role,
        status,
        department_id: None,
        org_level: None,
        job_profile_id: None,
        manager_id: None,
        avatar_url: None,
    };
    let avatar = |n: u8| Some(format!("https://picsum.photos/200/200?random={n}"));

    vec![
        User {
            department_id: Some("d3".into()),
            org_level: Some(OrgLevel::GeneralManager),
            ..user("u1", "Admin User", "admin@erpom.com", Role::Admin, UserStatus::Active)
        },
        User {
            department_id: Some("d2".into()),
            job_profile_id: Some("j1".into()),
            org_level: Some(OrgLevel::DepartmentManager),
            avatar_url: avatar(1),
            ..user("u2", "Ahmed Manager", "ahmed@erpom.com", Role::Manager, UserStatus::Active)
        },
        User {
            department_id: Some("d2".into()),
            manager_id: Some("u2".into()),
            job_profile_id: Some("j1".into()),
            org_level: Some(OrgLevel::FirstPosition),
            avatar_url: avatar(2),
            ..user("u3", "Sara Engineer", "sara@erpom.com", Role::Employee, UserStatus::Active)
        },
        User {
            department_id: Some("d1".into()),
            manager_id: Some("u2".into()),
            job_profile_id: Some("j2".into()),
            org_level: Some(OrgLevel::Fresh),
            avatar_url: avatar(3),
            ..user("u4", "Khaled Technician", "khaled@erpom.com", Role::Employee, UserStatus::Active)
        },
        User {
            avatar_url: avatar(4),
            ..user("u5", "New Pending User", "new@erpom.com", Role::Employee, UserStatus::Pending)
        },
    ]
}

fn assessments() -> Vec<Assessment> {
    let rating = |id: &str, rater: &str, skill: &str, score, comment: &str, date, kind| Assessment {
        id: id.into(),
        rater_id: rater.into(),
        subject_id: "u3".into(),
        skill_id: skill.into(),
        score: p(score),
        comment: comment.into(),
        date,
        kind,
    };
    vec![
        rating("a1", "u3", "s1", 2, "Need more training", datetime!(2023-10-01 0:00 UTC), AssessmentType::SelfReview),
        rating("a2", "u2", "s1", 3, "Good progress", datetime!(2023-10-05 0:00 UTC), AssessmentType::Manager),
        rating("a3", "u3", "s2", 3, "Solid understanding", datetime!(2023-10-01 0:00 UTC), AssessmentType::SelfReview),
    ]
}

fn logs(now: OffsetDateTime) -> Vec<ActivityLog> {
    [
        ("l1", "Modified Skill Requirements", "Process Engineer Track", Duration::hours(2)),
        ("l2", "Onboarded Employee", "Sarah Connor", Duration::hours(5)),
        ("l3", "System Initialization", "Core Modules", Duration::hours(24)),
    ]
    .into_iter()
    .map(|(id, action, target, ago)| ActivityLog {
        id: id.into(),
        action: action.into(),
        target: target.into(),
        timestamp: now - ago,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_skills_define_all_five_levels() {
        for skill in skills() {
            assert!(skill.levels.is_complete(), "{} is missing levels", skill.id);
        }
    }

    #[test]
    fn sample_logs_are_newest_first() {
        let logs = logs(OffsetDateTime::now_utc());
        assert!(logs.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn sample_reporting_lines_point_at_existing_users() {
        let users = users();
        for u in &users {
            if let Some(m) = &u.manager_id {
                assert!(users.iter().any(|x| &x.id == m));
            }
        }
    }
}
