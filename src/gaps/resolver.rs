use serde::Serialize;

use crate::model::{JobProfile, Proficiency, OrgLevel, Skill, User};

/// Lookups the resolver needs; implemented by the data store.
pub trait CompetencyCatalog {
    fn job_profile(&self, id: &str) -> Option<JobProfile>;
    fn skill(&self, id: &str) -> Option<Skill>;
    /// Current competency on the 0..=5 scale, 0 meaning never assessed.
    fn skill_score(&self, user_id: &str, skill_id: &str) -> u8;
}

/// Outcome of a gap analysis. Missing assignments are states, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapReport {
    NoProfile,
    NoLevel { profile: String },
    NoRequirements { profile: String, level: OrgLevel },
    Analysed(GapAnalysis),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillComparison {
    pub skill_id: String,
    /// `None` when the requirement points at an undefined skill.
    pub skill_name: Option<String>,
    pub required: Proficiency,
    pub current: u8,
    pub gap: i8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub skill_id: String,
    pub skill_name: Option<String>,
    pub target_level: Proficiency,
    pub description: Option<String>,
    pub certificates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapAnalysis {
    pub user_id: String,
    pub profile: String,
    pub level: OrgLevel,
    pub level_label: String,
    pub compliant: Vec<SkillComparison>,
    pub gaps: Vec<SkillComparison>,
    pub recommendations: Vec<Recommendation>,
    /// Percentage of requirements met, rounded half-up.
    pub compliance_rate: u8,
    pub recommended_certificates: usize,
}

fn percent(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    u8::try_from((200 * part + total) / (2 * total)).unwrap_or(100)
}

fn recommend(cmp: &SkillComparison, skill: Option<&Skill>) -> Recommendation {
    let target_level = Proficiency::new(cmp.current.saturating_add(1).min(Proficiency::MAX.get()))
        .unwrap_or(Proficiency::MAX);
    let descriptor = skill.and_then(|s| s.levels.get(target_level));
    Recommendation {
        skill_id: cmp.skill_id.clone(),
        skill_name: cmp.skill_name.clone(),
        target_level,
        description: descriptor.map(|d| d.description.clone()),
        certificates: descriptor
            .map(|d| d.required_certificates.clone())
            .unwrap_or_default(),
    }
}

/// Compares `user`'s current competencies with what their job profile
/// requires at their hierarchy level.
pub fn resolve<C: CompetencyCatalog + ?Sized>(catalog: &C, user: &User) -> GapReport {
    let Some(profile) = user
        .job_profile_id
        .as_deref()
        .and_then(|id| catalog.job_profile(id))
    else {
        return GapReport::NoProfile;
    };
    let Some(level) = user.org_level else {
        return GapReport::NoLevel {
            profile: profile.title,
        };
    };
    let requirements = profile.requirements.for_level(level);
    if requirements.is_empty() {
        return GapReport::NoRequirements {
            profile: profile.title,
            level,
        };
    }

    let mut compliant = Vec::new();
    let mut gaps = Vec::new();
    let mut recommendations = Vec::new();

    for req in requirements {
        let skill = catalog.skill(&req.skill_id);
        let current = catalog.skill_score(&user.id, &req.skill_id);
        let cmp = SkillComparison {
            skill_id: req.skill_id.clone(),
            skill_name: skill.as_ref().map(|s| s.name.clone()),
            required: req.required_level,
            current,
            gap: req.required_level.get() as i8 - current as i8,
        };
        if cmp.gap > 0 {
            recommendations.push(recommend(&cmp, skill.as_ref()));
            gaps.push(cmp);
        } else {
            compliant.push(cmp);
        }
    }

    let compliance_rate = percent(compliant.len(), requirements.len());
    let recommended_certificates = recommendations.iter().map(|r| r.certificates.len()).sum();

    GapReport::Analysed(GapAnalysis {
        user_id: user.id.clone(),
        profile: profile.title,
        level,
        level_label: level.label().to_string(),
        compliant,
        gaps,
        recommendations,
        compliance_rate,
        recommended_certificates,
    })
}
