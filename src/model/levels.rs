use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Proficiency on the 1..=5 competency scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Proficiency(u8);

impl Proficiency {
    pub const MIN: Proficiency = Proficiency(1);
    pub const MAX: Proficiency = Proficiency(5);

    pub fn new(value: u8) -> Result<Self, StoreError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(StoreError::Invalid(format!(
                "proficiency must be between 1 and 5, got {value}"
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Slot in a five-entry table.
    fn slot(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for Proficiency {
    type Error = StoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Proficiency> for u8 {
    fn from(p: Proficiency) -> Self {
        p.0
    }
}

impl fmt::Display for Proficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position in the organization hierarchy, ordered top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrgLevel {
    #[serde(rename = "GM")]
    GeneralManager,
    #[serde(rename = "GAM")]
    GeneralAssistantManager,
    #[serde(rename = "DM")]
    DepartmentManager,
    #[serde(rename = "DH")]
    DepartmentHead,
    #[serde(rename = "EX")]
    ExcellentPosition,
    #[serde(rename = "FP")]
    FirstPosition,
    #[serde(rename = "FR")]
    Fresh,
}

impl OrgLevel {
    /// Strict hierarchy order.
    pub const ALL: [OrgLevel; 7] = [
        OrgLevel::GeneralManager,
        OrgLevel::GeneralAssistantManager,
        OrgLevel::DepartmentManager,
        OrgLevel::DepartmentHead,
        OrgLevel::ExcellentPosition,
        OrgLevel::FirstPosition,
        OrgLevel::Fresh,
    ];

    pub fn code(self) -> &'static str {
        match self {
            OrgLevel::GeneralManager => "GM",
            OrgLevel::GeneralAssistantManager => "GAM",
            OrgLevel::DepartmentManager => "DM",
            OrgLevel::DepartmentHead => "DH",
            OrgLevel::ExcellentPosition => "EX",
            OrgLevel::FirstPosition => "FP",
            OrgLevel::Fresh => "FR",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrgLevel::GeneralManager => "General Manager",
            OrgLevel::GeneralAssistantManager => "General Assistant Manager",
            OrgLevel::DepartmentManager => "Department Manager",
            OrgLevel::DepartmentHead => "Department Head",
            OrgLevel::ExcellentPosition => "Excellent Position",
            OrgLevel::FirstPosition => "First Position",
            OrgLevel::Fresh => "Fresh",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl FromStr for OrgLevel {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrgLevel::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StoreError::Invalid(format!("unknown org level: {s}")))
    }
}

impl fmt::Display for OrgLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Descriptor for one proficiency level of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLevel {
    pub level: Proficiency,
    pub description: String,
    #[serde(default)]
    pub required_certificates: Vec<String>,
}

/// Level descriptors of a skill, one slot per proficiency.
///
/// On the wire this is an object keyed by `"1"`..`"5"`. Missing levels are
/// tolerated; keys outside the scale are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<u8, SkillLevel>",
    into = "BTreeMap<u8, SkillLevel>"
)]
pub struct SkillLevels([Option<SkillLevel>; 5]);

impl SkillLevels {
    pub fn get(&self, level: Proficiency) -> Option<&SkillLevel> {
        self.0[level.slot()].as_ref()
    }

    /// Stores `descriptor` under its own level, replacing any previous one.
    pub fn set(&mut self, descriptor: SkillLevel) {
        let slot = descriptor.level.slot();
        self.0[slot] = Some(descriptor);
    }

    pub fn is_complete(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillLevel> {
        self.0.iter().flatten()
    }
}

impl FromIterator<SkillLevel> for SkillLevels {
    fn from_iter<I: IntoIterator<Item = SkillLevel>>(iter: I) -> Self {
        let mut levels = SkillLevels::default();
        for descriptor in iter {
            levels.set(descriptor);
        }
        levels
    }
}

impl TryFrom<BTreeMap<u8, SkillLevel>> for SkillLevels {
    type Error = StoreError;

    fn try_from(map: BTreeMap<u8, SkillLevel>) -> Result<Self, Self::Error> {
        let mut levels = SkillLevels::default();
        for (key, mut descriptor) in map {
            // the key is authoritative
            descriptor.level = Proficiency::new(key)?;
            levels.set(descriptor);
        }
        Ok(levels)
    }
}

impl From<SkillLevels> for BTreeMap<u8, SkillLevel> {
    fn from(levels: SkillLevels) -> Self {
        levels
            .0
            .into_iter()
            .flatten()
            .map(|d| (d.level.get(), d))
            .collect()
    }
}

/// A skill a job profile demands at a given proficiency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProfileSkill {
    pub skill_id: String,
    pub required_level: Proficiency,
}

/// Skill requirements of a job profile, one slot per hierarchy level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<OrgLevel, Vec<JobProfileSkill>>",
    into = "BTreeMap<OrgLevel, Vec<JobProfileSkill>>"
)]
pub struct Requirements([Vec<JobProfileSkill>; 7]);

impl Requirements {
    pub fn for_level(&self, level: OrgLevel) -> &[JobProfileSkill] {
        &self.0[level.slot()]
    }

    pub fn set(&mut self, level: OrgLevel, skills: Vec<JobProfileSkill>) {
        self.0[level.slot()] = skills;
    }

    /// Levels that carry at least one requirement, in hierarchy order.
    pub fn levels(&self) -> impl Iterator<Item = OrgLevel> + '_ {
        OrgLevel::ALL
            .into_iter()
            .filter(|l| !self.for_level(*l).is_empty())
    }
}

impl TryFrom<BTreeMap<OrgLevel, Vec<JobProfileSkill>>> for Requirements {
    type Error = StoreError;

    fn try_from(map: BTreeMap<OrgLevel, Vec<JobProfileSkill>>) -> Result<Self, Self::Error> {
        let mut requirements = Requirements::default();
        for (level, skills) in map {
            requirements.set(level, skills);
        }
        Ok(requirements)
    }
}

impl From<Requirements> for BTreeMap<OrgLevel, Vec<JobProfileSkill>> {
    fn from(requirements: Requirements) -> Self {
        OrgLevel::ALL
            .into_iter()
            .zip(requirements.0)
            .filter(|(_, skills)| !skills.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proficiency_rejects_out_of_scale() {
        assert!(Proficiency::new(0).is_err());
        assert!(Proficiency::new(6).is_err());
        assert_eq!(Proficiency::new(5).unwrap(), Proficiency::MAX);
        assert!(serde_json::from_str::<Proficiency>("7").is_err());
    }

    #[test]
    fn org_levels_are_ordered_top_to_bottom() {
        let codes: Vec<_> = OrgLevel::ALL.iter().map(|l| l.code()).collect();
        assert_eq!(codes, ["GM", "GAM", "DM", "DH", "EX", "FP", "FR"]);
        assert!(OrgLevel::GeneralManager < OrgLevel::Fresh);
        assert_eq!("dh".parse::<OrgLevel>().unwrap(), OrgLevel::DepartmentHead);
        assert_eq!(OrgLevel::ExcellentPosition.label(), "Excellent Position");
    }

    #[test]
    fn skill_levels_tolerate_sparse_maps() {
        let json = r#"{"2":{"level":2,"description":"two","requiredCertificates":["A"]},
                       "4":{"level":4,"description":"four"}}"#;
        let levels: SkillLevels = serde_json::from_str(json).unwrap();
        assert!(!levels.is_complete());
        assert_eq!(levels.get(Proficiency::new(2).unwrap()).unwrap().required_certificates, ["A"]);
        assert!(levels.get(Proficiency::new(3).unwrap()).is_none());

        let back = serde_json::to_value(&levels).unwrap();
        assert!(back.get("2").is_some());
        assert!(back.get("3").is_none());
    }

    #[test]
    fn skill_levels_reject_keys_outside_scale() {
        let json = r#"{"6":{"level":6,"description":"six"}}"#;
        assert!(serde_json::from_str::<SkillLevels>(json).is_err());
    }

    #[test]
    fn requirements_omit_empty_levels_on_the_wire() {
        let json = r#"{"FR":[{"skillId":"s1","requiredLevel":2}],"DM":[]}"#;
        let req: Requirements = serde_json::from_str(json).unwrap();
        assert_eq!(req.for_level(OrgLevel::Fresh).len(), 1);
        assert!(req.for_level(OrgLevel::DepartmentManager).is_empty());
        assert_eq!(req.levels().collect::<Vec<_>>(), [OrgLevel::Fresh]);

        let back = serde_json::to_value(&req).unwrap();
        assert_eq!(back.as_object().unwrap().len(), 1);
    }

    #[test]
    fn requirements_reject_required_level_out_of_scale() {
        let json = r#"{"FR":[{"skillId":"s1","requiredLevel":9}]}"#;
        assert!(serde_json::from_str::<Requirements>(json).is_err());
    }
}
