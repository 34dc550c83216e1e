mod entities;
mod levels;

pub use entities::{
    ActivityLog, Assessment, AssessmentType, Department, JobProfile, NewAssessment, Role, Skill,
    User, UserStatus,
};
pub use levels::{JobProfileSkill, OrgLevel, Proficiency, Requirements, SkillLevel, SkillLevels};
