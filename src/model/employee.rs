//! Employee records as the optimization core sees them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
}

/// Skill tier used for payroll premiums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillTier {
    #[default]
    Basic,
    Intermediate,
    Expert,
}

impl SkillTier {
    /// Hourly premium on top of the base rate.
    pub fn hourly_premium(self) -> f64 {
        match self {
            SkillTier::Basic => 0.0,
            SkillTier::Intermediate => 2.50,
            SkillTier::Expert => 5.00,
        }
    }
}

/// Read-only employee input for one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Id,
    pub employment_type: EmploymentType,
    /// Contracted weekly hours (40.0 for a standard full-time norm).
    pub weekly_hours_norm: f64,
    /// Employment rate multiplier (0.5, 0.75, 1.0, 1.25).
    pub work_rate: f64,
    pub skills: BTreeSet<Id>,
    pub skill_tier: SkillTier,
    pub overtime_authorization: bool,
    pub night_permission: bool,
    pub weekend_permission: bool,
    pub base_site: Id,
    pub cost_center_id: Option<Id>,
    /// Annual salary band `(min, max)` when known; hourly rates derive from
    /// the band midpoint.
    pub salary_band: Option<(f64, f64)>,
    pub position_title: String,
    pub time_zone: String,
}

impl Employee {
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            employment_type: EmploymentType::FullTime,
            weekly_hours_norm: 40.0,
            work_rate: 1.0,
            skills: BTreeSet::new(),
            skill_tier: SkillTier::Basic,
            overtime_authorization: true,
            night_permission: true,
            weekend_permission: true,
            base_site: "main".to_string(),
            cost_center_id: None,
            salary_band: None,
            position_title: "agent".to_string(),
            time_zone: "UTC".to_string(),
        }
    }

    pub fn with_employment_type(mut self, employment_type: EmploymentType) -> Self {
        self.employment_type = employment_type;
        if employment_type == EmploymentType::PartTime {
            self.weekly_hours_norm = 20.0;
        }
        self
    }

    pub fn with_skill(mut self, skill: impl Into<Id>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    pub fn with_skills(mut self, skills: impl IntoIterator<Item = impl Into<Id>>) -> Self {
        for skill in skills {
            self.skills.insert(skill.into());
        }
        self
    }

    pub fn with_skill_tier(mut self, tier: SkillTier) -> Self {
        self.skill_tier = tier;
        self
    }

    pub fn with_work_rate(mut self, rate: f64) -> Self {
        self.work_rate = rate;
        self
    }

    pub fn with_base_site(mut self, site: impl Into<Id>) -> Self {
        self.base_site = site.into();
        self
    }

    pub fn with_cost_center(mut self, id: impl Into<Id>) -> Self {
        self.cost_center_id = Some(id.into());
        self
    }

    pub fn with_salary_band(mut self, min: f64, max: f64) -> Self {
        self.salary_band = Some((min, max));
        self
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }
}
