//! Per-interval staffing requirements.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Id;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

/// Required headcount and skills for one interval of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRequirement {
    pub required_headcount: u32,
    pub required_skills: BTreeSet<Id>,
    pub priority: Priority,
}

impl CoverageRequirement {
    pub fn headcount(required: u32) -> Self {
        Self {
            required_headcount: required,
            required_skills: BTreeSet::new(),
            priority: Priority::default(),
        }
    }

    pub fn with_skill(mut self, skill: impl Into<Id>) -> Self {
        self.required_skills.insert(skill.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}
