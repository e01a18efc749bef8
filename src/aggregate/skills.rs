// src/aggregate/skills.rs
use std::collections::HashMap;

use serde::Serialize;

use crate::aggregate::count_keys;
use crate::records::{JobFunction, JobRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillRank {
    /// 1-based within its function.
    pub rank: usize,
    pub skill: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSkills {
    pub job_function: JobFunction,
    pub skills: Vec<SkillRank>,
}

/// Skill frequency per closed-set function, functions in canonical order.
///
/// Expects the skills projection; undecodable skill fields count as empty lists.
pub fn by_skill_and_function(records: &[JobRecord]) -> Vec<FunctionSkills> {
    let mut per_function: HashMap<JobFunction, Vec<String>> = HashMap::new();
    for r in records {
        if let Some(f) = r.category() {
            per_function.entry(f).or_default().extend(r.skills());
        }
    }

    JobFunction::ALL
        .into_iter()
        .filter_map(|f| per_function.get(&f).map(|skills| (f, skills)))
        .map(|(f, skills)| FunctionSkills {
            job_function: f,
            skills: count_keys(skills.iter().map(String::as_str))
                .into_iter()
                .enumerate()
                .map(|(i, (skill, count))| SkillRank {
                    rank: i + 1,
                    skill: skill.to_string(),
                    count,
                })
                .collect(),
        })
        .collect()
}
