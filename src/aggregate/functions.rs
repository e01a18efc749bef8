// src/aggregate/functions.rs
use std::collections::HashMap;

use serde::Serialize;

use crate::format::{percent, Precision};
use crate::records::{JobFunction, JobRecord};

/// Per-function counts and salary statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionStats {
    pub job_function: JobFunction,
    pub count: usize,
    /// Share of categorised records, whole percent.
    pub percentage: f64,
    /// Mean over records with a positive salary; 0 when none.
    pub average_salary: f64,
    pub jobs_with_salary: usize,
    /// Share of this function's records that state a salary, whole percent.
    pub salary_info_percentage: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionBreakdown {
    pub functions: Vec<FunctionStats>,
    /// Records in the closed set (the percentage denominator).
    pub total: usize,
    /// Records with a missing or unrecognised function.
    pub uncategorized: usize,
}

impl FunctionBreakdown {
    pub fn get(&self, f: JobFunction) -> Option<&FunctionStats> {
        self.functions.iter().find(|s| s.job_function == f)
    }

    /// Function with the highest average salary, ignoring those without salary data.
    pub fn highest_paid(&self) -> Option<&FunctionStats> {
        self.functions
            .iter()
            .filter(|s| s.jobs_with_salary > 0)
            .fold(None, |best: Option<&FunctionStats>, s| match best {
                Some(b) if b.average_salary >= s.average_salary => Some(b),
                _ => Some(s),
            })
    }

    pub fn jobs_with_salary(&self) -> usize {
        self.functions.iter().map(|s| s.jobs_with_salary).sum()
    }
}

#[derive(Default)]
struct Acc {
    count: usize,
    salary_sum: f64,
    salary_count: usize,
}

pub fn by_function(records: &[JobRecord]) -> FunctionBreakdown {
    let mut order: Vec<JobFunction> = Vec::new();
    let mut acc: HashMap<JobFunction, Acc> = HashMap::new();
    let mut uncategorized = 0usize;

    for r in records {
        let Some(f) = r.category() else {
            uncategorized += 1;
            continue;
        };
        let entry = acc.entry(f).or_insert_with(|| {
            order.push(f);
            Acc::default()
        });
        entry.count += 1;
        if let Some(s) = r.salary() {
            entry.salary_sum += s;
            entry.salary_count += 1;
        }
    }

    let total: usize = acc.values().map(|a| a.count).sum();
    let mut functions: Vec<FunctionStats> = order
        .into_iter()
        .filter_map(|f| acc.get(&f).map(|a| (f, a)))
        .map(|(f, a)| FunctionStats {
            job_function: f,
            count: a.count,
            percentage: percent(a.count, total, Precision::Whole),
            average_salary: if a.salary_count > 0 {
                a.salary_sum / a.salary_count as f64
            } else {
                0.0
            },
            jobs_with_salary: a.salary_count,
            salary_info_percentage: percent(a.salary_count, a.count, Precision::Whole),
            color: f.color(),
        })
        .collect();
    functions.sort_by(|a, b| b.count.cmp(&a.count));

    FunctionBreakdown {
        functions,
        total,
        uncategorized,
    }
}
