// src/filter.rs
//! Cross-filtering for the listings table.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::records::JobRecord;

/// Conjunction of predicates; an empty string matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    /// Case-insensitive substring of the title.
    pub search: String,
    pub job_function: String,
    pub location: String,
    pub company: String,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.search.is_empty()
            && self.job_function.is_empty()
            && self.location.is_empty()
            && self.company.is_empty()
    }

    pub fn matches(&self, record: &JobRecord) -> bool {
        let search_ok = self.search.is_empty()
            || record
                .title()
                .to_lowercase()
                .contains(&self.search.to_lowercase());
        search_ok
            && exact(&self.job_function, record.job_function.as_deref())
            && exact(&self.location, record.location.as_deref())
            && exact(&self.company, record.company.as_deref())
    }
}

fn exact(wanted: &str, actual: Option<&str>) -> bool {
    wanted.is_empty() || actual == Some(wanted)
}

/// Matching records, in input order.
pub fn apply_filters(records: &[JobRecord], filter: &FilterState) -> Vec<JobRecord> {
    if filter.is_empty() {
        return records.to_vec();
    }
    records.iter().filter(|r| filter.matches(r)).cloned().collect()
}

/// Selectable values for the filter dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub job_functions: Vec<String>,
    pub locations: Vec<String>,
    pub companies: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[JobRecord]) -> Self {
        Self {
            job_functions: distinct_sorted(records.iter().filter_map(JobRecord::job_function)),
            locations: distinct_sorted(records.iter().filter_map(JobRecord::location)),
            companies: distinct_sorted(records.iter().filter_map(JobRecord::company)),
        }
    }
}

fn distinct_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let set: BTreeSet<&str> = values.collect();
    let mut out: Vec<String> = set.into_iter().map(str::to_string).collect();
    out.sort_by(|a, b| alphabetical(a, b));
    out
}

// Case-insensitive first so "acme" sits next to "Acme".
fn alphabetical(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
