// src/aggregate/mod.rs
//! Grouping and counting over a fetched record set.
//!
//! Every function here is pure: same records in, deep-equal result out. Records whose
//! grouping key is missing or blank are left out of that dimension only.

pub mod companies;
pub mod functions;
pub mod skills;
pub mod timeline;

pub use companies::{company_size_ranges, SizeRange};
pub use functions::{by_function, FunctionBreakdown, FunctionStats};
pub use skills::{by_skill_and_function, FunctionSkills, SkillRank};
pub use timeline::{by_date_and_function, Timeline, TimelineSeries, WeekdayCount};

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::format::{percent, Precision};
use crate::records::JobRecord;

/// One grouping key with its count and share of the dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub key: String,
    pub count: usize,
    pub percentage: f64,
}

/// Buckets of one dimension, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub buckets: Vec<Bucket>,
    /// Records that landed in some bucket (the percentage denominator).
    pub total: usize,
    /// Records without a usable key.
    pub excluded: usize,
    pub precision: Precision,
}

impl Breakdown {
    pub fn get(&self, key: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.key == key)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Attribute a [`Breakdown`] can be grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Company,
    Location,
    JobFunction,
}

impl Dimension {
    pub fn key(self, record: &JobRecord) -> Option<&str> {
        match self {
            Dimension::Company => record.company(),
            Dimension::Location => record.location(),
            Dimension::JobFunction => record.job_function(),
        }
    }
}

/// Count keys in first-seen order, then stable-sort by count descending.
pub(crate) fn count_keys<'a, I>(keys: I) -> Vec<(&'a str, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for key in keys {
        match index.get(key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key, counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Group `records` by `key_fn`, with percentages of the keyed total.
pub fn aggregate_by<F>(records: &[JobRecord], key_fn: F, precision: Precision) -> Breakdown
where
    F: Fn(&JobRecord) -> Option<&str>,
{
    let mut excluded = 0usize;
    let keys = records.iter().filter_map(|r| {
        let k = key_fn(r);
        if k.is_none() {
            excluded += 1;
        }
        k
    });
    let counts = count_keys(keys);
    let total: usize = counts.iter().map(|(_, c)| c).sum();

    let buckets = counts
        .into_iter()
        .map(|(key, count)| Bucket {
            key: key.to_string(),
            count,
            percentage: percent(count, total, precision),
        })
        .collect();

    Breakdown {
        buckets,
        total,
        excluded,
        precision,
    }
}

pub fn aggregate(records: &[JobRecord], dimension: Dimension, precision: Precision) -> Breakdown {
    aggregate_by(records, |r| dimension.key(r), precision)
}

pub fn by_company(records: &[JobRecord]) -> Breakdown {
    aggregate(records, Dimension::Company, Precision::OneDecimal)
}

pub fn by_location(records: &[JobRecord]) -> Breakdown {
    aggregate(records, Dimension::Location, Precision::OneDecimal)
}

/// Size and extent of a record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSpan {
    pub total_records: usize,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
    pub countries: usize,
    pub companies: usize,
}

pub fn dataset_span(records: &[JobRecord]) -> DatasetSpan {
    let dates = records.iter().filter_map(|r| r.posted_date);
    let countries: BTreeSet<&str> = records.iter().filter_map(JobRecord::location).collect();
    let companies: BTreeSet<&str> = records.iter().filter_map(JobRecord::company).collect();
    DatasetSpan {
        total_records: records.len(),
        earliest: dates.clone().min(),
        latest: dates.max(),
        countries: countries.len(),
        companies: companies.len(),
    }
}
