// src/aggregate/companies.rs
use serde::Serialize;

use crate::aggregate::Breakdown;
use crate::format::{percent, Precision};

/// Inclusive posting-count ranges; `None` upper bound is open.
const RANGES: [(&str, usize, Option<usize>); 5] = [
    ("1", 1, Some(1)),
    ("2-5", 2, Some(5)),
    ("6-10", 6, Some(10)),
    ("11-20", 11, Some(20)),
    ("20+", 21, None),
];

/// How many companies posted a number of jobs within `range`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeRange {
    pub range: &'static str,
    pub companies: usize,
    /// Share of all companies, one decimal.
    pub percentage: f64,
}

pub fn company_size_ranges(companies: &Breakdown) -> Vec<SizeRange> {
    let total = companies.buckets.len();
    RANGES
        .iter()
        .map(|&(range, lo, hi)| {
            let n = companies
                .buckets
                .iter()
                .filter(|b| b.count >= lo && hi.map_or(true, |hi| b.count <= hi))
                .count();
            SizeRange {
                range,
                companies: n,
                percentage: percent(n, total, Precision::OneDecimal),
            }
        })
        .collect()
}
