// src/aggregate/timeline.rs
//! Postings per day, stacked by job function.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::records::{function_color, JobRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineSeries {
    pub job_function: String,
    pub color: &'static str,
    /// One count per entry of [`Timeline::dates`], zero-filled.
    pub counts: Vec<usize>,
}

/// Dense date × function matrix: dates ascending, functions sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub dates: Vec<NaiveDate>,
    pub series: Vec<TimelineSeries>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayCount {
    pub weekday: String,
    pub count: usize,
}

impl Timeline {
    pub fn count(&self, date: NaiveDate, job_function: &str) -> usize {
        let Some(i) = self.dates.iter().position(|d| *d == date) else {
            return 0;
        };
        self.series
            .iter()
            .find(|s| s.job_function == job_function)
            .map_or(0, |s| s.counts[i])
    }

    pub fn total(&self) -> usize {
        self.series.iter().flat_map(|s| s.counts.iter()).sum()
    }

    pub fn daily_totals(&self) -> Vec<(NaiveDate, usize)> {
        self.dates
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, self.series.iter().map(|s| s.counts[i]).sum()))
            .collect()
    }

    /// Postings per weekday, Monday first.
    pub fn weekday_totals(&self) -> Vec<WeekdayCount> {
        let mut totals = [0usize; 7];
        for (date, n) in self.daily_totals() {
            totals[date.weekday().num_days_from_monday() as usize] += n;
        }
        WEEKDAYS
            .iter()
            .zip(totals)
            .map(|(name, count)| WeekdayCount {
                weekday: (*name).to_string(),
                count,
            })
            .collect()
    }
}

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Records missing either the date or the function are left out entirely.
pub fn by_date_and_function(records: &[JobRecord]) -> Timeline {
    let mut grid: BTreeMap<NaiveDate, BTreeMap<&str, usize>> = BTreeMap::new();
    let mut functions: BTreeSet<&str> = BTreeSet::new();

    for r in records {
        let (Some(date), Some(f)) = (r.posted_date, r.job_function()) else {
            continue;
        };
        *grid.entry(date).or_default().entry(f).or_insert(0) += 1;
        functions.insert(f);
    }

    let dates: Vec<NaiveDate> = grid.keys().copied().collect();
    let series = functions
        .into_iter()
        .map(|f| TimelineSeries {
            job_function: f.to_string(),
            color: function_color(f),
            counts: grid
                .values()
                .map(|row| row.get(f).copied().unwrap_or(0))
                .collect(),
        })
        .collect();

    Timeline { dates, series }
}
