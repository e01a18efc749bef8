// tests/common/mod.rs
//
// Shared builders and in-memory fakes for integration tests.
#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crypto_jobs_dashboard::fetch::{PageQuery, RecordSource, StoreError};
use crypto_jobs_dashboard::JobRecord;

pub const ENG: &str = "Engineering, Product, and Research";
pub const BIZ: &str = "Business, Strategy, and Operations";
pub const DATA: &str = "Data and Analytics";
pub const DESIGN: &str = "Design, Art, and Creative";

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Small builder so tests only spell out the fields they care about.
#[derive(Default, Clone)]
pub struct Rec(JobRecord);

impl Rec {
    pub fn new(title: &str) -> Self {
        Rec(JobRecord {
            title: Some(title.to_string()),
            ..Default::default()
        })
    }
    pub fn company(mut self, v: &str) -> Self {
        self.0.company = Some(v.to_string());
        self
    }
    pub fn location(mut self, v: &str) -> Self {
        self.0.location = Some(v.to_string());
        self
    }
    pub fn function(mut self, v: &str) -> Self {
        self.0.job_function = Some(v.to_string());
        self
    }
    pub fn salary(mut self, v: f64) -> Self {
        self.0.salary_amount = Some(v);
        self
    }
    pub fn posted(mut self, d: NaiveDate) -> Self {
        self.0.posted_date = Some(d);
        self
    }
    pub fn skills(mut self, v: serde_json::Value) -> Self {
        self.0.skills = Some(v);
        self
    }
    pub fn build(self) -> JobRecord {
        self.0
    }
}

/// Serves `records` page by page and logs every query it sees.
pub struct FakeSource {
    records: Vec<JobRecord>,
    pub seen: Mutex<Vec<PageQuery>>,
    fail_at_offset: Option<usize>,
}

impl FakeSource {
    pub fn new(records: Vec<JobRecord>) -> Self {
        Self {
            records,
            seen: Mutex::new(Vec::new()),
            fail_at_offset: None,
        }
    }

    pub fn failing_at(mut self, offset: usize) -> Self {
        self.fail_at_offset = Some(offset);
        self
    }

    pub fn queries(&self) -> Vec<PageQuery> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSource for FakeSource {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<JobRecord>, StoreError> {
        self.seen.lock().unwrap().push(query.clone());
        if self.fail_at_offset == Some(query.offset) {
            return Err(StoreError::Api {
                status: 500,
                code: None,
                message: "boom".into(),
                details: None,
                hint: None,
            });
        }
        Ok(self
            .records
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// `n` records dated over ~90 days in a scrambled order.
pub fn dated_records(n: usize) -> Vec<JobRecord> {
    (0..n)
        .map(|i| {
            let offset = ((i * 37) % 90) as u64;
            Rec::new(&format!("job-{i}"))
                .posted(day(2025, 3, 1) + chrono::Days::new(offset))
                .build()
        })
        .collect()
}
