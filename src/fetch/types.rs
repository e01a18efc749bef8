// src/fetch/types.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::fetch::error::StoreError;
use crate::records::JobRecord;

/// Which columns to request from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Every column.
    Full,
    /// `skills` + `job_function` only, restricted to the skills source.
    Skills,
}

impl Projection {
    pub fn columns(self) -> &'static str {
        match self {
            Projection::Full => "*",
            Projection::Skills => "skills,job_function",
        }
    }
}

/// One page request against the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub projection: Projection,
    pub posted_since: NaiveDate,
    /// Exact-match filter on the `source` column.
    pub source: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<JobRecord>, StoreError>;
    fn name(&self) -> &'static str;
}
