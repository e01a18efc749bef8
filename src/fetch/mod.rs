// src/fetch/mod.rs
//! Record fetching: a sequential pager over any [`RecordSource`].
//!
//! Pages are requested strictly one after another. Paging stops on the first short
//! page or once the record cap is reached; any page failure aborts the whole fetch.

pub mod error;
pub mod postgrest;
pub mod types;

pub use error::StoreError;
pub use postgrest::PostgrestSource;
pub use types::{PageQuery, Projection, RecordSource};

use std::time::Instant;

use chrono::NaiveDate;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::config::StoreSettings;
use crate::records::JobRecord;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("store_pages_total", "Pages requested from the record store.");
        describe_counter!("store_records_total", "Records received from the record store.");
        describe_counter!("store_errors_total", "Failed record store fetches.");
        describe_histogram!("store_fetch_ms", "Wall time of a full paged fetch in milliseconds.");
    });
}

/// Paging limits and filters shared by every view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub page_size: usize,
    pub record_cap: usize,
    /// Only records posted on or after this day are requested.
    pub posted_since: NaiveDate,
    /// `source` value the skills projection is restricted to.
    pub skills_source: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        StoreSettings::default().fetch_settings()
    }
}

impl FetchSettings {
    fn page(&self, projection: Projection, offset: usize, limit: usize) -> PageQuery {
        let source = match projection {
            Projection::Full => None,
            Projection::Skills => Some(self.skills_source.clone()),
        };
        PageQuery {
            projection,
            posted_since: self.posted_since,
            source,
            offset,
            limit,
        }
    }
}

/// Fetch every matching record (up to the cap), newest first.
pub async fn fetch_all_records(
    source: &dyn RecordSource,
    settings: &FetchSettings,
    projection: Projection,
) -> Result<Vec<JobRecord>, StoreError> {
    ensure_metrics_described();
    let t0 = Instant::now();

    let page_size = settings.page_size.max(1);
    let cap = settings.record_cap;
    let mut out: Vec<JobRecord> = Vec::new();
    let mut offset = 0usize;

    while offset < cap {
        let limit = page_size.min(cap - offset);
        let query = settings.page(projection, offset, limit);
        counter!("store_pages_total").increment(1);

        let mut page = match source.fetch_page(&query).await {
            Ok(p) => p,
            Err(e) => {
                counter!("store_errors_total").increment(1);
                tracing::warn!(
                    target: "fetch",
                    error = %e,
                    source = source.name(),
                    offset,
                    "page fetch failed"
                );
                return Err(e);
            }
        };

        let received = page.len();
        if received > limit {
            tracing::warn!(target: "fetch", received, limit, "store returned an oversized page");
            page.truncate(limit);
        }
        tracing::debug!(target: "fetch", offset, limit, received, "page received");
        out.append(&mut page);

        if received < limit {
            break;
        }
        offset += page_size;
    }

    sort_newest_first(&mut out);

    counter!("store_records_total").increment(out.len() as u64);
    histogram!("store_fetch_ms").record(t0.elapsed().as_secs_f64() * 1000.0);
    tracing::info!(
        target: "fetch",
        records = out.len(),
        projection = projection.columns(),
        source = source.name(),
        "fetch complete"
    );
    Ok(out)
}

/// Descending by posting date; undated records go last, ties keep store order.
pub fn sort_newest_first(records: &mut [JobRecord]) {
    records.sort_by(|a, b| match (a.posted_date, b.posted_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::dashboard::DEFAULT_SKILLS_SOURCE;

    fn dated(day: Option<u32>, title: &str) -> JobRecord {
        JobRecord {
            title: Some(title.into()),
            posted_date: day.and_then(|d| NaiveDate::from_ymd_opt(2025, 4, d)),
            ..Default::default()
        }
    }

    #[test]
    fn undated_records_sort_last() {
        let mut v = vec![dated(None, "a"), dated(Some(2), "b"), dated(Some(9), "c")];
        sort_newest_first(&mut v);
        let titles: Vec<&str> = v.iter().map(JobRecord::title).collect();
        assert_eq!(titles, vec!["c", "b", "a"]);
    }

    #[test]
    fn skills_pages_carry_source_filter() {
        let s = FetchSettings::default();
        assert_eq!(s.page(Projection::Full, 0, 10).source, None);
        assert_eq!(
            s.page(Projection::Skills, 0, 10).source.as_deref(),
            Some(DEFAULT_SKILLS_SOURCE)
        );
    }
}
