// src/fetch/postgrest.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::StoreSettings;
use crate::fetch::error::StoreError;
use crate::fetch::types::{PageQuery, RecordSource};
use crate::records::JobRecord;

/// Read-only client for a PostgREST table (the hosted store's REST surface).
pub struct PostgrestSource {
    http: reqwest::Client,
    endpoint: String,
    key: String,
}

#[derive(Debug, Default, Deserialize)]
struct PostgrestErrorBody {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl PostgrestSource {
    pub fn new(settings: &StoreSettings) -> Result<Self, StoreError> {
        let base = settings.url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(StoreError::NotConfigured(
                "store url is empty (set SUPABASE_URL)".into(),
            ));
        }
        if settings.key.trim().is_empty() {
            return Err(StoreError::NotConfigured(
                "store key is empty (set SUPABASE_KEY)".into(),
            ));
        }
        if settings.table.trim().is_empty() {
            return Err(StoreError::NotConfigured("store table is empty".into()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("crypto-jobs-dashboard/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/rest/v1/{}", base, settings.table.trim()),
            key: settings.key.trim().to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn query_params(q: &PageQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("select", q.projection.columns().to_string()),
        ("posted_date", format!("gte.{}", q.posted_since.format("%Y-%m-%d"))),
    ];
    if let Some(src) = &q.source {
        params.push(("source", format!("eq.{src}")));
    }
    params.push(("offset", q.offset.to_string()));
    params.push(("limit", q.limit.to_string()));
    params
}

fn api_error(status: u16, body: &[u8]) -> StoreError {
    let parsed: PostgrestErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| {
        let raw = String::from_utf8_lossy(body).trim().to_string();
        if raw.is_empty() {
            "empty response body".to_string()
        } else {
            raw
        }
    });
    StoreError::Api {
        status,
        code: parsed.code,
        message,
        details: parsed.details,
        hint: parsed.hint,
    }
}

#[async_trait]
impl RecordSource for PostgrestSource {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<JobRecord>, StoreError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&query_params(query))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Vec::new());
        }
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_slice::<Vec<JobRecord>>(&body)?)
    }

    fn name(&self) -> &'static str {
        "postgrest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Projection;
    use chrono::NaiveDate;

    #[test]
    fn params_follow_postgrest_operators() {
        let q = PageQuery {
            projection: Projection::Skills,
            posted_since: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            source: Some("cryptojobs.com".into()),
            offset: 1000,
            limit: 500,
        };
        let params = query_params(&q);
        assert!(params.contains(&("select", "skills,job_function".into())));
        assert!(params.contains(&("posted_date", "gte.2025-03-01".into())));
        assert!(params.contains(&("source", "eq.cryptojobs.com".into())));
        assert!(params.contains(&("offset", "1000".into())));
        assert!(params.contains(&("limit", "500".into())));
    }

    #[test]
    fn error_body_fields_are_kept() {
        let body = br#"{"message":"permission denied for table jobs_clean","code":"42501","details":null,"hint":null}"#;
        match api_error(401, body) {
            StoreError::Api { status, code, message, .. } => {
                assert_eq!(status, 401);
                assert_eq!(code.as_deref(), Some("42501"));
                assert!(message.contains("permission denied"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        match api_error(503, b"upstream down") {
            StoreError::Api { message, .. } => assert_eq!(message, "upstream down"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let settings = StoreSettings::default();
        assert!(matches!(
            PostgrestSource::new(&settings),
            Err(StoreError::NotConfigured(_))
        ));
    }
}
