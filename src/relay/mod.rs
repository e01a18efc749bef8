// src/relay/mod.rs
//! Chat relay: forwards a free-text query to the analytics backend and classifies
//! whatever comes back. Every outcome, including transport failures, ends up as a
//! [`ClassifiedResponse`].

pub mod prompts;
pub mod session;

pub use prompts::{suggested_prompts, BASE_PROMPTS};
pub use session::{AskOutcome, ChatExchange, ChatMessage, ChatSession, QueryTicket, Role, GREETING};

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::RelaySettings;

pub const MSG_UNREACHABLE: &str = "Failed to reach the analytics service";
pub const MSG_MALFORMED: &str = "Malformed response from analytics service";
pub const MSG_MALFORMED_TABLE: &str = "Malformed table payload";
pub const MSG_NO_ANSWER: &str = "The analytics service could not answer this query";
pub const MSG_EMPTY_CHART: &str = "The analytics service returned an empty chart reference";

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_requests_total", "Queries forwarded to the analytics backend.");
        describe_counter!("relay_responses_total", "Classified relay responses by kind.");
        describe_counter!("relay_superseded_total", "Chat queries dropped because a newer one started.");
    });
}

/// Column of a decoded table response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableColumn {
    pub key: String,
    pub label: String,
}

/// What the chat panel should render for one query. Serialised `kind` values match
/// the backend's `type` names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifiedResponse {
    Error {
        message: String,
        code: Option<String>,
        detail: Option<String>,
    },
    #[serde(rename = "string")]
    Text {
        text: String,
    },
    Number {
        value: serde_json::Number,
    },
    #[serde(rename = "dataframe")]
    Table {
        columns: Vec<TableColumn>,
        rows: Vec<Map<String, Value>>,
    },
    Chart {
        url: String,
    },
    /// A `type` this client does not know how to render, echoed back as `type`.
    Unsupported {
        #[serde(rename = "type")]
        kind: String,
    },
}

impl ClassifiedResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedResponse::Error { .. } => "error",
            ClassifiedResponse::Text { .. } => "string",
            ClassifiedResponse::Number { .. } => "number",
            ClassifiedResponse::Table { .. } => "dataframe",
            ClassifiedResponse::Chart { .. } => "chart",
            ClassifiedResponse::Unsupported { .. } => "unsupported",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ClassifiedResponse::Error { .. })
    }

    fn error(message: impl Into<String>, detail: Option<String>) -> Self {
        ClassifiedResponse::Error {
            message: message.into(),
            code: None,
            detail,
        }
    }
}

/// Anything that can answer a chat query.
#[async_trait]
pub trait QueryRelay: Send + Sync {
    async fn relay(&self, query: &str, history: &[ChatExchange]) -> ClassifiedResponse;
    fn name(&self) -> &'static str;
}

/// HTTP relay to the analytics backend.
pub struct ChatRelay {
    client: reqwest::Client,
    base_url: String,
    chat_url: String,
}

impl ChatRelay {
    pub fn new(settings: &RelaySettings) -> Result<Self> {
        let base_url = settings.base_url.trim().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .context("building relay http client")?;
        let chat_url = format!("{}/{}", base_url, settings.chat_path.trim().trim_start_matches('/'));
        Ok(Self {
            client,
            base_url,
            chat_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl QueryRelay for ChatRelay {
    async fn relay(&self, query: &str, history: &[ChatExchange]) -> ClassifiedResponse {
        ensure_metrics_described();
        counter!("relay_requests_total").increment(1);
        tracing::debug!(target: "relay", history = history.len(), "forwarding query");

        let body = serde_json::json!({ "query": query });
        let classified = match self.client.post(&self.chat_url).json(&body).send().await {
            Ok(resp) => {
                let status = resp.status();
                match resp.bytes().await {
                    Ok(bytes) => classify(status.as_u16(), &bytes, &self.base_url),
                    Err(e) => {
                        tracing::warn!(target: "relay", error = %e, "reading relay body failed");
                        ClassifiedResponse::error(MSG_UNREACHABLE, Some(e.to_string()))
                    }
                }
            }
            Err(e) => {
                tracing::warn!(target: "relay", error = %e, url = %self.chat_url, "relay request failed");
                ClassifiedResponse::error(MSG_UNREACHABLE, Some(e.to_string()))
            }
        };

        counter!("relay_responses_total", "kind" => classified.kind()).increment(1);
        classified
    }

    fn name(&self) -> &'static str {
        "analytics-http"
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    result: Option<Payload>,
    error: Option<BackendError>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    code: Value,
    #[serde(default)]
    error_details: Value,
}

#[derive(Debug, Deserialize)]
struct BackendError {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Classify a relay reply from its HTTP status and raw body.
pub fn classify(status: u16, body: &[u8], base_url: &str) -> ClassifiedResponse {
    let envelope = serde_json::from_slice::<Envelope>(body);

    if !(200..300).contains(&status) {
        let detail = envelope
            .ok()
            .and_then(|e| e.error)
            .and_then(|e| match (e.kind, e.message) {
                (Some(k), Some(m)) => Some(format!("{k}: {m}")),
                (None, Some(m)) => Some(m),
                _ => None,
            });
        return ClassifiedResponse::error(
            format!("Analytics service returned HTTP {status}"),
            detail,
        );
    }

    let envelope = match envelope {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(target: "relay", error = %e, "undecodable relay reply");
            return ClassifiedResponse::error(MSG_MALFORMED, Some(e.to_string()));
        }
    };
    match envelope.result {
        Some(payload) => classify_payload(payload, base_url),
        None => ClassifiedResponse::error(
            MSG_MALFORMED,
            envelope.error.and_then(|e| e.message),
        ),
    }
}

fn classify_payload(p: Payload, base_url: &str) -> ClassifiedResponse {
    let kind = p.kind.unwrap_or_default();
    match kind.as_str() {
        "error" => ClassifiedResponse::Error {
            message: value_text(&p.value).unwrap_or_else(|| MSG_NO_ANSWER.to_string()),
            code: value_text(&p.code),
            detail: value_text(&p.error_details),
        },
        "string" => ClassifiedResponse::Text {
            text: value_text(&p.value).unwrap_or_default(),
        },
        "number" => match number_of(&p.value) {
            Some(value) => ClassifiedResponse::Number { value },
            None => ClassifiedResponse::Text {
                text: value_text(&p.value).unwrap_or_default(),
            },
        },
        "dataframe" => match decode_table(&p.value) {
            Some((columns, rows)) => ClassifiedResponse::Table { columns, rows },
            None => ClassifiedResponse::error(MSG_MALFORMED_TABLE, None),
        },
        "chart" => match p.value.as_str().map(str::trim).filter(|s| !s.is_empty()) {
            Some(reference) => ClassifiedResponse::Chart {
                url: resolve_chart_url(base_url, reference),
            },
            None => ClassifiedResponse::error(MSG_EMPTY_CHART, None),
        },
        other => {
            tracing::debug!(target: "relay", kind = other, "unrenderable response type");
            ClassifiedResponse::Unsupported {
                kind: other.to_string(),
            }
        }
    }
}

/// Strings stay as-is; other non-null values are rendered as compact JSON.
fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn number_of(v: &Value) -> Option<serde_json::Number> {
    match v {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .map(serde_json::Number::from)
                .or_else(|| s.parse::<f64>().ok().and_then(serde_json::Number::from_f64))
        }
        _ => None,
    }
}

/// Row-oriented table, either already decoded or JSON-encoded in a string.
fn decode_table(v: &Value) -> Option<(Vec<TableColumn>, Vec<Map<String, Value>>)> {
    let decoded;
    let v = match v {
        Value::String(s) => {
            decoded = serde_json::from_str::<Value>(s).ok()?;
            &decoded
        }
        other => other,
    };
    let rows = v
        .as_array()?
        .iter()
        .map(|row| row.as_object().cloned())
        .collect::<Option<Vec<_>>>()?;
    let columns = rows
        .first()
        .map(|first| {
            first
                .keys()
                .map(|k| TableColumn {
                    key: k.clone(),
                    label: capitalize(k),
                })
                .collect()
        })
        .unwrap_or_default();
    Some((columns, rows))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Absolute http(s)/data URLs pass through, `//host/..` takes the scheme of `base_url`,
/// anything else is joined onto `base_url`.
pub fn resolve_chart_url(base_url: &str, reference: &str) -> String {
    let reference = reference.trim();
    if let Ok(url) = reqwest::Url::parse(reference) {
        if matches!(url.scheme(), "http" | "https" | "data") {
            return reference.to_string();
        }
    }
    // Protocol-relative: keep the host, borrow the base's scheme.
    if let Some(rest) = reference.strip_prefix("//") {
        let scheme = reqwest::Url::parse(base_url)
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|_| "http".to_string());
        return format!("{scheme}://{rest}");
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        reference.trim_start_matches('/')
    )
}
