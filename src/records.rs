// src/records.rs
//! Job records as served by the hosted store, plus the closed set of job functions.
//!
//! Rows arrive loosely typed (numbers as strings, skills either as a list or as a
//! JSON-encoded string, timestamps or plain dates). Everything is decoded leniently:
//! a field that cannot be read becomes `None` instead of rejecting the whole row.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Fallback chart colour for functions outside the closed set.
pub const UNCATEGORIZED_COLOR: &str = "#808080";

/// Store identifiers are integers in practice, but text keys are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

/// One job posting. Read-only; the ingestion pipeline owns the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default, rename = "my_id")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_function: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub salary_amount: Option<f64>,
    /// Raw skills column; use [`JobRecord::skills`] to read it.
    #[serde(default)]
    pub skills: Option<Value>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub job_url: Option<String>,
    #[serde(default, deserialize_with = "de_posted_date")]
    pub posted_date: Option<NaiveDate>,
}

impl JobRecord {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn company(&self) -> Option<&str> {
        non_empty(&self.company)
    }

    pub fn location(&self) -> Option<&str> {
        non_empty(&self.location)
    }

    pub fn job_function(&self) -> Option<&str> {
        non_empty(&self.job_function)
    }

    /// The closed-set category, or `None` for missing/unrecognised functions.
    pub fn category(&self) -> Option<JobFunction> {
        self.job_function().and_then(JobFunction::parse)
    }

    /// `salary_amount > 0` is the only salary signal; zero means "not stated".
    pub fn salary(&self) -> Option<f64> {
        self.salary_amount.filter(|v| v.is_finite() && *v > 0.0)
    }

    pub fn has_salary(&self) -> bool {
        self.salary().is_some()
    }

    /// Decoded skill tokens (empty when absent or undecodable).
    pub fn skills(&self) -> Vec<String> {
        decode_skills(self.skills.as_ref())
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.trim().is_empty())
}

/// Explicit decode step for the skills column.
///
/// Accepts a JSON array of strings or a string holding such an array. Anything else
/// (malformed JSON, objects, numbers) decodes to an empty list.
pub fn decode_skills(raw: Option<&Value>) -> Vec<String> {
    match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Vec::new();
            }
            match serde_json::from_str::<Value>(s) {
                Ok(v @ Value::Array(_)) => decode_skills(Some(&v)),
                Ok(_) => Vec::new(),
                Err(e) => {
                    tracing::debug!(target: "records", error = %e, "undecodable skills field");
                    Vec::new()
                }
            }
        }
        Some(_) => Vec::new(),
    }
}

fn de_lenient_f64<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn de_posted_date<'de, D>(d: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(Value::as_str).and_then(parse_day))
}

/// Calendar day of a `YYYY-MM-DD` date or an ISO-8601 timestamp.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let day = s.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// The closed set of job-function categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobFunction {
    EngineeringProductResearch,
    BusinessStrategyOperations,
    DataAnalytics,
    DesignArtCreative,
}

impl JobFunction {
    pub const ALL: [JobFunction; 4] = [
        JobFunction::EngineeringProductResearch,
        JobFunction::BusinessStrategyOperations,
        JobFunction::DataAnalytics,
        JobFunction::DesignArtCreative,
    ];

    pub fn label(self) -> &'static str {
        match self {
            JobFunction::EngineeringProductResearch => "Engineering, Product, and Research",
            JobFunction::BusinessStrategyOperations => "Business, Strategy, and Operations",
            JobFunction::DataAnalytics => "Data and Analytics",
            JobFunction::DesignArtCreative => "Design, Art, and Creative",
        }
    }

    /// Exact label match (surrounding whitespace ignored).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|f| f.label() == s)
    }

    /// Chart colour used by the stacked and pie views.
    pub fn color(self) -> &'static str {
        match self {
            JobFunction::EngineeringProductResearch => "#FFDAC1",
            JobFunction::BusinessStrategyOperations => "#FFFFBA",
            JobFunction::DataAnalytics => "#B5EAD7",
            JobFunction::DesignArtCreative => "#C7CEEA",
        }
    }
}

/// Colour for an arbitrary function label, grey when uncategorised.
pub fn function_color(label: &str) -> &'static str {
    JobFunction::parse(label)
        .map(JobFunction::color)
        .unwrap_or(UNCATEGORIZED_COLOR)
}

impl fmt::Display for JobFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for JobFunction {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for JobFunction {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        JobFunction::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown job function: {s}")))
    }
}
