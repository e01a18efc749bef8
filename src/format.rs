// src/format.rs
//! Presentation helpers: percentages, currency strings, top-N slices, and the
//! overview narrative.

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{by_company, by_function, by_location, dataset_span};
use crate::records::{JobFunction, JobRecord};

/// Rounding applied uniformly within one aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Whole,
    OneDecimal,
}

impl Precision {
    pub fn round(self, v: f64) -> f64 {
        match self {
            Precision::Whole => v.round(),
            Precision::OneDecimal => (v * 10.0).round() / 10.0,
        }
    }
}

/// `count / total * 100`, rounded. A zero denominator yields 0.
pub fn percent(count: usize, total: usize, precision: Precision) -> f64 {
    if total == 0 {
        return 0.0;
    }
    precision.round(count as f64 * 100.0 / total as f64)
}

pub fn format_percent(value: f64, precision: Precision) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    match precision {
        Precision::Whole => format!("{:.0}%", value),
        Precision::OneDecimal => format!("{:.1}%", value),
    }
}

/// en-US dollars with no decimals: `123456.7` → `"$123,457"`.
pub fn format_usd(amount: f64) -> String {
    let amount = if amount.is_finite() { amount } else { 0.0 };
    let whole = amount.round();
    let sign = if whole < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(whole.abs() as u64))
}

/// Average salary cell of the function table.
pub fn format_salary(average: f64) -> String {
    if average > 0.0 {
        format_usd(average)
    } else {
        "No salary data".to_string()
    }
}

/// Salary column of the listings table: grouped digits or a dash.
pub fn format_amount(amount: Option<f64>) -> String {
    match amount.filter(|v| v.is_finite() && *v > 0.0) {
        Some(v) => group_thousands(v.round() as u64),
        None => "-".to_string(),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// First `n` items (fewer when the input is shorter).
pub fn top_n<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    items.iter().take(n).cloned().collect()
}

/// One line of the per-function summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionLine {
    pub job_function: JobFunction,
    pub count: usize,
    pub percentage: String,
    pub average_salary: String,
}

/// Numbers behind the overview narrative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Takeaways {
    pub total_jobs: usize,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
    pub countries: usize,
    pub remote_share: String,
    pub united_states_share: String,
    /// Every closed-set function, in canonical order (zeros when absent).
    pub functions: Vec<FunctionLine>,
    pub highest_paid: Option<JobFunction>,
    pub salary_info_share: String,
    pub companies: usize,
    pub companies_over_ten_share: String,
}

impl Takeaways {
    pub fn from_records(records: &[JobRecord]) -> Self {
        let span = dataset_span(records);
        let locations = by_location(records);
        let companies = by_company(records);
        let functions = by_function(records);

        let share_of = |key: &str| {
            locations
                .get(key)
                .map(|b| format_percent(b.percentage, locations.precision))
                .unwrap_or_else(|| "0%".to_string())
        };

        let lines = JobFunction::ALL
            .into_iter()
            .map(|f| match functions.get(f) {
                Some(s) => FunctionLine {
                    job_function: f,
                    count: s.count,
                    percentage: format_percent(s.percentage, Precision::Whole),
                    average_salary: format_usd(s.average_salary),
                },
                None => FunctionLine {
                    job_function: f,
                    count: 0,
                    percentage: "0%".to_string(),
                    average_salary: format_usd(0.0),
                },
            })
            .collect();

        let over_ten = companies.buckets.iter().filter(|b| b.count > 10).count();

        Self {
            total_jobs: span.total_records,
            earliest: span.earliest,
            latest: span.latest,
            countries: span.countries,
            remote_share: share_of("Remote"),
            united_states_share: share_of("United States"),
            functions: lines,
            highest_paid: functions.highest_paid().map(|s| s.job_function),
            salary_info_share: format_percent(
                percent(functions.jobs_with_salary(), functions.total, Precision::Whole),
                Precision::Whole,
            ),
            companies: companies.buckets.len(),
            companies_over_ten_share: format_percent(
                percent(over_ten, companies.buckets.len(), Precision::OneDecimal),
                Precision::OneDecimal,
            ),
        }
    }

    /// Markdown rendering of the overview panel.
    pub fn to_markdown(&self) -> String {
        let day = |d: Option<NaiveDate>| d.map_or_else(|| "N/A".to_string(), |d| d.to_string());
        let mut out = String::new();
        out.push_str("### Dataset\n");
        out.push_str(&format!(
            "- Date range: {} to {}\n- Listings: {}\n\n",
            day(self.earliest),
            day(self.latest),
            self.total_jobs
        ));
        out.push_str("### Locations\n");
        out.push_str(&format!(
            "- Listings are from {} unique countries.\n- Remote roles make up {} of the market, followed by US-based positions at {}.\n\n",
            self.countries, self.remote_share, self.united_states_share
        ));
        out.push_str("### Listings by Job Functions\n");
        for line in &self.functions {
            out.push_str(&format!(
                "- {}: {} ({})\n",
                line.job_function, line.count, line.percentage
            ));
        }
        out.push_str("\n### Average Salary\n");
        for line in &self.functions {
            out.push_str(&format!("- {}: {}\n", line.job_function, line.average_salary));
        }
        if let Some(top) = self.highest_paid {
            out.push_str(&format!("- Highest-paying function: {top}\n"));
        }
        out.push_str(&format!(
            "- {} of categorized listings state a salary.\n\n",
            self.salary_info_share
        ));
        out.push_str("### Companies\n");
        out.push_str(&format!(
            "- Listings are from {} unique companies.\n- Most companies report 1-5 open roles, but some companies ({}) report 10+ open roles.\n",
            self.companies, self.companies_over_ten_share
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn precision_rounding() {
        assert_eq!(Precision::OneDecimal.round(33.333), 33.3);
        assert_eq!(Precision::Whole.round(66.6), 67.0);
    }
}
