// src/relay/prompts.rs
use crate::aggregate::{by_company, by_function, by_location, count_keys};
use crate::records::JobRecord;

/// Prompts shown even without any data.
pub const BASE_PROMPTS: [&str; 3] = [
    "What is the highest-paying job in each job function?",
    "Which country has the most job listings?",
    "Show me a bar chart of average salary by job function - labels should be fully visible.",
];

/// Base prompts followed by a few seeded from the current record set.
pub fn suggested_prompts(records: &[JobRecord]) -> Vec<String> {
    let mut out: Vec<String> = BASE_PROMPTS.iter().map(|p| p.to_string()).collect();

    if let Some(top) = by_company(records).buckets.first() {
        out.push(format!(
            "How many open roles does {} have, and in which job functions?",
            top.key
        ));
    }
    if let Some(place) = by_location(records)
        .buckets
        .iter()
        .find(|b| b.key != "Remote")
    {
        out.push(format!("Which companies are hiring in {}?", place.key));
    }
    if let Some(f) = by_function(records).functions.first() {
        out.push(format!(
            "What is the average salary for {} roles by country?",
            f.job_function
        ));
    }
    let skills: Vec<String> = records.iter().flat_map(JobRecord::skills).collect();
    if let Some((skill, _)) = count_keys(skills.iter().map(String::as_str)).first() {
        out.push(format!("Which job functions ask for {skill} most often?"));
    }

    out.dedup();
    out
}
