use std::env;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::RawListing;
use crate::pipeline::RunStats;

/// The production search rotation. One query per term, every run.
pub const DEFAULT_SEARCH_QUERIES: &[&str] = &[
    "Architectural Assistant",
    "Landscape Architecture Intern",
    "Urban Planning Intern",
    "Architectural Drafter",
];

pub const DEFAULT_SITES: &[&str] = &["indeed", "linkedin"];

const DEFAULT_JOBS_API_URL: &str = "http://127.0.0.1:8000/api/v1/search_jobs";

/// Everything the pipeline needs to know about a run, in one place instead
/// of constants scattered across call sites.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub queries: Vec<String>,
    pub location: String,
    pub country: String,
    pub hours_old: u32,
    pub results_wanted: u32,
    pub sites: Vec<String>,
    /// When set, created_at mirrors the resolved posting date so "days ago"
    /// displays stay consistent; when unset, created_at records ingestion
    /// time.
    pub created_at_mirrors_posted: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            queries: DEFAULT_SEARCH_QUERIES
                .iter()
                .map(|q| q.to_string())
                .collect(),
            location: "India".to_string(),
            country: "India".to_string(),
            hours_old: 24,
            results_wanted: 30,
            sites: DEFAULT_SITES.iter().map(|s| s.to_string()).collect(),
            created_at_mirrors_posted: true,
        }
    }
}

/// One search against the aggregation source. Implementations own their
/// transport; the pipeline only sees batches of raw listings.
pub trait JobSource {
    fn search(&self, config: &SearchConfig, query: &str) -> Result<Vec<RawListing>>;
}

/// Client for the self-hosted job scraping API.
pub struct ScrapeApiSource {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl ScrapeApiSource {
    pub fn from_env() -> Self {
        let endpoint =
            env::var("JOBS_API_URL").unwrap_or_else(|_| DEFAULT_JOBS_API_URL.to_string());
        Self {
            endpoint,
            client: reqwest::blocking::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    site_name: &'a [String],
    search_term: &'a str,
    location: &'a str,
    results_wanted: u32,
    hours_old: u32,
    country_indeed: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    jobs: Vec<RawListing>,
}

impl JobSource for ScrapeApiSource {
    fn search(&self, config: &SearchConfig, query: &str) -> Result<Vec<RawListing>> {
        let request = SearchRequest {
            site_name: &config.sites,
            search_term: query,
            location: &config.location,
            results_wanted: config.results_wanted,
            hours_old: config.hours_old,
            country_indeed: &config.country,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .context("Failed to reach the job search API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Job search API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let body: SearchResponse = response
            .json()
            .context("Failed to parse job search API response")?;
        Ok(body.jobs)
    }
}

/// Runs one search per configured term. A failed term is logged and
/// skipped; partial results are expected. No retries.
pub fn collect_all(
    source: &dyn JobSource,
    config: &SearchConfig,
    stats: &mut RunStats,
) -> Vec<RawListing> {
    let mut all = Vec::new();
    for query in &config.queries {
        eprint!("  {} ... ", query);
        stats.queries_run += 1;
        match source.search(config, query) {
            Ok(batch) => {
                eprintln!("{} listings", batch.len());
                all.extend(batch);
            }
            Err(e) => {
                stats.queries_failed += 1;
                eprintln!("failed: {}", e);
            }
        }
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakySource;

    impl JobSource for FlakySource {
        fn search(&self, _config: &SearchConfig, query: &str) -> Result<Vec<RawListing>> {
            if query.contains("Landscape") {
                return Err(anyhow!("rate limited"));
            }
            let json = format!(
                r#"{{"id": "{}", "title": "Junior Architect", "site": "indeed",
                    "job_url": "https://in.indeed.com/viewjob?jk=1"}}"#,
                query.to_lowercase().replace(' ', "-")
            );
            Ok(vec![serde_json::from_str(&json).unwrap()])
        }
    }

    #[test]
    fn test_search_config_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.queries.len(), 4);
        assert_eq!(config.location, "India");
        assert_eq!(config.hours_old, 24);
        assert_eq!(config.results_wanted, 30);
        assert_eq!(config.sites, vec!["indeed", "linkedin"]);
        assert!(config.created_at_mirrors_posted);
    }

    #[test]
    fn test_collect_all_skips_failed_terms() {
        let config = SearchConfig::default();
        let mut stats = RunStats::default();
        let batches = collect_all(&FlakySource, &config, &mut stats);

        // Four terms, one fails, the other three each return a listing.
        assert_eq!(stats.queries_run, 4);
        assert_eq!(stats.queries_failed, 1);
        assert_eq!(batches.len(), 3);
    }
}
