use std::env;

use anyhow::{anyhow, Context, Result};

use crate::models::NormalizedListing;

const JOBS_TABLE: &str = "jobs";
const CONFLICT_KEY: &str = "jobId";

/// One keyed write per record. Implementations must give insert-or-update
/// semantics on the job identifier so re-ingesting is idempotent.
pub trait JobSink {
    fn upsert(&self, listing: &NormalizedListing) -> Result<()>;
}

/// REST client for the hosted jobs table.
pub struct SupabaseSink {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl SupabaseSink {
    /// Reads credentials from the environment; missing values fail here,
    /// before any collection work starts.
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("SUPABASE_URL").context(
            "SUPABASE_URL environment variable not set. Set it with: export SUPABASE_URL=https://<project>.supabase.co",
        )?;
        let api_key = env::var("SUPABASE_KEY")
            .context("SUPABASE_KEY environment variable not set. Use the project's service role key.")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::blocking::Client::new(),
        })
    }
}

impl JobSink for SupabaseSink {
    fn upsert(&self, listing: &NormalizedListing) -> Result<()> {
        let url = format!(
            "{}/rest/v1/{}?on_conflict={}",
            self.base_url, JOBS_TABLE, CONFLICT_KEY
        );

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(listing)
            .send()
            .context("Failed to send upsert request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Upsert failed with status {}: {}",
                status,
                error_text
            ));
        }

        Ok(())
    }
}
