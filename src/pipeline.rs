use chrono::Utc;

use crate::collect::{self, JobSource, SearchConfig};
use crate::normalize;
use crate::sheet;
use crate::sink::JobSink;

/// Per-run accounting. Every recovered failure is counted here instead of
/// being silently discarded, and the totals are printed at the end of the
/// run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub queries_run: usize,
    pub queries_failed: usize,
    pub raw_collected: usize,
    pub duplicates_skipped: usize,
    pub filtered_out: usize,
    pub written: usize,
    pub write_failures: usize,
    pub sheet_rows: usize,
    pub sheet_written: usize,
    pub sheet_failures: usize,
}

/// Collect → dedup → filter/normalize → upsert. Per-record write failures
/// are logged and counted; nothing here aborts the run.
pub fn run_scrape_pass(
    source: &dyn JobSource,
    sink: &dyn JobSink,
    config: &SearchConfig,
    dry_run: bool,
    stats: &mut RunStats,
) {
    println!(
        "Collecting listings for {} search terms...",
        config.queries.len()
    );
    let raw = collect::collect_all(source, config, stats);
    stats.raw_collected = raw.len();
    if raw.is_empty() {
        println!("No listings collected this run.");
        return;
    }

    let (unique, duplicates) = normalize::dedup_by_id(raw);
    stats.duplicates_skipped = duplicates;

    let now = Utc::now();
    for record in &unique {
        let Some(listing) = normalize::normalize(record, config, now) else {
            stats.filtered_out += 1;
            continue;
        };

        if dry_run {
            println!(
                "[DRY RUN] Would upsert: {} at {} ({})",
                listing.title, listing.company_name, listing.source
            );
            continue;
        }

        match sink.upsert(&listing) {
            Ok(()) => stats.written += 1,
            Err(e) => {
                stats.write_failures += 1;
                eprintln!("  Upsert failed for job {}: {}", listing.job_id, e);
            }
        }
    }
}

/// Imports the curated sheet through the same sink contract. Any fetch or
/// parse failure skips the whole pass; per-row write failures are counted
/// and the loop continues.
pub fn run_sheet_pass(
    sink: &dyn JobSink,
    config: &SearchConfig,
    url: &str,
    dry_run: bool,
    stats: &mut RunStats,
) {
    println!("Fetching curated sheet...");
    let client = reqwest::blocking::Client::new();
    let text = match sheet::fetch_sheet_csv(&client, url) {
        Ok(text) => text,
        Err(e) => {
            stats.sheet_failures += 1;
            eprintln!("  Sheet fetch failed, skipping curated feed: {}", e);
            return;
        }
    };

    let listings = match sheet::parse_sheet(&text, config, Utc::now()) {
        Ok(listings) => listings,
        Err(e) => {
            stats.sheet_failures += 1;
            eprintln!("  Sheet parse failed, skipping curated feed: {}", e);
            return;
        }
    };

    for listing in listings {
        stats.sheet_rows += 1;

        if dry_run {
            println!(
                "[DRY RUN] Would upsert: {} at {} ({})",
                listing.title, listing.company_name, listing.source
            );
            continue;
        }

        match sink.upsert(&listing) {
            Ok(()) => stats.sheet_written += 1,
            Err(e) => {
                stats.sheet_failures += 1;
                eprintln!("  Upsert failed for sheet row {}: {}", listing.job_id, e);
            }
        }
    }
}
