mod collect;
mod models;
mod normalize;
mod pipeline;
mod sheet;
mod sink;

use anyhow::Result;
use clap::{Parser, Subcommand};

use collect::{ScrapeApiSource, SearchConfig};
use pipeline::RunStats;
use sink::SupabaseSink;

#[derive(Parser)]
#[command(name = "archjobs")]
#[command(about = "Architecture job ingestion - collect, normalize, and sync listings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: scrape pass, then the curated sheet pass
    Run {
        /// Show what would be written without touching the sink
        #[arg(long)]
        dry_run: bool,

        /// Skip the curated sheet pass
        #[arg(long)]
        skip_sheet: bool,

        /// Override the published sheet CSV URL
        #[arg(long)]
        sheet_url: Option<String>,
    },

    /// Run the scrape pass only
    Jobs {
        /// Show what would be written without touching the sink
        #[arg(long)]
        dry_run: bool,
    },

    /// Import the curated sheet only
    Sheet {
        /// Show what would be written without touching the sink
        #[arg(long)]
        dry_run: bool,

        /// Override the published sheet CSV URL
        #[arg(long)]
        url: Option<String>,
    },
}

fn resolve_sheet_url(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("SHEET_CSV_URL").ok())
        .unwrap_or_else(|| sheet::DEFAULT_SHEET_CSV_URL.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SearchConfig::default();
    let sink = SupabaseSink::from_env()?;
    let mut stats = RunStats::default();

    match cli.command {
        Commands::Run {
            dry_run,
            skip_sheet,
            sheet_url,
        } => {
            let source = ScrapeApiSource::from_env();
            pipeline::run_scrape_pass(&source, &sink, &config, dry_run, &mut stats);
            // The curated sheet runs regardless of how the scrape pass went.
            if !skip_sheet {
                pipeline::run_sheet_pass(
                    &sink,
                    &config,
                    &resolve_sheet_url(sheet_url),
                    dry_run,
                    &mut stats,
                );
            }
            print_summary(&stats, dry_run);
        }

        Commands::Jobs { dry_run } => {
            let source = ScrapeApiSource::from_env();
            pipeline::run_scrape_pass(&source, &sink, &config, dry_run, &mut stats);
            print_summary(&stats, dry_run);
        }

        Commands::Sheet { dry_run, url } => {
            pipeline::run_sheet_pass(&sink, &config, &resolve_sheet_url(url), dry_run, &mut stats);
            print_summary(&stats, dry_run);
        }
    }

    Ok(())
}

fn print_summary(stats: &RunStats, dry_run: bool) {
    println!("\nResults:");
    println!(
        "  Queries run:    {} ({} failed)",
        stats.queries_run, stats.queries_failed
    );
    println!("  Raw collected:  {}", stats.raw_collected);
    println!("  Duplicates:     {}", stats.duplicates_skipped);
    println!("  Filtered out:   {}", stats.filtered_out);
    println!("  Written:        {}", stats.written);
    if stats.write_failures > 0 {
        println!("  Write failures: {}", stats.write_failures);
    }
    println!(
        "  Sheet rows:     {} ({} written, {} failed)",
        stats.sheet_rows, stats.sheet_written, stats.sheet_failures
    );

    if dry_run {
        println!("\n(Dry run - nothing was written)");
    }
}
