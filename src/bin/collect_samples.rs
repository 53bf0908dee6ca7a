#![forbid(unsafe_code)]

//! Collects a topic-balanced sample of public videos and writes
//! `youtube_sample.csv` plus the `videos` table in `youtube_videos.db`.
//!
//! Runs with no arguments; the only required input is `YOUTUBE_API_KEY`,
//! read from the environment or a `.env` file in the working directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use newtube_harvest::config::{SettingsOverrides, resolve_settings};
use newtube_harvest::pipeline;
use newtube_harvest::youtube::YouTubeClient;

#[derive(Debug, Parser)]
#[command(version, about = "Sample YouTube video metadata into CSV and SQLite")]
struct CollectArgs {
    /// dotenv file to read settings from
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// CSV output path
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Table replaced in the database
    #[arg(long)]
    table: Option<String>,

    /// Region code passed to search
    #[arg(long)]
    region: Option<String>,

    /// Maximum video ids collected per query
    #[arg(long)]
    max_results: Option<usize>,

    /// Topic query; repeat to replace the built-in topic list
    #[arg(long = "query", value_name = "TEXT")]
    queries: Vec<String>,
}

impl From<CollectArgs> for SettingsOverrides {
    fn from(args: CollectArgs) -> Self {
        SettingsOverrides {
            env_path: args.env_file,
            region_code: args.region,
            max_results: args.max_results,
            queries: args.queries,
            csv_path: args.csv,
            db_path: args.db,
            table: args.table,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = CollectArgs::parse();
    let settings = resolve_settings(args.into()).context("loading settings")?;
    let client = YouTubeClient::from_settings(&settings)?;

    info!(
        "Collecting up to {} videos per query for {} queries (region {})",
        settings.collect.max_results,
        settings.queries.len(),
        settings.collect.region_code
    );

    let report = pipeline::run(
        &client,
        &settings.queries,
        &settings.collect,
        &settings.output,
    )
    .await?;

    if !report.failures.is_empty() {
        info!(
            "{} request(s) failed and were skipped; see errors above.",
            report.failures.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_no_overrides() {
        let args = CollectArgs::try_parse_from(["collect_samples"]).unwrap();
        let overrides = SettingsOverrides::from(args);
        assert!(overrides.env_path.is_none());
        assert!(overrides.queries.is_empty());
        assert!(overrides.max_results.is_none());
    }

    #[test]
    fn flags_map_onto_overrides() {
        let args = CollectArgs::try_parse_from([
            "collect_samples",
            "--csv",
            "out/sample.csv",
            "--db",
            "out/sample.db",
            "--table",
            "samples",
            "--region",
            "US",
            "--max-results",
            "120",
            "--query",
            "rust",
            "--query",
            "systems programming",
        ])
        .unwrap();
        let overrides = SettingsOverrides::from(args);
        assert_eq!(overrides.csv_path, Some(PathBuf::from("out/sample.csv")));
        assert_eq!(overrides.db_path, Some(PathBuf::from("out/sample.db")));
        assert_eq!(overrides.table.as_deref(), Some("samples"));
        assert_eq!(overrides.region_code.as_deref(), Some("US"));
        assert_eq!(overrides.max_results, Some(120));
        assert_eq!(overrides.queries, vec!["rust", "systems programming"]);
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(CollectArgs::try_parse_from(["collect_samples", "--bogus"]).is_err());
    }
}
