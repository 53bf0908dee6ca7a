#![forbid(unsafe_code)]

//! Drives a full collection run: search every topic, fetch details, dedupe,
//! then write the CSV and the SQLite table.

use anyhow::{Result, ensure};
use log::{info, warn};

use crate::config::{CollectOptions, OutputPaths};
use crate::details::fetch_video_details;
use crate::error::FailureNote;
use crate::export::write_csv;
use crate::metadata::MetadataStore;
use crate::record::{VideoRecord, dedupe_last_wins};
use crate::search::collect_video_ids;
use crate::youtube::VideoApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryReport {
    pub query: String,
    pub ids_found: usize,
    pub rows_fetched: usize,
}

/// Rows gathered across all queries, before deduplication.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub rows: Vec<VideoRecord>,
    pub queries: Vec<QueryReport>,
    pub failures: Vec<FailureNote>,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub queries: Vec<QueryReport>,
    pub failures: Vec<FailureNote>,
    pub collected_rows: usize,
    pub unique_rows: usize,
    /// False when nothing was collected and both outputs were left untouched.
    pub written: bool,
}

/// Runs search and detail lookups for each query, one after another.
pub fn collect_all<A: VideoApi + ?Sized>(
    api: &A,
    queries: &[String],
    options: &CollectOptions,
) -> Collection {
    let mut collection = Collection::default();

    for query in queries {
        info!("Searching for query: '{query}'...");
        let search = collect_video_ids(api, query, options);
        info!(" -> Found {} video IDs.", search.ids.len());
        collection.failures.extend(search.failure);

        let mut rows_fetched = 0;
        if !search.ids.is_empty() {
            let details = fetch_video_details(api, query, &search.ids, options);
            rows_fetched = details.rows.len();
            info!(" -> Fetched details for {rows_fetched} videos.");
            collection.rows.extend(details.rows);
            collection.failures.extend(details.failures);
        }

        collection.queries.push(QueryReport {
            query: query.clone(),
            ids_found: search.ids.len(),
            rows_fetched,
        });
    }

    collection
}

/// Collects, dedupes and persists. Returns early without touching `output`
/// when no rows came back at all.
pub async fn run<A: VideoApi + ?Sized>(
    api: &A,
    queries: &[String],
    options: &CollectOptions,
    output: &OutputPaths,
) -> Result<RunReport> {
    let Collection {
        rows,
        queries: query_reports,
        failures,
    } = collect_all(api, queries, options);

    let mut report = RunReport {
        queries: query_reports,
        failures,
        collected_rows: rows.len(),
        ..RunReport::default()
    };

    for failure in &report.failures {
        warn!("Recovered failure: {failure}");
    }

    if rows.is_empty() {
        info!("No video data was collected. Exiting.");
        return Ok(report);
    }

    let unique = dedupe_last_wins(rows);
    report.unique_rows = unique.len();

    write_csv(&output.csv_path, &unique)?;
    let store = MetadataStore::open(&output.db_path, &output.table).await?;
    store.replace_all(&unique).await?;
    let stored = store.count().await?;
    ensure!(
        usize::try_from(stored).is_ok_and(|stored| stored == unique.len()),
        "table {} holds {stored} rows after writing {}",
        output.table,
        unique.len()
    );
    report.written = true;

    info!(
        "Saved {} unique videos to '{}' and '{}'.",
        report.unique_rows,
        output.csv_path.display(),
        output.db_path.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::youtube::fake::{FakeApi, bare_item, ids, video_item, video_page};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    fn options() -> CollectOptions {
        CollectOptions {
            request_delay: Duration::ZERO,
            failure_backoff: Duration::ZERO,
            ..CollectOptions::default()
        }
    }

    fn output_in(dir: &Path) -> OutputPaths {
        OutputPaths {
            csv_path: dir.join("youtube_sample.csv"),
            db_path: dir.join("youtube_videos.db"),
            table: "videos".into(),
        }
    }

    fn queries(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn music_end_to_end_writes_both_outputs() -> Result<()> {
        let first = ids("m", 50);
        let second = ids("n", 12);
        let untagged = second[11].clone();
        let api = FakeApi::new()
            .with_page("music", video_page(&first, Some("PAGE2")))
            .with_page("music", video_page(&second, None))
            .with_videos(first.iter().chain(&second[..11]).map(|id| video_item(id)))
            .with_videos([bare_item(&untagged)]);
        let dir = tempdir()?;
        let output = output_in(dir.path());

        let report = run(&api, &queries(&["music"]), &options(), &output).await?;

        let batches: Vec<_> = api.detail_calls.borrow().iter().map(Vec::len).collect();
        assert_eq!(batches, vec![50, 12]);
        assert!(report.written);
        assert_eq!(report.unique_rows, 62);
        assert!(report.failures.is_empty());
        assert_eq!(
            report.queries,
            vec![QueryReport {
                query: "music".into(),
                ids_found: 62,
                rows_fetched: 62
            }]
        );

        let csv = fs::read_to_string(&output.csv_path)?;
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 63);
        assert_eq!(lines[0], crate::record::COLUMNS.join(","));
        let last = lines[62];
        assert!(last.starts_with(&format!("{untagged},Bare {untagged},,[],")));

        let store = MetadataStore::open(&output.db_path, &output.table).await?;
        let stored = store.load_all().await?;
        assert_eq!(stored.len(), 62);
        let stored_ids: Vec<_> = stored.iter().map(|row| row.video_id.clone()).collect();
        let expected: Vec<_> = first.iter().chain(&second).cloned().collect();
        assert_eq!(stored_ids, expected);
        assert_eq!(stored[61].tags, "[]");
        assert_eq!(stored[61].like_count, None);
        Ok(())
    }

    #[tokio::test]
    async fn failed_sports_batch_does_not_stop_the_run() -> Result<()> {
        let sports = ids("s", 60);
        let news = ids("n", 5);
        let api = FakeApi::new()
            .with_page("sports", video_page(&sports, None))
            .with_page("news", video_page(&news, None))
            .with_videos(sports.iter().chain(&news).map(|id| video_item(id)))
            .failing_for([sports[0].clone()]);
        let dir = tempdir()?;
        let output = output_in(dir.path());

        let report = run(&api, &queries(&["sports", "news"]), &options(), &output).await?;

        assert!(report.written);
        assert_eq!(report.unique_rows, 10 + 5);
        assert_eq!(report.queries[0].rows_fetched, 10);
        assert_eq!(report.queries[1].rows_fetched, 5);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, Stage::Details);
        assert_eq!(report.failures[0].query, "sports");

        let store = MetadataStore::open(&output.db_path, &output.table).await?;
        let stored = store.load_all().await?;
        assert!(stored.iter().all(|row| !sports[..50].contains(&row.video_id)));
        Ok(())
    }

    #[tokio::test]
    async fn empty_run_leaves_outputs_untouched() -> Result<()> {
        let api = FakeApi::new().with_search_error("technology");
        let dir = tempdir()?;
        let output = output_in(dir.path());

        let report = run(&api, &queries(&["technology", "education"]), &options(), &output).await?;

        assert!(!report.written);
        assert_eq!(report.collected_rows, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(!output.csv_path.exists());
        assert!(!output.db_path.exists());
        assert!(api.detail_calls.borrow().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn empty_run_keeps_previous_outputs() -> Result<()> {
        let dir = tempdir()?;
        let output = output_in(dir.path());
        fs::write(&output.csv_path, "video_id\nprevious\n")?;
        {
            let store = MetadataStore::open(&output.db_path, &output.table).await?;
            store
                .replace_all(&[crate::record::tests::sample_record("previous")])
                .await?;
        }
        let csv_before = fs::read(&output.csv_path)?;
        let csv_modified = fs::metadata(&output.csv_path)?.modified()?;

        let api = FakeApi::new();
        let report = run(&api, &queries(&["technology"]), &options(), &output).await?;

        assert!(!report.written);
        assert_eq!(fs::read(&output.csv_path)?, csv_before);
        assert_eq!(fs::metadata(&output.csv_path)?.modified()?, csv_modified);
        let store = MetadataStore::open(&output.db_path, &output.table).await?;
        let stored = store.load_all().await?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].video_id, "previous");
        Ok(())
    }

    #[tokio::test]
    async fn overlapping_queries_keep_one_row_per_video() -> Result<()> {
        let shared = ids("shared", 3);
        let api = FakeApi::new()
            .with_page("music", video_page(&shared, None))
            .with_page("gaming", video_page(&shared[1..], None))
            .with_videos(shared.iter().map(|id| video_item(id)));
        let dir = tempdir()?;
        let output = output_in(dir.path());

        let report = run(&api, &queries(&["music", "gaming"]), &options(), &output).await?;

        assert_eq!(report.collected_rows, 5);
        assert_eq!(report.unique_rows, 3);
        let store = MetadataStore::open(&output.db_path, &output.table).await?;
        let stored_ids: Vec<_> = store
            .load_all()
            .await?
            .into_iter()
            .map(|row| row.video_id)
            .collect();
        assert_eq!(stored_ids, shared);
        Ok(())
    }

    #[test]
    fn collect_all_processes_queries_in_order() {
        let api = FakeApi::new()
            .with_page("a", video_page(&ids("a", 2), None))
            .with_page("b", video_page(&ids("b", 1), None))
            .with_videos(ids("a", 2).iter().chain(&ids("b", 1)).map(|id| video_item(id)));

        let collection = collect_all(&api, &queries(&["a", "empty", "b"]), &options());

        let order: Vec<_> = api
            .searches
            .borrow()
            .iter()
            .map(|search| search.query.clone())
            .collect();
        assert_eq!(order, vec!["a", "empty", "b"]);
        assert_eq!(api.detail_calls.borrow().len(), 2);
        assert_eq!(collection.rows.len(), 3);
        assert_eq!(collection.queries[1].ids_found, 0);
    }
}
