#![forbid(unsafe_code)]

//! Batched `videos.list` lookups and flattening into [`VideoRecord`] rows.

use std::thread;

use log::{debug, error, warn};

use crate::config::{API_PAGE_LIMIT, CollectOptions};
use crate::error::{FailureNote, Stage};
use crate::record::VideoRecord;
use crate::youtube::{Count, VideoApi, VideoItem};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailOutcome {
    pub rows: Vec<VideoRecord>,
    pub batches_requested: usize,
    pub failures: Vec<FailureNote>,
}

/// Fetches details for `ids` in chunks of at most `options.batch_size`.
///
/// A failed batch is logged, followed by a `failure_backoff` pause, and then
/// dropped without retry. `query` only labels log lines and failure notes.
pub fn fetch_video_details<A: VideoApi + ?Sized>(
    api: &A,
    query: &str,
    ids: &[String],
    options: &CollectOptions,
) -> DetailOutcome {
    let batch_size = options.batch_size.clamp(1, API_PAGE_LIMIT);
    let mut outcome = DetailOutcome::default();

    for (index, batch) in ids.chunks(batch_size).enumerate() {
        outcome.batches_requested += 1;
        let response = match api.list_videos(batch) {
            Ok(response) => response,
            Err(err) => {
                error!(
                    "HttpError fetching batch {} ({} ids) for '{query}': {err}",
                    index + 1,
                    batch.len()
                );
                outcome.failures.push(FailureNote {
                    stage: Stage::Details,
                    query: query.to_string(),
                    detail: format!("batch {} of {} ids: {err}", index + 1, batch.len()),
                });
                thread::sleep(options.failure_backoff);
                continue;
            }
        };
        debug!(
            "details '{query}': batch {} returned {} of {} items",
            index + 1,
            response.items.len(),
            batch.len()
        );
        outcome
            .rows
            .extend(response.items.iter().map(flatten_item));
        thread::sleep(options.request_delay);
    }

    outcome
}

/// Merges snippet, content details and statistics into one row.
pub fn flatten_item(item: &VideoItem) -> VideoRecord {
    let snippet = &item.snippet;
    let stats = &item.statistics;
    let tags = snippet.tags.as_deref().unwrap_or_default();

    VideoRecord {
        video_id: item.id.clone(),
        title: snippet.title.clone(),
        description: snippet.description.clone(),
        tags: serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string()),
        published_at: snippet.published_at.clone(),
        channel_id: snippet.channel_id.clone(),
        channel_title: snippet.channel_title.clone(),
        category_id: snippet.category_id.clone(),
        duration: item.content_details.duration.clone(),
        definition: item.content_details.definition.clone(),
        view_count: parse_count(&item.id, "viewCount", stats.view_count.as_ref()).unwrap_or(0),
        like_count: parse_count(&item.id, "likeCount", stats.like_count.as_ref()),
        comment_count: parse_count(&item.id, "commentCount", stats.comment_count.as_ref()),
    }
}

fn parse_count(video_id: &str, field: &str, count: Option<&Count>) -> Option<i64> {
    let count = count?;
    let parsed = count.parse();
    if parsed.is_none() {
        warn!("video {video_id}: ignoring unparseable {field} {count:?}");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::fake::{FakeApi, bare_item, ids, video_item};
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn options() -> CollectOptions {
        CollectOptions {
            request_delay: Duration::ZERO,
            failure_backoff: Duration::ZERO,
            ..CollectOptions::default()
        }
    }

    #[test]
    fn issues_ceil_n_over_fifty_batches() {
        for total in [0usize, 1, 49, 50, 51, 100, 101, 137] {
            let all = ids("v", total);
            let api = FakeApi::new().with_videos(all.iter().map(|id| video_item(id)));

            let outcome = fetch_video_details(&api, "q", &all, &options());

            let calls = api.detail_calls.borrow();
            assert_eq!(calls.len(), total.div_ceil(50), "total={total}");
            assert_eq!(outcome.batches_requested, calls.len());
            assert!(calls.iter().all(|batch| !batch.is_empty() && batch.len() <= 50));
            assert_eq!(calls.concat(), all);
            assert_eq!(outcome.rows.len(), total);
        }
    }

    #[test]
    fn smaller_batch_size_is_honoured() {
        let all = ids("v", 7);
        let api = FakeApi::new().with_videos(all.iter().map(|id| video_item(id)));
        let opts = CollectOptions {
            batch_size: 3,
            ..options()
        };

        fetch_video_details(&api, "q", &all, &opts);

        let sizes: Vec<_> = api.detail_calls.borrow().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn failed_batch_is_skipped() {
        let all = ids("s", 120);
        let api = FakeApi::new()
            .with_videos(all.iter().map(|id| video_item(id)))
            .failing_for([all[60].clone()]);

        let outcome = fetch_video_details(&api, "sports", &all, &options());

        assert_eq!(outcome.batches_requested, 3);
        assert_eq!(outcome.rows.len(), 70);
        assert!(outcome.rows.iter().all(|row| row.video_id != all[75]));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].stage, Stage::Details);
        assert_eq!(outcome.failures[0].query, "sports");
        assert!(outcome.failures[0].detail.starts_with("batch 2 of 50 ids"));
    }

    #[test]
    fn failed_batch_waits_backoff_instead_of_request_delay() {
        let all = ids("s", 120);
        let api = FakeApi::new()
            .with_videos(all.iter().map(|id| video_item(id)))
            .failing_for([all[60].clone()]);
        let opts = CollectOptions {
            request_delay: Duration::from_millis(20),
            failure_backoff: Duration::from_millis(100),
            ..CollectOptions::default()
        };

        let started = Instant::now();
        let outcome = fetch_video_details(&api, "sports", &all, &opts);

        assert_eq!(outcome.failures.len(), 1);
        // two successful batches at 20ms plus one backoff at 100ms
        assert!(started.elapsed() >= Duration::from_millis(140));
    }

    #[test]
    fn flatten_keeps_null_counts_distinct_from_zero() {
        let row = flatten_item(&bare_item("b1"));
        assert_eq!(row.view_count, 7);
        assert_eq!(row.like_count, None);
        assert_eq!(row.comment_count, None);

        let zeroes: VideoItem = serde_json::from_value(json!({
            "id": "z1",
            "statistics": {"likeCount": "0", "commentCount": "0"}
        }))
        .unwrap();
        let row = flatten_item(&zeroes);
        assert_eq!(row.view_count, 0);
        assert_eq!(row.like_count, Some(0));
        assert_eq!(row.comment_count, Some(0));
    }

    #[test]
    fn flatten_serializes_tags() {
        let row = flatten_item(&video_item("t1"));
        assert_eq!(row.tags, r#"["sample","demo"]"#);
        assert_eq!(row.title.as_deref(), Some("Title t1"));
        assert_eq!(row.duration.as_deref(), Some("PT4M13S"));
        assert_eq!(row.definition.as_deref(), Some("hd"));
        assert_eq!(row.category_id.as_deref(), Some("10"));
        assert_eq!(row.view_count, 1200);
        assert_eq!(row.like_count, Some(34));
        assert_eq!(row.comment_count, Some(5));

        let untagged = flatten_item(&bare_item("t2"));
        assert_eq!(untagged.tags, "[]");
        assert!(untagged.channel_id.is_none());
    }

    #[test]
    fn unparseable_count_is_treated_as_missing() {
        let item: VideoItem = serde_json::from_value(json!({
            "id": "x",
            "statistics": {"viewCount": "many", "likeCount": "n/a"}
        }))
        .unwrap();
        let row = flatten_item(&item);
        assert_eq!(row.view_count, 0);
        assert_eq!(row.like_count, None);
    }

    #[test]
    fn missing_items_produce_no_rows() {
        let all = ids("gone", 4);
        let api = FakeApi::new().with_videos([video_item(&all[1])]);
        let outcome = fetch_video_details(&api, "q", &all, &options());
        assert_eq!(outcome.rows.len(), 1);
        assert!(outcome.failures.is_empty());
    }
}
