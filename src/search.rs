#![forbid(unsafe_code)]

//! Paged keyword search that gathers video ids for one topic.

use std::thread;

use log::{debug, error};

use crate::config::CollectOptions;
use crate::error::{FailureNote, Stage};
use crate::youtube::{SearchRequest, SearchResult, VideoApi};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub ids: Vec<String>,
    pub pages_fetched: usize,
    /// Set when a page request failed and `ids` is a truncated prefix.
    pub failure: Option<FailureNote>,
}

/// Follows `nextPageToken` until `options.max_results` video ids are
/// collected or the result set runs out. Channel and playlist hits are
/// skipped. A failed page ends collection for this query but keeps what was
/// already gathered.
pub fn collect_video_ids<A: VideoApi + ?Sized>(
    api: &A,
    query: &str,
    options: &CollectOptions,
) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();
    let mut page_token: Option<String> = None;

    while outcome.ids.len() < options.max_results {
        let request = SearchRequest {
            query,
            region_code: &options.region_code,
            page_size: options.page_size,
            page_token: page_token.as_deref(),
        };
        let page = match api.search_page(&request) {
            Ok(page) => page,
            Err(err) => {
                error!("An error occurred during search for '{query}': {err}");
                outcome.failure = Some(FailureNote {
                    stage: Stage::Search,
                    query: query.to_string(),
                    detail: err.to_string(),
                });
                break;
            }
        };
        outcome.pages_fetched += 1;

        let remaining = options.max_results - outcome.ids.len();
        outcome.ids.extend(
            page.items
                .iter()
                .filter_map(SearchResult::video_id)
                .take(remaining)
                .map(str::to_string),
        );
        debug!(
            "search '{query}': page {} -> {} ids so far",
            outcome.pages_fetched,
            outcome.ids.len()
        );

        thread::sleep(options.request_delay);

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    outcome
}
