#![forbid(unsafe_code)]

//! Thin client for the two YouTube Data API v3 calls the collector needs:
//! `search.list` and `videos.list`.
//!
//! Response structs only model the fields we flatten; everything else in the
//! payload is ignored by serde.

use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::config::Settings;
use crate::error::{ApiError, ConfigError};

pub const VIDEO_KIND: &str = "youtube#video";
const SEARCH_ENDPOINT: &str = "search";
const VIDEOS_ENDPOINT: &str = "videos";
const DETAIL_PARTS: &str = "snippet,contentDetails,statistics";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One page of `search.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchListResponse {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: ResourceId,
}

/// Keyword searches can also return channels and playlists; `kind` tells
/// them apart and only video hits carry `videoId`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub kind: String,
    #[serde(default)]
    pub video_id: Option<String>,
}

impl SearchResult {
    /// Returns the id when this hit refers to a video resource.
    pub fn video_id(&self) -> Option<&str> {
        if self.id.kind == VIDEO_KIND {
            self.id.video_id.as_deref()
        } else {
            None
        }
    }
}

/// Response of `videos.list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    #[serde(default)]
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub content_details: ContentDetails,
    #[serde(default)]
    pub statistics: VideoStatistics,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published_at: Option<String>,
    pub channel_id: Option<String>,
    pub channel_title: Option<String>,
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentDetails {
    pub duration: Option<String>,
    pub definition: Option<String>,
}

/// Counters are omitted entirely when the creator hides them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub view_count: Option<Count>,
    pub like_count: Option<Count>,
    pub comment_count: Option<Count>,
}

/// The API encodes 64-bit counters as decimal strings, but mocks and proxies
/// sometimes hand back plain numbers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Number(i64),
    Text(String),
}

impl Count {
    pub fn parse(&self) -> Option<i64> {
        match self {
            Count::Number(value) => Some(*value),
            Count::Text(raw) => raw.trim().parse().ok(),
        }
    }
}

/// Parameters for one `search.list` page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub region_code: &'a str,
    pub page_size: usize,
    pub page_token: Option<&'a str>,
}

/// The remote operations the collector consumes.
pub trait VideoApi {
    fn search_page(&self, request: &SearchRequest<'_>) -> Result<SearchListResponse, ApiError>;

    fn list_videos(&self, ids: &[String]) -> Result<VideoListResponse, ApiError>;
}

/// Blocking HTTP client authenticated with an API key.
pub struct YouTubeClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YouTubeClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, ConfigError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey(crate::config::API_KEY_VAR));
        }
        let agent = ureq::AgentBuilder::new()
            .user_agent(&format!("newtube-harvest/{}", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build();
        Ok(Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Self::new(&settings.api_key, &settings.api_base_url)
    }

    fn get<T>(&self, endpoint: &'static str, params: &[(&str, &str)]) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!("GET {url} {params:?}");
        let mut request = self.agent.get(&url);
        for (name, value) in params {
            request = request.query(name, value);
        }
        let response = request
            .query("key", &self.api_key)
            .call()
            .map_err(|err| self.map_error(endpoint, err))?;
        response
            .into_json::<T>()
            .map_err(|source| ApiError::Decode { endpoint, source })
    }

    fn map_error(&self, endpoint: &'static str, err: ureq::Error) -> ApiError {
        match err {
            ureq::Error::Status(status, response) => ApiError::Status {
                endpoint,
                status,
                body: response.into_string().unwrap_or_default(),
            },
            // Transport errors echo the request URL, which carries the key.
            ureq::Error::Transport(transport) => ApiError::Transport {
                endpoint,
                message: transport.to_string().replace(&self.api_key, "<redacted>"),
            },
        }
    }
}

impl VideoApi for YouTubeClient {
    fn search_page(&self, request: &SearchRequest<'_>) -> Result<SearchListResponse, ApiError> {
        let page_size = request.page_size.to_string();
        let mut params = vec![
            ("part", "id"),
            ("type", "video"),
            ("q", request.query),
            ("maxResults", page_size.as_str()),
            ("regionCode", request.region_code),
        ];
        if let Some(token) = request.page_token {
            params.push(("pageToken", token));
        }
        self.get(SEARCH_ENDPOINT, &params)
    }

    fn list_videos(&self, ids: &[String]) -> Result<VideoListResponse, ApiError> {
        let joined = ids.join(",");
        self.get(
            VIDEOS_ENDPOINT,
            &[("part", DETAIL_PARTS), ("id", joined.as_str())],
        )
    }
}
