use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A live stream as returned by `GET /helix/streams`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub game_name: String,
    // "live", or "" when the stream went down mid-request
    #[serde(rename = "type", default)]
    pub stream_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub viewer_count: u64,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub is_mature: bool,
}

impl Stream {
    pub fn is_live(&self) -> bool {
        self.stream_type == "live"
    }

    /// Thumbnail URL with the `{width}`/`{height}` template filled in.
    pub fn thumbnail(&self, width: u32, height: u32) -> String {
        self.thumbnail_url
            .replace("{width}", &width.to_string())
            .replace("{height}", &height.to_string())
    }
}

/// Body of a successful `GET /helix/streams`.
///
/// Pagination is not followed: a request never asks for more IDs than fit on
/// one page.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamsResponse {
    pub data: Vec<Stream>,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub message: String,
}

/// Stream type filter for `GET /helix/streams`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamType {
    #[default]
    Live,
}

impl StreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Live => "live",
        }
    }
}

/// Query parameters for `GET /helix/streams`.
#[derive(Debug, Clone, Default)]
pub struct StreamsParams {
    /// Page size, 1..=100.
    pub first: u32,
    pub stream_type: StreamType,
    pub user_ids: Vec<String>,
}

impl StreamsParams {
    /// Maximum number of user IDs (and page size) Helix accepts per request.
    pub const MAX_PER_REQUEST: usize = 100;

    pub fn live_for(user_ids: Vec<String>) -> Self {
        Self {
            first: Self::MAX_PER_REQUEST as u32,
            stream_type: StreamType::Live,
            user_ids,
        }
    }

    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(2 + self.user_ids.len());
        if self.first > 0 {
            let first = self.first.min(Self::MAX_PER_REQUEST as u32);
            query.push(("first", first.to_string()));
        }
        query.push(("type", self.stream_type.as_str().to_string()));
        query.extend(self.user_ids.iter().map(|id| ("user_id", id.clone())));
        query
    }
}

/// Rate-limit state reported by the `Ratelimit-*` response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Bucket size.
    pub limit: u32,
    /// Points left in the current window.
    pub remaining: u32,
    /// Unix timestamp (seconds) at which the bucket refills.
    pub reset: i64,
}

impl RateLimit {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub(crate) fn from_headers(headers: &reqwest::header::HeaderMap) -> Option<Self> {
        fn parse<T: std::str::FromStr>(headers: &reqwest::header::HeaderMap, name: &str) -> Option<T> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        }

        let remaining = parse::<u32>(headers, "ratelimit-remaining")?;
        let reset = parse::<i64>(headers, "ratelimit-reset")?;
        let limit = parse::<u32>(headers, "ratelimit-limit").unwrap_or_default();
        Some(Self {
            limit,
            remaining,
            reset,
        })
    }
}
