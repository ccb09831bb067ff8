use std::future::Future;

use parley_types::{Tool, ToolContext, ToolDescriptor, ToolResult, ValidationError};
use serde::{Deserialize, Serialize};

use crate::schema::parameters_schema;

/// Registered name of [`SearchTool`].
pub const SEARCH_TOOL_NAME: &str = "google_search";

const MAX_RESULTS: u32 = 10;

/// Arguments for [`SearchTool`].
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchArgs {
    /// The search query to execute.
    pub query: String,
    /// Number of results to return (max 10).
    #[serde(default = "default_num_results")]
    pub num_results: u32,
}

fn default_num_results() -> u32 {
    3
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub link: String,
    /// Text excerpt.
    #[serde(default)]
    pub snippet: String,
    /// Short host shown to the user.
    #[serde(default)]
    pub display_link: String,
}

/// A page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    /// The hits, best first.
    pub results: Vec<SearchHit>,
    /// Total hits reported by the backend (may exceed `results.len()`).
    pub total: u64,
}

/// Errors from a [`SearchBackend`].
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The backend has no credentials.
    #[error("Google API credentials not configured")]
    CredentialsMissing,
    /// The backend answered with an error status.
    #[error("search request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as received.
        body: String,
    },
    /// Transport-level failure.
    #[error("search request failed: {0}")]
    Transport(String),
}

/// Where search queries go.
///
/// Uses RPITIT (return position impl trait in trait).
/// Not object-safe; the search tool is generic over its backend.
pub trait SearchBackend: Send + Sync {
    /// Run `query`, returning at most `limit` hits.
    fn search(
        &self,
        query: &str,
        limit: u32,
    ) -> impl Future<Output = Result<SearchPage, SearchError>> + Send;
}

/// A backend that answers every query from a fixed list of hits.
#[derive(Debug, Clone, Default)]
pub struct StaticSearchBackend {
    hits: Vec<SearchHit>,
}

impl StaticSearchBackend {
    /// A backend returning `hits` (truncated to the requested limit).
    #[must_use]
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }
}

impl SearchBackend for StaticSearchBackend {
    async fn search(&self, _query: &str, limit: u32) -> Result<SearchPage, SearchError> {
        let results: Vec<SearchHit> = self.hits.iter().take(limit as usize).cloned().collect();
        Ok(SearchPage {
            total: self.hits.len() as u64,
            results,
        })
    }
}

/// Web search through a [`SearchBackend`].
#[derive(Debug, Clone)]
pub struct SearchTool<B> {
    backend: B,
}

impl<B: SearchBackend> SearchTool<B> {
    /// Create a search tool over `backend`.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: SearchBackend> Tool for SearchTool<B> {
    const NAME: &'static str = SEARCH_TOOL_NAME;
    type Args = SearchArgs;
    type Error = SearchError;

    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: Self::NAME.into(),
            description: "Search the web using Google Custom Search API".into(),
            version: "1.0.0".into(),
            parameters_schema: parameters_schema::<SearchArgs>(),
        }
    }

    fn validate(&self, args: &SearchArgs) -> Result<(), ValidationError> {
        if args.query.trim().is_empty() {
            return Err(ValidationError::single(Self::NAME, "query", "must not be empty"));
        }
        Ok(())
    }

    async fn execute(&self, args: SearchArgs, _ctx: &ToolContext) -> Result<ToolResult, SearchError> {
        let limit = args.num_results.clamp(1, MAX_RESULTS);
        let page = self.backend.search(&args.query, limit).await?;

        if page.results.is_empty() {
            let data = serde_json::json!({ "results": [], "total": 0, "query": args.query });
            return Ok(ToolResult::ok(data, "No results found"));
        }

        let message = format_hits(&args.query, &page.results);
        let data = serde_json::json!({
            "results": page.results,
            "total": page.total,
            "query": args.query,
        });
        Ok(ToolResult::ok(data, message))
    }
}

fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    let mut out = format!("Top {} results for \"{query}\":", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("\n{}. {} ({})", i + 1, hit.title, hit.link));
        if !hit.snippet.is_empty() {
            out.push_str(&format!(" - {}", hit.snippet.trim()));
        }
    }
    out
}

#[cfg(feature = "google-search")]
pub use google::GoogleSearchBackend;

#[cfg(feature = "google-search")]
mod google {
    use super::{SearchBackend, SearchError, SearchHit, SearchPage};

    const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

    /// Google Custom Search JSON API backend.
    pub struct GoogleSearchBackend {
        credentials: Option<(String, String)>,
        base_url: String,
        client: reqwest::Client,
    }

    impl GoogleSearchBackend {
        /// A backend with the given API key and search engine id.
        #[must_use]
        pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
            Self {
                credentials: Some((api_key.into(), engine_id.into())),
                base_url: DEFAULT_BASE_URL.to_string(),
                client: reqwest::Client::new(),
            }
        }

        /// A backend without credentials. Every search fails with
        /// [`SearchError::CredentialsMissing`].
        #[must_use]
        pub fn unconfigured() -> Self {
            Self {
                credentials: None,
                base_url: DEFAULT_BASE_URL.to_string(),
                client: reqwest::Client::new(),
            }
        }

        /// Build from optional credentials, as read from configuration.
        #[must_use]
        pub fn from_credentials(api_key: Option<String>, engine_id: Option<String>) -> Self {
            match (api_key, engine_id) {
                (Some(key), Some(cx)) if !key.is_empty() && !cx.is_empty() => Self::new(key, cx),
                _ => Self::unconfigured(),
            }
        }

        /// Read `GOOGLE_API_KEY` and `GOOGLE_SEARCH_ENGINE_ID`.
        #[must_use]
        pub fn from_env() -> Self {
            Self::from_credentials(
                std::env::var("GOOGLE_API_KEY").ok(),
                std::env::var("GOOGLE_SEARCH_ENGINE_ID").ok(),
            )
        }

        /// Override the endpoint (for testing or proxies).
        #[must_use]
        pub fn base_url(mut self, url: impl Into<String>) -> Self {
            self.base_url = url.into();
            self
        }

        /// Whether credentials are present.
        #[must_use]
        pub fn is_configured(&self) -> bool {
            self.credentials.is_some()
        }
    }

    impl std::fmt::Debug for GoogleSearchBackend {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("GoogleSearchBackend")
                .field("configured", &self.is_configured())
                .field("base_url", &self.base_url)
                .finish()
        }
    }

    #[derive(serde::Deserialize)]
    struct CseResponse {
        #[serde(default)]
        items: Vec<SearchHit>,
        #[serde(rename = "searchInformation")]
        search_information: Option<CseInfo>,
    }

    #[derive(serde::Deserialize)]
    struct CseInfo {
        #[serde(rename = "totalResults")]
        total_results: Option<String>,
    }

    impl SearchBackend for GoogleSearchBackend {
        async fn search(&self, query: &str, limit: u32) -> Result<SearchPage, SearchError> {
            let (key, cx) = self
                .credentials
                .as_ref()
                .ok_or(SearchError::CredentialsMissing)?;

            let num = limit.to_string();
            let response = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("key", key.as_str()),
                    ("cx", cx.as_str()),
                    ("q", query),
                    ("num", num.as_str()),
                ])
                .send()
                .await
                .map_err(|e| SearchError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SearchError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let parsed: CseResponse = response
                .json()
                .await
                .map_err(|e| SearchError::Transport(e.to_string()))?;

            let total = parsed
                .search_information
                .and_then(|info| info.total_results)
                .and_then(|t| t.parse().ok())
                .unwrap_or(parsed.items.len() as u64);

            Ok(SearchPage {
                results: parsed.items,
                total,
            })
        }
    }
}
