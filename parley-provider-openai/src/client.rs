//! OpenAI client struct, builder, and [`ModelClient`] implementation.

use parley_types::{ModelClient, ModelError, StepRequest, StepStream};

use crate::error::{map_http_status, map_reqwest_error, retry_after_header};
use crate::mapping::{from_api_response, to_api_request};
use crate::streaming::stream_step;

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Client for the OpenAI Chat Completions API.
///
/// # Example
///
/// ```no_run
/// use parley_provider_openai::OpenAi;
///
/// let client = OpenAi::new("sk-...")
///     .model("gpt-4o-mini")
///     .base_url("https://api.openai.com")
///     .streaming(true);
/// ```
#[derive(Clone)]
pub struct OpenAi {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) organization: Option<String>,
    pub(crate) streaming: bool,
    pub(crate) client: reqwest::Client,
}

impl OpenAi {
    /// Create a client with the given API key, the default model, and
    /// streaming enabled.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            organization: None,
            streaming: true,
            client: reqwest::Client::new(),
        }
    }

    /// Override the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (a mock server, a proxy, or a compatible
    /// service). A trailing `/` or `/v1` is tolerated.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        let url = url.trim_end_matches('/');
        self.base_url = url.strip_suffix("/v1").unwrap_or(url).to_string();
        self
    }

    /// Send the `OpenAI-Organization` header on every request.
    #[must_use]
    pub fn organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Choose between SSE streaming and single-response requests.
    #[must_use]
    pub fn streaming(mut self, enabled: bool) -> Self {
        self.streaming = enabled;
        self
    }

    /// The configured model.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    async fn send(&self, request: &StepRequest) -> Result<reqwest::Response, ModelError> {
        let body = to_api_request(request, &self.model, self.streaming);
        tracing::debug!(
            event = "parley.openai.request",
            model = %self.model,
            stream = self.streaming,
            messages = body.messages.len(),
            tools = body.tools.len(),
        );

        let mut builder = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body);
        if let Some(org) = &self.organization {
            builder = builder.header("OpenAI-Organization", org);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = retry_after_header(response.headers());
        let text = response.text().await.map_err(map_reqwest_error)?;
        tracing::debug!(event = "parley.openai.http_error", status = status.as_u16());
        Err(map_http_status(status, retry_after, &text))
    }
}

impl std::fmt::Debug for OpenAi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAi")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("streaming", &self.streaming)
            .finish_non_exhaustive()
    }
}

impl ModelClient for OpenAi {
    async fn generate_step(&self, request: StepRequest) -> Result<StepStream, ModelError> {
        let response = self.send(&request).await?;
        if self.streaming {
            return Ok(stream_step(response));
        }
        let text = response.text().await.map_err(map_reqwest_error)?;
        Ok(from_api_response(&text)?.into_stream())
    }
}
