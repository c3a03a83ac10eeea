use std::pin::Pin;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, StatusCode, header};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_DURATION,
    STREAM_TTFB,
};
use crate::sse::EventReader;
use crate::types::{ChatCompletionRequest, CompletionChunk};

/// Default base URL of the inference endpoint.
pub const DEFAULT_BASE_URL: &str = "https://models.inference.ai.azure.com/";
const CHAT_COMPLETIONS_PATH: &str = "chat/completions";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// A boxed byte source for a [`StreamHandle`].
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Client for a chat-completion endpoint.
///
/// The client holds the credential and the HTTP connection pool.  It is constructed once at
/// startup and handed to the session; nothing about it is global.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    token: String,
    client: ReqwestClient,
    endpoint: Url,
    connect_timeout: Duration,
}

impl InferenceClient {
    /// Create a new client for the default endpoint.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_options(token, None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// Only connection establishment is bounded by `connect_timeout`; a response body may
    /// stream for as long as the model keeps generating.
    pub fn with_options(
        token: impl Into<String>,
        base_url: Option<String>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::authentication("no token provided"));
        }
        let endpoint = chat_completions_url(base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;

        let connect_timeout = connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                Error::transport(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            token,
            client,
            endpoint,
            connect_timeout,
        })
    }

    /// The URL chat completions are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token)).map_err(|_| {
            Error::authentication("token contains characters that are not valid in a header")
        })?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type.
    ///
    /// The body is read to the end here, which releases the connection before the error is
    /// returned.
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            message: Option<String>,
            param: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::transport(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error);
        let error_param = detail.as_ref().and_then(|d| d.param.clone());
        let error_message = detail
            .and_then(|d| d.message)
            .unwrap_or_else(|| error_body.trim().to_string());

        warn!(status = status.as_u16(), "chat completion request failed");
        match status {
            StatusCode::UNAUTHORIZED => {
                Error::authentication(with_detail("unauthorized", &error_message))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Error::validation(with_detail("bad request", &error_message), error_param)
            }
            _ => Error::server(
                status.as_u16(),
                format!("unexpected response from the server: {status}"),
                error_body,
            ),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.connect_timeout.as_secs_f64()),
            )
        } else {
            Error::transport(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Send a chat-completion request and get a streaming response.
    ///
    /// The request's `stream` flag is forced on.  A non-success status is mapped to
    /// [`Error::Authentication`] (401), [`Error::Validation`] (400, 422) or [`Error::Server`]
    /// (anything else), and no handle is returned.
    pub async fn stream(&self, mut request: ChatCompletionRequest) -> Result<StreamHandle> {
        request.stream = true;
        CLIENT_REQUESTS.click();
        let started = Instant::now();
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.default_headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                self.map_send_error(e)
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());

        let bytes = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::transport(format!("Error in HTTP stream: {}", e), Some(Box::new(e)))
            })
        });
        let mut handle = StreamHandle::new(Box::pin(bytes));
        handle.started = started;
        Ok(handle)
    }
}

fn with_detail(label: &str, detail: &str) -> String {
    if detail.is_empty() {
        label.to_string()
    } else {
        format!("{label}: {detail}")
    }
}

/// Resolves the chat-completions endpoint under `base_url`.
pub fn chat_completions_url(base_url: &str) -> Result<Url> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(Url::parse(&base)?.join(CHAT_COMPLETIONS_PATH)?)
}

/// A pull-based stream of [`CompletionChunk`]s for one request.
///
/// The handle owns the response body.  [`StreamHandle::close`] (or dropping the handle)
/// releases the connection; closing is idempotent and safe after natural end of stream.
pub struct StreamHandle {
    reader: EventReader<ByteStream, CompletionChunk>,
    started: Instant,
    first_chunk_seen: bool,
    duration_recorded: bool,
}

impl StreamHandle {
    /// Wraps an event-stream byte source.
    pub fn new(source: ByteStream) -> Self {
        Self {
            reader: EventReader::new(source),
            started: Instant::now(),
            first_chunk_seen: false,
            duration_recorded: false,
        }
    }

    /// Returns the next chunk, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Result<Option<CompletionChunk>> {
        let result = self.reader.next().await;
        match &result {
            Ok(Some(_)) => {
                if !self.first_chunk_seen {
                    self.first_chunk_seen = true;
                    STREAM_TTFB.add(self.started.elapsed().as_secs_f64());
                }
            }
            Ok(None) | Err(_) => self.record_duration(),
        }
        result
    }

    /// Releases the underlying connection.
    pub fn close(&mut self) {
        self.reader.close();
        self.record_duration();
    }

    /// Returns true once the stream has ended, failed, or been closed.
    pub fn is_closed(&self) -> bool {
        self.reader.is_finished()
    }

    fn record_duration(&mut self) {
        if !self.duration_recorded {
            self.duration_recorded = true;
            STREAM_DURATION.add(self.started.elapsed().as_secs_f64());
        }
    }
}
