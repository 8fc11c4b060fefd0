use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::error::{ApiError, ApiErrorBody};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8081";

/// HTTP access to the EventSphere API.
///
/// The client holds no credential of its own. Calls that need one take the
/// bearer token as an argument, so the caller decides which session a
/// request runs under.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_http_client(Client::new(), base_url)
    }

    pub fn with_http_client(http: Client, base_url: &str) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `<base>/<segments...>`, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        match bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        bearer: Option<&str>,
    ) -> Result<T> {
        let response = execute(self.request(Method::GET, url, bearer)).await?;
        decode_json(response).await
    }

    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        url: Url,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = execute(self.request(method, url, bearer).json(body)).await?;
        decode_json(response).await
    }

    /// Like [`send_json`](Self::send_json) but tolerates an empty response
    /// body, which some update endpoints return.
    pub(crate) async fn send_json_optional<B>(
        &self,
        method: Method,
        url: Url,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<Option<serde_json::Value>>
    where
        B: Serialize + ?Sized,
    {
        let response = execute(self.request(method, url, bearer).json(body)).await?;
        let bytes = response.bytes().await.map_err(ClientError::Transport)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub(crate) async fn delete(&self, url: Url, bearer: Option<&str>) -> Result<()> {
        execute(self.request(Method::DELETE, url, bearer)).await?;
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ClientError::Validation(format!("invalid api url '{raw}': {e}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Validation(format!(
            "invalid api url '{raw}': expected an http(s) base url"
        )));
    }
    Ok(url)
}

async fn execute(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(|err| {
        warn!(error = %err, "api request did not complete");
        ClientError::Transport(err)
    })?;
    check_status(response).await
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let raw = response.text().await.unwrap_or_default();
    let body: ApiErrorBody = serde_json::from_str(&raw).unwrap_or_default();
    let error = ApiError::from_body(status.as_u16(), &body);

    if status == StatusCode::UNAUTHORIZED {
        warn!(%url, "unauthorized response from api");
        return Err(ClientError::Unauthorized(error.message));
    }

    debug!(%url, status = status.as_u16(), "api returned failure status");
    Err(ClientError::Api(error.into()))
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await.map_err(ClientError::Transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}
