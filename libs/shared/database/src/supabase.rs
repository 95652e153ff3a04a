use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::error::DbError;

pub const PREFER_REPRESENTATION: &str = "return=representation";
pub const PREFER_EXACT_COUNT: &str = "count=exact";

/// Thin PostgREST client. Every store in the workspace goes through it.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, DbError> {
        let mut headers = HeaderMap::new();

        let key = HeaderValue::from_str(&self.anon_key)
            .map_err(|_| DbError::Config("anon key is not a valid header value".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.anon_key))
            .map_err(|_| DbError::Config("anon key is not a valid bearer token".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, body, extra_headers).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DbError::Decode(e.to_string()))
    }

    /// Issues a request whose response body is ignored (e.g. DELETE without representation).
    pub async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<(), DbError> {
        self.send(method, path, body, None).await.map(|_| ())
    }

    /// GET with `Prefer: count=exact`; returns the rows plus the total from `Content-Range`.
    pub async fn request_counted<T>(&self, path: &str) -> Result<(Vec<T>, u64), DbError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send(Method::GET, path, None, Some(prefer(PREFER_EXACT_COUNT)))
            .await?;

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total);

        let rows = response
            .json::<Vec<T>>()
            .await
            .map_err(|e| DbError::Decode(e.to_string()))?;

        let total = total.unwrap_or_else(|| {
            warn!("PostgREST response for {} carried no total count", path);
            rows.len() as u64
        });

        Ok((rows, total))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response, DbError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await.map_err(|e| {
            warn!("Request to {} failed: {}", url, e);
            DbError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);
            return Err(map_status(status, error_text));
        }

        Ok(response)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

pub fn prefer(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("prefer"), HeaderValue::from_static(value));
    headers
}

/// An `ilike` operand that matches `value` literally, ignoring case only.
/// LIKE wildcards and PostgREST's `*` alias are backslash-escaped, then the
/// whole operand is percent-encoded for the query string.
pub fn ilike_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_' | '*') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    urlencoding::encode(&escaped).into_owned()
}

fn map_status(status: StatusCode, body: String) -> DbError {
    match status.as_u16() {
        401 | 403 => DbError::Unauthorized(body),
        404 => DbError::NotFound(body),
        409 => DbError::Conflict(body),
        503 | 504 => DbError::Unavailable(body),
        code => DbError::Api { status: code, message: body },
    }
}

/// `0-24/137` -> 137, `*/0` -> 0.
fn parse_content_range_total(raw: &str) -> Option<u64> {
    raw.rsplit_once('/').and_then(|(_, total)| total.parse().ok())
}
