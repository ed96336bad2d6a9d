use crate::api::backend::{BlobStore, ChangeFeed, RowStore};
use crate::api::events::ChangeFilter;
use crate::api::query::Query;
use crate::api::realtime::{self, Subscription};
use crate::app::AppConfig;
use crate::error::ApiError;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP + websocket access to the hosted backend.
#[derive(Clone)]
pub struct BackendClient {
    http: HttpClient,
    base_url: Url,
    api_key: String,
    access_token: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, api_key: &str, access_token: Option<String>) -> Result<Self, ApiError> {
        if base_url.trim().is_empty() || api_key.trim().is_empty() {
            return Err(ApiError::NotConfigured);
        }
        let base_url = Url::parse(&crate::utils::normalize_url(base_url))?;
        let http = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
            access_token,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        Self::new(&config.base_url, &config.api_key, config.access_token.clone())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))?)
    }

    pub fn rest_url(&self, table: &str) -> Result<Url, ApiError> {
        self.endpoint(&format!("rest/v1/{table}"))
    }

    pub fn storage_object_url(&self, bucket: &str, key: &str) -> Result<Url, ApiError> {
        self.endpoint(&format!("storage/v1/object/{bucket}/{key}"))
    }

    pub fn realtime_url(&self) -> Result<Url, ApiError> {
        let mut url = self.endpoint("realtime/v1/websocket")?;
        let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
        // http(s) -> ws(s) is always an allowed scheme change.
        let _ = url.set_scheme(scheme);
        url.query_pairs_mut()
            .append_pair("apikey", &self.api_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }

    fn with_auth(&self, req: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn check(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn rows(resp: Response) -> Result<Vec<Value>, ApiError> {
        let json: Value = Self::check(resp).await?.json().await?;
        Ok(match json {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        })
    }
}

/// Total from a `Content-Range` header such as `0-24/311` or `*/0`.
pub fn parse_content_range_total(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(CONTENT_RANGE)?.to_str().ok()?;
    let (_, total) = raw.rsplit_once('/')?;
    total.trim().parse().ok()
}

impl RowStore for BackendClient {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, ApiError> {
        let url = self.rest_url(table)?;
        let req = self.with_auth(self.http.get(url).query(&query.to_params()));
        Self::rows(req.send().await?).await
    }

    async fn count(&self, table: &str, query: &Query) -> Result<u64, ApiError> {
        let url = self.rest_url(table)?;
        let req = self
            .with_auth(self.http.head(url).query(&query.to_params()))
            .header("Prefer", "count=exact");
        let resp = Self::check(req.send().await?).await?;
        parse_content_range_total(resp.headers()).ok_or(ApiError::MissingRow("count"))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, ApiError> {
        let url = self.rest_url(table)?;
        let req = self
            .with_auth(self.http.post(url))
            .header("Prefer", "return=representation")
            .json(&row);
        Self::rows(req.send().await?)
            .await?
            .into_iter()
            .next()
            .ok_or(ApiError::MissingRow("insert"))
    }

    async fn update(&self, table: &str, query: &Query, patch: Value) -> Result<Vec<Value>, ApiError> {
        let url = self.rest_url(table)?;
        let req = self
            .with_auth(self.http.patch(url).query(query.filters()))
            .header("Prefer", "return=representation")
            .json(&patch);
        Self::rows(req.send().await?).await
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<(), ApiError> {
        let url = self.rest_url(table)?;
        let req = self.with_auth(self.http.delete(url).query(query.filters()));
        Self::check(req.send().await?).await?;
        Ok(())
    }
}

impl BlobStore for BackendClient {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ApiError> {
        let url = self.storage_object_url(bucket, key)?;
        let content_type = HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        let req = self
            .with_auth(self.http.post(url))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .header("cache-control", "max-age=3600")
            .body(bytes);
        Self::check(req.send().await?).await?;
        Ok(())
    }

    async fn remove(&self, bucket: &str, keys: &[String]) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}"))?;
        let req = self
            .with_auth(self.http.delete(url))
            .json(&json!({ "prefixes": keys }));
        Self::check(req.send().await?).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/storage/v1/object/public/{bucket}/{key}")
    }
}

impl ChangeFeed for BackendClient {
    fn subscribe(&self, name: &str, changes: Vec<ChangeFilter>) -> Subscription {
        let topic = format!("realtime:{name}");
        let (subscription, sink) = Subscription::channel(topic.clone());
        match self.realtime_url() {
            Ok(url) => realtime::spawn_channel(url, topic, changes, self.access_token.clone(), sink),
            // Dropping the sink ends the subscription right away.
            Err(err) => log::error!("Cannot open realtime channel {topic}: {err}"),
        }
        subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> BackendClient {
        BackendClient::new("demo.example.co/", "anon-key", None).unwrap()
    }

    #[test]
    fn refuses_missing_settings() {
        assert!(matches!(
            BackendClient::new("", "key", None),
            Err(ApiError::NotConfigured)
        ));
        assert!(matches!(
            BackendClient::new("https://demo.example.co", " ", None),
            Err(ApiError::NotConfigured)
        ));
    }

    #[test]
    fn derives_endpoints_from_base() {
        let c = client();
        assert_eq!(
            c.rest_url("messages").unwrap().as_str(),
            "https://demo.example.co/rest/v1/messages"
        );
        assert_eq!(
            c.storage_object_url("profile-images", "u1-1.png").unwrap().as_str(),
            "https://demo.example.co/storage/v1/object/profile-images/u1-1.png"
        );
        assert_eq!(
            c.public_url("profile-images", "u1-1.png"),
            "https://demo.example.co/storage/v1/object/public/profile-images/u1-1.png"
        );
        assert_eq!(
            c.realtime_url().unwrap().as_str(),
            "wss://demo.example.co/realtime/v1/websocket?apikey=anon-key&vsn=1.0.0"
        );
    }

    #[test]
    fn plain_http_maps_to_ws() {
        let c = BackendClient::new("http://localhost:54321", "k", None).unwrap();
        assert_eq!(c.realtime_url().unwrap().scheme(), "ws");
    }

    #[test]
    fn reads_count_totals() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_RANGE, HeaderValue::from_static("0-24/311"));
        assert_eq!(parse_content_range_total(&headers), Some(311));
        headers.insert(CONTENT_RANGE, HeaderValue::from_static("*/0"));
        assert_eq!(parse_content_range_total(&headers), Some(0));
        headers.insert(CONTENT_RANGE, HeaderValue::from_static("0-24/*"));
        assert_eq!(parse_content_range_total(&headers), None);
    }
}
