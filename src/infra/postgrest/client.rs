use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_RANGE};
use reqwest::{Method, Request, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::fetch::HttpClient;
use crate::services::record_store::{Collection, Page, RecordStore};

/// Reads collections from `{base_url}/rest/v1/{table}` using offset/limit
/// windows ordered by `id`.
pub struct PostgrestStore<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> PostgrestStore<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn page_url(&self, collection: &Collection, offset: usize, limit: usize) -> Result<Url, StoreError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, collection.name))
            .map_err(|e| StoreError::Malformed(format!("invalid store URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("select", &collection.select)
            .append_pair("order", "id.asc")
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> RecordStore for PostgrestStore<C> {
    async fn fetch_page(
        &self,
        collection: &Collection,
        offset: usize,
        limit: usize,
    ) -> Result<Page, StoreError> {
        let url = self.page_url(collection, offset, limit)?;
        let mut req = Request::new(Method::GET, url);
        req.headers_mut()
            .insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self
            .client
            .execute(req)
            .await
            .map_err(|e| StoreError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(StoreError::Transient(format!("store returned {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        let body = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transient(format!("failed to read body: {e}")))?;
        let rows: Vec<Value> = serde_json::from_slice(&body)
            .map_err(|e| StoreError::Malformed(format!("expected a JSON array: {e}")))?;

        debug!(
            collection = %collection.name,
            offset,
            rows = rows.len(),
            total,
            "Page received"
        );

        Ok(Page { rows, total })
    }
}

/// Extracts the total from a `Content-Range` value such as `0-999/5589` or
/// `*/0`. Returns `None` when the total is `*` or unparsable.
pub fn parse_content_range(value: &str) -> Option<usize> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unused;

    #[async_trait]
    impl HttpClient for Unused {
        async fn execute(&self, _req: Request) -> reqwest::Result<reqwest::Response> {
            unreachable!("not called in these tests")
        }
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-999/5589"), Some(5589));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-999/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_page_url_carries_window_and_order() {
        let store = PostgrestStore::new(Unused, "https://abc.supabase.co/");
        let url = store
            .page_url(&Collection::new("visits", "id,visit_date"), 2000, 1000)
            .unwrap();

        assert_eq!(url.path(), "/rest/v1/visits");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("select".into(), "id,visit_date".into())));
        assert!(pairs.contains(&("order".into(), "id.asc".into())));
        assert!(pairs.contains(&("offset".into(), "2000".into())));
        assert!(pairs.contains(&("limit".into(), "1000".into())));
    }
}
