use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects a Supabase API key.
///
/// Supabase expects the key twice: once in the `apikey` header and once as a
/// bearer token. Header values are validated up front so a bad key fails at
/// start-up instead of on the first request.
pub struct SupabaseKey<C> {
    inner: C,
    api_key: HeaderValue,
    bearer: HeaderValue,
}

impl<C> SupabaseKey<C> {
    pub fn new(inner: C, key: &str) -> Result<Self> {
        let mut api_key =
            HeaderValue::from_str(key).context("SUPABASE_KEY is not a valid header value")?;
        api_key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .context("SUPABASE_KEY is not a valid header value")?;
        bearer.set_sensitive(true);

        Ok(Self {
            inner,
            api_key,
            bearer,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for SupabaseKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let headers = req.headers_mut();
        headers.insert(HeaderName::from_static("apikey"), self.api_key.clone());
        headers.insert(AUTHORIZATION, self.bearer.clone());
        self.inner.execute(req).await
    }
}
