//! Run configuration.
//!
//! Everything here is built once at start-up and handed down explicitly;
//! nothing reads the environment after that.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use std::time::Duration;

/// Connection settings for the Supabase REST endpoint.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key: String,
    pub timeout: Duration,
    pub paging: PagingConfig,
}

/// Page size, retry ceiling and parallelism used by the pager.
#[derive(Debug, Clone, PartialEq)]
pub struct PagingConfig {
    pub page_size: usize,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub concurrency: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_attempts: 3,
            retry_delay: Duration::from_millis(2000),
            concurrency: 4,
        }
    }
}

/// Largest page the pager will ask for.
pub const MAX_PAGE_SIZE: usize = 100_000;

/// Most page requests the pager keeps in flight per collection.
pub const MAX_CONCURRENCY: usize = 64;

impl PagingConfig {
    /// Clamps values that would stall the pager or overflow its offsets.
    pub fn sanitized(mut self) -> Self {
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self.max_attempts = self.max_attempts.max(1);
        self.concurrency = self.concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }
}

impl StoreConfig {
    /// Reads `SUPABASE_URL`, `SUPABASE_KEY` and the optional `ELAB_*` tuning
    /// variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("SUPABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("SUPABASE_URL must be set (environment or .env)"))?;
        let key = lookup("SUPABASE_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("SUPABASE_KEY must be set (environment or .env)"))?;

        let defaults = PagingConfig::default();
        let paging = PagingConfig {
            page_size: parse_var(&lookup, "ELAB_PAGE_SIZE")?.unwrap_or(defaults.page_size),
            max_attempts: parse_var(&lookup, "ELAB_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
            retry_delay: parse_var(&lookup, "ELAB_RETRY_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            concurrency: parse_var(&lookup, "ELAB_FETCH_CONCURRENCY")?
                .unwrap_or(defaults.concurrency),
        }
        .sanitized();

        let timeout = parse_var(&lookup, "ELAB_HTTP_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            key,
            timeout,
            paging,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} has invalid value '{raw}'")),
        _ => Ok(None),
    }
}

/// Inclusive service-date window. Unbounded ends are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    /// The last `days` days, ending on `today`.
    pub fn last_days(days: u32, today: NaiveDate) -> Self {
        Self {
            start: today.checked_sub_days(chrono::Days::new(u64::from(days))),
            end: Some(today),
        }
    }

    pub fn is_all(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }

    /// Label used in exported metadata.
    pub fn describe_start(&self) -> String {
        self.start
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "ALL".to_string())
    }

    pub fn describe_end(&self) -> String {
        self.end
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "ALL".to_string())
    }
}
