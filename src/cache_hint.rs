// src/cache_hint.rs
//! `Cache-Control` directive for aggregate responses: fresh at shared caches
//! for `max_age_secs`, then served stale while the intermediary revalidates.

use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheHint {
    pub max_age_secs: u64,
}

impl CacheHint {
    pub fn new(max_age_secs: u64) -> Self {
        Self { max_age_secs }
    }

    pub fn header_value(&self) -> HeaderValue {
        // Digits and ASCII only, always a valid header value.
        HeaderValue::from_str(&format!(
            "s-maxage={}, stale-while-revalidate",
            self.max_age_secs
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("no-store"))
    }

    /// Wrap a successful response; error responses never go through here.
    pub fn apply(&self, inner: impl IntoResponse) -> Response {
        let mut resp = inner.into_response();
        resp.headers_mut()
            .insert(header::CACHE_CONTROL, self.header_value());
        resp
    }
}

impl Default for CacheHint {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CACHE_MAX_AGE_SECS)
    }
}
