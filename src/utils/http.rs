// HTTP plumbing shared by the REST record store
use std::time::Duration;

use reqwest::{Client, RequestBuilder};

use crate::error::{CoreError, CoreResult};

/// Build the shared async client. One client per store so connections are pooled.
pub fn build_client(timeout: Duration) -> CoreResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("stickerdrop/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CoreError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Attach the backend API key the way hosted PostgREST gateways expect it
pub fn with_api_key(request: RequestBuilder, key: &str) -> RequestBuilder {
    request
        .header("apikey", key)
        .header("Authorization", format!("Bearer {}", key))
}

/// `Prefer` header value for an upsert
pub fn upsert_preference(ignore_duplicates: bool) -> &'static str {
    if ignore_duplicates {
        "resolution=ignore-duplicates,return=representation"
    } else {
        "resolution=merge-duplicates,return=representation"
    }
}
