//! PostgREST-compatible HTTP record store
//!
//! No retries: a failed call is reported once and the caller decides what to do.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use super::{filter_param, Filter, OnConflict, Query, RecordStore};
use crate::config::BackendConfig;
use crate::constants::REST_PATH;
use crate::error::{CoreResult, StoreError};
use crate::utils::http::{build_client, upsert_preference, with_api_key};

pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(config: &BackendConfig) -> CoreResult<Self> {
        Ok(Self {
            client: build_client(config.timeout)?,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.anon_key.clone(),
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, table)
    }

    pub fn rpc_url(&self, name: &str) -> String {
        format!("{}/{}/rpc/{}", self.base_url, REST_PATH, name)
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, StoreError> {
        let response = with_api_key(request, &self.api_key)
            .send()
            .await
            .map_err(|e| {
                log::warn!("[RestStore] {} request failed: {}", context, e);
                StoreError::Unreachable(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        log::warn!("[RestStore] {} returned {}: {}", context, status, message);
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

async fn read_rows(response: Response) -> Result<Vec<Value>, StoreError> {
    response
        .json::<Vec<Value>>()
        .await
        .map_err(|e| StoreError::Malformed(e.to_string()))
}

#[async_trait]
impl RecordStore for RestStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        let url = format!("{}?{}", self.table_url(table), query.to_query_string());
        log::debug!("[RestStore] GET {}", url);

        let response = self.send(self.client.get(&url), table).await?;
        read_rows(response).await
    }

    async fn upsert(
        &self,
        table: &str,
        record: Value,
        conflict_key: &str,
        on_conflict: OnConflict,
    ) -> Result<Option<Value>, StoreError> {
        let url = format!(
            "{}?on_conflict={}",
            self.table_url(table),
            urlencoding::encode(conflict_key)
        );
        log::debug!("[RestStore] POST {} ({:?})", url, on_conflict);

        let request = self
            .client
            .post(&url)
            .header("Prefer", upsert_preference(on_conflict == OnConflict::Ignore))
            .json(&record);
        let response = self.send(request, table).await?;
        Ok(read_rows(response).await?.into_iter().next())
    }

    async fn update(&self, table: &str, fields: Value, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let url = format!("{}?{}", self.table_url(table), filter_param(filter));
        log::debug!("[RestStore] PATCH {}", url);

        let request = self
            .client
            .patch(&url)
            .header("Prefer", "return=representation")
            .json(&fields);
        let response = self.send(request, table).await?;
        read_rows(response).await
    }

    async fn rpc(&self, name: &str, args: Value) -> Result<Value, StoreError> {
        let url = self.rpc_url(name);
        log::debug!("[RestStore] POST {}", url);

        match self.send(self.client.post(&url).json(&args), name).await {
            Ok(response) => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| StoreError::Malformed(e.to_string()))?;
                if body.trim().is_empty() {
                    return Ok(Value::Null);
                }
                serde_json::from_str(&body).map_err(|e| StoreError::Malformed(e.to_string()))
            }
            Err(StoreError::Rejected { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(StoreError::Unsupported(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_table_and_rpc_urls() {
        let store = RestStore::new(&BackendConfig::new("https://demo.supabase.co/", "key")).unwrap();
        assert_eq!(store.table_url("stickers"), "https://demo.supabase.co/rest/v1/stickers");
        assert_eq!(
            store.rpc_url("toggle_likes"),
            "https://demo.supabase.co/rest/v1/rpc/toggle_likes"
        );
    }

    #[tokio::test]
    async fn unreachable_backend_reports_unreachable() {
        let mut config = BackendConfig::new("http://127.0.0.1:1", "key");
        config.timeout = std::time::Duration::from_millis(500);
        let store = RestStore::new(&config).unwrap();

        let err = store.select("stickers", &Query::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unreachable(_)));
    }
}
