//! PostgREST client.

use std::time::Duration;

use async_trait::async_trait;
use fpt_config::StoreConfig;
use fpt_core::row::Row;
use reqwest::RequestBuilder;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

use crate::error::StoreError;
use crate::http::{check_response, parse_content_range};
use crate::query::Query;
use crate::RemoteStore;

/// Remote store reached through the hosted REST API.
pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    schema: String,
}

impl RestStore {
    /// Build a client from store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotConfigured`] when the URL or both keys are
    /// missing, or [`StoreError::Http`] if the HTTP client fails to build.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let api_key = config
            .api_key()
            .filter(|_| !config.url.is_empty())
            .ok_or(StoreError::NotConfigured)?;
        let http = reqwest::Client::builder()
            .user_agent("fpt/0.1")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            api_key: api_key.to_string(),
            schema: config.schema.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(table))
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, urlencoding::encode(function))
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(key) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(reqwest::header::AUTHORIZATION, bearer);
        }
        if self.schema != "public"
            && let Ok(schema) = HeaderValue::from_str(&self.schema)
        {
            headers.insert("Accept-Profile", schema.clone());
            headers.insert("Content-Profile", schema);
        }
        headers
    }

    fn get(&self, table: &str, params: &[(String, String)]) -> RequestBuilder {
        self.http
            .get(with_params(&self.table_url(table), params))
            .headers(self.headers())
    }

    async fn rows(request: RequestBuilder) -> Result<Vec<Row>, StoreError> {
        let resp = check_response(request.send().await?).await?;
        Ok(resp.json().await?)
    }
}

/// Append URL-encoded query pairs.
fn with_params(url: &str, params: &[(String, String)]) -> String {
    let encoded: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    if encoded.is_empty() {
        url.to_string()
    } else {
        format!("{url}?{}", encoded.join("&"))
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn fetch_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Row>, StoreError> {
        let params = [
            ("select".to_string(), "*".to_string()),
            ("offset".to_string(), offset.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        Self::rows(self.get(table, &params))
            .await
            .map_err(|e| e.for_table(table))
    }

    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        Self::rows(self.get(&query.table, &query.to_params()))
            .await
            .map_err(|e| e.for_table(&query.table))
    }

    async fn upsert(
        &self,
        table: &str,
        rows: &[Row],
        conflict_column: &str,
    ) -> Result<(), StoreError> {
        let resp = self
            .http
            .post(with_params(
                &self.table_url(table),
                &[("on_conflict".to_string(), conflict_column.to_string())],
            ))
            .headers(self.headers())
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await?;
        check_response(resp).await?;
        Ok(())
    }

    async fn delete_all(&self, table: &str) -> Result<(), StoreError> {
        self.rpc("delete_all_rows", serde_json::json!({ "table_name": table }))
            .await?;
        Ok(())
    }

    async fn count_where(&self, query: &Query) -> Result<u64, StoreError> {
        let mut params = query.to_params();
        params.retain(|(key, _)| key != "order" && key != "limit");
        let resp = self
            .http
            .head(with_params(&self.table_url(&query.table), &params))
            .headers(self.headers())
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = check_response(resp)
            .await
            .map_err(|e| e.for_table(&query.table))?;
        parse_content_range(&resp)
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, StoreError> {
        let resp = self
            .http
            .post(self.rpc_url(function))
            .headers(self.headers())
            .json(&args)
            .send()
            .await?;
        let body = check_response(resp).await?.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StoreConfig {
        StoreConfig {
            url: "https://abcd.supabase.co/".into(),
            anon_key: "anon".into(),
            ..Default::default()
        }
    }

    #[test]
    fn unconfigured_store_is_rejected() {
        let result = RestStore::new(&StoreConfig::default());
        assert!(matches!(result, Err(StoreError::NotConfigured)));
    }

    #[test]
    fn builds_rest_urls() {
        let store = RestStore::new(&config()).unwrap();
        assert_eq!(
            store.table_url("time_entries"),
            "https://abcd.supabase.co/rest/v1/time_entries"
        );
        assert_eq!(
            store.rpc_url("get_pending_notifications"),
            "https://abcd.supabase.co/rest/v1/rpc/get_pending_notifications"
        );
    }

    #[test]
    fn encodes_query_params() {
        let url = with_params(
            "https://abcd.supabase.co/rest/v1/tasks",
            &Query::table("tasks")
                .gte("due_date", "2026-10-18T00:00:00+00:00")
                .to_params(),
        );
        assert_eq!(
            url,
            "https://abcd.supabase.co/rest/v1/tasks?select=%2A&due_date=gte.2026-10-18T00%3A00%3A00%2B00%3A00"
        );
    }

    #[test]
    fn sends_key_in_both_headers() {
        let store = RestStore::new(&config()).unwrap();
        let headers = store.headers();
        assert_eq!(headers.get("apikey").unwrap(), "anon");
        assert_eq!(
            headers.get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer anon"
        );
        assert!(headers.get("Accept-Profile").is_none());
    }

    #[test]
    fn non_public_schema_sets_profile_headers() {
        let store = RestStore::new(&StoreConfig {
            schema: "ops".into(),
            ..config()
        })
        .unwrap();
        assert_eq!(store.headers().get("Content-Profile").unwrap(), "ops");
    }
}
