//! HTTP transport for the hosted table store (PostgREST dialect).
//!
//! Each table lives at `{url}/rest/v1/{table}`; rows are filtered with
//! `id=eq.<id>` and ordered with `order=<column>.desc`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

use super::remote::{RemoteError, RemoteStore};
use crate::config::RemoteConfig;
use crate::models::Table;

/// Table used for the connectivity probe.
const PROBE_TABLE: Table = Table::DailyPlans;

#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    api_key: String,
    client: Client,
}

impl RestStore {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// Returns an error if the remote store is not configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let url = config.url.clone().ok_or(RemoteError::NotConfigured)?;
        let api_key = config.api_key.clone().ok_or(RemoteError::NotConfigured)?;
        Self::new(url, api_key, config.timeout())
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }

    fn row_url(&self, table: Table, id: &str) -> String {
        format!(
            "{}?id=eq.{}",
            self.table_url(table),
            urlencoding::encode(id)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "no response body".to_string());
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

fn map_transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Unreachable(e.to_string())
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn probe(&self) -> Result<(), RemoteError> {
        let request = self
            .request(Method::GET, &self.table_url(PROBE_TABLE))
            .query(&[("select", "id"), ("limit", "1")]);
        self.send(request).await?;
        Ok(())
    }

    async fn fetch_all(&self, table: Table) -> Result<Vec<Value>, RemoteError> {
        let order = format!("{}.desc", table.sort_column());
        let request = self
            .request(Method::GET, &self.table_url(table))
            .query(&[("select", "*"), ("order", order.as_str())]);

        self.send(request)
            .await?
            .json::<Vec<Value>>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn insert(&self, table: Table, row: &Value) -> Result<(), RemoteError> {
        let request = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(&[row]);
        self.send(request).await?;
        Ok(())
    }

    async fn update(&self, table: Table, id: &str, row: &Value) -> Result<(), RemoteError> {
        let request = self
            .request(Method::PATCH, &self.row_url(table, id))
            .header("Prefer", "return=minimal")
            .json(row);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), RemoteError> {
        let request = self.request(Method::DELETE, &self.row_url(table, id));
        self.send(request).await?;
        Ok(())
    }
}
