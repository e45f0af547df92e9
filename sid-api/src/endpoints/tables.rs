//! Table endpoints (`/rest/v1/{table}`).

use reqwest::Method;
use serde_json::Value;
use sid_core::error::{SidError, SidResult};

use crate::client::ApiClient;
use crate::query::TableQuery;

const RETURN_REPRESENTATION: (&str, &str) = ("Prefer", "return=representation");

/// Wrap a single object into a one-element array; arrays pass through.
fn as_rows(rows: &Value) -> Value {
    match rows {
        Value::Array(_) => rows.clone(),
        other => Value::Array(vec![other.clone()]),
    }
}

impl ApiClient {
    /// Read rows matching `query`.
    pub async fn select_rows(&self, table: &str, query: &TableQuery) -> SidResult<Vec<Value>> {
        let url = Self::with_query(&self.rest_url(table), &query.to_pairs())?;
        let resp = self
            .request_with_retry(Method::GET, &url, self.default_timeout(), &[], None)
            .await?;
        Self::parse_json_or_default(resp).await
    }

    /// Insert one row or an array of rows; returns the stored rows.
    pub async fn insert_rows(&self, table: &str, rows: &Value) -> SidResult<Vec<Value>> {
        let url = self.rest_url(table);
        let body = as_rows(rows);
        let resp = self
            .request_with_retry(
                Method::POST,
                &url,
                self.default_timeout(),
                &[RETURN_REPRESENTATION],
                Some(&body),
            )
            .await?;
        Self::parse_json_or_default(resp).await
    }

    /// Patch rows matching `filter`; returns the updated rows.
    pub async fn update_rows(
        &self,
        table: &str,
        filter: &TableQuery,
        patch: &Value,
    ) -> SidResult<Vec<Value>> {
        if !filter.has_filters() {
            return Err(SidError::Validation(format!("refusing unfiltered update on {table}")));
        }
        let url = Self::with_query(&self.rest_url(table), &filter.filter_pairs())?;
        let resp = self
            .request_with_retry(
                Method::PATCH,
                &url,
                self.default_timeout(),
                &[RETURN_REPRESENTATION],
                Some(patch),
            )
            .await?;
        Self::parse_json_or_default(resp).await
    }

    /// Delete rows matching `filter`; returns the deleted rows.
    pub async fn delete_rows(&self, table: &str, filter: &TableQuery) -> SidResult<Vec<Value>> {
        if !filter.has_filters() {
            return Err(SidError::Validation(format!("refusing unfiltered delete on {table}")));
        }
        let url = Self::with_query(&self.rest_url(table), &filter.filter_pairs())?;
        let resp = self
            .request_with_retry(
                Method::DELETE,
                &url,
                self.default_timeout(),
                &[RETURN_REPRESENTATION],
                None,
            )
            .await?;
        Self::parse_json_or_default(resp).await
    }

    /// Insert or merge rows on the `on_conflict` column(s).
    pub async fn upsert_rows(
        &self,
        table: &str,
        rows: &Value,
        on_conflict: &str,
    ) -> SidResult<Vec<Value>> {
        let url = Self::with_query(
            &self.rest_url(table),
            &[("on_conflict".to_string(), on_conflict.to_string())],
        )?;
        let body = as_rows(rows);
        let resp = self
            .request_with_retry(
                Method::POST,
                &url,
                self.default_timeout(),
                &[("Prefer", "resolution=merge-duplicates,return=representation")],
                Some(&body),
            )
            .await?;
        Self::parse_json_or_default(resp).await
    }
}
