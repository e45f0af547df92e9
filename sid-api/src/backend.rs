//! The `Backend` seam.
//!
//! Services depend on this trait rather than on [`ApiClient`] directly so
//! they can run against an in-memory fake in tests.

use async_trait::async_trait;
use serde_json::Value;

use sid_core::error::SidResult;

use crate::client::ApiClient;
use crate::endpoints::auth::{AuthUser, Session};
use crate::endpoints::render::{RenderRequest, RenderResponse};
use crate::endpoints::rpc::Capabilities;
use crate::query::TableQuery;

/// Everything the client needs from the hosted backend.
#[async_trait]
pub trait Backend: Send + Sync {
    // --- Tables ---
    async fn select(&self, table: &str, query: &TableQuery) -> SidResult<Vec<Value>>;
    async fn insert(&self, table: &str, rows: &Value) -> SidResult<Vec<Value>>;
    async fn update(&self, table: &str, filter: &TableQuery, patch: &Value) -> SidResult<Vec<Value>>;
    async fn delete(&self, table: &str, filter: &TableQuery) -> SidResult<Vec<Value>>;
    async fn upsert(&self, table: &str, rows: &Value, on_conflict: &str) -> SidResult<Vec<Value>>;

    // --- Procedures ---
    async fn rpc(&self, name: &str, args: &Value) -> SidResult<Value>;
    async fn capabilities(&self) -> SidResult<Capabilities>;

    // --- Storage ---
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, mime: &str) -> SidResult<String>;
    fn public_url(&self, bucket: &str, path: &str) -> String;
    async fn remove(&self, bucket: &str, paths: &[String]) -> SidResult<()>;

    // --- Auth ---
    async fn sign_in_with_password(&self, email: &str, password: &str) -> SidResult<Session>;
    async fn sign_out(&self) -> SidResult<()>;
    async fn get_user(&self) -> SidResult<AuthUser>;
    async fn set_access_token(&self, token: Option<String>);

    // --- Rendering ---
    async fn render(&self, request: &RenderRequest) -> SidResult<RenderResponse>;
    async fn download(&self, url: &str) -> SidResult<Vec<u8>>;
}

#[async_trait]
impl Backend for ApiClient {
    async fn select(&self, table: &str, query: &TableQuery) -> SidResult<Vec<Value>> {
        self.select_rows(table, query).await
    }

    async fn insert(&self, table: &str, rows: &Value) -> SidResult<Vec<Value>> {
        self.insert_rows(table, rows).await
    }

    async fn update(&self, table: &str, filter: &TableQuery, patch: &Value) -> SidResult<Vec<Value>> {
        self.update_rows(table, filter, patch).await
    }

    async fn delete(&self, table: &str, filter: &TableQuery) -> SidResult<Vec<Value>> {
        self.delete_rows(table, filter).await
    }

    async fn upsert(&self, table: &str, rows: &Value, on_conflict: &str) -> SidResult<Vec<Value>> {
        self.upsert_rows(table, rows, on_conflict).await
    }

    async fn rpc(&self, name: &str, args: &Value) -> SidResult<Value> {
        self.call_rpc(name, args).await
    }

    async fn capabilities(&self) -> SidResult<Capabilities> {
        self.fetch_capabilities().await
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, mime: &str) -> SidResult<String> {
        self.upload_object(bucket, path, bytes, mime).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.object_public_url(bucket, path)
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> SidResult<()> {
        self.remove_objects(bucket, paths).await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> SidResult<Session> {
        ApiClient::sign_in_with_password(self, email, password).await
    }

    async fn sign_out(&self) -> SidResult<()> {
        ApiClient::sign_out(self).await
    }

    async fn get_user(&self) -> SidResult<AuthUser> {
        ApiClient::get_user(self).await
    }

    async fn set_access_token(&self, token: Option<String>) {
        ApiClient::set_access_token(self, token).await
    }

    async fn render(&self, request: &RenderRequest) -> SidResult<RenderResponse> {
        self.render_document(request).await
    }

    async fn download(&self, url: &str) -> SidResult<Vec<u8>> {
        self.download_file(url).await
    }
}
