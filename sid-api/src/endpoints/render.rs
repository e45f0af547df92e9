//! Document rendering endpoint.
//!
//! The rendering function fills a stored document template with a flat
//! key/value map and answers with the URL of the produced file.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use sid_core::error::{SidError, SidResult};

use crate::client::ApiClient;

/// Body posted to the rendering endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub template_url: String,
    pub data: Map<String, Value>,
    pub template_id: String,
}

/// Rendering result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderResponse {
    #[serde(default, alias = "fileUrl", alias = "url")]
    pub file_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RenderResponse {
    /// The file URL, or a render error carrying the endpoint's message.
    pub fn into_file_url(self) -> SidResult<String> {
        match (self.file_url.filter(|u| !u.is_empty()), self.error) {
            (Some(url), _) => Ok(url),
            (None, Some(err)) => Err(SidError::Render(err)),
            (None, None) => Err(SidError::Render("rendering endpoint returned no file url".into())),
        }
    }
}

impl ApiClient {
    /// Post a substitution map to the rendering endpoint.
    pub async fn render_document(&self, request: &RenderRequest) -> SidResult<RenderResponse> {
        let body = serde_json::to_value(request)?;
        let endpoint = self.render_endpoint().to_string();
        let resp = self
            .request_with_retry(Method::POST, &endpoint, self.render_timeout(), &[], Some(&body))
            .await?;
        let rendered: RenderResponse = Self::parse_json(resp).await?;
        info!("rendered template {}", request.template_id);
        Ok(rendered)
    }

    /// Download a rendered file (or any absolute URL) as bytes.
    pub async fn download_file(&self, url: &str) -> SidResult<Vec<u8>> {
        let resp = self
            .request_with_retry(Method::GET, url, self.render_timeout(), &[], None)
            .await?;
        Self::response_bytes(resp).await
    }
}
