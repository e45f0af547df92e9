//! Remote procedure endpoints (`/rest/v1/rpc/{name}`) and capability negotiation.

use std::collections::BTreeSet;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use sid_core::constants::rpc;
use sid_core::error::SidResult;

use crate::client::ApiClient;
use crate::response::is_missing_function;

/// Remote procedures the backend advertises through `api_capabilities`.
///
/// Callers check membership up front and pick exactly one code path; a
/// missing capability is never discovered by trying the call and falling back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    procedures: BTreeSet<String>,
}

impl Capabilities {
    pub fn new<I, S>(procedures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            procedures: procedures.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the RPC result: either a list of names or `{ "capabilities": [...] }`.
    pub fn from_value(value: &Value) -> Self {
        let list = match value {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => match map.get("capabilities") {
                Some(Value::Array(items)) => items.as_slice(),
                _ => &[],
            },
            _ => &[],
        };
        Self::new(list.iter().filter_map(|v| v.as_str()))
    }

    pub fn supports(&self, procedure: &str) -> bool {
        self.procedures.contains(procedure)
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.procedures.iter().map(String::as_str)
    }
}

impl ApiClient {
    /// Call a named remote procedure with JSON arguments.
    pub async fn call_rpc(&self, name: &str, args: &Value) -> SidResult<Value> {
        let url = self.rest_url(&format!("rpc/{name}"));
        let resp = self
            .request_with_retry(Method::POST, &url, self.default_timeout(), &[], Some(args))
            .await?;
        let value: Option<Value> = Self::parse_json_or_default(resp).await?;
        Ok(value.unwrap_or(Value::Null))
    }

    /// Fetch the capability set. A backend without `api_capabilities`
    /// offers nothing beyond the plain table API.
    pub async fn fetch_capabilities(&self) -> SidResult<Capabilities> {
        match self.call_rpc(rpc::CAPABILITIES, &Value::Object(Default::default())).await {
            Ok(value) => {
                let caps = Capabilities::from_value(&value);
                info!("backend advertises {} procedures", caps.procedures.len());
                Ok(caps)
            }
            Err(e) if is_missing_function(&e) => {
                debug!("capability listing not available: {e}");
                Ok(Capabilities::default())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capabilities_from_list() {
        let caps = Capabilities::from_value(&json!(["update_form_data_checked", "generate_nomor_surat"]));
        assert!(caps.supports(rpc::UPDATE_FORM_DATA));
        assert!(caps.supports(rpc::GENERATE_LETTER_NUMBER));
        assert!(!caps.supports(rpc::DELETE_FORM_DATA));
    }

    #[test]
    fn test_capabilities_from_object() {
        let caps = Capabilities::from_value(&json!({"capabilities": ["set_user_role", 5]}));
        assert_eq!(caps.iter().collect::<Vec<_>>(), vec!["set_user_role"]);
    }

    #[test]
    fn test_capabilities_unexpected_shape() {
        assert!(Capabilities::from_value(&json!("nope")).is_empty());
        assert!(Capabilities::from_value(&Value::Null).is_empty());
    }
}
