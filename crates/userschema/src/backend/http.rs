//! HTTP backend for the directory service's user schema API.
//!
//! Talks to `/api/v1/meta/schemas/user/{typeId}`: `GET` returns the whole
//! schema, `POST` with the whole schema replaces it. The API token is passed
//! through as an `SSWS` authorization header and never inspected.

use super::{RemoteResult, RemoteSchemaClient};
use crate::error::RemoteError;
use crate::types::SchemaScope;
use serde_json::Value;
use std::time::Duration;

/// Default per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP client for the user schema API.
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Organization base URL, without trailing slash.
    org_url: String,
    /// API token sent as `SSWS <token>`.
    api_token: Option<String>,
}

impl HttpBackend {
    /// Create a backend for an organization URL.
    pub fn new(org_url: impl Into<String>, api_token: Option<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            org_url: org_url.into().trim_end_matches('/').to_string(),
            api_token,
        }
    }

    /// Organization base URL.
    pub fn org_url(&self) -> &str {
        &self.org_url
    }

    /// Build the schema URL for a scope.
    pub fn schema_url(&self, scope: &SchemaScope) -> String {
        format!("{}/api/v1/meta/schemas/user/{}", self.org_url, scope.type_id())
    }

    fn authorization(&self) -> Option<String> {
        self.api_token.as_ref().map(|token| format!("SSWS {token}"))
    }
}

impl RemoteSchemaClient for HttpBackend {
    fn fetch_document(&self, scope: &SchemaScope) -> RemoteResult<Value> {
        let url = self.schema_url(scope);
        log::debug!("GET {url}");

        let mut request = self
            .agent
            .get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", "userschema-rs");
        if let Some(auth) = self.authorization() {
            request = request.header("Authorization", auth);
        }

        let document: Value = request.call()?.body_mut().read_json()?;
        if !document.is_object() {
            return Err(RemoteError::permanent(format!(
                "unexpected schema response from {url}"
            )));
        }
        Ok(document)
    }

    fn replace_document(&self, scope: &SchemaScope, document: &Value) -> RemoteResult<()> {
        let url = self.schema_url(scope);
        log::debug!("POST {url}");

        let mut request = self
            .agent
            .post(&url)
            .header("Accept", "application/json")
            .header("User-Agent", "userschema-rs");
        if let Some(auth) = self.authorization() {
            request = request.header("Authorization", auth);
        }

        request.send_json(document)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_url() {
        let backend = HttpBackend::new("https://example.okta.com/", None);
        assert_eq!(backend.org_url(), "https://example.okta.com");
        assert_eq!(
            backend.schema_url(&SchemaScope::Default),
            "https://example.okta.com/api/v1/meta/schemas/user/default"
        );
        assert_eq!(
            backend.schema_url(&SchemaScope::custom("oty1abc")),
            "https://example.okta.com/api/v1/meta/schemas/user/oty1abc"
        );
    }

    #[test]
    fn test_authorization_header() {
        let backend = HttpBackend::new("https://example.okta.com", Some("t0k".into()));
        assert_eq!(backend.authorization().as_deref(), Some("SSWS t0k"));
        assert!(HttpBackend::new("https://x", None).authorization().is_none());
    }

    #[test]
    fn test_unreachable_host_is_transient() {
        let backend = HttpBackend::new("http://127.0.0.1:9", None);
        let err = backend.fetch_document(&SchemaScope::Default).unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err:?}");
    }
}
