//! HTTP client capability used by scenario actions.
//!
//! Each run shares one [`ServiceClient`] (a cheap clone around a pooled
//! `reqwest::Client`). Requests are addressed by path relative to the target
//! base URL and return an [`HttpResponse`] whose check helpers produce
//! [`AssertionFailure`]s for the scenario's success predicate.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::loadtest::error::{AssertionFailure, LoadTestError, RequestError};

/// HTTP verbs the harness issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    fn as_reqwest(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// A received HTTP response, fully buffered.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Numeric status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body decoded as text.
    pub body: String,
}

impl HttpResponse {
    /// Passes when the status is below 400, the default pass rule for
    /// requests without an explicit check.
    pub fn expect_ok(&self) -> Result<&Self, AssertionFailure> {
        if self.status < 400 {
            Ok(self)
        } else {
            Err(AssertionFailure::new(format!(
                "Got status code {}",
                self.status
            )))
        }
    }

    /// Passes when the status is one of `expected`.
    pub fn expect_status(&self, expected: &[u16]) -> Result<&Self, AssertionFailure> {
        if expected.contains(&self.status) {
            return Ok(self);
        }
        let reason = match expected {
            [200] => format!("Got status code {}", self.status),
            [single] => format!("Expected {single}, got {}", self.status),
            _ => format!("Unexpected status code {}", self.status),
        };
        Err(AssertionFailure::new(reason))
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, AssertionFailure> {
        serde_json::from_str(&self.body)
            .map_err(|e| AssertionFailure::new(format!("Failed to parse response: {e}")))
    }

    /// Parse the body as a JSON object and return the value under `key`.
    pub fn expect_json_key(&self, key: &str) -> Result<serde_json::Value, AssertionFailure> {
        let mut value = self.json()?;
        value
            .get_mut(key)
            .map(serde_json::Value::take)
            .ok_or_else(|| AssertionFailure::new(format!("No {key} in response")))
    }

    /// Passes when the body equals `expected` exactly.
    pub fn expect_body(&self, expected: &str) -> Result<&Self, AssertionFailure> {
        if self.body == expected {
            Ok(self)
        } else {
            Err(AssertionFailure::new("Unexpected response content"))
        }
    }
}

/// HTTP client bound to the target base URL. Cloning is cheap.
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    timeout: Duration,
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ServiceClient {
    /// Build a client for `base_url` with the given per-request timeout.
    ///
    /// A trailing `/` on the base URL is dropped so paths can always start
    /// with `/`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LoadTestError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadTestError::Client {
                message: e.to_string(),
            })?;
        Ok(Self::with_http_client(http, base_url, timeout))
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_http_client(http: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            timeout,
        }
    }

    /// The base URL every path is resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve a path (with or without a leading `/`) against the base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn get(&self, path: &str) -> Result<HttpResponse, RequestError> {
        self.send::<()>(HttpMethod::Get, path, None, &[]).await
    }

    pub async fn post_json<T>(&self, path: &str, body: &T) -> Result<HttpResponse, RequestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send(HttpMethod::Post, path, Some(body), &[]).await
    }

    pub async fn put_json<T>(&self, path: &str, body: &T) -> Result<HttpResponse, RequestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send(HttpMethod::Put, path, Some(body), &[]).await
    }

    pub async fn delete(&self, path: &str) -> Result<HttpResponse, RequestError> {
        self.send::<()>(HttpMethod::Delete, path, None, &[]).await
    }

    /// Issue a request with an optional JSON body and extra headers.
    ///
    /// Any HTTP status is returned as a response; only transport failures
    /// become a [`RequestError`].
    pub async fn send<T>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&T>,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, RequestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        let mut request = self.http.request(method.as_reqwest(), self.url_for(path));
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_url_for_joins_paths() {
        let client = ServiceClient::with_http_client(
            reqwest::Client::new(),
            "http://localhost:8080/",
            Duration::from_secs(1),
        );
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(
            client.url_for("/api/users"),
            "http://localhost:8080/api/users"
        );
        assert_eq!(client.url_for("api/users"), "http://localhost:8080/api/users");
    }

    #[test]
    fn test_expect_ok_rejects_client_errors() {
        assert!(response(204, "").expect_ok().is_ok());
        let err = response(404, "").expect_ok().unwrap_err();
        assert_eq!(err.reason, "Got status code 404");
    }

    #[test]
    fn test_expect_status_messages() {
        let err = response(500, "").expect_status(&[200]).unwrap_err();
        assert_eq!(err.reason, "Got status code 500");

        let err = response(200, "").expect_status(&[400]).unwrap_err();
        assert_eq!(err.reason, "Expected 400, got 200");

        let err = response(503, "").expect_status(&[200, 400]).unwrap_err();
        assert_eq!(err.reason, "Unexpected status code 503");

        assert!(response(400, "").expect_status(&[200, 400]).is_ok());
    }

    #[test]
    fn test_expect_json_key() {
        let ok = response(200, r#"{"collection": [1, 2]}"#);
        assert_eq!(
            ok.expect_json_key("collection").unwrap(),
            serde_json::json!([1, 2])
        );

        let missing = response(200, r#"{"items": []}"#);
        assert_eq!(
            missing.expect_json_key("collection").unwrap_err().reason,
            "No collection in response"
        );

        let garbage = response(200, "<html>");
        assert!(garbage
            .expect_json_key("collection")
            .unwrap_err()
            .reason
            .starts_with("Failed to parse response"));
    }

    #[test]
    fn test_expect_body() {
        assert!(response(200, "true").expect_body("true").is_ok());
        assert_eq!(
            response(200, "false").expect_body("true").unwrap_err().reason,
            "Unexpected response content"
        );
    }

    #[test]
    fn test_http_method_parses_uppercase() {
        let method: HttpMethod = serde_json::from_str(r#""DELETE""#).unwrap();
        assert_eq!(method, HttpMethod::Delete);
        assert_eq!(method.to_string(), "DELETE");
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        let client = ServiceClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        let err = client.get("/api/users").await.unwrap_err();
        assert!(matches!(
            err,
            RequestError::Connection { .. } | RequestError::Timeout | RequestError::Transport { .. }
        ));
    }

    #[tokio::test]
    async fn test_send_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/orders")
            .match_header("x-trace", "abc")
            .with_status(201)
            .with_body(r#"{"orderId": 7}"#)
            .create_async()
            .await;

        let client = ServiceClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let resp = client
            .send(
                HttpMethod::Post,
                "/api/orders",
                Some(&serde_json::json!({"productId": 2})),
                &[("x-trace".to_string(), "abc".to_string())],
            )
            .await
            .unwrap();

        assert_eq!(resp.status, 201);
        assert_eq!(resp.expect_json_key("orderId").unwrap(), 7);
        mock.assert_async().await;
    }
}
