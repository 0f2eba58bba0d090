//! Declarative HTTP steps from `[[scenario]]` blocks of the config file.
//!
//! A step is one request plus an [`Expectation`] about its response. Steps
//! implement [`ScenarioAction`] directly, so they register into a
//! [`ScenarioRegistry`](crate::loadtest::scenario::ScenarioRegistry) next to
//! the built-in profile scenarios.
//!
//! ```toml
//! [[scenario]]
//! name = "list users"
//! weight = 4
//! method = "GET"
//! path = "/user-service/api/users"
//! expect = { status = [200], json_key = "collection" }
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::loadtest::client::{HttpMethod, HttpResponse};
use crate::loadtest::error::{AssertionFailure, ScenarioError};
use crate::loadtest::scenario::{Outcome, ScenarioAction, ScenarioContext};

/// A single weighted HTTP request with a success predicate.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HttpStep {
    /// Scenario name used in statistics. Must be unique.
    pub name: String,
    /// Scheduling weight relative to other scenarios. `0` disables the step.
    pub weight: u32,
    /// HTTP method (defaults to `GET`).
    #[serde(default = "default_method")]
    pub method: HttpMethod,
    /// Request path, starting with `/`, relative to the target URL.
    pub path: String,
    /// Optional JSON body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Extra request headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// What a passing response looks like.
    #[serde(default)]
    pub expect: Expectation,
}

fn default_method() -> HttpMethod {
    HttpMethod::Get
}

/// Response checks of an [`HttpStep`]. All present checks must pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Expectation {
    /// Accepted status codes. Empty means "any status below 400".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<u16>,
    /// Key that must be present in the JSON object body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_key: Option<String>,
    /// Exact expected body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Expectation {
    pub fn check(&self, response: &HttpResponse) -> Result<(), AssertionFailure> {
        if self.status.is_empty() {
            response.expect_ok()?;
        } else {
            response.expect_status(&self.status)?;
        }
        if let Some(key) = &self.json_key {
            response.expect_json_key(key)?;
        }
        if let Some(body) = &self.body {
            response.expect_body(body)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ScenarioAction for HttpStep {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        let headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let response = ctx
            .client
            .send(self.method, &self.path, self.body.as_ref(), &headers)
            .await?;
        self.expect.check(&response)?;
        Ok(Outcome::Success)
    }
}
