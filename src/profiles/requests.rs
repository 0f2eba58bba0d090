//! Request actions shared by several profiles.

use async_trait::async_trait;
use serde_json::Value;

use crate::loadtest::client::{HttpMethod, ServiceClient};
use crate::loadtest::error::ScenarioError;
use crate::loadtest::scenario::{Outcome, ScenarioAction, ScenarioContext};

/// `GET path` expecting `200` and a JSON object with a `collection` key.
#[derive(Debug, Clone, Copy)]
pub struct ListCollection {
    pub path: &'static str,
}

impl ListCollection {
    pub const fn new(path: &'static str) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ScenarioAction for ListCollection {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        list_collection(ctx.client, self.path).await
    }
}

pub(crate) async fn list_collection(
    client: &ServiceClient,
    path: &str,
) -> Result<Outcome, ScenarioError> {
    client
        .get(path)
        .await?
        .expect_status(&[200])?
        .expect_json_key("collection")?;
    Ok(Outcome::Success)
}

/// A request whose only check is a status below 400.
#[derive(Debug, Clone)]
pub struct Unchecked {
    method: HttpMethod,
    path: &'static str,
    body: Option<Value>,
}

impl Unchecked {
    pub fn get(path: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            body: None,
        }
    }

    pub fn post(path: &'static str, body: Option<Value>) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            body,
        }
    }
}

#[async_trait]
impl ScenarioAction for Unchecked {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        ctx.client
            .send(self.method, self.path, self.body.as_ref(), &[])
            .await?
            .expect_ok()?;
        Ok(Outcome::Success)
    }
}
