//! User service CRUD traffic.
//!
//! Every virtual user remembers the ids of the users it created and reuses
//! them for reads, updates and deletes. Ids never leak between virtual
//! users.

use async_trait::async_trait;
use rand::Rng;

use crate::loadtest::error::{AssertionFailure, ConfigurationError, ScenarioError};
use crate::loadtest::scenario::{
    action_fn, Outcome, ScenarioAction, ScenarioContext, UserBehavior, WaitTime,
};
use crate::loadtest::state::StateKey;
use crate::profiles::payload::{random_email, UserPayload};
use crate::profiles::requests::{ListCollection, Unchecked};

pub const BASE_PATH: &str = "/user-service/api/users";

/// Ids of the users this virtual user created and has not deleted yet.
pub const USER_IDS: StateKey<Vec<i64>> = StateKey::new("user_ids");

/// Deletes only start once more than this many ids are known.
const DELETE_THRESHOLD: usize = 5;

const UNKNOWN_USER_PATH: &str = "/user-service/api/users/999999";

pub(crate) fn behavior(name: &str, wait_time: WaitTime) -> Result<UserBehavior, ConfigurationError> {
    UserBehavior::new(name, wait_time)
        .with_on_start(action_fn(|ctx| {
            ctx.state.insert(&USER_IDS, Vec::new());
            Ok(Outcome::Success)
        }))
        .scenario("create user", 3, CreateUser)?
        .scenario("list users", 4, ListCollection::new(BASE_PATH))?
        .scenario("get user by id", 2, GetUserById)?
        .scenario("update user", 1, UpdateUser)?
        .scenario("delete user", 1, DeleteUser)?
        .scenario("error handling", 1, UnknownUser)
}

pub(crate) fn stress_behavior(
    name: &str,
    wait_time: WaitTime,
) -> Result<UserBehavior, ConfigurationError> {
    UserBehavior::new(name, wait_time)
        .scenario("rapid list users", 5, Unchecked::get(BASE_PATH))?
        .scenario("rapid user creation", 2, RapidCreate)
}

fn user_path(id: i64) -> String {
    format!("{BASE_PATH}/{id}")
}

/// A random id out of the ones this virtual user knows.
fn known_id(ctx: &mut ScenarioContext<'_>) -> Option<i64> {
    let ids = ctx.state.get(&USER_IDS)?;
    if ids.is_empty() {
        return None;
    }
    Some(ids[ctx.rng.random_range(0..ids.len())])
}

struct CreateUser;

#[async_trait]
impl ScenarioAction for CreateUser {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        let payload = UserPayload::load(ctx.rng);
        let response = ctx.client.post_json(BASE_PATH, &payload).await?;
        let user_id = response
            .expect_status(&[200])?
            .expect_json_key("userId")?
            .as_i64()
            .ok_or_else(|| AssertionFailure::new("No userId in response"))?;
        ctx.state.get_or_default(&USER_IDS).push(user_id);
        Ok(Outcome::Success)
    }
}

/// Reads back a known user. Without any, probes user `1` and accepts
/// either a hit or a `400`.
struct GetUserById;

#[async_trait]
impl ScenarioAction for GetUserById {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        match known_id(ctx) {
            Some(id) => {
                ctx.client
                    .get(&user_path(id))
                    .await?
                    .expect_status(&[200])?
                    .expect_json_key("userId")?;
            },
            None => {
                ctx.client
                    .get(&user_path(1))
                    .await?
                    .expect_status(&[200, 400])?;
            },
        }
        Ok(Outcome::Success)
    }
}

struct UpdateUser;

#[async_trait]
impl ScenarioAction for UpdateUser {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        let Some(id) = known_id(ctx) else {
            return Ok(Outcome::Skipped);
        };
        let mut payload = UserPayload::load(ctx.rng);
        payload.user_id = id;
        payload.email = format!("updated_{}", random_email(ctx.rng));

        ctx.client
            .put_json(&user_path(id), &payload)
            .await?
            .expect_status(&[200])?;
        Ok(Outcome::Success)
    }
}

/// Deletes a random known user once enough exist. The id is forgotten
/// before the request, whatever its result.
struct DeleteUser;

#[async_trait]
impl ScenarioAction for DeleteUser {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        let Some(ids) = ctx.state.get_mut(&USER_IDS) else {
            return Ok(Outcome::Skipped);
        };
        if ids.len() <= DELETE_THRESHOLD {
            return Ok(Outcome::Skipped);
        }
        let index = ctx.rng.random_range(0..ids.len());
        let id = ids.remove(index);

        ctx.client
            .delete(&user_path(id))
            .await?
            .expect_status(&[200])?
            .expect_body("true")?;
        Ok(Outcome::Success)
    }
}

/// An unknown user must produce a `400` carrying the service's error body.
struct UnknownUser;

#[async_trait]
impl ScenarioAction for UnknownUser {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        let response = ctx.client.get(UNKNOWN_USER_PATH).await?;
        response.expect_status(&[400])?;

        let body: serde_json::Value = serde_json::from_str(&response.body).map_err(|e| {
            AssertionFailure::new(format!("Failed to parse error response: {e}"))
        })?;
        if body.get("timestamp").is_none() {
            return Err(AssertionFailure::new("Expected error response format not found").into());
        }
        Ok(Outcome::Success)
    }
}

struct RapidCreate;

#[async_trait]
impl ScenarioAction for RapidCreate {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        let payload = UserPayload::stress(ctx.rng);
        ctx.client.post_json(BASE_PATH, &payload).await?.expect_ok()?;
        Ok(Outcome::Success)
    }
}
