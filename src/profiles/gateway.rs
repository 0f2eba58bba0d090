//! Traffic through the API gateway, which routes by service prefix.

use async_trait::async_trait;
use rand::Rng;

use crate::loadtest::error::{ConfigurationError, ScenarioError};
use crate::loadtest::scenario::{Outcome, ScenarioAction, ScenarioContext, UserBehavior, WaitTime};
use crate::profiles::requests::{list_collection, ListCollection};

pub const USERS_PATH: &str = "/user-service/api/users";
pub const PRODUCTS_PATH: &str = "/product-service/api/products";
pub const ORDERS_PATH: &str = "/order-service/api/orders";
pub const FAVOURITES_PATH: &str = "/favourite-service/api/favourites";

/// Lookups that must be rejected with `400`.
const UNKNOWN_ENTITY_PATHS: [&str; 2] = [
    "/user-service/api/users/999999",
    "/order-service/api/orders/999999",
];

const LIST_PATHS: [&str; 4] = [USERS_PATH, ORDERS_PATH, PRODUCTS_PATH, FAVOURITES_PATH];

pub(crate) fn behavior(name: &str, wait_time: WaitTime) -> Result<UserBehavior, ConfigurationError> {
    UserBehavior::new(name, wait_time)
        .scenario("list users", 4, ListCollection::new(USERS_PATH))?
        .scenario("list products", 4, ListCollection::new(PRODUCTS_PATH))?
        .scenario("list orders", 4, ListCollection::new(ORDERS_PATH))?
        .scenario("list favourites", 3, ListCollection::new(FAVOURITES_PATH))?
        .scenario("error handling", 1, UnknownEntities)
}

pub(crate) fn stress_behavior(
    name: &str,
    wait_time: WaitTime,
) -> Result<UserBehavior, ConfigurationError> {
    UserBehavior::new(name, wait_time).scenario("rapid list requests", 5, RapidList)
}

/// Asks for an unknown user and an unknown order. Both requests are always
/// sent; the first one that is not a `400` decides the failure reason.
struct UnknownEntities;

#[async_trait]
impl ScenarioAction for UnknownEntities {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        let mut first_failure = None;
        for path in UNKNOWN_ENTITY_PATHS {
            let checked = match ctx.client.get(path).await {
                Ok(response) => response
                    .expect_status(&[400])
                    .map(|_| ())
                    .map_err(ScenarioError::from),
                Err(e) => Err(ScenarioError::from(e)),
            };
            if let Err(e) = checked {
                first_failure.get_or_insert(e);
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(Outcome::Success),
        }
    }
}

/// Lists one of the four gateway collections, chosen uniformly.
struct RapidList;

#[async_trait]
impl ScenarioAction for RapidList {
    async fn execute(&self, ctx: &mut ScenarioContext<'_>) -> Result<Outcome, ScenarioError> {
        let path = LIST_PATHS[ctx.rng.random_range(0..LIST_PATHS.len())];
        list_collection(ctx.client, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadtest::client::ServiceClient;
    use crate::loadtest::state::VirtualUserState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    async fn execute(action: &dyn ScenarioAction, url: &str) -> Result<Outcome, ScenarioError> {
        let client = ServiceClient::new(url, Duration::from_secs(5)).unwrap();
        let mut state = VirtualUserState::new();
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = ScenarioContext {
            vu_id: 0,
            client: &client,
            state: &mut state,
            rng: &mut rng,
        };
        action.execute(&mut ctx).await
    }

    #[test]
    fn test_gateway_weights() {
        let behavior = behavior("api-gateway", WaitTime::default()).unwrap();
        let registry = behavior.registry();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.total_weight(), 16);
        assert_eq!(registry.get("list favourites").map(|s| s.weight()), Some(3));
        assert_eq!(registry.get("error handling").map(|s| s.weight()), Some(1));
    }

    #[tokio::test]
    async fn test_list_requires_collection_key() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", ORDERS_PATH)
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let err = execute(&ListCollection::new(ORDERS_PATH), &server.url())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No collection in response");
    }

    #[tokio::test]
    async fn test_list_reports_bad_json() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", USERS_PATH)
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let err = execute(&ListCollection::new(USERS_PATH), &server.url())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse response: "));
    }

    #[tokio::test]
    async fn test_unknown_entities_pass_on_400() {
        let mut server = mockito::Server::new_async().await;
        let users = server
            .mock("GET", UNKNOWN_ENTITY_PATHS[0])
            .with_status(400)
            .create_async()
            .await;
        let orders = server
            .mock("GET", UNKNOWN_ENTITY_PATHS[1])
            .with_status(400)
            .create_async()
            .await;

        let outcome = execute(&UnknownEntities, &server.url()).await.unwrap();
        assert_eq!(outcome, Outcome::Success);
        users.assert_async().await;
        orders.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_entities_sends_both_and_reports_first_failure() {
        let mut server = mockito::Server::new_async().await;
        let _users = server
            .mock("GET", UNKNOWN_ENTITY_PATHS[0])
            .with_status(404)
            .create_async()
            .await;
        let orders = server
            .mock("GET", UNKNOWN_ENTITY_PATHS[1])
            .with_status(500)
            .create_async()
            .await;

        let err = execute(&UnknownEntities, &server.url()).await.unwrap_err();
        assert_eq!(err.to_string(), "Expected 400, got 404");
        orders.assert_async().await;
    }

    #[tokio::test]
    async fn test_rapid_list_hits_a_gateway_collection() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for path in LIST_PATHS {
            mocks.push(
                server
                    .mock("GET", path)
                    .with_status(200)
                    .with_body(r#"{"collection": []}"#)
                    .expect_at_most(1)
                    .create_async()
                    .await,
            );
        }

        let outcome = execute(&RapidList, &server.url()).await.unwrap();
        assert_eq!(outcome, Outcome::Success);
    }
}
