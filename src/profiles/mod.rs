//! Built-in user classes for the e-commerce services.
//!
//! Each [`Profile`] builds a [`UserBehavior`] with its scenarios, weights
//! and default pacing. Profiles can be extended with declarative steps from
//! the config file.

mod catalog;
mod gateway;
pub mod payload;
mod requests;
pub mod user_service;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::loadtest::error::ConfigurationError;
use crate::loadtest::scenario::{UserBehavior, WaitTime};

pub use requests::{ListCollection, Unchecked};

/// A built-in user class.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Browses every service through the gateway.
    ApiGateway,
    /// Hammers the gateway list endpoints.
    ApiGatewayStress,
    /// Creates, reads, updates and deletes users.
    UserService,
    /// Rapid user listing and creation.
    UserServiceStress,
    /// Places, lists and cancels orders.
    OrderService,
    /// Lists, fetches and searches products.
    ProductService,
}

impl Profile {
    pub const ALL: [Profile; 6] = [
        Profile::ApiGateway,
        Profile::ApiGatewayStress,
        Profile::UserService,
        Profile::UserServiceStress,
        Profile::OrderService,
        Profile::ProductService,
    ];

    /// The kebab-case name used in config files and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::ApiGateway => "api-gateway",
            Self::ApiGatewayStress => "api-gateway-stress",
            Self::UserService => "user-service",
            Self::UserServiceStress => "user-service-stress",
            Self::OrderService => "order-service",
            Self::ProductService => "product-service",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ApiGateway => "Lists users, products, orders and favourites through the gateway",
            Self::ApiGatewayStress => "Rapid list requests against a random gateway route",
            Self::UserService => "User CRUD with per-user memory of created ids",
            Self::UserServiceStress => "Rapid user listing and creation without validation",
            Self::OrderService => "Places, lists and cancels orders",
            Self::ProductService => "Lists, fetches and searches products",
        }
    }

    /// Default pause bounds between scenarios, in milliseconds.
    pub fn wait_bounds_ms(self) -> (u64, u64) {
        match self {
            Self::ApiGateway | Self::UserService => (1000, 3000),
            Self::ApiGatewayStress | Self::UserServiceStress => (100, 500),
            Self::OrderService | Self::ProductService => (1000, 5000),
        }
    }

    /// Build the behaviour every virtual user of this class follows.
    pub fn build(self) -> Result<UserBehavior, ConfigurationError> {
        let (min_ms, max_ms) = self.wait_bounds_ms();
        let wait_time = WaitTime::between_millis(min_ms, max_ms)?;
        let name = self.name();
        match self {
            Self::ApiGateway => gateway::behavior(name, wait_time),
            Self::ApiGatewayStress => gateway::stress_behavior(name, wait_time),
            Self::UserService => user_service::behavior(name, wait_time),
            Self::UserServiceStress => user_service::stress_behavior(name, wait_time),
            Self::OrderService => catalog::order_behavior(name, wait_time),
            Self::ProductService => catalog::product_behavior(name, wait_time),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
