//! # svcload
//!
//! Locust-style load generation for the e-commerce HTTP microservices.
//!
//! A run spawns a number of virtual users. Each one repeatedly picks a
//! weighted scenario, issues its requests against the target, classifies
//! the response as success or failure, and pauses before the next pick.
//! Built-in [`profiles`] model the traffic of the user, order, product and
//! gateway services; custom steps come from a TOML config file.
//!
//! ```no_run
//! use std::time::Duration;
//! use svcload::loadtest::client::ServiceClient;
//! use svcload::loadtest::engine::RunController;
//! use svcload::profiles::Profile;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::new("http://localhost:8080", Duration::from_secs(5))?;
//! let controller = RunController::new(Profile::ApiGateway.build()?, client)?;
//! let result = controller
//!     .run(10, Duration::from_secs(60), Duration::from_secs(10))
//!     .await;
//! println!("{} attempts", result.snapshot.total_attempts);
//! # Ok(())
//! # }
//! ```

pub mod loadtest;
pub mod profiles;
