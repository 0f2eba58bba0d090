//! Order and product service traffic. Requests are only checked for a
//! status below 400.

use serde_json::json;

use crate::loadtest::error::ConfigurationError;
use crate::loadtest::scenario::{UserBehavior, WaitTime};
use crate::profiles::requests::Unchecked;

pub(crate) fn order_behavior(
    name: &str,
    wait_time: WaitTime,
) -> Result<UserBehavior, ConfigurationError> {
    UserBehavior::new(name, wait_time)
        .scenario(
            "place order",
            2,
            Unchecked::post(
                "/orders",
                Some(json!({"userId": 1, "productId": 2, "quantity": 1})),
            ),
        )?
        .scenario("user orders", 1, Unchecked::get("/orders/user/1"))?
        .scenario("cancel order", 1, Unchecked::post("/orders/1/cancel", None))
}

pub(crate) fn product_behavior(
    name: &str,
    wait_time: WaitTime,
) -> Result<UserBehavior, ConfigurationError> {
    UserBehavior::new(name, wait_time)
        .scenario("list products", 2, Unchecked::get("/products"))?
        .scenario("get product", 1, Unchecked::get("/products/1"))?
        .scenario("search products", 1, Unchecked::get("/products/search?q=phone"))
}
