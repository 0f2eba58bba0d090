//! Request bodies for the user service.
//!
//! Field names follow the service's camelCase JSON contract.

use rand::Rng;
use serde::Serialize;

const EMAIL_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

const CITIES: [&str; 5] = ["New York", "Los Angeles", "Chicago", "Houston", "Phoenix"];

/// A user as accepted by `POST /user-service/api/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub image_url: String,
    pub email: String,
    pub address_dtos: Vec<AddressPayload>,
    pub credential: CredentialPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub full_address: String,
    pub postal_code: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPayload {
    pub username: String,
    pub password: String,
    pub role_based_authority: String,
    pub is_enabled: bool,
    pub is_account_non_expired: bool,
    pub is_account_non_locked: bool,
    pub is_credentials_non_expired: bool,
}

impl CredentialPayload {
    fn active_user(username: String, password: &str) -> Self {
        Self {
            username,
            password: password.to_string(),
            role_based_authority: "ROLE_USER".to_string(),
            is_enabled: true,
            is_account_non_expired: true,
            is_account_non_locked: true,
            is_credentials_non_expired: true,
        }
    }
}

impl UserPayload {
    /// A regular load-test user with a random address in one of five cities.
    pub fn load<R: Rng>(rng: &mut R) -> Self {
        let city = CITIES[rng.random_range(0..CITIES.len())];
        Self {
            user_id: rng.random_range(1000..=999_999),
            first_name: "Load".to_string(),
            last_name: "Test".to_string(),
            image_url: random_image_url(rng),
            email: random_email(rng),
            address_dtos: vec![AddressPayload {
                full_address: format!("{} Test Street", rng.random_range(100..=999)),
                postal_code: rng.random_range(10_000..=99_999).to_string(),
                city: city.to_string(),
            }],
            credential: CredentialPayload::active_user(
                format!("user_{}", rng.random_range(1000..=9999)),
                "testpass123",
            ),
        }
    }

    /// The lighter-weight user posted by the stress profile.
    pub fn stress<R: Rng>(rng: &mut R) -> Self {
        Self {
            user_id: rng.random_range(1000..=999_999),
            first_name: "Stress".to_string(),
            last_name: "Test".to_string(),
            image_url: random_image_url(rng),
            email: format!("stress_{}@example.com", rng.random_range(10_000..=99_999)),
            address_dtos: vec![AddressPayload {
                full_address: format!("{} Stress Ave", rng.random_range(100..=999)),
                postal_code: rng.random_range(10_000..=99_999).to_string(),
                city: "Test City".to_string(),
            }],
            credential: CredentialPayload::active_user(
                format!("stress_{}", rng.random_range(1000..=9999)),
                "stresstest",
            ),
        }
    }
}

/// `test_<8 lowercase letters or digits>@example.com`
pub fn random_email<R: Rng>(rng: &mut R) -> String {
    let local: String = (0..8)
        .map(|_| char::from(EMAIL_ALPHABET[rng.random_range(0..EMAIL_ALPHABET.len())]))
        .collect();
    format!("test_{local}@example.com")
}

fn random_image_url<R: Rng>(rng: &mut R) -> String {
    format!(
        "https://picsum.photos/200/200?random={}",
        rng.random_range(1..=1000)
    )
}
