//! Error types for the load testing engine.
//!
//! Defines [`LoadTestError`] for setup failures, [`ConfigurationError`] for
//! invalid scenario registration, and the per-execution errors
//! ([`RequestError`], [`AssertionFailure`], [`ScenarioError`]) that the
//! virtual user loop turns into failure outcomes.

/// Errors that occur during load test configuration parsing, validation,
/// client construction, or file I/O. Any of these aborts a run before the
/// first virtual user starts.
#[derive(Debug, thiserror::Error)]
pub enum LoadTestError {
    /// TOML parse failure -- the config file contains invalid TOML syntax
    /// or does not match the expected schema.
    #[error("Failed to parse config TOML: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    /// Semantic validation failure -- the config parsed successfully but
    /// contains invalid values (e.g., no scenario source, inverted wait bounds).
    #[error("Config validation error: {message}")]
    ConfigValidation { message: String },

    /// File I/O failure -- the config file could not be read from disk.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigIo {
        source: std::io::Error,
        path: String,
    },

    /// Scenario registration or behaviour setup was rejected.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The HTTP client could not be built (e.g., TLS backend init failure).
    #[error("Failed to build HTTP client: {message}")]
    Client { message: String },

    /// CLI-level error (config not found, file I/O for reports).
    #[error("{message}")]
    Cli { message: String },
}

/// Invalid scenario registration or user behaviour definition.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A scenario was registered with weight 0.
    #[error("Scenario '{name}' must have a positive weight")]
    ZeroWeight { name: String },

    /// Two scenarios share the same name.
    #[error("Scenario '{name}' is already registered")]
    DuplicateScenario { name: String },

    /// A behaviour was used without any registered scenario.
    #[error("User behavior '{behavior}' has no registered scenarios")]
    EmptyRegistry { behavior: String },

    /// Wait-time bounds where `min > max`.
    #[error("Wait time minimum {min_ms}ms exceeds maximum {max_ms}ms")]
    InvalidWaitTime { min_ms: u64, max_ms: u64 },
}

/// Transport-level failure: no HTTP response was received.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The request exceeded the configured per-request timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure (DNS resolution, TCP connect, TLS handshake).
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Any other transport failure (request building, body decoding, redirects).
    #[error("Request error: {message}")]
    Transport { message: String },
}

impl RequestError {
    /// Classify a [`reqwest::Error`] into the appropriate [`RequestError`] variant.
    pub fn classify_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection {
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        Self::classify_reqwest(&err)
    }
}

/// A response was received but did not satisfy the scenario's predicate.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct AssertionFailure {
    /// Human-readable reason, reported verbatim as the failure reason.
    pub reason: String,
}

impl AssertionFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Any error a scenario action may raise. Caught at the virtual user loop
/// boundary and recorded as a failure outcome.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Assertion(#[from] AssertionFailure),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_messages() {
        assert_eq!(RequestError::Timeout.to_string(), "Request timed out");
        let err = RequestError::Connection {
            message: "DNS resolution failed".to_string(),
        };
        assert_eq!(err.to_string(), "Connection error: DNS resolution failed");
    }

    #[test]
    fn test_scenario_error_messages_are_transparent() {
        let err: ScenarioError = AssertionFailure::new("No collection in response").into();
        assert_eq!(err.to_string(), "No collection in response");

        let err: ScenarioError = RequestError::Timeout.into();
        assert_eq!(err.to_string(), "Request timed out");
    }

    #[test]
    fn test_configuration_error_wraps_into_load_test_error() {
        let err: LoadTestError = ConfigurationError::ZeroWeight {
            name: "list users".to_string(),
        }
        .into();
        assert!(matches!(err, LoadTestError::Configuration(_)));
        assert!(err.to_string().contains("list users"));
    }
}
