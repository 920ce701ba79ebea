// FleetSleuth - api/client.rs
//
// Blocking HTTP client for the device-management API.
//
// One `CoreClient` per fetch cycle; authentication state lives in an
// explicit `AuthSession` passed to every fetch call; there is no global
// token. Sign-in creates the session, dropping it is the teardown.
//
// Every failure mode is a typed `ApiError` so callers can distinguish
// "no data" from "fetch failed"; the app layer degrades all of them to an
// empty table plus a non-fatal warning.

use crate::core::model::Family;
use crate::util::constants;
use crate::util::error::ApiError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

// =============================================================================
// Credentials and session
// =============================================================================

/// API credentials, resolved from environment variables over config.
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    // Manual impl so the password can never leak through debug logging.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated API session.
///
/// Created by `CoreClient::login`, passed explicitly to every fetch, and
/// dropped on logout. The token is deliberately private: nothing outside
/// this module can read or log it.
#[derive(Clone)]
pub struct AuthSession {
    token: String,
    signed_in_at: DateTime<Utc>,
}

impl AuthSession {
    /// When this session was established.
    pub fn signed_in_at(&self) -> DateTime<Utc> {
        self.signed_in_at
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("signed_in_at", &self.signed_in_at)
            .finish()
    }
}

// =============================================================================
// Client
// =============================================================================

/// Wire shape of the sign-in response.
#[derive(Debug, Deserialize)]
struct SignInResponse {
    #[serde(default)]
    login: bool,
    #[serde(rename = "apiToken", default)]
    api_token: Option<String>,
}

/// Blocking client for the management API.
pub struct CoreClient {
    http: reqwest::blocking::Client,
    base_url: String,
    tenant_uuid: String,
}

impl CoreClient {
    /// Build a client for the given API endpoint.
    ///
    /// `base_url` has any trailing slash stripped so path joins are uniform.
    pub fn new(
        base_url: &str,
        tenant_uuid: &str,
        timeout: Duration,
    ) -> Result<CoreClient, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(constants::API_USER_AGENT)
            .build()
            .map_err(|e| ApiError::Transport {
                url: base_url.to_string(),
                source: e,
            })?;

        Ok(CoreClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tenant_uuid: tenant_uuid.to_string(),
        })
    }

    /// Sign in and establish a session.
    ///
    /// Success requires HTTP 200, `login == true`, and a non-empty
    /// `apiToken` in the response body.
    pub fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        let url = format!("{}/users/sign-in", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "username": credentials.username,
                "password": credentials.password,
            }))
            .send()
            .map_err(|e| ApiError::Transport {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }

        let body: SignInResponse = response.json().map_err(|e| ApiError::Transport {
            url: url.clone(),
            source: e,
        })?;

        match body.api_token {
            Some(token) if body.login && !token.is_empty() => {
                tracing::info!(username = %credentials.username, "Signed in");
                Ok(AuthSession {
                    token,
                    signed_in_at: Utc::now(),
                })
            }
            _ => Err(ApiError::AuthRejected),
        }
    }

    /// Fetch one resource's raw records.
    ///
    /// The response may be a JSON list of records or an object wrapping
    /// exactly one list field; both shapes unwrap to the same record
    /// sequence. Items are returned as-is (the normaliser handles
    /// non-object entries).
    pub fn fetch(&self, session: &AuthSession, family: Family) -> Result<Vec<Value>, ApiError> {
        let url = self.resource_url(family);

        tracing::debug!(%family, url = %url, "Fetching resource");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, session.bearer())
            .send()
            .map_err(|e| ApiError::Transport {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }

        if let Some(len) = response.content_length() {
            if len > constants::MAX_RESPONSE_BYTES {
                return Err(ApiError::ResponseTooLarge {
                    url,
                    limit: constants::MAX_RESPONSE_BYTES,
                });
            }
        }

        let body = response.text().map_err(|e| ApiError::Transport {
            url: url.clone(),
            source: e,
        })?;

        if body.len() as u64 > constants::MAX_RESPONSE_BYTES {
            return Err(ApiError::ResponseTooLarge {
                url,
                limit: constants::MAX_RESPONSE_BYTES,
            });
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| ApiError::MalformedJson {
                url: url.clone(),
                source: e,
            })?;

        unwrap_records(value, &url)
    }

    /// Full URL for a family's resource endpoint.
    fn resource_url(&self, family: Family) -> String {
        match family {
            Family::Boards => format!("{}/boards", self.base_url),
            Family::Kiwi => format!("{}/kiwi", self.base_url),
            Family::Firmware => format!("{}/boards/info", self.base_url),
            // The M2M endpoint is tenant-scoped; without a configured tenant
            // the bare path is used and the server answers for the token's
            // default tenant.
            Family::M2m if self.tenant_uuid.is_empty() => {
                format!("{}/m2m", self.base_url)
            }
            Family::M2m => {
                format!("{}/m2m?tenant_uuid={}", self.base_url, self.tenant_uuid)
            }
        }
    }
}

// =============================================================================
// Response unwrapping
// =============================================================================

/// Unwrap a resource response into its record sequence.
///
/// Accepted shapes:
/// - a JSON array (the records themselves)
/// - a JSON object with exactly one array-valued field (the envelope some
///   endpoints wrap their list in)
///
/// Anything else is `UnexpectedShape`.
pub fn unwrap_records(value: Value, url: &str) -> Result<Vec<Value>, ApiError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => {
            let mut lists = map
                .into_iter()
                .filter_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .collect::<Vec<_>>();
            match lists.len() {
                1 => Ok(lists.remove(0)),
                0 => Err(ApiError::UnexpectedShape {
                    url: url.to_string(),
                    found: "an object with no list field",
                }),
                _ => Err(ApiError::UnexpectedShape {
                    url: url.to_string(),
                    found: "an object with several list fields",
                }),
            }
        }
        Value::Null => Ok(Vec::new()),
        _ => Err(ApiError::UnexpectedShape {
            url: url.to_string(),
            found: "a scalar",
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_plain_list() {
        let value = json!([{"name": "a"}, {"name": "b"}]);
        let records = unwrap_records(value, "test").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_unwrap_enveloped_list() {
        let value = json!({"total": 2, "boards": [{"name": "a"}, {"name": "b"}]});
        let records = unwrap_records(value, "test").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "a");
    }

    #[test]
    fn test_unwrap_null_is_empty() {
        assert!(unwrap_records(json!(null), "test").unwrap().is_empty());
    }

    #[test]
    fn test_unwrap_ambiguous_envelope_rejected() {
        let value = json!({"boards": [], "kiwi": []});
        let err = unwrap_records(value, "test").unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedShape { .. }));
    }

    #[test]
    fn test_unwrap_scalar_rejected() {
        let err = unwrap_records(json!(42), "test").unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedShape { .. }));
    }

    #[test]
    fn test_resource_urls() {
        let client = CoreClient::new(
            "https://example.test/api/",
            "tenant-1",
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            client.resource_url(Family::Boards),
            "https://example.test/api/boards"
        );
        assert_eq!(
            client.resource_url(Family::Kiwi),
            "https://example.test/api/kiwi"
        );
        assert_eq!(
            client.resource_url(Family::Firmware),
            "https://example.test/api/boards/info"
        );
        assert_eq!(
            client.resource_url(Family::M2m),
            "https://example.test/api/m2m?tenant_uuid=tenant-1"
        );

        let no_tenant =
            CoreClient::new("https://example.test/api", "", Duration::from_secs(5)).unwrap();
        assert_eq!(
            no_tenant.resource_url(Family::M2m),
            "https://example.test/api/m2m"
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "ops".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("ops"));
        assert!(!rendered.contains("hunter2"));
    }
}
