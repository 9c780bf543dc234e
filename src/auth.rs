//! Trino authentication.
//!
//! Maps the configured `AUTH_METHOD` to the credentials attached to every
//! request sent to the coordinator.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use clap::ValueEnum;
use reqwest::RequestBuilder;
use serde_json::Value as JsonValue;

use crate::error::{ServerError, ServerResult};

/// Authentication method used against the Trino coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum AuthMethod {
    /// HTTP basic auth with TRINO_USER / TRINO_PASSWORD
    #[default]
    Password,
    /// Bearer token, sent with `X-Client-Info: secured`
    #[value(name = "oauth2")]
    OAuth2,
    /// Azure service principal bearer token
    #[value(alias = "azure-spn")]
    AzureSpn,
    /// No credentials
    None,
}

impl AuthMethod {
    /// Token based methods always talk to the coordinator over TLS on 443.
    pub fn forces_https(self) -> bool {
        matches!(self, Self::OAuth2 | Self::AzureSpn)
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password => write!(f, "password"),
            Self::OAuth2 => write!(f, "oauth2"),
            Self::AzureSpn => write!(f, "azure_spn"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Resolved credentials.
///
/// `Debug` never prints secrets.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { user: String, password: String },
    Bearer { token: String, client_info: bool },
    None,
}

impl Credentials {
    /// Build credentials for `method`.
    pub fn resolve(
        method: AuthMethod,
        user: &str,
        password: Option<&str>,
        access_token: Option<&str>,
    ) -> ServerResult<Self> {
        match method {
            AuthMethod::Password => {
                let password = password.filter(|p| !p.is_empty()).ok_or_else(|| {
                    ServerError::configuration(
                        "TRINO_PASSWORD is required when AUTH_METHOD is PASSWORD",
                    )
                })?;
                if user.is_empty() {
                    return Err(ServerError::configuration(
                        "TRINO_USER is required when AUTH_METHOD is PASSWORD",
                    ));
                }
                Ok(Self::Basic {
                    user: user.to_string(),
                    password: password.to_string(),
                })
            }
            AuthMethod::OAuth2 | AuthMethod::AzureSpn => {
                let token = access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
                    ServerError::configuration(format!(
                        "TRINO_ACCESS_TOKEN is required when AUTH_METHOD is {}",
                        method.to_string().to_uppercase()
                    ))
                })?;
                Ok(Self::Bearer {
                    token: token.to_string(),
                    client_info: method == AuthMethod::OAuth2,
                })
            }
            AuthMethod::None => Ok(Self::None),
        }
    }

    /// Attach credentials to an outgoing coordinator request.
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Basic { user, password } => request.basic_auth(user, Some(password)),
            Self::Bearer { token, client_info } => {
                let request = request.bearer_auth(token);
                if *client_info {
                    request.header("X-Client-Info", "secured")
                } else {
                    request
                }
            }
            Self::None => request,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"***")
                .finish(),
            Self::Bearer { client_info, .. } => f
                .debug_struct("Bearer")
                .field("token", &"***")
                .field("client_info", client_info)
                .finish(),
            Self::None => write!(f, "None"),
        }
    }
}

/// Principal id from a JWT access token: `oid`, else `sub`.
///
/// The signature is not verified; the coordinator does that.
pub fn user_from_jwt(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: JsonValue = serde_json::from_slice(&bytes).ok()?;
    ["oid", "sub"].iter().find_map(|claim| {
        claims
            .get(claim)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    })
}
