use serde::{Deserialize, Serialize};

use relay_core::errors::AuthError;

/// The subset of the OIDC discovery document we need.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub jwks_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
}

/// One JWKS entry. Only RSA signing keys are used; other key types are
/// skipped when building the verifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// Fetch `{issuer}/.well-known/openid-configuration`.
pub async fn fetch_discovery(
    client: &reqwest::Client,
    issuer_url: &str,
) -> Result<DiscoveryDocument, AuthError> {
    let url = format!(
        "{}/.well-known/openid-configuration",
        issuer_url.trim_end_matches('/')
    );
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| AuthError::DiscoveryUnavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(AuthError::DiscoveryUnavailable(format!(
            "{url} returned {}",
            response.status()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::DiscoveryUnavailable(format!("malformed document: {e}")))
}

/// Fetch the key set the discovery document points at.
pub async fn fetch_jwks(client: &reqwest::Client, jwks_uri: &str) -> Result<Jwks, AuthError> {
    let response = client
        .get(jwks_uri)
        .send()
        .await
        .map_err(|e| AuthError::DiscoveryUnavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(AuthError::DiscoveryUnavailable(format!(
            "{jwks_uri} returned {}",
            response.status()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::DiscoveryUnavailable(format!("malformed jwks: {e}")))
}
