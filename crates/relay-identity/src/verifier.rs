use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::{info, instrument};

use relay_core::errors::AuthError;
use relay_core::ids::ActorId;
use relay_core::security::BearerToken;

use crate::discovery::{fetch_discovery, fetch_jwks};

const CLOCK_SKEW_LEEWAY_SECS: u64 = 30;

/// Outcome of a successful verification.
#[derive(Clone, Debug)]
pub struct VerifiedIdentity {
    pub actor_id: ActorId,
    /// The claim the actor id came from (`sub` or `username`).
    pub claim: &'static str,
}

/// Seam the orchestrator verifies callers through.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(
        &self,
        token: &BearerToken,
        expected_actor: &ActorId,
    ) -> Result<VerifiedIdentity, AuthError>;
}

/// The claims we read. `sub` is the canonical actor identifier; `username`
/// is the fallback some issuers put user identity under.
#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

struct VerificationKey {
    kid: Option<String>,
    key: DecodingKey,
    alg: Algorithm,
}

/// Local bearer-token verifier. Keys come from the issuer's JWKS at
/// construction time; verification itself makes no network calls.
pub struct TokenVerifier {
    issuer: String,
    audience: String,
    keys: Vec<VerificationKey>,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("keys", &self.keys.len())
            .finish()
    }
}

impl TokenVerifier {
    /// Build from the issuer's discovery document and JWKS.
    #[instrument(skip(client))]
    pub async fn from_discovery(
        client: &reqwest::Client,
        issuer_url: &str,
        audience: &str,
    ) -> Result<Self, AuthError> {
        let doc = fetch_discovery(client, issuer_url).await?;
        let jwks = fetch_jwks(client, &doc.jwks_uri).await?;

        let mut keys = Vec::new();
        for jwk in &jwks.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            let (Some(n), Some(e)) = (&jwk.n, &jwk.e) else {
                continue;
            };
            let Ok(key) = DecodingKey::from_rsa_components(n, e) else {
                continue;
            };
            let alg = match jwk.alg.as_deref() {
                Some("RS384") => Algorithm::RS384,
                Some("RS512") => Algorithm::RS512,
                _ => Algorithm::RS256,
            };
            keys.push(VerificationKey {
                kid: jwk.kid.clone(),
                key,
                alg,
            });
        }

        if keys.is_empty() {
            return Err(AuthError::DiscoveryUnavailable(
                "jwks contains no usable RSA keys".into(),
            ));
        }

        info!(issuer = %doc.issuer, key_count = keys.len(), "token verifier initialized");

        Ok(Self {
            issuer: doc.issuer,
            audience: audience.to_string(),
            keys,
        })
    }

    /// Symmetric-key verifier for tests and local development.
    pub fn with_hs256(issuer: &str, audience: &str, secret: &[u8]) -> Self {
        Self {
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            keys: vec![VerificationKey {
                kid: None,
                key: DecodingKey::from_secret(secret),
                alg: Algorithm::HS256,
            }],
        }
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = CLOCK_SKEW_LEEWAY_SECS;
        validation
    }

    fn decode_claims(&self, raw: &str) -> Result<Claims, AuthError> {
        let header = decode_header(raw).map_err(|e| AuthError::Malformed(e.to_string()))?;

        // kid-tagged tokens must match a known key; untagged tokens are
        // tried against every key.
        let candidates: Vec<&VerificationKey> = match &header.kid {
            Some(kid) => {
                let matched: Vec<_> = self
                    .keys
                    .iter()
                    .filter(|k| k.kid.as_deref() == Some(kid.as_str()))
                    .collect();
                if matched.is_empty() {
                    return Err(AuthError::UnknownKey(kid.clone()));
                }
                matched
            }
            None => self.keys.iter().collect(),
        };

        let mut last_err = AuthError::BadSignature;
        for candidate in candidates {
            match decode::<Claims>(raw, &candidate.key, &self.validation(candidate.alg)) {
                Ok(data) => return Ok(data.claims),
                Err(e) => last_err = map_jwt_error(e),
            }
        }
        Err(last_err)
    }
}

#[async_trait]
impl Verifier for TokenVerifier {
    async fn verify(
        &self,
        token: &BearerToken,
        expected_actor: &ActorId,
    ) -> Result<VerifiedIdentity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let claims = self.decode_claims(token.expose())?;

        let (actor, claim) = match (&claims.sub, &claims.username) {
            (Some(sub), _) => (sub.as_str(), "sub"),
            (None, Some(username)) => (username.as_str(), "username"),
            (None, None) => {
                return Err(AuthError::Malformed("no sub or username claim".into()));
            }
        };

        if actor != expected_actor.as_str() {
            return Err(AuthError::ActorMismatch {
                actor: expected_actor.to_string(),
            });
        }

        Ok(VerifiedIdentity {
            actor_id: expected_actor.clone(),
            claim,
        })
    }
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::BadSignature,
        ErrorKind::InvalidIssuer => AuthError::IssuerMismatch("issuer claim rejected".into()),
        ErrorKind::InvalidAudience => AuthError::AudienceMismatch("audience claim rejected".into()),
        _ => AuthError::Malformed(e.to_string()),
    }
}
