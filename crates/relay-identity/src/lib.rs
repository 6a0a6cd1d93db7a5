//! Credential-provider adapter.
//!
//! The issuer is an external OIDC-style service: we fetch its discovery
//! document at startup, load the JWKS it points at, and verify bearer tokens
//! locally (issuer, audience, expiry, signature). Verification happens before
//! any session-store or gateway access — an auth failure has no side effects.

pub mod discovery;
pub mod verifier;

pub use discovery::{DiscoveryDocument, Jwk, Jwks};
pub use verifier::{TokenVerifier, VerifiedIdentity, Verifier};
