//! API key authentication and role-gated extractors.
//!
//! Keys are configured as `token:role:subject` triples. Only the SHA-256 digest of each token is
//! kept; lookups hash the presented token and compare against every entry in constant time.

use anyhow::{anyhow, bail};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::crypto::hashing::hash_api_key;
use crate::domain::{Principal, Role};
use crate::transport::http::error::ApiError;
use crate::transport::http::types::AppState;

/// Cookie carrying the API token for browser clients.
pub const AUTH_COOKIE: &str = "realstack_token";

/// Where the caller's credential came from. Only cookie credentials need CSRF protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Bearer,
    Cookie,
}

#[derive(Debug, Clone)]
struct ApiKeyEntry {
    digest: [u8; 32],
    principal: Principal,
}

#[derive(Debug, Clone, Default)]
pub struct ApiKeyRegistry {
    entries: Vec<ApiKeyEntry>,
}

impl ApiKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated `token:role:subject` list. Blank input yields an empty registry.
    pub fn parse(entries: &str) -> anyhow::Result<Self> {
        let mut registry = Self::new();
        for (index, raw) in entries.split(',').enumerate() {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let mut parts = raw.splitn(3, ':');
            let token = parts.next().unwrap_or_default().trim();
            let role = parts
                .next()
                .ok_or_else(|| anyhow!("api key #{} is missing a role", index + 1))?;
            let subject = parts
                .next()
                .ok_or_else(|| anyhow!("api key #{} is missing a subject", index + 1))?
                .trim();
            let role: Role = role
                .parse()
                .map_err(|e| anyhow!("api key #{}: {}", index + 1, e))?;
            registry.insert(token, Principal::new(subject, role))?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, token: &str, principal: Principal) -> anyhow::Result<()> {
        if token.len() < 8 {
            bail!("api key for '{}' must be at least 8 characters", principal.subject);
        }
        if principal.subject.is_empty() {
            bail!("api key subject must not be empty");
        }
        let digest = hash_api_key(token);
        if self.entries.iter().any(|e| e.digest == digest) {
            bail!("duplicate api key for '{}'", principal.subject);
        }
        self.entries.push(ApiKeyEntry { digest, principal });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walks every entry so the time taken does not depend on which key matched.
    pub fn resolve(&self, token: &str) -> Option<Principal> {
        let digest = hash_api_key(token);
        let mut found = None;
        for entry in &self.entries {
            if bool::from(entry.digest[..].ct_eq(&digest[..])) {
                found = Some(entry.principal.clone());
            }
        }
        found
    }
}

/// Reads a single cookie value from the `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Bearer header wins over the cookie when both are present.
pub fn extract_credential(headers: &HeaderMap) -> Option<(String, CredentialSource)> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some((token, CredentialSource::Bearer));
    }
    cookie_value(headers, AUTH_COOKIE).map(|t| (t, CredentialSource::Cookie))
}

/// Any caller holding a valid API key.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(AuthenticatedPrincipal(principal.clone()));
        }
        let app_state = AppState::from_ref(state);
        let (token, _) = extract_credential(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("missing API key".to_string()))?;
        let principal = app_state.api_keys.resolve(&token).ok_or_else(|| {
            warn!(path = %parts.uri.path(), "rejected unknown API key");
            ApiError::Unauthorized("invalid API key".to_string())
        })?;
        parts.extensions.insert(principal.clone());
        Ok(AuthenticatedPrincipal(principal))
    }
}

macro_rules! define_role_extractor {
    ($name:ident, [$($role:expr),+], $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name(pub Principal);

        #[async_trait]
        impl<S> FromRequestParts<S> for $name
        where
            AppState: FromRef<S>,
            S: Send + Sync,
        {
            type Rejection = ApiError;

            async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
                let AuthenticatedPrincipal(principal) =
                    AuthenticatedPrincipal::from_request_parts(parts, state).await?;
                let allowed: &[Role] = &[$($role),+];
                if !principal.has_any_role(allowed) {
                    warn!(
                        subject = %principal.subject,
                        role = %principal.role,
                        path = %parts.uri.path(),
                        "principal lacks required role"
                    );
                    return Err(ApiError::Forbidden(format!(
                        "role '{}' may not perform this action",
                        principal.role
                    )));
                }
                Ok($name(principal))
            }
        }
    };
}

define_role_extractor!(RequireAdmin, [Role::Admin], "Admins only.");
define_role_extractor!(
    RequireAssetWriter,
    [Role::Admin, Role::AssetManager],
    "Admins and asset managers."
);
define_role_extractor!(
    RequireVerifier,
    [Role::Admin, Role::Verifier],
    "Admins and verifiers."
);
define_role_extractor!(
    RequireValuer,
    [Role::Admin, Role::AssetManager, Role::Verifier],
    "Anyone allowed to record a valuation."
);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_key_list_and_resolves() {
        let registry =
            ApiKeyRegistry::parse("admin-secret-1:admin:root, mgr-secret-01:asset_manager:alice")
                .unwrap();
        assert_eq!(registry.len(), 2);
        let p = registry.resolve("mgr-secret-01").unwrap();
        assert_eq!(p.subject, "alice");
        assert_eq!(p.role, Role::AssetManager);
        assert!(registry.resolve("mgr-secret-02").is_none());
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(ApiKeyRegistry::parse("short:admin:root").is_err());
        assert!(ApiKeyRegistry::parse("long-enough-key:superuser:root").is_err());
        assert!(ApiKeyRegistry::parse("long-enough-key:admin").is_err());
        assert!(ApiKeyRegistry::parse("long-enough-key:admin:a,long-enough-key:verifier:b").is_err());
        assert!(ApiKeyRegistry::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn bearer_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; realstack_token=from-cookie"),
        );
        assert_eq!(
            extract_credential(&headers),
            Some(("from-cookie".to_string(), CredentialSource::Cookie))
        );
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(
            extract_credential(&headers),
            Some(("from-header".to_string(), CredentialSource::Bearer))
        );
    }
}
