//! RS256 bearer-token verification against the issuer's JWKS.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use modkit::TracedClient;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::config::IdentityConfig;
use crate::contract::IdentityClaims;
use crate::domain::ports::{AuthError, IdentityVerifier};

struct KeyCache {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// Key set is cached for `jwks_ttl_secs`. A token naming an unknown `kid` refetches it,
/// but only once the cached set is older than `jwks_refetch_cooldown_secs`.
pub struct JwksVerifier {
    http: TracedClient,
    jwks_url: String,
    validation: Validation,
    ttl: Duration,
    refetch_cooldown: Duration,
    cache: ArcSwapOption<KeyCache>,
    refresh_lock: Mutex<()>,
}

impl JwksVerifier {
    pub fn new(config: &IdentityConfig, http: TracedClient) -> Self {
        let domain = config.domain.trim_end_matches('/');
        let jwks_url = config
            .jwks_url
            .clone()
            .unwrap_or_else(|| format!("https://{domain}/.well-known/jwks.json"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[format!("https://{domain}/")]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Self {
            http,
            jwks_url,
            validation,
            ttl: Duration::from_secs(config.jwks_ttl_secs),
            refetch_cooldown: Duration::from_secs(config.jwks_refetch_cooldown_secs),
            cache: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
        }
    }

    fn lookup(&self, kid: &str, require_fresh: bool) -> Option<DecodingKey> {
        let cache = self.cache.load();
        let cache = cache.as_ref()?;
        if require_fresh && cache.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        cache.keys.get(kid).cloned()
    }

    /// A fresh key set fetched within the cooldown answers misses on its own.
    fn miss_is_final(&self) -> bool {
        self.cache.load().as_ref().is_some_and(|cache| {
            let age = cache.fetched_at.elapsed();
            age < self.ttl && age < self.refetch_cooldown
        })
    }

    #[instrument(name = "backoffice.identity.refresh_jwks", skip_all, fields(url = %self.jwks_url))]
    async fn refresh(&self, started: Instant) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;
        if let Some(cache) = self.cache.load().as_ref() {
            if cache.fetched_at > started {
                debug!("Key set refreshed by a concurrent request");
                return Ok(());
            }
        }

        let keys = self
            .fetch()
            .await
            .map_err(|e| AuthError::KeySet(format!("{e:#}")))?;
        info!("Loaded {} signing keys", keys.len());
        self.cache.store(Some(Arc::new(KeyCache {
            keys,
            fetched_at: Instant::now(),
        })));
        Ok(())
    }

    async fn fetch(&self) -> anyhow::Result<HashMap<String, DecodingKey>> {
        let set: JwkSet = self
            .http
            .get(&self.jwks_url)
            .await
            .context("JWKS request failed")?
            .error_for_status()
            .context("JWKS endpoint returned an error")?
            .json()
            .await
            .context("JWKS body is not a key set")?;

        let mut keys = HashMap::new();
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => debug!(%kid, "Skipping unusable JWK: {}", e),
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl IdentityVerifier for JwksVerifier {
    #[instrument(name = "backoffice.identity.verify", skip_all)]
    async fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Malformed(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::Rejected(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::Malformed("token header has no kid".to_string()))?;

        let key = match self.lookup(&kid, true) {
            Some(key) => key,
            None if self.miss_is_final() => {
                debug!(%kid, "Unknown kid within refetch cooldown");
                return Err(AuthError::UnknownKey(kid));
            }
            None => {
                self.refresh(Instant::now()).await?;
                self.lookup(&kid, false)
                    .ok_or_else(|| AuthError::UnknownKey(kid.clone()))?
            }
        };

        let data = decode::<TokenClaims>(token, &key, &self.validation)
            .map_err(|e| AuthError::Rejected(e.to_string()))?;
        Ok(IdentityClaims {
            subject: data.claims.sub,
            email: data.claims.email,
        })
    }
}
