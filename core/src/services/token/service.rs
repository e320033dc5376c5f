//! Main token service implementation

use std::marker::PhantomData;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use ot_shared::{ConfigError, TokenGeneratorKind};

use crate::domain::{mask_token, IssuedToken, RecordHeader, TokenKind, TokenPair, TokenRecord};
use crate::errors::{StoreError, TokenError, TokenResult};
use crate::repositories::TokenStore;

use super::config::TokenServiceConfig;
use super::deadline::BoundedStore;
use super::generator::{OpaqueTokenGenerator, TokenGenerator};
use super::sweep::{score_at, LazySweeper, SweepReport};

/// Service managing the lifecycle of opaque access/refresh tokens
///
/// Holds no mutable state of its own; every operation goes straight to the
/// store, so one instance can be shared freely across tasks.
pub struct TokenService<S, P, G = OpaqueTokenGenerator> {
    store: S,
    generator: G,
    config: TokenServiceConfig,
    _payload: PhantomData<fn() -> P>,
}

impl<S, P> TokenService<S, P, OpaqueTokenGenerator>
where
    S: TokenStore,
    P: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Creates a new token service instance
    ///
    /// # Arguments
    ///
    /// * `store` - Token store backing both the records and the user indexes
    /// * `config` - Token service configuration
    ///
    /// # Returns
    ///
    /// A new `TokenService` instance or error if the configuration is unusable
    pub fn new(store: S, config: TokenServiceConfig) -> Result<Self, ConfigError> {
        let generator = match config.generator {
            TokenGeneratorKind::Opaque => OpaqueTokenGenerator::new(config.token_length),
        };
        Self::with_generator(store, config, generator)
    }
}

impl<S, P, G> TokenService<S, P, G>
where
    S: TokenStore,
    P: Serialize + DeserializeOwned + Clone + Send + Sync,
    G: TokenGenerator,
{
    /// Creates a token service with an explicit generator
    pub fn with_generator(store: S, config: TokenServiceConfig, generator: G) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            generator,
            config,
            _payload: PhantomData,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fresh lineage identifier for a token pair
    pub fn new_lineage_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn bounded(&self) -> BoundedStore<'_, S> {
        BoundedStore::new(&self.store, self.config.operation_timeout)
    }

    fn sweeper(&self) -> LazySweeper<'_, S> {
        LazySweeper::new(self.bounded())
    }

    /// Reconciles a user's index with the primary store
    pub async fn sweep_user(&self, user_id: &str) -> TokenResult<SweepReport> {
        Ok(self.sweeper().sweep(user_id, Utc::now()).await?)
    }

    /// Mints a single token
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owning principal
    /// * `kind` - Access or refresh
    /// * `payload` - Caller data stored with the token
    /// * `ttl` - Lifetime of the token
    /// * `lineage_id` - Lineage to join; a fresh one is generated when absent
    ///
    /// # Returns
    ///
    /// * `Ok(IssuedToken)` - The token string and its stored record
    /// * `Err(TokenError)` - Store failure; nothing is left behind
    pub async fn mint(
        &self,
        user_id: &str,
        kind: TokenKind,
        payload: P,
        ttl: Duration,
        lineage_id: Option<String>,
    ) -> TokenResult<IssuedToken<P>> {
        self.sweep_user(user_id).await?;
        let lineage_id = lineage_id.unwrap_or_else(|| self.new_lineage_id());
        self.mint_unswept(user_id, kind, payload, ttl, lineage_id)
            .await
    }

    async fn mint_unswept(
        &self,
        user_id: &str,
        kind: TokenKind,
        payload: P,
        ttl: Duration,
        lineage_id: String,
    ) -> TokenResult<IssuedToken<P>> {
        let store = self.bounded();
        let now = Utc::now();
        let record = TokenRecord::new(lineage_id, user_id, kind, payload, now, ttl);
        let value = record.encode().map_err(|e| {
            error!("Failed to encode {} token record for user {}: {}", kind, user_id, e);
            TokenError::TokenInvalid
        })?;

        let mut attempts: u32 = 0;
        let token = loop {
            attempts += 1;
            let candidate = self.generator.generate();
            if store.reserve(&candidate, &value, ttl).await? {
                break candidate;
            }
            debug!(
                "Token identifier collision on attempt {}, generating a new candidate",
                attempts
            );
        };

        let expiry_score = score_at(expiry_after(now, ttl));
        if let Err(e) = store.index_add(user_id, &token, expiry_score).await {
            warn!(
                "Failed to index {} token {} for user {}: {}",
                kind,
                mask_token(&token),
                user_id,
                e
            );
            if let Err(rollback) = store.delete(std::slice::from_ref(&token)).await {
                warn!(
                    "Failed to roll back unindexed token {}: {}",
                    mask_token(&token),
                    rollback
                );
            }
            return Err(e.into());
        }

        debug!(
            "Minted {} token {} for user {}",
            kind,
            mask_token(&token),
            user_id
        );
        Ok(IssuedToken { token, record })
    }

    /// Mints an access/refresh pair sharing a fresh lineage id
    pub async fn mint_pair(&self, user_id: &str, payload: P) -> TokenResult<TokenPair<P>> {
        self.mint_pair_with_ttl(
            user_id,
            payload,
            self.config.access_token_ttl,
            self.config.refresh_token_ttl,
        )
        .await
    }

    /// Mints an access/refresh pair with explicit lifetimes
    pub async fn mint_pair_with_ttl(
        &self,
        user_id: &str,
        payload: P,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> TokenResult<TokenPair<P>> {
        self.sweep_user(user_id).await?;
        self.mint_pair_unswept(user_id, payload, access_ttl, refresh_ttl)
            .await
    }

    async fn mint_pair_unswept(
        &self,
        user_id: &str,
        payload: P,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> TokenResult<TokenPair<P>> {
        let lineage_id = self.new_lineage_id();

        let access = self
            .mint_unswept(
                user_id,
                TokenKind::Access,
                payload.clone(),
                access_ttl,
                lineage_id.clone(),
            )
            .await?;

        let refresh = match self
            .mint_unswept(user_id, TokenKind::Refresh, payload, refresh_ttl, lineage_id)
            .await
        {
            Ok(refresh) => refresh,
            Err(e) => {
                self.discard(user_id, vec![access.token]).await;
                return Err(e);
            }
        };

        info!(
            "Minted token pair for user {} with lineage {}",
            user_id, access.record.id
        );
        Ok(TokenPair { access, refresh })
    }

    /// Resolves a token to its record
    ///
    /// # Returns
    ///
    /// * `Ok(TokenRecord)` - The token is live
    /// * `Err(TokenError::TokenInvalid)` - Unknown, expired, revoked or undecodable
    /// * `Err(TokenError::BackendUnavailable)` - Store failure
    pub async fn validate(&self, token: &str) -> TokenResult<TokenRecord<P>> {
        let (record, _) = self.load_live(token).await?;
        Ok(record)
    }

    /// Same as [`validate`](Self::validate)
    pub async fn get_token_data(&self, token: &str) -> TokenResult<TokenRecord<P>> {
        self.validate(token).await
    }

    /// Validates a token and requires it to be an access token
    pub async fn validate_access(&self, token: &str) -> TokenResult<TokenRecord<P>> {
        self.validate_kind(token, TokenKind::Access).await
    }

    /// Validates a token and requires it to be a refresh token
    pub async fn validate_refresh(&self, token: &str) -> TokenResult<TokenRecord<P>> {
        self.validate_kind(token, TokenKind::Refresh).await
    }

    async fn validate_kind(&self, token: &str, expected: TokenKind) -> TokenResult<TokenRecord<P>> {
        let record = self.validate(token).await?;
        if record.kind != expected {
            return Err(TokenError::InvalidTokenKind {
                expected,
                actual: record.kind,
            });
        }
        Ok(record)
    }

    /// Fetches and decodes a token, then checks it survives its owner's sweep
    async fn load_live(&self, token: &str) -> TokenResult<(TokenRecord<P>, SweepReport)> {
        let store = self.bounded();
        let raw = store.get(token).await?;
        let record = TokenRecord::<P>::decode(&raw).map_err(|e| {
            debug!("Undecodable record under token {}: {}", mask_token(token), e);
            TokenError::TokenInvalid
        })?;

        let report = self.sweeper().sweep(&record.user_id, Utc::now()).await?;
        if !report.contains(token) {
            warn!(
                "Token {} has no index entry for user {}, deleting record",
                mask_token(token),
                record.user_id
            );
            if let Err(e) = store.delete(&[token.to_string()]).await {
                warn!("Failed to delete unindexed token {}: {}", mask_token(token), e);
            }
            return Err(TokenError::TokenInvalid);
        }

        Ok((record, report))
    }

    /// Lists every live token of a user, in ascending expiry order
    ///
    /// Tokens evicted or undecodable between the sweep and the fetch are skipped.
    pub async fn list_user_tokens(&self, user_id: &str) -> TokenResult<Vec<IssuedToken<P>>> {
        let report = self.sweep_user(user_id).await?;
        self.load_indexed(&report.live).await
    }

    async fn load_indexed(&self, tokens: &[String]) -> TokenResult<Vec<IssuedToken<P>>> {
        let store = self.bounded();
        let mut issued = Vec::with_capacity(tokens.len());

        for token in tokens {
            let raw = match store.get(token).await {
                Ok(raw) => raw,
                Err(StoreError::NotFound) => continue,
                Err(e) => return Err(e.into()),
            };
            match TokenRecord::<P>::decode(&raw) {
                Ok(record) => issued.push(IssuedToken {
                    token: token.clone(),
                    record,
                }),
                Err(e) => debug!("Skipping undecodable token {}: {}", mask_token(token), e),
            }
        }

        Ok(issued)
    }

    /// Exchanges a refresh token for a new pair
    ///
    /// Consumes the refresh token and the access token of the same lineage,
    /// then mints a new pair carrying `new_payload`, or the old payload when
    /// none is given. Of several concurrent rotations of one refresh token at
    /// most one succeeds.
    ///
    /// # Returns
    ///
    /// * `Ok(TokenPair)` - The replacement pair
    /// * `Err(TokenError::InvalidTokenKind)` - An access token was presented
    /// * `Err(TokenError::TokenInvalid)` - Unknown, consumed, or its access token is gone
    pub async fn rotate(&self, refresh_token: &str, new_payload: Option<P>) -> TokenResult<TokenPair<P>> {
        let (record, report) = self.load_live(refresh_token).await?;
        if record.kind != TokenKind::Refresh {
            return Err(TokenError::InvalidTokenKind {
                expected: TokenKind::Refresh,
                actual: record.kind,
            });
        }

        let store = self.bounded();
        let user_id = record.user_id.clone();
        let consumed = vec![refresh_token.to_string()];

        let removed = store.index_remove(&user_id, &consumed).await?;
        store.delete(&consumed).await?;
        if removed == 0 {
            warn!(
                "Refresh token {} was consumed concurrently",
                mask_token(refresh_token)
            );
            return Err(TokenError::TokenInvalid);
        }

        let remaining: Vec<String> = report
            .live
            .into_iter()
            .filter(|token| token != refresh_token)
            .collect();
        let access = self
            .load_indexed(&remaining)
            .await?
            .into_iter()
            .find(|issued| issued.kind() == TokenKind::Access && issued.record.is_lineage(&record.id));

        let Some(access) = access else {
            warn!(
                "No live access token for lineage {} of user {}",
                record.id, user_id
            );
            return Err(TokenError::TokenInvalid);
        };

        let retired = vec![access.token];
        store.index_remove(&user_id, &retired).await?;
        store.delete(&retired).await?;

        let payload = new_payload.unwrap_or(record.payload);
        let pair = self
            .mint_pair_unswept(
                &user_id,
                payload,
                self.config.access_token_ttl,
                self.config.refresh_token_ttl,
            )
            .await?;

        info!(
            "Rotated lineage {} to {} for user {}",
            record.id,
            pair.lineage_id(),
            user_id
        );
        Ok(pair)
    }

    /// Revokes a single token
    ///
    /// Idempotent: revoking an unknown or already revoked token succeeds.
    pub async fn revoke(&self, token: &str) -> TokenResult<()> {
        let store = self.bounded();
        let tokens = vec![token.to_string()];

        match store.get(token).await {
            Ok(raw) => match RecordHeader::decode(&raw) {
                Ok(header) => {
                    self.sweeper().sweep(&header.user_id, Utc::now()).await?;
                    store.index_remove(&header.user_id, &tokens).await?;
                }
                Err(e) => debug!(
                    "Revoking undecodable token {} from the primary store only: {}",
                    mask_token(token),
                    e
                ),
            },
            Err(StoreError::NotFound) => {
                debug!("Token {} already absent", mask_token(token));
            }
            Err(e) => return Err(e.into()),
        }

        store.delete(&tokens).await?;
        info!("Revoked token {}", mask_token(token));
        Ok(())
    }

    /// Revokes every live token sharing the presented token's lineage
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of tokens revoked
    pub async fn revoke_all_for_lineage(&self, token: &str) -> TokenResult<usize> {
        let (record, report) = self.load_live(token).await?;
        let store = self.bounded();

        let mut lineage = Vec::new();
        for candidate in &report.live {
            let raw = match store.get(candidate).await {
                Ok(raw) => raw,
                Err(StoreError::NotFound) => continue,
                Err(e) => return Err(e.into()),
            };
            if let Ok(header) = RecordHeader::decode(&raw) {
                if header.id == record.id {
                    lineage.push(candidate.clone());
                }
            }
        }

        store.index_remove(&record.user_id, &lineage).await?;
        store.delete(&lineage).await?;

        info!(
            "Revoked {} tokens of lineage {} for user {}",
            lineage.len(),
            record.id,
            record.user_id
        );
        Ok(lineage.len())
    }

    /// Revokes every live token of a user
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of tokens revoked
    pub async fn revoke_all_for_user(&self, user_id: &str) -> TokenResult<usize> {
        let report = self.sweep_user(user_id).await?;
        let store = self.bounded();

        store.index_remove(user_id, &report.live).await?;
        store.delete(&report.live).await?;

        info!("Revoked {} tokens for user {}", report.live.len(), user_id);
        Ok(report.live.len())
    }

    /// Best-effort removal of tokens minted by an operation that failed midway
    async fn discard(&self, user_id: &str, tokens: Vec<String>) {
        let store = self.bounded();
        if let Err(e) = store.index_remove(user_id, &tokens).await {
            warn!("Failed to unindex discarded tokens for user {}: {}", user_id, e);
        }
        if let Err(e) = store.delete(&tokens).await {
            warn!("Failed to delete discarded tokens for user {}: {}", user_id, e);
        }
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
