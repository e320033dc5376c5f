//! Token entities for opaque bearer tokens.

use std::fmt;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Number of leading characters kept when a token string is logged
const MASK_VISIBLE_CHARS: usize = 6;

/// Kind of an issued token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived token presented on every request
    Access,
    /// Long-lived token exchanged for a new pair
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Record persisted under a token string in the primary store
///
/// Records are immutable once written. An access token and the refresh token
/// minted alongside it share `id` (the lineage) but are independent entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord<P> {
    /// Lineage identifier shared by an access/refresh pair
    pub id: String,

    /// Owning principal
    pub user_id: String,

    /// Access or refresh
    pub kind: TokenKind,

    /// Caller-supplied data
    pub payload: P,

    /// Creation time as a unix timestamp in seconds
    pub created_at: i64,

    /// Lifetime in seconds applied at storage time
    pub expires_in: i64,
}

impl<P> TokenRecord<P> {
    /// Creates a new record
    ///
    /// # Arguments
    ///
    /// * `id` - Lineage identifier
    /// * `user_id` - Owning principal
    /// * `kind` - Access or refresh
    /// * `payload` - Caller-supplied data
    /// * `created_at` - Mint time
    /// * `ttl` - Lifetime applied in the store
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        kind: TokenKind,
        payload: P,
        created_at: DateTime<Utc>,
        ttl: StdDuration,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            kind,
            payload,
            created_at: created_at.timestamp(),
            expires_in: lifetime_secs(ttl),
        }
    }

    /// Absolute expiry as a unix timestamp in seconds
    pub fn expires_at(&self) -> i64 {
        self.created_at.saturating_add(self.expires_in)
    }

    /// Checks whether the record is past its logical expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at()
    }

    /// Gets the time remaining until expiration, or zero if expired
    pub fn time_until_expiration(&self) -> Duration {
        let expires_at = Utc
            .timestamp_opt(self.expires_at(), 0)
            .single()
            .unwrap_or_else(Utc::now);
        let now = Utc::now();
        if expires_at > now {
            expires_at - now
        } else {
            Duration::zero()
        }
    }

    /// Checks whether this record belongs to the given lineage
    pub fn is_lineage(&self, lineage_id: &str) -> bool {
        self.id == lineage_id
    }
}

impl<P: Serialize> TokenRecord<P> {
    /// Serializes the record into the value stored under the token key
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<P: DeserializeOwned> TokenRecord<P> {
    /// Deserializes a stored value
    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Ownership fields of a stored record, decodable without knowing the payload type
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordHeader {
    /// Lineage identifier
    pub id: String,
    /// Owning principal
    pub user_id: String,
    /// Access or refresh
    pub kind: TokenKind,
}

impl RecordHeader {
    /// Deserializes the header fields of a stored value, ignoring the payload
    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// A token string together with the record stored under it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedToken<P> {
    /// Opaque token string handed to the client
    pub token: String,

    /// Server-side record
    pub record: TokenRecord<P>,
}

impl<P> IssuedToken<P> {
    /// Kind of the issued token
    pub fn kind(&self) -> TokenKind {
        self.record.kind
    }
}

/// Access and refresh tokens minted together under one lineage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair<P> {
    /// Access token
    pub access: IssuedToken<P>,

    /// Refresh token
    pub refresh: IssuedToken<P>,
}

impl<P> TokenPair<P> {
    /// Access token string
    pub fn access_token(&self) -> &str {
        &self.access.token
    }

    /// Refresh token string
    pub fn refresh_token(&self) -> &str {
        &self.refresh.token
    }

    /// Lineage shared by both tokens
    pub fn lineage_id(&self) -> &str {
        &self.access.record.id
    }
}

// Whole seconds, rounded up so a live record never reads as expired
fn lifetime_secs(ttl: StdDuration) -> i64 {
    let secs = ttl.as_secs().saturating_add(u64::from(ttl.subsec_nanos() > 0));
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Masks a token string for logging, keeping only a short prefix
pub fn mask_token(token: &str) -> String {
    match token.char_indices().nth(MASK_VISIBLE_CHARS) {
        Some((idx, _)) => format!("{}***", &token[..idx]),
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Session {
        name: String,
    }

    fn record(kind: TokenKind) -> TokenRecord<Session> {
        TokenRecord::new(
            "lineage-1",
            "user-1",
            kind,
            Session {
                name: "alice".to_string(),
            },
            Utc::now(),
            StdDuration::from_secs(3600),
        )
    }

    #[test]
    fn test_record_expiry() {
        let rec = record(TokenKind::Access);

        assert_eq!(rec.expires_at(), rec.created_at + 3600);
        assert!(!rec.is_expired_at(Utc::now()));
        assert!(rec.is_expired_at(Utc::now() + Duration::hours(2)));
        assert!(rec.time_until_expiration() <= Duration::hours(1));
        assert!(rec.time_until_expiration() > Duration::minutes(59));
    }

    #[test]
    fn test_sub_second_ttl_rounds_up() {
        let rec = TokenRecord::new(
            "lineage-1",
            "user-1",
            TokenKind::Access,
            (),
            Utc::now(),
            StdDuration::from_millis(900),
        );

        assert_eq!(rec.expires_in, 1);
        assert!(!rec.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let rec = TokenRecord::new(
            "lineage-1",
            "user-1",
            TokenKind::Refresh,
            (),
            Utc::now(),
            StdDuration::from_secs(u64::MAX),
        );

        assert_eq!(rec.expires_in, i64::MAX);
        assert_eq!(rec.expires_at(), i64::MAX);
        assert!(!rec.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_record_wire_field_names() {
        let rec = record(TokenKind::Refresh);
        let json: serde_json::Value = serde_json::from_str(&rec.encode().unwrap()).unwrap();

        assert_eq!(json["id"], "lineage-1");
        assert_eq!(json["user_id"], "user-1");
        assert_eq!(json["kind"], "refresh");
        assert_eq!(json["payload"]["name"], "alice");
        assert_eq!(json["expires_in"], 3600);
        assert!(json["created_at"].is_i64());
    }

    #[test]
    fn test_record_decode_rejects_garbage() {
        assert!(TokenRecord::<Session>::decode("not json").is_err());
        assert!(TokenRecord::<Session>::decode(r#"{"id":"x"}"#).is_err());
    }

    #[test]
    fn test_header_ignores_payload_shape() {
        let raw = record(TokenKind::Access).encode().unwrap();
        let header = RecordHeader::decode(&raw).unwrap();

        assert_eq!(header.id, "lineage-1");
        assert_eq!(header.user_id, "user-1");
        assert_eq!(header.kind, TokenKind::Access);
        assert!(TokenRecord::<u64>::decode(&raw).is_err());
    }

    #[test]
    fn test_pair_accessors() {
        let pair = TokenPair {
            access: IssuedToken {
                token: "a-token".to_string(),
                record: record(TokenKind::Access),
            },
            refresh: IssuedToken {
                token: "r-token".to_string(),
                record: record(TokenKind::Refresh),
            },
        };

        assert_eq!(pair.access_token(), "a-token");
        assert_eq!(pair.refresh_token(), "r-token");
        assert_eq!(pair.lineage_id(), "lineage-1");
        assert_eq!(pair.refresh.kind(), TokenKind::Refresh);
        assert!(pair.access.record.is_lineage("lineage-1"));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("abcdefghijkl"), "abcdef***");
        assert_eq!(mask_token("abc"), "***");
    }
}
