use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker written once per successful export.
///
/// Opaque to readers, which only ever compare two tokens for equality. The
/// value is the export time in milliseconds since the epoch, bumped past the
/// previous token when the clock has not advanced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncToken(String);

impl SyncToken {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Mint the token for an export happening now.
    pub fn mint(previous: Option<&SyncToken>) -> Self {
        Self::mint_at(chrono::Utc::now().timestamp_millis(), previous)
    }

    /// Mint a token for an export at `now_millis`, strictly newer than
    /// `previous` when that one is numeric.
    pub fn mint_at(now_millis: i64, previous: Option<&SyncToken>) -> Self {
        let previous = previous.and_then(|t| t.0.parse::<i64>().ok());
        let value = match previous {
            Some(prev) if prev >= now_millis => prev + 1,
            _ => now_millis,
        };
        Self(value.to_string())
    }
}

impl fmt::Display for SyncToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authoritative holder of the current sync token.
pub trait SyncTokenSource: Send + Sync {
    fn current_sync_token(&self) -> Result<Option<SyncToken>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_uses_clock() {
        let token = SyncToken::mint_at(1_700_000_000_000, Some(&SyncToken::new("1600000000000")));
        assert_eq!(token.as_str(), "1700000000000");
    }

    #[test]
    fn test_mint_never_repeats_previous() {
        let previous = SyncToken::new("1700000000000");
        let same_ms = SyncToken::mint_at(1_700_000_000_000, Some(&previous));
        let clock_behind = SyncToken::mint_at(1_600_000_000_000, Some(&previous));

        assert_eq!(same_ms.as_str(), "1700000000001");
        assert_eq!(clock_behind.as_str(), "1700000000001");
    }

    #[test]
    fn test_mint_ignores_opaque_previous() {
        let token = SyncToken::mint_at(42, Some(&SyncToken::new("not-a-number")));
        assert_eq!(token.as_str(), "42");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&SyncToken::new("123")).unwrap();
        assert_eq!(json, "\"123\"");
    }
}
