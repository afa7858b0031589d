//! Cache configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Namespace scope for cached values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Keyed by working directory.
    #[default]
    Folder,
    /// Keyed by shell session identifier.
    Session,
}

impl Strategy {
    /// Parse a strategy name, falling back to `Folder` for anything unknown.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "session" => Self::Session,
            _ => Self::Folder,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder => f.write_str("folder"),
            Self::Session => f.write_str("session"),
        }
    }
}

/// How long a cached value stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDuration {
    /// Values live for the current process only and are never persisted.
    None,
    /// Values never expire.
    Infinite,
    /// Values expire after the given time-to-live.
    For(Duration),
}

impl Default for CacheDuration {
    fn default() -> Self {
        Self::For(Duration::from_secs(3600)) // 1 hour
    }
}

impl CacheDuration {
    /// Parse `none`, `infinite` or an amount with a unit (`30s`, `5m`, `1h`, `2d`, `1w`).
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().to_lowercase();
        match input.as_str() {
            "" => None,
            "none" | "0" => Some(Self::None),
            "infinite" => Some(Self::Infinite),
            _ => parse_duration(&input).map(Self::For),
        }
    }

    /// Time-to-live for new entries. `None` means no expiry.
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            Self::For(ttl) => Some(*ttl),
            Self::None | Self::Infinite => None,
        }
    }

    /// Whether entries written with this duration survive the process.
    pub fn persists(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Parse `<amount><unit>` where unit is one of `s`, `m`, `h`, `d`, `w`.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.len() < 2 || !input.is_char_boundary(input.len() - 1) {
        return None;
    }

    let (digits, unit) = input.split_at(input.len() - 1);
    let amount: u64 = digits.parse().ok()?;

    let factor: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        "w" => 604800,
        _ => return None,
    };

    amount.checked_mul(factor).map(Duration::from_secs)
}

/// Configuration for the cache service, supplied by the surrounding CLI.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Default time-to-live for entries.
    pub duration: CacheDuration,

    /// Namespace scope for strategy-scoped lookups.
    pub strategy: Strategy,
}

impl CacheConfig {
    /// Create a config with the given strategy and default duration.
    pub fn with_strategy(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    /// Set the default time-to-live (builder pattern).
    #[must_use]
    pub fn duration(mut self, duration: CacheDuration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the namespace strategy (builder pattern).
    #[must_use]
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("45s"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86400)));
        assert_eq!(parse_duration("1w"), Some(Duration::from_secs(604800)));
        assert_eq!(parse_duration("invalid"), None);
        assert_eq!(parse_duration("h"), None);
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert_eq!(parse_duration("31000000000000w"), None);
        assert_eq!(parse_duration("18446744073709551615m"), None);
        assert_eq!(CacheDuration::parse("31000000000000w"), None);
        assert_eq!(
            parse_duration("18446744073709551615s"),
            Some(Duration::from_secs(u64::MAX))
        );
    }

    #[test]
    fn test_cache_duration_keywords() {
        assert_eq!(CacheDuration::parse("none"), Some(CacheDuration::None));
        assert_eq!(CacheDuration::parse("INFINITE"), Some(CacheDuration::Infinite));
        assert_eq!(
            CacheDuration::parse("2h"),
            Some(CacheDuration::For(Duration::from_secs(7200)))
        );
        assert_eq!(CacheDuration::parse(""), None);
        assert!(!CacheDuration::None.persists());
        assert_eq!(CacheDuration::Infinite.ttl(), None);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(Strategy::parse("session"), Strategy::Session);
        assert_eq!(Strategy::parse(" Folder "), Strategy::Folder);
        assert_eq!(Strategy::parse("bogus"), Strategy::Folder);
        assert_eq!(Strategy::Session.to_string(), "session");
    }
}
