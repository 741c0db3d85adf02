//! Game rules that deployments may tune.

use std::env;

use chrono::Duration;
use thiserror::Error;

/// Errors raised while reading the policy from the environment.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Tunable game constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Members needed before the creator may start.
    pub min_members_to_start: i64,
    /// Roster capacity, creator included.
    pub max_members: i64,
    /// How long completed operations are kept before purging.
    pub retention_days: i64,
    /// Missions drawn per difficulty tier for a daily pool.
    pub missions_per_tier: usize,
    /// Invite code allocations tried before giving up.
    pub invite_code_attempts: usize,
    /// Entries returned by the operation feed.
    pub feed_limit: i64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            min_members_to_start: 3,
            max_members: 5,
            retention_days: 7,
            missions_per_tier: 3,
            invite_code_attempts: 10,
            feed_limit: 50,
        }
    }
}

impl Policy {
    /// Read overrides from `MIN_MEMBERS_TO_START`, `MAX_MEMBERS` and
    /// `RETENTION_DAYS`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, PolicyError> {
        let defaults = Self::default();

        let policy = Self {
            min_members_to_start: read_positive("MIN_MEMBERS_TO_START", defaults.min_members_to_start)?,
            max_members: read_positive("MAX_MEMBERS", defaults.max_members)?,
            retention_days: read_positive("RETENTION_DAYS", defaults.retention_days)?,
            ..defaults
        };

        if policy.min_members_to_start > policy.max_members {
            return Err(PolicyError::InvalidValue {
                name: "MIN_MEMBERS_TO_START",
                value: format!(
                    "{} exceeds MAX_MEMBERS {}",
                    policy.min_members_to_start, policy.max_members
                ),
            });
        }

        Ok(policy)
    }

    /// Size of a full daily pool.
    pub fn pool_size(&self) -> usize {
        self.missions_per_tier * database::Difficulty::ALL.len()
    }

    pub fn retention(&self) -> Duration {
        Duration::days(self.retention_days)
    }
}

fn read_positive(name: &'static str, default: i64) -> Result<i64, PolicyError> {
    match env::var(name) {
        Ok(raw) => parse_positive(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<i64, PolicyError> {
    match raw.trim().parse::<i64>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(PolicyError::InvalidValue {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = Policy::default();
        assert_eq!(policy.min_members_to_start, 3);
        assert_eq!(policy.max_members, 5);
        assert_eq!(policy.pool_size(), 9);
        assert_eq!(policy.retention(), Duration::days(7));
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("X", " 4 ").unwrap(), 4);
        assert!(parse_positive("X", "0").is_err());
        assert!(parse_positive("X", "-2").is_err());
        assert!(parse_positive("X", "three").is_err());
    }
}
