use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context};

use crate::app::{
    AllocationSettings, DEFAULT_REVIEW_CAPACITY, MAX_PEER_REVIEW_CAPACITY, MIN_PEER_REVIEWS,
    PEER_REVIEW_DUE_DAYS, PERSIST_ATTEMPTS, REVIEW_DUE_DAYS,
};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Per-reviewer capacity for scopes without their own cap
    pub default_review_capacity: u32,
    pub min_peer_reviews: usize,
    /// Open peer evaluations a reviewer may hold at once
    pub max_peer_review_capacity: u32,
    pub review_due_days: i64,
    pub peer_review_due_days: i64,
    pub persist_attempts: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?,
            default_review_capacity: parse_or(
                &lookup,
                "DEFAULT_REVIEW_CAPACITY",
                DEFAULT_REVIEW_CAPACITY,
            )?,
            min_peer_reviews: parse_or(&lookup, "MIN_PEER_REVIEWS", MIN_PEER_REVIEWS)?,
            max_peer_review_capacity: parse_or(
                &lookup,
                "MAX_PEER_REVIEW_CAPACITY",
                MAX_PEER_REVIEW_CAPACITY,
            )?,
            review_due_days: parse_or(&lookup, "REVIEW_DUE_DAYS", REVIEW_DUE_DAYS)?,
            peer_review_due_days: parse_or(
                &lookup,
                "PEER_REVIEW_DUE_DAYS",
                PEER_REVIEW_DUE_DAYS,
            )?,
            persist_attempts: parse_or(&lookup, "PERSIST_ATTEMPTS", PERSIST_ATTEMPTS)?,
        })
    }

    /// Allocation knobs for the services, with the default expertise matrix
    pub fn settings(&self) -> AllocationSettings {
        AllocationSettings {
            default_capacity: self.default_review_capacity,
            min_peer_reviews: self.min_peer_reviews,
            max_peer_review_capacity: self.max_peer_review_capacity,
            review_due_days: self.review_due_days,
            peer_review_due_days: self.peer_review_due_days,
            persist_attempts: self.persist_attempts,
            ..AllocationSettings::default()
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")])).unwrap();

        assert_eq!(config.database_url, "postgres://x");
        assert_eq!(config.settings(), AllocationSettings::default());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("DEFAULT_REVIEW_CAPACITY", "8"),
            ("MIN_PEER_REVIEWS", " 3 "),
            ("MAX_PEER_REVIEW_CAPACITY", "4"),
            ("REVIEW_DUE_DAYS", "14"),
            ("PEER_REVIEW_DUE_DAYS", "3"),
            ("PERSIST_ATTEMPTS", "3"),
        ]))
        .unwrap();

        let settings = config.settings();
        assert_eq!(settings.default_capacity, 8);
        assert_eq!(settings.min_peer_reviews, 3);
        assert_eq!(settings.max_peer_review_capacity, 4);
        assert_eq!(settings.review_due_days, 14);
        assert_eq!(settings.peer_review_due_days, 3);
        assert_eq!(settings.persist_attempts, 3);
    }

    #[test]
    fn database_url_is_required() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn malformed_number_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("MIN_PEER_REVIEWS", "two"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("MIN_PEER_REVIEWS"));
    }
}
