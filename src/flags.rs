//! Feature flags with percentage rollout
//!
//! Gating decisions are deterministic per (user, flag): a user's bucket
//! comes from consistent hashing, so the same user always sees the same
//! side of a percentage rollout. Decisions are cached briefly so hot
//! request paths do not re-evaluate flag state.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use crate::errors::{AppError, Result};

/// Flag definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub name: String,
    /// Master switch; false disables the flag for everyone
    pub enabled: bool,
    /// Rollout percentage in [0, 100]
    pub rollout_percentage: f32,
    /// Premium users bypass the percentage gate when the flag is enabled
    pub premium_bypass: bool,
}

impl FeatureFlag {
    pub fn full(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            rollout_percentage: 100.0,
            premium_bypass: false,
        }
    }

    pub fn partial(name: &str, rollout_percentage: f32, premium_bypass: bool) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            rollout_percentage,
            premium_bypass,
        }
    }
}

/// Backend holding flag definitions and per-user overrides
pub trait FlagStore: Send + Sync {
    fn get(&self, name: &str) -> Option<FeatureFlag>;
    fn user_override(&self, name: &str, user_id: &str) -> Option<bool>;
    fn is_premium(&self, user_id: &str) -> bool;
}

/// In-process flag backend
#[derive(Default)]
pub struct InMemoryFlagStore {
    flags: DashMap<String, FeatureFlag>,
    overrides: DashMap<(String, String), bool>,
    premium_users: DashMap<String, ()>,
}

impl InMemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_flag(&self, flag: FeatureFlag) {
        self.flags.insert(flag.name.clone(), flag);
    }

    pub fn set_override(&self, name: &str, user_id: &str, enabled: bool) {
        self.overrides
            .insert((name.to_string(), user_id.to_string()), enabled);
    }

    pub fn set_premium(&self, user_id: &str) {
        self.premium_users.insert(user_id.to_string(), ());
    }
}

impl FlagStore for InMemoryFlagStore {
    fn get(&self, name: &str) -> Option<FeatureFlag> {
        self.flags.get(name).map(|f| f.clone())
    }

    fn user_override(&self, name: &str, user_id: &str) -> Option<bool> {
        self.overrides
            .get(&(name.to_string(), user_id.to_string()))
            .map(|v| *v)
    }

    fn is_premium(&self, user_id: &str) -> bool {
        self.premium_users.contains_key(user_id)
    }
}

/// Expired decisions are purged once the cache reaches this size, so the
/// map stays bounded under high user cardinality
const CACHE_SWEEP_LEN: usize = 10_000;

/// Evaluates flags for users with short-lived decision caching
pub struct RolloutGate {
    store: std::sync::Arc<dyn FlagStore>,
    cache: DashMap<(String, String), (bool, Instant)>,
    cache_ttl: Duration,
}

impl RolloutGate {
    pub fn new(store: std::sync::Arc<dyn FlagStore>, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache: DashMap::new(),
            cache_ttl,
        }
    }

    /// Is `flag` enabled for `user_id`?
    ///
    /// Precedence: per-user override, then master switch, then premium
    /// bypass, then percentage bucket. Unknown flags are off.
    pub fn is_enabled(&self, flag: &str, user_id: &str) -> bool {
        let key = (flag.to_string(), user_id.to_string());
        if let Some(cached) = self.cache.get(&key) {
            let (decision, at) = *cached;
            if at.elapsed() < self.cache_ttl {
                return decision;
            }
        }

        let decision = self.evaluate(flag, user_id);
        if self.cache.len() >= CACHE_SWEEP_LEN {
            self.cache.retain(|_, entry| entry.1.elapsed() < self.cache_ttl);
        }
        self.cache.insert(key, (decision, Instant::now()));
        decision
    }

    /// Premium tier check, for gates that treat premium membership as an
    /// alternative trigger rather than a percentage bypass
    pub fn is_premium(&self, user_id: &str) -> bool {
        self.store.is_premium(user_id)
    }

    /// Flag definition for the flags API; errors on unknown names
    pub fn describe(&self, flag: &str) -> Result<FeatureFlag> {
        self.store
            .get(flag)
            .ok_or_else(|| AppError::FlagNotFound(flag.to_string()))
    }

    fn evaluate(&self, flag: &str, user_id: &str) -> bool {
        if let Some(forced) = self.store.user_override(flag, user_id) {
            return forced;
        }

        let Some(definition) = self.store.get(flag) else {
            return false;
        };
        if !definition.enabled {
            return false;
        }
        if definition.premium_bypass && self.store.is_premium(user_id) {
            return true;
        }
        if definition.rollout_percentage >= 100.0 {
            return true;
        }
        if definition.rollout_percentage <= 0.0 {
            return false;
        }

        bucket(user_id, flag) < definition.rollout_percentage
    }
}

/// Consistent bucket for (user, flag) in [0, 100)
fn bucket(user_id: &str, flag: &str) -> f32 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    user_id.hash(&mut hasher);
    flag.hash(&mut hasher);
    let hash = hasher.finish();
    (hash % 10000) as f32 / 100.0
}
