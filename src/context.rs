//! User context gathering for substitution ranking
//!
//! Four independent lookups (equipment, injuries, program, session) run
//! concurrently with individual timeouts. A slow or failed lookup degrades
//! that dimension to "unknown" instead of failing the request.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::Result;

/// What the user can train with right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EquipmentAvailability {
    /// Inventory is known; hard-filter against it
    Known(BTreeSet<String>),
    /// Lookup missing, failed, or timed out; do not filter
    Unknown,
}

impl EquipmentAvailability {
    pub fn allows(&self, equipment: &str) -> bool {
        match self {
            // Bodyweight work needs no inventory
            EquipmentAvailability::Known(set) => {
                equipment == "bodyweight" || set.contains(equipment)
            }
            EquipmentAvailability::Unknown => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjurySeverity {
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Injury {
    pub body_part: String,
    pub severity: InjurySeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Novice,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramContext {
    /// Exercises appearing in the user's active program
    pub exercise_ids: BTreeSet<Uuid>,
    pub phase: Option<String>,
    pub experience: Option<ExperienceLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatigueLevel {
    Fresh,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Exercises already completed this session
    pub completed: Vec<Uuid>,
    pub fatigue: FatigueLevel,
}

/// Everything the candidate filter knows about the user
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
    pub equipment: EquipmentAvailability,
    pub injuries: Vec<Injury>,
    pub program: Option<ProgramContext>,
    pub session: Option<SessionState>,
}

impl UserContext {
    /// Context for an unknown user; filters and boosts all no-op
    pub fn anonymous(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            equipment: EquipmentAvailability::Unknown,
            injuries: Vec::new(),
            program: None,
            session: None,
        }
    }

    pub fn has_injury(&self, body_part: &str) -> bool {
        self.injuries
            .iter()
            .any(|i| i.body_part.eq_ignore_ascii_case(body_part))
    }
}

/// Backend for the four context dimensions
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn equipment(&self, user_id: &str) -> Result<Option<BTreeSet<String>>>;
    async fn injuries(&self, user_id: &str) -> Result<Vec<Injury>>;
    async fn program(&self, user_id: &str) -> Result<Option<ProgramContext>>;
    async fn session(&self, user_id: &str) -> Result<Option<SessionState>>;
}

/// Runs the four lookups concurrently and absorbs partial failures
pub struct ContextGatherer {
    store: std::sync::Arc<dyn ContextStore>,
    lookup_timeout: Duration,
}

impl ContextGatherer {
    pub fn new(store: std::sync::Arc<dyn ContextStore>, lookup_timeout: Duration) -> Self {
        Self {
            store,
            lookup_timeout,
        }
    }

    pub async fn gather(&self, user_id: &str) -> UserContext {
        let (equipment, injuries, program, session) = tokio::join!(
            tokio::time::timeout(self.lookup_timeout, self.store.equipment(user_id)),
            tokio::time::timeout(self.lookup_timeout, self.store.injuries(user_id)),
            tokio::time::timeout(self.lookup_timeout, self.store.program(user_id)),
            tokio::time::timeout(self.lookup_timeout, self.store.session(user_id)),
        );

        let equipment = match equipment {
            Ok(Ok(Some(set))) => EquipmentAvailability::Known(set),
            Ok(Ok(None)) => EquipmentAvailability::Unknown,
            Ok(Err(e)) => {
                self.record_failure(user_id, "equipment", &e.to_string());
                EquipmentAvailability::Unknown
            }
            Err(_) => {
                self.record_failure(user_id, "equipment", "timeout");
                EquipmentAvailability::Unknown
            }
        };

        let injuries = match injuries {
            Ok(Ok(list)) => list,
            Ok(Err(e)) => {
                self.record_failure(user_id, "injuries", &e.to_string());
                Vec::new()
            }
            Err(_) => {
                self.record_failure(user_id, "injuries", "timeout");
                Vec::new()
            }
        };

        let program = match program {
            Ok(Ok(p)) => p,
            Ok(Err(e)) => {
                self.record_failure(user_id, "program", &e.to_string());
                None
            }
            Err(_) => {
                self.record_failure(user_id, "program", "timeout");
                None
            }
        };

        let session = match session {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                self.record_failure(user_id, "session", &e.to_string());
                None
            }
            Err(_) => {
                self.record_failure(user_id, "session", "timeout");
                None
            }
        };

        UserContext {
            user_id: user_id.to_string(),
            equipment,
            injuries,
            program,
            session,
        }
    }

    fn record_failure(&self, user_id: &str, dimension: &str, reason: &str) {
        crate::metrics::CONTEXT_PARTIAL_FAILURES_TOTAL
            .with_label_values(&[dimension])
            .inc();
        tracing::debug!(
            user_id = %user_id,
            dimension = %dimension,
            reason = %reason,
            "context lookup degraded"
        );
    }
}

/// In-process context backend
#[derive(Default)]
pub struct InMemoryContextStore {
    equipment: DashMap<String, BTreeSet<String>>,
    injuries: DashMap<String, Vec<Injury>>,
    programs: DashMap<String, ProgramContext>,
    sessions: DashMap<String, SessionState>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_equipment(&self, user_id: &str, items: impl IntoIterator<Item = String>) {
        self.equipment
            .insert(user_id.to_string(), items.into_iter().collect());
    }

    pub fn add_injury(&self, user_id: &str, injury: Injury) {
        self.injuries
            .entry(user_id.to_string())
            .or_default()
            .push(injury);
    }

    pub fn set_program(&self, user_id: &str, program: ProgramContext) {
        self.programs.insert(user_id.to_string(), program);
    }

    pub fn set_session(&self, user_id: &str, session: SessionState) {
        self.sessions.insert(user_id.to_string(), session);
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn equipment(&self, user_id: &str) -> Result<Option<BTreeSet<String>>> {
        Ok(self.equipment.get(user_id).map(|e| e.clone()))
    }

    async fn injuries(&self, user_id: &str) -> Result<Vec<Injury>> {
        Ok(self
            .injuries
            .get(user_id)
            .map(|i| i.clone())
            .unwrap_or_default())
    }

    async fn program(&self, user_id: &str) -> Result<Option<ProgramContext>> {
        Ok(self.programs.get(user_id).map(|p| p.clone()))
    }

    async fn session(&self, user_id: &str) -> Result<Option<SessionState>> {
        Ok(self.sessions.get(user_id).map(|s| s.clone()))
    }
}
