//! # Progress Tracker
//!
//! Per-NUPCAN record of which application steps a candidate finished.
//!
//! ## State machine
//! - Stages in fixed order: inscription, documents, payment, then `done` (terminal)
//! - Completing a stage only ever adds to `completedStages`
//! - `currentStage` is the first workflow stage not yet completed, `done` once all three are
//!
//! ## Storage
//! - Key `progress_<nupcan>`, value is the JSON record (camelCase, same shape the client keeps)
//! - Reads never fail: a missing, unreadable or corrupt record is "no progress recorded"
//! - Writes that fail are logged and the computed record is still returned
//!
//! Concurrent writers for one identifier (two tabs) are last write wins.
use std::{collections::BTreeSet, fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::RegistryError;

pub const PROGRESS_KEY_PREFIX: &str = "progress_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Inscription,
    Documents,
    Payment,
    Done,
}

impl Stage {
    /// Stages a candidate actually completes, in order. `Done` is derived.
    pub const WORKFLOW: [Stage; 3] = [Stage::Inscription, Stage::Documents, Stage::Payment];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Inscription => "inscription",
            Stage::Documents => "documents",
            Stage::Payment => "payment",
            Stage::Done => "done",
        }
    }

    /// Workflow stages strictly before `self`.
    pub fn prerequisites(self) -> &'static [Stage] {
        match self {
            Stage::Inscription => &[],
            Stage::Documents => &[Stage::Inscription],
            Stage::Payment => &[Stage::Inscription, Stage::Documents],
            Stage::Done => &[Stage::Inscription, Stage::Documents, Stage::Payment],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = RegistryError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "inscription" => Ok(Stage::Inscription),
            "documents" => Ok(Stage::Documents),
            "payment" => Ok(Stage::Payment),
            "done" => Ok(Stage::Done),
            other => Err(RegistryError::MalformedIdentifier(format!(
                "unknown stage {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progression {
    pub current_stage: Stage,
    pub completed_stages: BTreeSet<Stage>,
    pub documents_uploaded: bool,
    pub payment_done: bool,
    pub registered_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl Progression {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_stage: Stage::Inscription,
            completed_stages: BTreeSet::new(),
            documents_uploaded: false,
            payment_done: false,
            registered_at: now,
            last_accessed_at: now,
        }
    }

    /// Adds `stage` and recomputes the derived fields. Returns whether anything was added.
    pub fn complete(&mut self, stage: Stage) -> bool {
        if stage == Stage::Done {
            return false;
        }

        let added = self.completed_stages.insert(stage);
        self.recompute();

        added
    }

    pub fn is_complete(&self, stage: Stage) -> bool {
        self.completed_stages.contains(&stage)
    }

    pub fn can_access(&self, stage: Stage) -> bool {
        stage
            .prerequisites()
            .iter()
            .all(|required| self.is_complete(*required))
    }

    pub fn completion_percentage(&self) -> u8 {
        let done = Stage::WORKFLOW
            .iter()
            .filter(|stage| self.is_complete(**stage))
            .count();

        ((100.0 * done as f64) / Stage::WORKFLOW.len() as f64).round() as u8
    }

    fn recompute(&mut self) {
        // `done` is never stored, only derived
        self.completed_stages.remove(&Stage::Done);

        self.current_stage = Stage::WORKFLOW
            .into_iter()
            .find(|stage| !self.completed_stages.contains(stage))
            .unwrap_or(Stage::Done);
        self.documents_uploaded = self.is_complete(Stage::Documents);
        self.payment_done = self.is_complete(Stage::Payment);
    }
}

/// Key-value persistence for progression records.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, RegistryError>;

    async fn save(&self, key: &str, value: String) -> Result<(), RegistryError>;
}

pub fn progress_key(id: &str) -> String {
    format!("{PROGRESS_KEY_PREFIX}{id}")
}

#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn ProgressStore>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    pub fn create_initial(&self) -> Progression {
        Progression::new(Utc::now())
    }

    /// Called once, right after a registration succeeded.
    pub async fn initialize_after_registration(&self, id: &str) -> Progression {
        let mut progression = self.create_initial();
        progression.complete(Stage::Inscription);

        self.persist(id, &progression).await;
        progression
    }

    pub async fn mark_complete(&self, id: &str, stage: Stage) -> Progression {
        let mut progression = match self.get_progress(id).await {
            Some(progression) => progression,
            None => {
                debug!("No progression for {id}, starting fresh");
                self.create_initial()
            }
        };

        if !progression.complete(stage) {
            debug!("Nothing new to record for {id} at {stage}");
        }
        progression.last_accessed_at = Utc::now();

        self.persist(id, &progression).await;
        progression
    }

    /// `None` covers unknown, expired, unreadable and corrupt records alike.
    pub async fn get_progress(&self, id: &str) -> Option<Progression> {
        let key = progress_key(id);

        let raw = match self.store.load(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to load {key}: {e}");
                return None;
            }
        };

        match decode(&raw) {
            Ok(progression) => Some(progression),
            Err(e) => {
                warn!("Discarding {key}: {e}");
                None
            }
        }
    }

    pub async fn can_access_stage(&self, id: &str, stage: Stage) -> bool {
        self.get_progress(id)
            .await
            .is_some_and(|progression| progression.can_access(stage))
    }

    pub async fn completion_percentage(&self, id: &str) -> u8 {
        self.get_progress(id)
            .await
            .map_or(0, |progression| progression.completion_percentage())
    }

    async fn persist(&self, id: &str, progression: &Progression) {
        let key = progress_key(id);

        let value = match serde_json::to_string(progression) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode {key}: {e}");
                return;
            }
        };

        if let Err(e) = self.store.save(&key, value).await {
            warn!("Failed to save {key}: {e}");
        }
    }
}

fn decode(raw: &str) -> Result<Progression, RegistryError> {
    let mut progression: Progression = serde_json::from_str(raw)?;
    progression.recompute();

    Ok(progression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryProgressStore;

    fn tracker() -> (Arc<MemoryProgressStore>, ProgressTracker) {
        let store = Arc::new(MemoryProgressStore::default());
        (store.clone(), ProgressTracker::new(store))
    }

    fn assert_consistent(progression: &Progression) {
        let expected = Stage::WORKFLOW
            .into_iter()
            .find(|stage| !progression.completed_stages.contains(stage))
            .unwrap_or(Stage::Done);

        assert_eq!(progression.current_stage, expected);
        assert_eq!(
            progression.documents_uploaded,
            progression.is_complete(Stage::Documents)
        );
        assert_eq!(progression.payment_done, progression.is_complete(Stage::Payment));
        assert!(!progression.completed_stages.contains(&Stage::Done));
    }

    #[test]
    fn test_create_initial() {
        let (_, tracker) = tracker();
        let progression = tracker.create_initial();

        assert!(progression.completed_stages.is_empty());
        assert_eq!(progression.current_stage, Stage::Inscription);
        assert_eq!(progression.completion_percentage(), 0);
    }

    #[tokio::test]
    async fn test_initialize_after_registration() {
        let (_, tracker) = tracker();
        tracker.initialize_after_registration("X").await;

        let progression = tracker.get_progress("X").await.unwrap();
        assert_eq!(
            progression.completed_stages,
            BTreeSet::from([Stage::Inscription])
        );
        assert_eq!(progression.current_stage, Stage::Documents);
        assert_eq!(tracker.completion_percentage("X").await, 33);
    }

    #[tokio::test]
    async fn test_full_workflow_reaches_done() {
        let (_, tracker) = tracker();
        tracker.initialize_after_registration("X").await;

        tracker.mark_complete("X", Stage::Documents).await;
        tracker.mark_complete("X", Stage::Payment).await;

        let progression = tracker.get_progress("X").await.unwrap();
        assert_eq!(progression.current_stage, Stage::Done);
        assert!(progression.documents_uploaded);
        assert!(progression.payment_done);
        assert_eq!(tracker.completion_percentage("X").await, 100);
    }

    #[tokio::test]
    async fn test_mark_complete_is_idempotent() {
        let (_, tracker) = tracker();
        tracker.initialize_after_registration("X").await;

        let first = tracker.mark_complete("X", Stage::Documents).await;
        let second = tracker.mark_complete("X", Stage::Documents).await;

        assert_eq!(first.completed_stages, second.completed_stages);
        assert_eq!(first.current_stage, second.current_stage);
        assert_eq!(second.current_stage, Stage::Payment);
        assert!(second.last_accessed_at >= first.last_accessed_at);
    }

    #[tokio::test]
    async fn test_mark_complete_without_record_starts_fresh() {
        let (_, tracker) = tracker();

        let progression = tracker.mark_complete("Y", Stage::Documents).await;
        assert_eq!(
            progression.completed_stages,
            BTreeSet::from([Stage::Documents])
        );
        assert_eq!(progression.current_stage, Stage::Inscription);
        assert!(tracker.get_progress("Y").await.is_some());
    }

    #[tokio::test]
    async fn test_mark_done_adds_nothing() {
        let (_, tracker) = tracker();
        tracker.initialize_after_registration("X").await;

        let progression = tracker.mark_complete("X", Stage::Done).await;
        assert_eq!(progression.current_stage, Stage::Documents);
        assert_consistent(&progression);
    }

    #[tokio::test]
    async fn test_payment_access_requires_documents() {
        let (_, tracker) = tracker();
        tracker.initialize_after_registration("X").await;
        assert!(!tracker.can_access_stage("X", Stage::Payment).await);

        // paying first does not open the gate either
        tracker.mark_complete("X", Stage::Payment).await;
        assert!(!tracker.can_access_stage("X", Stage::Payment).await);

        tracker.mark_complete("X", Stage::Documents).await;
        assert!(tracker.can_access_stage("X", Stage::Payment).await);
        assert!(tracker.can_access_stage("X", Stage::Done).await);
    }

    #[tokio::test]
    async fn test_unknown_identifier() {
        let (store, tracker) = tracker();

        assert!(tracker.get_progress("unknown-id").await.is_none());
        assert!(!tracker.can_access_stage("unknown-id", Stage::Documents).await);
        assert!(!tracker.can_access_stage("unknown-id", Stage::Inscription).await);
        assert_eq!(tracker.completion_percentage("unknown-id").await, 0);

        // reads do not create anything
        assert!(store.raw("progress_unknown-id").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_treated_as_absent() {
        let (store, tracker) = tracker();
        store.insert_raw("progress_X", "{not json").await;

        assert!(tracker.get_progress("X").await.is_none());
        assert!(!tracker.can_access_stage("X", Stage::Documents).await);

        let progression = tracker.initialize_after_registration("X").await;
        assert_eq!(tracker.get_progress("X").await, Some(progression));
    }

    #[tokio::test]
    async fn test_inconsistent_record_is_normalized_on_load() {
        let (store, tracker) = tracker();
        store
            .insert_raw(
                "progress_X",
                r#"{
                    "currentStage": "inscription",
                    "completedStages": ["payment", "inscription", "documents", "done"],
                    "documentsUploaded": false,
                    "paymentDone": false,
                    "registeredAt": "2024-03-05T08:00:00Z",
                    "lastAccessedAt": "2024-03-05T08:00:00Z"
                }"#,
            )
            .await;

        let progression = tracker.get_progress("X").await.unwrap();
        assert_eq!(progression.current_stage, Stage::Done);
        assert_consistent(&progression);
    }

    #[tokio::test]
    async fn test_storage_failure_degrades_to_absent() {
        let (store, tracker) = tracker();
        tracker.initialize_after_registration("X").await;

        store.set_unavailable(true);
        assert!(tracker.get_progress("X").await.is_none());
        let progression = tracker.mark_complete("X", Stage::Documents).await;
        assert!(progression.is_complete(Stage::Documents));

        store.set_unavailable(false);
        assert!(!tracker.get_progress("X").await.unwrap().documents_uploaded);
    }

    #[test]
    fn test_every_reachable_state_is_consistent() {
        // every order of completing every subset of stages
        let orders: [[Stage; 3]; 6] = [
            [Stage::Inscription, Stage::Documents, Stage::Payment],
            [Stage::Inscription, Stage::Payment, Stage::Documents],
            [Stage::Documents, Stage::Inscription, Stage::Payment],
            [Stage::Documents, Stage::Payment, Stage::Inscription],
            [Stage::Payment, Stage::Inscription, Stage::Documents],
            [Stage::Payment, Stage::Documents, Stage::Inscription],
        ];

        for order in orders {
            let mut progression = Progression::new(Utc::now());
            let mut seen = BTreeSet::new();

            for stage in order {
                progression.complete(stage);
                seen.insert(stage);

                assert_consistent(&progression);
                assert_eq!(progression.completed_stages, seen);
                assert_eq!(
                    progression.completion_percentage(),
                    [0, 33, 67, 100][seen.len()]
                );
            }
        }
    }

    #[test]
    fn test_stage_parsing() {
        assert_eq!("documents".parse::<Stage>().unwrap(), Stage::Documents);
        assert_eq!(Stage::Payment.to_string(), "payment");
        assert!("Payment".parse::<Stage>().is_err());
    }

    #[test]
    fn test_record_shape() {
        let mut progression = Progression::new(Utc::now());
        progression.complete(Stage::Inscription);

        let json: serde_json::Value = serde_json::to_value(&progression).unwrap();
        assert_eq!(json["currentStage"], "documents");
        assert_eq!(json["completedStages"], serde_json::json!(["inscription"]));
        assert_eq!(json["documentsUploaded"], false);
        assert!(json.get("registeredAt").is_some());
        assert!(json.get("lastAccessedAt").is_some());
    }
}
