//! In-memory dataset store shared by the HTTP handlers.
//!
//! The store owns the enriched records, contacts and campaigns behind a
//! tokio `RwLock`. Reads hand out cloned snapshots so the analytics core
//! runs outside the lock. Every successful write bumps a version counter.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::ingest::{hospitals, link_campaigns, Dataset};
use crate::metrics::enrich_all;
use crate::model::{Campaign, ContactInfo, ContactUpdate, EnrichedRecord, InfluencerUpdate};
use crate::workflow::{self, KanbanLane, WorkflowError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl StoreError {
    fn influencer(id: &str) -> Self {
        StoreError::NotFound {
            kind: "influencer",
            id: id.to_string(),
        }
    }
}

/// Enriched records at a given store version.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub records: Vec<EnrichedRecord>,
}

#[derive(Debug, Default)]
struct State {
    records: Vec<EnrichedRecord>,
    contacts: Vec<ContactInfo>,
    campaigns: Vec<Campaign>,
    version: u64,
}

impl State {
    /// Validate and apply an update, re-deriving metrics and bumping the version.
    fn apply_update(
        &mut self,
        id: &str,
        update: &InfluencerUpdate,
    ) -> Result<EnrichedRecord, StoreError> {
        let slot = self
            .records
            .iter_mut()
            .find(|r| r.record.id == id)
            .ok_or_else(|| StoreError::influencer(id))?;

        workflow::validate_update(&slot.record, update)?;

        let previous_hospital = slot.record.hospital.clone();
        update.apply_to(&mut slot.record);
        *slot = slot.re_enrich();
        let updated = slot.clone();

        if updated.record.hospital != previous_hospital {
            let plain: Vec<_> = self.records.iter().map(|r| r.record.clone()).collect();
            link_campaigns(&mut self.campaigns, &plain);
        }

        self.version += 1;
        Ok(updated)
    }
}

/// Cloneable handle to the shared dataset.
#[derive(Debug, Clone, Default)]
pub struct Store {
    state: Arc<RwLock<State>>,
}

impl Store {
    /// Build a store from a loaded dataset, enriching every record.
    pub fn new(dataset: Dataset) -> Self {
        let state = State {
            records: enrich_all(&dataset.influencers),
            contacts: dataset.contacts,
            campaigns: dataset.campaigns,
            version: 0,
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.read().await;
        Snapshot {
            version: state.version,
            records: state.records.clone(),
        }
    }

    pub async fn records(&self) -> Vec<EnrichedRecord> {
        self.state.read().await.records.clone()
    }

    pub async fn get(&self, id: &str) -> Result<EnrichedRecord, StoreError> {
        let state = self.state.read().await;
        state
            .records
            .iter()
            .find(|r| r.record.id == id)
            .cloned()
            .ok_or_else(|| StoreError::influencer(id))
    }

    /// Apply a partial update to an influencer.
    ///
    /// The update is checked against the workflow gates first; on success
    /// the derived metrics are recomputed and, when the hospital changed,
    /// campaign membership is relinked.
    ///
    /// # Returns
    ///
    /// The updated record with fresh metrics.
    pub async fn update_influencer(
        &self,
        id: &str,
        update: &InfluencerUpdate,
    ) -> Result<EnrichedRecord, StoreError> {
        let mut state = self.state.write().await;
        let updated = state.apply_update(id, update)?;
        info!(id, version = state.version, "Updated influencer");

        Ok(updated)
    }

    /// Drop an influencer's card on a kanban lane of `hospital`'s board.
    ///
    /// Cards of other hospitals are reported as not found. Dropping on the
    /// lane the card already sits in changes nothing and leaves the version
    /// untouched. The whole move happens under one write lock.
    pub async fn move_card(
        &self,
        hospital: &str,
        id: &str,
        lane: KanbanLane,
    ) -> Result<EnrichedRecord, StoreError> {
        let mut state = self.state.write().await;

        let current = state
            .records
            .iter()
            .find(|r| r.record.id == id && r.record.hospital == hospital)
            .ok_or_else(|| StoreError::influencer(id))?;

        let Some(update) = workflow::move_card(&current.record, lane) else {
            debug!(id, ?lane, "Card already in lane");
            return Ok(current.clone());
        };

        let moved = state.apply_update(id, &update)?;
        info!(id, ?lane, version = state.version, "Moved card");

        Ok(moved)
    }

    pub async fn contacts(&self) -> Vec<ContactInfo> {
        self.state.read().await.contacts.clone()
    }

    pub async fn update_contact(
        &self,
        id: &str,
        update: &ContactUpdate,
    ) -> Result<ContactInfo, StoreError> {
        let mut state = self.state.write().await;

        let contact = state
            .contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "contact",
                id: id.to_string(),
            })?;
        update.apply_to(contact);
        let updated = contact.clone();

        state.version += 1;
        info!(id, version = state.version, "Updated contact");

        Ok(updated)
    }

    pub async fn campaigns(&self) -> Vec<Campaign> {
        self.state.read().await.campaigns.clone()
    }

    /// Known hospitals, campaigns first, then in record order.
    pub async fn hospitals(&self) -> Vec<String> {
        let state = self.state.read().await;
        let plain: Vec<_> = state.records.iter().map(|r| r.record.clone()).collect();
        hospitals(&state.campaigns, &plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CostTier, FollowerTier, InfluencerStatus};
    use crate::workflow::WorkflowStep;

    fn setup_store() -> Store {
        let json = r#"{
            "influencers": [
                {"id": "1", "username": "alpha", "hospital": "Oblive Clinic", "views": 1000, "likes": 100, "comments": 10},
                {"id": "2", "username": "bravo", "hospital": "Yuonne Clinic", "status": "예약 확정"}
            ],
            "contacts": [
                {"id": "c1", "influencerId": "1", "englishName": "Jane"}
            ]
        }"#;
        Store::new(Dataset::from_json_str(json).unwrap())
    }

    #[tokio::test]
    async fn test_new_store_enriches_records() {
        let store = setup_store();

        let record = store.get("1").await.unwrap();
        assert_eq!(record.metrics.emv, 44.0);
        assert_eq!(store.version().await, 0);
        assert_eq!(store.records().await.len(), 2);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let store = setup_store();
        let err = store.get("404").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "influencer", .. }));
        assert_eq!(err.to_string(), "influencer 404 not found");
    }

    #[tokio::test]
    async fn test_update_rederives_metrics_and_bumps_version() {
        let store = setup_store();
        let update = InfluencerUpdate {
            cost_tier: Some(CostTier::Paid),
            follower_tier: Some(FollowerTier::Macro),
            follower_count: Some(100_000),
            views: Some(5000),
            likes: Some(500),
            comments: Some(50),
            ..Default::default()
        };

        let updated = store.update_influencer("1", &update).await.unwrap();

        assert_eq!(updated.metrics.emv, 220.0);
        assert_eq!(updated.metrics.cost, 8000);
        assert_eq!(updated.metrics.roas, 2.0);
        assert_eq!(store.version().await, 1);
        assert_eq!(store.get("1").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_workflow_violation_leaves_record_untouched() {
        let store = setup_store();
        let before = store.get("1").await.unwrap();
        let update = InfluencerUpdate {
            google_form_sent: Some(true),
            views: Some(1),
            ..Default::default()
        };

        let err = store.update_influencer("1", &update).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Workflow(WorkflowError::StepLocked {
                step: WorkflowStep::GoogleFormSent,
                ..
            })
        ));
        assert_eq!(store.get("1").await.unwrap(), before);
        assert_eq!(store.version().await, 0);
    }

    #[tokio::test]
    async fn test_hospital_change_relinks_campaigns() {
        let store = setup_store();
        let update = InfluencerUpdate {
            hospital: Some("Yuonne Clinic".to_string()),
            ..Default::default()
        };

        store.update_influencer("1", &update).await.unwrap();

        let campaigns = store.campaigns().await;
        let oblive = campaigns.iter().find(|c| c.hospital == "Oblive Clinic").unwrap();
        let yuonne = campaigns.iter().find(|c| c.hospital == "Yuonne Clinic").unwrap();
        assert!(oblive.influencer_ids.is_empty());
        assert_eq!(yuonne.influencer_ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_move_card() {
        let store = setup_store();

        let moved = store
            .move_card("Yuonne Clinic", "2", KanbanLane::RejectedOrCancelled)
            .await
            .unwrap();
        assert_eq!(moved.record.status, InfluencerStatus::Rejected);
        assert!(moved.record.is_rejected);
        assert_eq!(store.version().await, 1);

        let same = store
            .move_card("Yuonne Clinic", "2", KanbanLane::RejectedOrCancelled)
            .await
            .unwrap();
        assert_eq!(same, moved);
        assert_eq!(store.version().await, 1);
    }

    #[tokio::test]
    async fn test_move_card_on_other_board_is_not_found() {
        let store = setup_store();

        let err = store
            .move_card("Oblive Clinic", "2", KanbanLane::Posted)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound { kind: "influencer", .. }));
        assert_eq!(
            store.get("2").await.unwrap().record.status,
            InfluencerStatus::BookingConfirmed
        );
        assert_eq!(store.version().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_moves_apply_once() {
        let store = setup_store();

        let moves = (0..8).map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .move_card("Oblive Clinic", "1", KanbanLane::Posted)
                    .await
                    .unwrap()
            })
        });
        for handle in moves.collect::<Vec<_>>() {
            let moved = handle.await.unwrap();
            assert_eq!(moved.record.status, InfluencerStatus::Posted);
        }

        assert_eq!(store.version().await, 1);
    }

    #[tokio::test]
    async fn test_update_contact() {
        let store = setup_store();
        let update = ContactUpdate {
            reminded: Some(true),
            korean_name: Some("제인".to_string()),
            ..Default::default()
        };

        let contact = store.update_contact("c1", &update).await.unwrap();
        assert!(contact.reminded);
        assert_eq!(contact.korean_name, "제인");
        assert_eq!(contact.english_name, "Jane");

        let err = store.update_contact("nope", &update).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "contact", .. }));
    }

    #[tokio::test]
    async fn test_hospitals_and_snapshot() {
        let store = setup_store();
        assert_eq!(store.hospitals().await, vec!["Oblive Clinic", "Yuonne Clinic"]);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.records.len(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = setup_store();
        let other = store.clone();
        let update = InfluencerUpdate {
            status: Some(InfluencerStatus::Posted),
            ..Default::default()
        };

        other.update_influencer("2", &update).await.unwrap();

        assert_eq!(store.get("2").await.unwrap().record.status, InfluencerStatus::Posted);
    }
}
