//! Sports event lifecycle.

use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use crate::domain::{EventStatus, NewSportsEvent, SportsEvent, SportsEventId};
use crate::error::Result;
use crate::port::outbound::store::Store;

/// Creates sports events and moves them through their lifecycle.
pub struct EventService {
    store: Arc<dyn Store>,
    duplicate_tolerance: Duration,
}

impl EventService {
    pub fn new(store: Arc<dyn Store>, duplicate_tolerance: Duration) -> Self {
        Self {
            store,
            duplicate_tolerance,
        }
    }

    /// Create an event, or return the active duplicate. The flag is true
    /// when a new event was stored.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn create(&self, event: NewSportsEvent) -> Result<(SportsEvent, bool)> {
        let (event, inserted) = self
            .store
            .create_event(event, self.duplicate_tolerance)
            .await?;
        if inserted {
            info!(event_id = %event.id, name = %event.canonical_name, "Sports event created");
        }
        Ok((event, inserted))
    }

    /// Move an event forward. Once an event is final or cancelled its
    /// opportunities are closed.
    ///
    /// # Errors
    /// `NotFound`, or `InvalidStatusTransition` on a backward move.
    pub async fn update_status(
        &self,
        id: SportsEventId,
        status: EventStatus,
    ) -> Result<SportsEvent> {
        let event = self.store.update_event_status(id, status).await?;
        if !event.status.is_active() {
            let closed = self.store.close_for_event(id).await?;
            info!(event_id = %id, status = %event.status, closed, "Sports event ended");
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::domain::OpportunityStatus;
    use crate::error::ErrorKind;
    use crate::port::outbound::store::{OpportunityFilter, OpportunityStore};
    use crate::testkit::domain::{event_at, opportunity_for, tip_off};

    #[tokio::test]
    async fn final_event_closes_opportunities() {
        let store = Arc::new(MemoryStore::new());
        let svc = EventService::new(store.clone(), Duration::hours(1));
        let (event, _) = svc
            .create(event_at("NBA", "Thunder", "Suns", tip_off()))
            .await
            .unwrap();
        store
            .upsert_opportunity(opportunity_for(event.id, 1))
            .await
            .unwrap();

        svc.update_status(event.id, EventStatus::Live).await.unwrap();
        svc.update_status(event.id, EventStatus::Final).await.unwrap();

        let opps = store
            .list_opportunities(&OpportunityFilter::default())
            .await
            .unwrap();
        assert_eq!(opps[0].status, OpportunityStatus::Closed);
    }

    #[tokio::test]
    async fn backward_transition_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let svc = EventService::new(store, Duration::hours(1));
        let (event, _) = svc
            .create(event_at("NBA", "Thunder", "Suns", tip_off()))
            .await
            .unwrap();
        svc.update_status(event.id, EventStatus::Live).await.unwrap();

        let err = svc
            .update_status(event.id, EventStatus::Scheduled)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatusTransition);
    }

    #[tokio::test]
    async fn duplicate_create_returns_existing() {
        let store = Arc::new(MemoryStore::new());
        let svc = EventService::new(store, Duration::hours(1));
        let (first, inserted) = svc
            .create(event_at("NBA", "Thunder", "Suns", tip_off()))
            .await
            .unwrap();
        assert!(inserted);
        let (second, inserted) = svc
            .create(event_at(
                "NBA",
                "Thunder",
                "Suns",
                tip_off() + Duration::minutes(30),
            ))
            .await
            .unwrap();
        assert!(!inserted);
        assert_eq!(first.id, second.id);
    }
}
