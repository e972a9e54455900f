//! Read-only standing and authorization queries.
//!
//! Kept apart from the mutation paths so the owner-or-admin predicate and
//! the participant counting that drives terminal-round detection stay
//! independently testable. The seeder and resolver share the pure helpers
//! here; the `StandingQuery` struct exposes the same logic over plain pool
//! reads for transports and tooling.

use std::sync::Arc;

use crate::db::store::BracketStore;
use crate::db::timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout};

use super::errors::{BracketError, BracketResult};
use super::models::{Actor, EventId, Match};

/// Terminal round number for a field of `participants` entrants, or `None`
/// when the field is too small to form a bracket.
///
/// Recomputed from the live participant count at every resolution; withdrawn
/// entrants are excluded upstream, entrants that already won or lost still
/// count because the bracket geometry is set by everyone seeded into it.
pub fn final_round_for(participants: i64) -> Option<i32> {
    if participants < 2 {
        return None;
    }
    Some((participants as u64).ilog2() as i32)
}

/// Read-only bracket queries over the storage gateway.
#[derive(Clone)]
pub struct StandingQuery {
    store: Arc<dyn BracketStore>,
}

impl StandingQuery {
    pub fn new(store: Arc<dyn BracketStore>) -> Self {
        Self { store }
    }

    /// Count of Participant-role inscriptions that have not withdrawn.
    ///
    /// # Errors
    ///
    /// * `BracketError::EventNotFound` - No such event
    pub async fn active_participant_count(&self, event_id: EventId) -> BracketResult<i64> {
        let store = &self.store;
        with_timeout(DEFAULT_QUERY_TIMEOUT, async move {
            store
                .fetch_event(event_id)
                .await?
                .ok_or(BracketError::EventNotFound(event_id))?;
            store.participant_count(event_id).await
        })
        .await
    }

    /// Whether the actor may manage the event's bracket.
    ///
    /// # Errors
    ///
    /// * `BracketError::EventNotFound` - No such event
    pub async fn is_owner_or_admin(
        &self,
        actor: &Actor,
        event_id: EventId,
    ) -> BracketResult<bool> {
        let event = with_timeout(DEFAULT_QUERY_TIMEOUT, self.store.fetch_event(event_id))
            .await?
            .ok_or(BracketError::EventNotFound(event_id))?;
        Ok(actor.may_manage(&event))
    }

    /// Ordered bracket view for an event: all matches, by round then by
    /// creation order.
    ///
    /// # Errors
    ///
    /// * `BracketError::EventNotFound` - No such event
    pub async fn bracket_matches(&self, event_id: EventId) -> BracketResult<Vec<Match>> {
        let store = &self.store;
        with_timeout(DEFAULT_QUERY_TIMEOUT, async move {
            store
                .fetch_event(event_id)
                .await?
                .ok_or(BracketError::EventNotFound(event_id))?;
            store.matches_for_event(event_id).await
        })
        .await
    }
}
