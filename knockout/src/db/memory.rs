//! In-memory implementation of the bracket storage gateway.
//!
//! Backs tests, benchmarks and local tooling. A store-wide async mutex
//! stands in for row locking: `begin` holds the lock for the whole
//! transaction, so plain reads and competing transactions wait until the
//! scope commits or drops. Writes land on a staged copy of the state and
//! replace the shared state only on commit, which gives the same
//! all-or-nothing and rollback-on-drop behavior as the Postgres gateway.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::bracket::errors::{BracketError, BracketResult};
use crate::bracket::models::{
    EntrantMode, EntrantRef, Event, EventId, EventStatus, Inscription, InscriptionId,
    InscriptionRole, InscriptionStatus, Match, MatchId, UserId,
};

use super::store::{BracketStore, BracketTx, NewMatch};

#[derive(Debug, Clone, Default)]
struct MemState {
    events: BTreeMap<EventId, Event>,
    inscriptions: BTreeMap<InscriptionId, Inscription>,
    matches: BTreeMap<MatchId, Match>,
    next_event_id: EventId,
    next_inscription_id: InscriptionId,
    next_match_id: MatchId,
}

fn count_participants(state: &MemState, event_id: EventId) -> i64 {
    state
        .inscriptions
        .values()
        .filter(|i| {
            i.event_id == event_id
                && i.role == InscriptionRole::Participant
                && i.status != InscriptionStatus::Removed
        })
        .count() as i64
}

/// In-memory bracket store
#[derive(Clone, Default)]
pub struct MemBracketStore {
    state: Arc<Mutex<MemState>>,
}

impl MemBracketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test fixture: register an event in Pending status.
    pub async fn insert_event(
        &self,
        name: &str,
        created_by: UserId,
        start_date: DateTime<Utc>,
        entrant_mode: EntrantMode,
    ) -> Event {
        let mut state = self.state.lock().await;
        state.next_event_id += 1;
        let event = Event {
            id: state.next_event_id,
            name: name.to_string(),
            created_by,
            start_date,
            status: EventStatus::Pending,
            entrant_mode,
            round_count: None,
            match_count: None,
        };
        state.events.insert(event.id, event.clone());
        event
    }

    /// Test fixture: register an inscription for an event.
    pub async fn insert_inscription(
        &self,
        event_id: EventId,
        entrant_ref: EntrantRef,
        role: InscriptionRole,
        status: InscriptionStatus,
    ) -> Inscription {
        let mut state = self.state.lock().await;
        state.next_inscription_id += 1;
        let inscription = Inscription {
            id: state.next_inscription_id,
            event_id,
            entrant_ref,
            role,
            status,
        };
        state.inscriptions.insert(inscription.id, inscription);
        inscription
    }
}

#[async_trait]
impl BracketStore for MemBracketStore {
    async fn begin(&self) -> BracketResult<Box<dyn BracketTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemBracketTx { guard, staged }))
    }

    async fn health_check(&self) -> BracketResult<()> {
        Ok(())
    }

    async fn fetch_event(&self, event_id: EventId) -> BracketResult<Option<Event>> {
        let state = self.state.lock().await;
        Ok(state.events.get(&event_id).cloned())
    }

    async fn fetch_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let state = self.state.lock().await;
        Ok(state.matches.get(&match_id).copied())
    }

    async fn matches_for_event(&self, event_id: EventId) -> BracketResult<Vec<Match>> {
        let state = self.state.lock().await;
        let mut matches: Vec<Match> = state
            .matches
            .values()
            .filter(|m| m.event_id == event_id)
            .copied()
            .collect();
        matches.sort_by_key(|m| (m.round_number, m.id));
        Ok(matches)
    }

    async fn inscriptions_for_event(&self, event_id: EventId) -> BracketResult<Vec<Inscription>> {
        let state = self.state.lock().await;
        Ok(state
            .inscriptions
            .values()
            .filter(|i| i.event_id == event_id)
            .copied()
            .collect())
    }

    async fn participant_count(&self, event_id: EventId) -> BracketResult<i64> {
        let state = self.state.lock().await;
        Ok(count_participants(&state, event_id))
    }
}

/// Transaction over a staged copy of the store state.
struct MemBracketTx {
    guard: OwnedMutexGuard<MemState>,
    staged: MemState,
}

#[async_trait]
impl BracketTx for MemBracketTx {
    async fn event_for_update(&mut self, event_id: EventId) -> BracketResult<Option<Event>> {
        Ok(self.staged.events.get(&event_id).cloned())
    }

    async fn match_for_update(&mut self, match_id: MatchId) -> BracketResult<Option<Match>> {
        Ok(self.staged.matches.get(&match_id).copied())
    }

    async fn confirmed_entrants(&mut self, event_id: EventId) -> BracketResult<Vec<Inscription>> {
        // Admission order: inscription ids are assigned at registration time.
        Ok(self
            .staged
            .inscriptions
            .values()
            .filter(|i| {
                i.event_id == event_id
                    && i.role == InscriptionRole::Participant
                    && i.status == InscriptionStatus::Confirmed
            })
            .copied()
            .collect())
    }

    async fn participant_count(&mut self, event_id: EventId) -> BracketResult<i64> {
        Ok(count_participants(&self.staged, event_id))
    }

    async fn has_matches(&mut self, event_id: EventId) -> BracketResult<bool> {
        Ok(self.staged.matches.values().any(|m| m.event_id == event_id))
    }

    async fn open_slot_match(
        &mut self,
        event_id: EventId,
        round_number: i32,
    ) -> BracketResult<Option<Match>> {
        Ok(self
            .staged
            .matches
            .values()
            .find(|m| {
                m.event_id == event_id
                    && m.round_number == round_number
                    && m.winner_ref.is_none()
                    && m.has_open_slot()
            })
            .copied())
    }

    async fn insert_match(&mut self, new_match: NewMatch) -> BracketResult<Match> {
        self.staged.next_match_id += 1;
        let match_row = Match {
            id: self.staged.next_match_id,
            event_id: new_match.event_id,
            round_number: new_match.round_number,
            slot_a: new_match.slot_a,
            slot_b: new_match.slot_b,
            scheduled_time: new_match.scheduled_time,
            winner_ref: None,
            loser_ref: None,
        };
        self.staged.matches.insert(match_row.id, match_row);
        Ok(match_row)
    }

    async fn fill_open_slot(
        &mut self,
        match_id: MatchId,
        entrant: EntrantRef,
    ) -> BracketResult<Match> {
        let match_row = self
            .staged
            .matches
            .get_mut(&match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;

        if match_row.winner_ref.is_some()
            || (match_row.slot_a.is_some() && match_row.slot_b.is_some())
        {
            return Err(BracketError::SlotAlreadyFilled(match_id));
        }

        if match_row.slot_a.is_none() {
            match_row.slot_a = Some(entrant);
        } else {
            match_row.slot_b = Some(entrant);
        }
        Ok(*match_row)
    }

    async fn record_outcome(
        &mut self,
        match_id: MatchId,
        winner: EntrantRef,
        loser: EntrantRef,
    ) -> BracketResult<Match> {
        let match_row = self
            .staged
            .matches
            .get_mut(&match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;

        if match_row.winner_ref.is_some() {
            return Err(BracketError::MatchAlreadyDecided(match_id));
        }

        match_row.winner_ref = Some(winner);
        match_row.loser_ref = Some(loser);
        Ok(*match_row)
    }

    async fn set_inscription_status(
        &mut self,
        event_id: EventId,
        entrant: EntrantRef,
        status: InscriptionStatus,
    ) -> BracketResult<()> {
        let found = self.staged.inscriptions.values_mut().find(|i| {
            i.event_id == event_id
                && i.entrant_ref == entrant
                && i.role == InscriptionRole::Participant
                && i.status == InscriptionStatus::Confirmed
        });

        match found {
            Some(inscription) => {
                inscription.status = status;
                Ok(())
            }
            None => Err(BracketError::InscriptionNotFound { event_id, entrant }),
        }
    }

    async fn mark_event_ongoing(
        &mut self,
        event_id: EventId,
        round_count: i32,
        match_count: i32,
    ) -> BracketResult<()> {
        let event = self
            .staged
            .events
            .get_mut(&event_id)
            .ok_or(BracketError::EventNotFound(event_id))?;

        if event.status != EventStatus::Pending {
            return Err(BracketError::EventAlreadyStarted(event_id));
        }

        event.status = EventStatus::Ongoing;
        event.round_count = Some(round_count);
        event.match_count = Some(match_count);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> BracketResult<()> {
        let MemBracketTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
