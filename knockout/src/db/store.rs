//! Storage gateway traits for bracket state.
//!
//! `BracketStore` covers plain reads plus transaction handles; `BracketTx`
//! is the scoped-acquisition primitive every mutating operation runs
//! inside. Two implementations ship with the crate: Postgres-backed
//! ([`crate::db::PgBracketStore`]) and in-memory
//! ([`crate::db::MemBracketStore`]) for tests and tooling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::bracket::errors::BracketResult;
use crate::bracket::models::{
    EntrantRef, Event, EventId, Inscription, InscriptionStatus, Match, MatchId,
};

/// Row to insert into the match table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewMatch {
    pub event_id: EventId,
    pub round_number: i32,
    pub slot_a: Option<EntrantRef>,
    pub slot_b: Option<EntrantRef>,
    pub scheduled_time: Option<DateTime<Utc>>,
}

/// Read-side storage operations plus transaction handles.
#[async_trait]
pub trait BracketStore: Send + Sync {
    /// Open a transaction scope for a bracket mutation.
    async fn begin(&self) -> BracketResult<Box<dyn BracketTx>>;

    /// Verify the backing store is reachable.
    async fn health_check(&self) -> BracketResult<()>;

    /// Fetch an event without locking it.
    async fn fetch_event(&self, event_id: EventId) -> BracketResult<Option<Event>>;

    /// Fetch a match without locking it.
    async fn fetch_match(&self, match_id: MatchId) -> BracketResult<Option<Match>>;

    /// All matches for an event, ordered by round then id.
    async fn matches_for_event(&self, event_id: EventId) -> BracketResult<Vec<Match>>;

    /// All inscriptions for an event, in admission order.
    async fn inscriptions_for_event(&self, event_id: EventId) -> BracketResult<Vec<Inscription>>;

    /// Count of Participant-role inscriptions that have not withdrawn.
    async fn participant_count(&self, event_id: EventId) -> BracketResult<i64>;
}

/// A single bracket mutation scope.
///
/// All reads inside the scope see a consistent snapshot and all writes land
/// atomically on [`BracketTx::commit`]. Dropping the handle without
/// committing rolls every staged write back.
#[async_trait]
pub trait BracketTx: Send {
    /// Fetch an event and hold it against concurrent bracket mutations.
    ///
    /// This is the serialization point: every mutation locks the event row
    /// first, so two transactions touching the same bracket never interleave.
    async fn event_for_update(&mut self, event_id: EventId) -> BracketResult<Option<Event>>;

    /// Fetch a match and hold it for the rest of the transaction.
    async fn match_for_update(&mut self, match_id: MatchId) -> BracketResult<Option<Match>>;

    /// Confirmed Participant-role inscriptions, in admission order.
    async fn confirmed_entrants(&mut self, event_id: EventId) -> BracketResult<Vec<Inscription>>;

    /// Count of Participant-role inscriptions that have not withdrawn.
    async fn participant_count(&mut self, event_id: EventId) -> BracketResult<i64>;

    /// Whether any match rows exist for the event.
    async fn has_matches(&mut self, event_id: EventId) -> BracketResult<bool>;

    /// Oldest undecided match in a round with exactly one empty slot, if any.
    async fn open_slot_match(
        &mut self,
        event_id: EventId,
        round_number: i32,
    ) -> BracketResult<Option<Match>>;

    /// Insert a match row and return it.
    async fn insert_match(&mut self, new_match: NewMatch) -> BracketResult<Match>;

    /// Place an entrant into the empty slot of an undecided match.
    async fn fill_open_slot(
        &mut self,
        match_id: MatchId,
        entrant: EntrantRef,
    ) -> BracketResult<Match>;

    /// Record winner and loser on an undecided match.
    async fn record_outcome(
        &mut self,
        match_id: MatchId,
        winner: EntrantRef,
        loser: EntrantRef,
    ) -> BracketResult<Match>;

    /// Move a confirmed Participant inscription to a new status.
    async fn set_inscription_status(
        &mut self,
        event_id: EventId,
        entrant: EntrantRef,
        status: InscriptionStatus,
    ) -> BracketResult<()>;

    /// Flip a pending event to Ongoing and record its bracket shape.
    async fn mark_event_ongoing(
        &mut self,
        event_id: EventId,
        round_count: i32,
        match_count: i32,
    ) -> BracketResult<()>;

    /// Make every staged write durable.
    async fn commit(self: Box<Self>) -> BracketResult<()>;
}
