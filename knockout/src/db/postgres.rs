//! PostgreSQL implementation of the bracket storage gateway.
//!
//! Expects the following schema:
//!
//! ```sql
//! CREATE TABLE events (
//!     id            BIGSERIAL PRIMARY KEY,
//!     name          TEXT NOT NULL,
//!     created_by    BIGINT NOT NULL,
//!     start_date    TIMESTAMP NOT NULL,
//!     status        TEXT NOT NULL DEFAULT 'pending',
//!     entrant_mode  TEXT NOT NULL DEFAULT 'individual',
//!     round_count   INTEGER,
//!     match_count   INTEGER
//! );
//!
//! CREATE TABLE event_inscriptions (
//!     id          BIGSERIAL PRIMARY KEY,
//!     event_id    BIGINT NOT NULL REFERENCES events(id),
//!     entrant_ref BIGINT NOT NULL,
//!     role        TEXT NOT NULL DEFAULT 'participant',
//!     status      TEXT NOT NULL DEFAULT 'confirmed',
//!     UNIQUE (event_id, entrant_ref)
//! );
//!
//! CREATE TABLE matches (
//!     id             BIGSERIAL PRIMARY KEY,
//!     event_id       BIGINT NOT NULL REFERENCES events(id),
//!     round_number   INTEGER NOT NULL,
//!     slot_a         BIGINT,
//!     slot_b         BIGINT,
//!     scheduled_time TIMESTAMP,
//!     winner_ref     BIGINT,
//!     loser_ref      BIGINT
//! );
//!
//! CREATE INDEX idx_matches_event_round ON matches (event_id, round_number);
//! CREATE INDEX idx_inscriptions_event ON event_inscriptions (event_id);
//! ```
//!
//! Lock order inside a transaction is the event row first, then match rows.
//! Every mutation path follows it, so two transactions on the same bracket
//! serialize on the event row instead of deadlocking on match rows.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::bracket::errors::{BracketError, BracketResult};
use crate::bracket::models::{
    EntrantMode, EntrantRef, Event, EventId, EventStatus, Inscription, InscriptionRole,
    InscriptionStatus, Match, MatchId,
};

use super::store::{BracketStore, BracketTx, NewMatch};

fn event_from_row(row: &PgRow) -> Event {
    let status = match row.get::<String, _>("status").as_str() {
        "pending" => EventStatus::Pending,
        "ongoing" => EventStatus::Ongoing,
        // fail closed
        _ => EventStatus::Closed,
    };
    let entrant_mode = match row.get::<String, _>("entrant_mode").as_str() {
        "team" => EntrantMode::Team,
        _ => EntrantMode::Individual,
    };

    Event {
        id: row.get("id"),
        name: row.get("name"),
        created_by: row.get("created_by"),
        start_date: row.get::<chrono::NaiveDateTime, _>("start_date").and_utc(),
        status,
        entrant_mode,
        round_count: row.get("round_count"),
        match_count: row.get("match_count"),
    }
}

fn inscription_from_row(row: &PgRow) -> Inscription {
    let role = match row.get::<String, _>("role").as_str() {
        "owner" => InscriptionRole::Owner,
        _ => InscriptionRole::Participant,
    };
    let status = match row.get::<String, _>("status").as_str() {
        "confirmed" => InscriptionStatus::Confirmed,
        "won" => InscriptionStatus::Won,
        "lost" => InscriptionStatus::Lost,
        // fail closed
        _ => InscriptionStatus::Removed,
    };

    Inscription {
        id: row.get("id"),
        event_id: row.get("event_id"),
        entrant_ref: row.get("entrant_ref"),
        role,
        status,
    }
}

fn match_from_row(row: &PgRow) -> Match {
    Match {
        id: row.get("id"),
        event_id: row.get("event_id"),
        round_number: row.get("round_number"),
        slot_a: row.get("slot_a"),
        slot_b: row.get("slot_b"),
        scheduled_time: row
            .get::<Option<chrono::NaiveDateTime>, _>("scheduled_time")
            .map(|t| t.and_utc()),
        winner_ref: row.get("winner_ref"),
        loser_ref: row.get("loser_ref"),
    }
}

fn status_str(status: InscriptionStatus) -> &'static str {
    match status {
        InscriptionStatus::Confirmed => "confirmed",
        InscriptionStatus::Won => "won",
        InscriptionStatus::Lost => "lost",
        InscriptionStatus::Removed => "removed",
    }
}

/// PostgreSQL-backed bracket store
#[derive(Clone)]
pub struct PgBracketStore {
    pool: Arc<PgPool>,
}

impl PgBracketStore {
    /// Create a new store over an existing connection pool
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    ///
    /// # Returns
    ///
    /// * `PgBracketStore` - New store instance
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BracketStore for PgBracketStore {
    async fn begin(&self) -> BracketResult<Box<dyn BracketTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgBracketTx { tx }))
    }

    async fn health_check(&self) -> BracketResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    async fn fetch_event(&self, event_id: EventId) -> BracketResult<Option<Event>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, created_by, start_date, status, entrant_mode, round_count, match_count
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(event_from_row))
    }

    async fn fetch_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let row = sqlx::query(
            r#"
            SELECT id, event_id, round_number, slot_a, slot_b, scheduled_time, winner_ref, loser_ref
            FROM matches
            WHERE id = $1
            "#,
        )
        .bind(match_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(match_from_row))
    }

    async fn matches_for_event(&self, event_id: EventId) -> BracketResult<Vec<Match>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, round_number, slot_a, slot_b, scheduled_time, winner_ref, loser_ref
            FROM matches
            WHERE event_id = $1
            ORDER BY round_number, id
            "#,
        )
        .bind(event_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(match_from_row).collect())
    }

    async fn inscriptions_for_event(&self, event_id: EventId) -> BracketResult<Vec<Inscription>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, entrant_ref, role, status
            FROM event_inscriptions
            WHERE event_id = $1
            ORDER BY id
            "#,
        )
        .bind(event_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(inscription_from_row).collect())
    }

    async fn participant_count(&self, event_id: EventId) -> BracketResult<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS participants
            FROM event_inscriptions
            WHERE event_id = $1 AND role = 'participant' AND status <> 'removed'
            "#,
        )
        .bind(event_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.get("participants"))
    }
}

/// A live Postgres transaction holding row locks until commit or drop.
struct PgBracketTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BracketTx for PgBracketTx {
    async fn event_for_update(&mut self, event_id: EventId) -> BracketResult<Option<Event>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, created_by, start_date, status, entrant_mode, round_count, match_count
            FROM events
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(event_from_row))
    }

    async fn match_for_update(&mut self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let row = sqlx::query(
            r#"
            SELECT id, event_id, round_number, slot_a, slot_b, scheduled_time, winner_ref, loser_ref
            FROM matches
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(match_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(match_from_row))
    }

    async fn confirmed_entrants(&mut self, event_id: EventId) -> BracketResult<Vec<Inscription>> {
        // Admission order: inscription ids are assigned at registration time.
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, entrant_ref, role, status
            FROM event_inscriptions
            WHERE event_id = $1 AND role = 'participant' AND status = 'confirmed'
            ORDER BY id
            "#,
        )
        .bind(event_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.iter().map(inscription_from_row).collect())
    }

    async fn participant_count(&mut self, event_id: EventId) -> BracketResult<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS participants
            FROM event_inscriptions
            WHERE event_id = $1 AND role = 'participant' AND status <> 'removed'
            "#,
        )
        .bind(event_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.get("participants"))
    }

    async fn has_matches(&mut self, event_id: EventId) -> BracketResult<bool> {
        let row = sqlx::query("SELECT id FROM matches WHERE event_id = $1 LIMIT 1")
            .bind(event_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.is_some())
    }

    async fn open_slot_match(
        &mut self,
        event_id: EventId,
        round_number: i32,
    ) -> BracketResult<Option<Match>> {
        let row = sqlx::query(
            r#"
            SELECT id, event_id, round_number, slot_a, slot_b, scheduled_time, winner_ref, loser_ref
            FROM matches
            WHERE event_id = $1
              AND round_number = $2
              AND winner_ref IS NULL
              AND ((slot_a IS NULL) <> (slot_b IS NULL))
            ORDER BY id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(event_id)
        .bind(round_number)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(match_from_row))
    }

    async fn insert_match(&mut self, new_match: NewMatch) -> BracketResult<Match> {
        let row = sqlx::query(
            r#"
            INSERT INTO matches (event_id, round_number, slot_a, slot_b, scheduled_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, event_id, round_number, slot_a, slot_b, scheduled_time, winner_ref, loser_ref
            "#,
        )
        .bind(new_match.event_id)
        .bind(new_match.round_number)
        .bind(new_match.slot_a)
        .bind(new_match.slot_b)
        .bind(new_match.scheduled_time.map(|t| t.naive_utc()))
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(match_from_row(&row))
    }

    async fn fill_open_slot(
        &mut self,
        match_id: MatchId,
        entrant: EntrantRef,
    ) -> BracketResult<Match> {
        // Atomically place the entrant in the first empty slot. The guard
        // clauses make a lost race surface as zero updated rows rather than
        // an overwrite.
        let row = sqlx::query(
            r#"
            UPDATE matches
            SET slot_a = COALESCE(slot_a, $2),
                slot_b = CASE WHEN slot_a IS NOT NULL AND slot_b IS NULL THEN $2 ELSE slot_b END
            WHERE id = $1
              AND winner_ref IS NULL
              AND (slot_a IS NULL OR slot_b IS NULL)
            RETURNING id, event_id, round_number, slot_a, slot_b, scheduled_time, winner_ref, loser_ref
            "#,
        )
        .bind(match_id)
        .bind(entrant)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(BracketError::SlotAlreadyFilled(match_id))?;

        Ok(match_from_row(&row))
    }

    async fn record_outcome(
        &mut self,
        match_id: MatchId,
        winner: EntrantRef,
        loser: EntrantRef,
    ) -> BracketResult<Match> {
        let row = sqlx::query(
            r#"
            UPDATE matches
            SET winner_ref = $2, loser_ref = $3
            WHERE id = $1 AND winner_ref IS NULL
            RETURNING id, event_id, round_number, slot_a, slot_b, scheduled_time, winner_ref, loser_ref
            "#,
        )
        .bind(match_id)
        .bind(winner)
        .bind(loser)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(BracketError::MatchAlreadyDecided(match_id))?;

        Ok(match_from_row(&row))
    }

    async fn set_inscription_status(
        &mut self,
        event_id: EventId,
        entrant: EntrantRef,
        status: InscriptionStatus,
    ) -> BracketResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE event_inscriptions
            SET status = $3
            WHERE event_id = $1
              AND entrant_ref = $2
              AND role = 'participant'
              AND status = 'confirmed'
            "#,
        )
        .bind(event_id)
        .bind(entrant)
        .bind(status_str(status))
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BracketError::InscriptionNotFound { event_id, entrant });
        }

        Ok(())
    }

    async fn mark_event_ongoing(
        &mut self,
        event_id: EventId,
        round_count: i32,
        match_count: i32,
    ) -> BracketResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET status = 'ongoing', round_count = $2, match_count = $3
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(event_id)
        .bind(round_count)
        .bind(match_count)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BracketError::EventAlreadyStarted(event_id));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> BracketResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
