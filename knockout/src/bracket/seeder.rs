//! Bracket seeding: turning a pending event's confirmed entrants into the
//! opening round of matches.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::db::store::{BracketStore, NewMatch};
use crate::db::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_timeout};
use crate::notify::{self, Notification, NotificationGateway};

use super::errors::{BracketError, BracketResult};
use super::models::{Actor, EntrantRef, Event, EventId, EventStatus, Match};
use super::schedule;
use super::standing::final_round_for;

/// A freshly seeded bracket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeededBracket {
    pub event_id: EventId,
    pub round_count: i32,
    pub matches: Vec<Match>,
}

/// Seeds opening rounds for events.
#[derive(Clone)]
pub struct BracketSeeder {
    store: Arc<dyn BracketStore>,
    notifier: Arc<dyn NotificationGateway>,
}

impl BracketSeeder {
    /// Create a new seeder
    ///
    /// # Arguments
    ///
    /// * `store` - Storage gateway
    /// * `notifier` - Post-commit notification gateway
    ///
    /// # Returns
    ///
    /// * `BracketSeeder` - New seeder instance
    pub fn new(store: Arc<dyn BracketStore>, notifier: Arc<dyn NotificationGateway>) -> Self {
        Self { store, notifier }
    }

    /// Seed the opening round for a pending event and flip it to Ongoing.
    ///
    /// Entrants are paired in admission order, first against second, third
    /// against fourth, and so on. Match start times step forward from the
    /// event's start date in fixed increments. The round count, match count
    /// and status change land in the same transaction as the match rows, so
    /// a bracket is either fully released or not released at all. Entrant
    /// notifications go out only after the commit succeeds.
    ///
    /// # Arguments
    ///
    /// * `event_id` - Event to seed
    /// * `actor` - Caller requesting the seed
    ///
    /// # Returns
    ///
    /// * `BracketResult<SeededBracket>` - The released bracket or error
    ///
    /// # Errors
    ///
    /// * `BracketError::EventNotFound` - No such event
    /// * `BracketError::NotOwner` - Actor is neither event owner nor admin
    /// * `BracketError::EventAlreadyStarted` - Event is past Pending or already has matches
    /// * `BracketError::NotStartableYet` - Event start date is in the future
    /// * `BracketError::InsufficientEntrants` - Fewer than two confirmed entrants
    /// * `BracketError::InvalidEntrantCount` - Field size is not a power of two
    pub async fn start_bracket(
        &self,
        event_id: EventId,
        actor: &Actor,
    ) -> BracketResult<SeededBracket> {
        let (seeded, notifications) = with_timeout(
            DEFAULT_TRANSACTION_TIMEOUT,
            self.seed_transaction(event_id, actor),
        )
        .await?;

        log::info!(
            "Bracket released for event {} with {} first-round matches",
            seeded.event_id,
            seeded.matches.len()
        );
        notify::dispatch(Arc::clone(&self.notifier), notifications);

        Ok(seeded)
    }

    async fn seed_transaction(
        &self,
        event_id: EventId,
        actor: &Actor,
    ) -> BracketResult<(SeededBracket, Vec<Notification>)> {
        // Start transaction
        let mut tx = self.store.begin().await?;

        let event = tx
            .event_for_update(event_id)
            .await?
            .ok_or(BracketError::EventNotFound(event_id))?;

        if !actor.may_manage(&event) {
            return Err(BracketError::NotOwner(actor.user_id));
        }
        if event.status != EventStatus::Pending {
            return Err(BracketError::EventAlreadyStarted(event_id));
        }
        if event.start_date > Utc::now() {
            return Err(BracketError::NotStartableYet {
                event_id,
                starts_at: event.start_date,
            });
        }
        if tx.has_matches(event_id).await? {
            return Err(BracketError::EventAlreadyStarted(event_id));
        }

        let entrants: Vec<EntrantRef> = tx
            .confirmed_entrants(event_id)
            .await?
            .iter()
            .map(|i| i.entrant_ref)
            .collect();

        let n = entrants.len();
        if n < 2 {
            return Err(BracketError::InsufficientEntrants { have: n });
        }
        if !n.is_power_of_two() {
            return Err(BracketError::InvalidEntrantCount { have: n });
        }
        let round_count =
            final_round_for(n as i64).ok_or(BracketError::InsufficientEntrants { have: n })?;

        let mut matches = Vec::with_capacity(n / 2);
        for (index, pair) in entrants.chunks_exact(2).enumerate() {
            let inserted = tx
                .insert_match(NewMatch {
                    event_id,
                    round_number: 1,
                    slot_a: Some(pair[0]),
                    slot_b: Some(pair[1]),
                    scheduled_time: Some(schedule::allocate(event.start_date, index)),
                })
                .await?;
            matches.push(inserted);
        }

        tx.mark_event_ongoing(event_id, round_count, (n / 2) as i32)
            .await?;

        // Commit transaction
        tx.commit().await?;

        let notifications = bracket_released(&event, &entrants);
        Ok((
            SeededBracket {
                event_id,
                round_count,
                matches,
            },
            notifications,
        ))
    }
}

fn bracket_released(event: &Event, entrants: &[EntrantRef]) -> Vec<Notification> {
    entrants
        .iter()
        .map(|&entrant| Notification {
            entrant,
            title: "Bracket released".to_string(),
            message: format!("The bracket for {} is out. Check your first match.", event.name),
            link: format!("/events/{}", event.id),
        })
        .collect()
}
