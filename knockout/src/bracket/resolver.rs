//! Match resolution: recording winners and advancing them through the
//! bracket round by round.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::store::{BracketStore, NewMatch};
use crate::db::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_timeout};
use crate::notify::{self, Notification, NotificationGateway};

use super::errors::{BracketError, BracketResult};
use super::models::{Actor, EntrantRef, Event, EventStatus, InscriptionStatus, Match, MatchId};
use super::standing::final_round_for;

/// Outcome of a winner declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// The winner moved into a next-round match.
    Advanced { next_match: Match },
    /// The final match was decided and the bracket is settled.
    TournamentComplete { champion: EntrantRef },
}

/// Resolves matches and advances winners.
#[derive(Clone)]
pub struct MatchResolver {
    store: Arc<dyn BracketStore>,
    notifier: Arc<dyn NotificationGateway>,
}

impl MatchResolver {
    /// Create a new resolver
    ///
    /// # Arguments
    ///
    /// * `store` - Storage gateway
    /// * `notifier` - Post-commit notification gateway
    ///
    /// # Returns
    ///
    /// * `MatchResolver` - New resolver instance
    pub fn new(store: Arc<dyn BracketStore>, notifier: Arc<dyn NotificationGateway>) -> Self {
        Self { store, notifier }
    }

    /// Record the winner of a match and advance them.
    ///
    /// A non-final win marks the loser's inscription Lost and places the
    /// winner into the next round: into the oldest half-filled match of that
    /// round if one exists, otherwise into a new match holding only the
    /// winner. Advancement matches carry no scheduled time. A final-round
    /// win settles the bracket and marks the winner Won, the loser Lost.
    /// The winner's own inscription does not change mid-bracket.
    ///
    /// All state changes for one declaration land in a single transaction;
    /// notifications go out only after it commits.
    ///
    /// # Arguments
    ///
    /// * `match_id` - Match being decided
    /// * `winner_ref` - Entrant occupying one of the match slots
    /// * `actor` - Caller declaring the winner
    ///
    /// # Returns
    ///
    /// * `BracketResult<Resolution>` - Advancement or completion, or error
    ///
    /// # Errors
    ///
    /// * `BracketError::MatchNotFound` - No such match
    /// * `BracketError::EventNotFound` - Match references a missing event
    /// * `BracketError::NotOwner` - Actor is neither event owner nor admin
    /// * `BracketError::EventNotStarted` - Event is not Ongoing
    /// * `BracketError::MatchAlreadyDecided` - Match already has a winner
    /// * `BracketError::SingleEntrantMatch` - Match is still missing an opponent
    /// * `BracketError::InvalidWinner` - Winner is in neither slot
    pub async fn declare_winner(
        &self,
        match_id: MatchId,
        winner_ref: EntrantRef,
        actor: &Actor,
    ) -> BracketResult<Resolution> {
        let (resolution, notifications) = with_timeout(
            DEFAULT_TRANSACTION_TIMEOUT,
            self.resolve_transaction(match_id, winner_ref, actor),
        )
        .await?;

        match &resolution {
            Resolution::Advanced { next_match } => {
                log::info!(
                    "Match {match_id} decided, winner {winner_ref} advances to match {}",
                    next_match.id
                );
            }
            Resolution::TournamentComplete { champion } => {
                log::info!("Match {match_id} decided, entrant {champion} wins the tournament");
            }
        }
        notify::dispatch(Arc::clone(&self.notifier), notifications);

        Ok(resolution)
    }

    async fn resolve_transaction(
        &self,
        match_id: MatchId,
        winner_ref: EntrantRef,
        actor: &Actor,
    ) -> BracketResult<(Resolution, Vec<Notification>)> {
        // Find which event the match belongs to before taking any locks.
        // The row is re-read under lock inside the transaction.
        let event_id = self
            .store
            .fetch_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?
            .event_id;

        // Start transaction
        let mut tx = self.store.begin().await?;

        // Event row first: bracket mutations for one event serialize here.
        let event = tx
            .event_for_update(event_id)
            .await?
            .ok_or(BracketError::EventNotFound(event_id))?;

        if !actor.may_manage(&event) {
            return Err(BracketError::NotOwner(actor.user_id));
        }
        if event.status != EventStatus::Ongoing {
            return Err(BracketError::EventNotStarted(event_id));
        }

        let subject = tx
            .match_for_update(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;

        if subject.is_decided() {
            return Err(BracketError::MatchAlreadyDecided(match_id));
        }
        if !subject.has_both_slots() {
            return Err(BracketError::SingleEntrantMatch(match_id));
        }
        let loser_ref = subject
            .opponent_of(winner_ref)
            .ok_or(BracketError::InvalidWinner {
                match_id,
                winner: winner_ref,
            })?;

        let active = tx.participant_count(event_id).await?;
        let final_round = final_round_for(active).ok_or(BracketError::InsufficientEntrants {
            have: active as usize,
        })?;

        let decided = tx.record_outcome(match_id, winner_ref, loser_ref).await?;

        if decided.round_number >= final_round {
            tx.set_inscription_status(event_id, winner_ref, InscriptionStatus::Won)
                .await?;
            tx.set_inscription_status(event_id, loser_ref, InscriptionStatus::Lost)
                .await?;

            // Commit transaction
            tx.commit().await?;

            let notifications = completion_notifications(&event, winner_ref, loser_ref);
            return Ok((
                Resolution::TournamentComplete {
                    champion: winner_ref,
                },
                notifications,
            ));
        }

        // Mid-bracket the loser is out while the winner stays Confirmed.
        tx.set_inscription_status(event_id, loser_ref, InscriptionStatus::Lost)
            .await?;

        let next_round = decided.round_number + 1;
        let (next_match, notifications) = match tx.open_slot_match(event_id, next_round).await? {
            Some(open) => {
                let filled = tx.fill_open_slot(open.id, winner_ref).await?;
                (filled, match_ready_notifications(&event, &filled))
            }
            None => {
                let created = tx
                    .insert_match(NewMatch {
                        event_id,
                        round_number: next_round,
                        slot_a: Some(winner_ref),
                        slot_b: None,
                        scheduled_time: None,
                    })
                    .await?;
                (created, Vec::new())
            }
        };

        // Commit transaction
        tx.commit().await?;

        Ok((Resolution::Advanced { next_match }, notifications))
    }
}

fn match_ready_notifications(event: &Event, next_match: &Match) -> Vec<Notification> {
    let link = format!("/events/{}/matches/{}", event.id, next_match.id);
    [next_match.slot_a, next_match.slot_b]
        .into_iter()
        .flatten()
        .map(|entrant| Notification {
            entrant,
            title: "Match ready".to_string(),
            message: format!(
                "Your round {} opponent in {} is set.",
                next_match.round_number, event.name
            ),
            link: link.clone(),
        })
        .collect()
}

fn completion_notifications(
    event: &Event,
    champion: EntrantRef,
    runner_up: EntrantRef,
) -> Vec<Notification> {
    let link = format!("/events/{}", event.id);
    vec![
        Notification {
            entrant: champion,
            title: "Tournament complete".to_string(),
            message: format!("You won {}.", event.name),
            link: link.clone(),
        },
        Notification {
            entrant: runner_up,
            title: "Tournament complete".to_string(),
            message: format!("{} is over. You finished second.", event.name),
            link,
        },
    ]
}
