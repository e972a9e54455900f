//! Bracket data models for single-elimination events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event ID type
pub type EventId = i64;

/// Match ID type
pub type MatchId = i64;

/// Inscription ID type
pub type InscriptionId = i64;

/// User ID type
pub type UserId = i64;

/// Reference to whoever occupies a bracket slot: a user id in individual
/// events, a team id in team events. Opaque to the bracket engine.
pub type EntrantRef = i64;

/// Event lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    /// Accepting inscriptions; bracket not yet seeded
    Pending,
    /// Bracket seeded; matches being resolved
    Ongoing,
    /// Archived; no bracket operation writes this state
    Closed,
}

/// What kind of entrant occupies the slots of an event's matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrantMode {
    /// Slots hold user ids
    Individual,
    /// Slots hold team ids
    Team,
}

/// Inscription role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InscriptionRole {
    /// The organizer's own inscription; never seeded into the bracket
    Owner,
    /// Competes in the bracket
    Participant,
}

/// Inscription lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InscriptionStatus {
    /// Admitted and eligible for seeding
    Confirmed,
    /// Tournament champion (terminal)
    Won,
    /// Eliminated (terminal)
    Lost,
    /// Withdrew before the bracket started (terminal)
    Removed,
}

/// A tournament event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    /// Organizing user; may manage the bracket alongside admins
    pub created_by: UserId,
    pub start_date: DateTime<Utc>,
    pub status: EventStatus,
    pub entrant_mode: EntrantMode,
    /// Total rounds, written at seeding (log2 of the entrant count)
    pub round_count: Option<i32>,
    /// Round-1 match count, written at seeding (half the entrant count)
    pub match_count: Option<i32>,
}

/// One entrant's registration in one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inscription {
    pub id: InscriptionId,
    pub event_id: EventId,
    pub entrant_ref: EntrantRef,
    pub role: InscriptionRole,
    pub status: InscriptionStatus,
}

/// A bracket match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub event_id: EventId,
    /// 1-indexed round position; round 1 is the first round
    pub round_number: i32,
    pub slot_a: Option<EntrantRef>,
    pub slot_b: Option<EntrantRef>,
    /// Assigned at seeding for round 1; advancement matches carry none
    pub scheduled_time: Option<DateTime<Utc>>,
    pub winner_ref: Option<EntrantRef>,
    pub loser_ref: Option<EntrantRef>,
}

impl Match {
    /// Whether a winner has been recorded
    pub fn is_decided(&self) -> bool {
        self.winner_ref.is_some()
    }

    /// Both slots occupied
    pub fn has_both_slots(&self) -> bool {
        self.slot_a.is_some() && self.slot_b.is_some()
    }

    /// Exactly one slot still empty
    pub fn has_open_slot(&self) -> bool {
        self.slot_a.is_none() != self.slot_b.is_none()
    }

    /// Whether the entrant occupies one of the slots
    pub fn contains(&self, entrant: EntrantRef) -> bool {
        self.slot_a == Some(entrant) || self.slot_b == Some(entrant)
    }

    /// The opposing slot's occupant, if the entrant is in the match
    pub fn opponent_of(&self, entrant: EntrantRef) -> Option<EntrantRef> {
        if self.slot_a == Some(entrant) {
            self.slot_b
        } else if self.slot_b == Some(entrant) {
            self.slot_a
        } else {
            None
        }
    }
}

/// The already-authenticated caller of a bracket operation.
///
/// Session verification happens upstream; the engine only consults this
/// value for the owner-or-admin predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Actor {
    /// A regular (non-admin) caller
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// An admin caller
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Owner-or-admin predicate gating every bracket mutation
    pub fn may_manage(&self, event: &Event) -> bool {
        self.is_admin || event.created_by == self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(created_by: UserId) -> Event {
        Event {
            id: 1,
            name: "Test Event".to_string(),
            created_by,
            start_date: Utc::now(),
            status: EventStatus::Pending,
            entrant_mode: EntrantMode::Individual,
            round_count: None,
            match_count: None,
        }
    }

    fn sample_match() -> Match {
        Match {
            id: 10,
            event_id: 1,
            round_number: 1,
            slot_a: Some(101),
            slot_b: Some(102),
            scheduled_time: None,
            winner_ref: None,
            loser_ref: None,
        }
    }

    #[test]
    fn test_may_manage_owner() {
        let event = sample_event(7);
        assert!(Actor::user(7).may_manage(&event));
    }

    #[test]
    fn test_may_manage_admin_overrides_ownership() {
        let event = sample_event(7);
        assert!(Actor::admin(99).may_manage(&event));
    }

    #[test]
    fn test_may_manage_rejects_other_users() {
        let event = sample_event(7);
        assert!(!Actor::user(8).may_manage(&event));
    }

    #[test]
    fn test_match_slot_helpers() {
        let m = sample_match();
        assert!(m.has_both_slots());
        assert!(!m.has_open_slot());
        assert!(!m.is_decided());
        assert!(m.contains(101));
        assert!(m.contains(102));
        assert!(!m.contains(103));
        assert_eq!(m.opponent_of(101), Some(102));
        assert_eq!(m.opponent_of(102), Some(101));
        assert_eq!(m.opponent_of(103), None);
    }

    #[test]
    fn test_open_slot_means_exactly_one_empty() {
        let mut m = sample_match();
        m.slot_b = None;
        assert!(m.has_open_slot());
        assert!(!m.has_both_slots());

        m.slot_a = None;
        assert!(!m.has_open_slot());
    }

    #[test]
    fn test_decided_match_reports_winner() {
        let mut m = sample_match();
        m.winner_ref = Some(101);
        m.loser_ref = Some(102);
        assert!(m.is_decided());
    }
}
