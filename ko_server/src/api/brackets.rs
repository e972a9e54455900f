//! Bracket API handlers.
//!
//! This module provides HTTP REST endpoints for tournament bracket operations:
//! - Seeding and releasing the bracket for a pending event
//! - Declaring match winners and advancing them through the rounds
//! - Viewing the current bracket and active participant count
//!
//! Mutations require caller identity headers; viewing a bracket is public.
//!
//! # Examples
//!
//! Release the bracket for event 1:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/events/1/bracket \
//!   -H "x-actor-id: 42"
//! ```
//!
//! Declare entrant 7 winner of match 3:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/matches/3/winner \
//!   -H "x-actor-id: 42" \
//!   -H "Content-Type: application/json" \
//!   -d '{"winner_ref": 7}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use knockout::bracket::models::{EntrantRef, EventId, MatchId};
use knockout::{Match, Resolution, SeededBracket};
use serde::{Deserialize, Serialize};

use super::{AppState, ErrorResponse, auth::CallerIdentity, error_response};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct DeclareWinnerRequest {
    pub winner_ref: EntrantRef,
}

#[derive(Debug, Serialize)]
pub struct BracketViewResponse {
    pub event_id: EventId,
    pub active_participants: i64,
    pub matches: Vec<Match>,
}

/// Seed and release the bracket for a pending event.
///
/// Pairs the event's confirmed entrants in admission order, schedules the
/// first round at ten-minute offsets from the event start, and flips the
/// event to Ongoing. Entrants are notified that the bracket is out.
///
/// # Path Parameters
///
/// - `event_id`: Event ID (integer)
///
/// # Authentication
///
/// Requires `x-actor-id` header; the caller must be the event owner or an
/// administrator.
///
/// # Response
///
/// Returns `201 Created` with the released bracket:
/// ```json
/// {
///   "event_id": 1,
///   "round_count": 2,
///   "matches": [
///     {
///       "id": 1,
///       "event_id": 1,
///       "round_number": 1,
///       "slot_a": 101,
///       "slot_b": 102,
///       "scheduled_time": "2026-08-21T18:00:00Z",
///       "winner_ref": null,
///       "loser_ref": null
///     }
///   ]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Fewer than two entrants, or a field size that is not a power of two
/// - `401 Unauthorized`: Missing or invalid caller identity headers
/// - `403 Forbidden`: Caller is neither the event owner nor an administrator
/// - `404 Not Found`: Event doesn't exist
/// - `409 Conflict`: Event already started, or its start date is still in the future
pub async fn start_bracket(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    CallerIdentity(actor): CallerIdentity,
) -> Result<(StatusCode, Json<SeededBracket>), (StatusCode, Json<ErrorResponse>)> {
    match state.seeder.start_bracket(event_id, &actor).await {
        Ok(seeded) => {
            metrics::bracket_seeded(seeded.matches.len() * 2);
            Ok((StatusCode::CREATED, Json(seeded)))
        }
        Err(e) => Err(error_response(&e)),
    }
}

/// Declare the winner of a match.
///
/// Records the outcome and marks the loser eliminated, then either advances
/// the winner into the next round or settles the tournament when this was
/// the final. Both entrants of a newly completed pairing are notified.
///
/// # Path Parameters
///
/// - `match_id`: Match ID (integer)
///
/// # Authentication
///
/// Requires `x-actor-id` header; the caller must be the event owner or an
/// administrator.
///
/// # Request Body
///
/// ```json
/// {
///   "winner_ref": 7
/// }
/// ```
///
/// # Response
///
/// Returns `200 OK` with the resolution. Mid-bracket:
/// ```json
/// {
///   "status": "advanced",
///   "next_match": {
///     "id": 5,
///     "event_id": 1,
///     "round_number": 2,
///     "slot_a": 7,
///     "slot_b": null,
///     "scheduled_time": null,
///     "winner_ref": null,
///     "loser_ref": null
///   }
/// }
/// ```
///
/// Final round:
/// ```json
/// {
///   "status": "tournament_complete",
///   "champion": 7
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Winner is in neither slot, or the match is still missing an opponent
/// - `401 Unauthorized`: Missing or invalid caller identity headers
/// - `403 Forbidden`: Caller is neither the event owner nor an administrator
/// - `404 Not Found`: Match doesn't exist
/// - `409 Conflict`: Match already decided, or the event is not Ongoing
pub async fn declare_winner(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    CallerIdentity(actor): CallerIdentity,
    Json(body): Json<DeclareWinnerRequest>,
) -> Result<Json<Resolution>, (StatusCode, Json<ErrorResponse>)> {
    match state
        .resolver
        .declare_winner(match_id, body.winner_ref, &actor)
        .await
    {
        Ok(resolution) => {
            let terminal = matches!(resolution, Resolution::TournamentComplete { .. });
            metrics::match_resolved(terminal);
            if terminal {
                metrics::tournament_completed();
            }
            Ok(Json(resolution))
        }
        Err(e) => Err(error_response(&e)),
    }
}

/// View the bracket for an event.
///
/// Returns every match of the event in round order together with the count
/// of participants still tracked by the bracket. This endpoint does not
/// require authentication.
///
/// # Path Parameters
///
/// - `event_id`: Event ID (integer)
///
/// # Response
///
/// Returns `200 OK` with the bracket view:
/// ```json
/// {
///   "event_id": 1,
///   "active_participants": 4,
///   "matches": [
///     {
///       "id": 1,
///       "event_id": 1,
///       "round_number": 1,
///       "slot_a": 101,
///       "slot_b": 102,
///       "scheduled_time": "2026-08-21T18:00:00Z",
///       "winner_ref": 101,
///       "loser_ref": 102
///     }
///   ]
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Event doesn't exist
pub async fn get_bracket(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> Result<Json<BracketViewResponse>, (StatusCode, Json<ErrorResponse>)> {
    let matches = match state.standing.bracket_matches(event_id).await {
        Ok(matches) => matches,
        Err(e) => return Err(error_response(&e)),
    };

    match state.standing.active_participant_count(event_id).await {
        Ok(active_participants) => Ok(Json(BracketViewResponse {
            event_id,
            active_participants,
            matches,
        })),
        Err(e) => Err(error_response(&e)),
    }
}
