//! Integration tests for the bracket HTTP API.
//!
//! Drives the full router over the in-memory store: seeding, match
//! resolution, standings, identity handling, and notification delivery.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use ko_server::api::{AppState, create_router};
use ko_server::hub::NotificationHub;
use knockout::bracket::models::{
    EntrantMode, EntrantRef, Event, InscriptionRole, InscriptionStatus, UserId,
};
use knockout::db::MemBracketStore;
use knockout::notify::NotificationGateway;
use knockout::{BracketSeeder, MatchResolver, StandingQuery};
use serde_json::{Value, json};
use tokio::time::timeout;
use tower::ServiceExt; // For `oneshot` method

const OWNER: UserId = 1;

/// Build a router over a fresh in-memory store holding one pending event
/// owned by `OWNER` with `entrants` confirmed participants.
async fn create_test_server(entrants: i64) -> (Router, Event, Vec<EntrantRef>, Arc<NotificationHub>) {
    let store = Arc::new(MemBracketStore::new());

    let event = store
        .insert_event(
            "Summer Cup",
            OWNER,
            Utc::now() - chrono::Duration::hours(1),
            EntrantMode::Individual,
        )
        .await;
    store
        .insert_inscription(
            event.id,
            OWNER,
            InscriptionRole::Owner,
            InscriptionStatus::Confirmed,
        )
        .await;

    let refs: Vec<EntrantRef> = (0..entrants).map(|i| 101 + i).collect();
    for &entrant in &refs {
        store
            .insert_inscription(
                event.id,
                entrant,
                InscriptionRole::Participant,
                InscriptionStatus::Confirmed,
            )
            .await;
    }

    let hub = Arc::new(NotificationHub::new());
    let gateway: Arc<dyn NotificationGateway> = hub.clone();

    let state = AppState {
        seeder: BracketSeeder::new(store.clone(), Arc::clone(&gateway)),
        resolver: MatchResolver::new(store.clone(), gateway),
        standing: StandingQuery::new(store.clone()),
        store,
        hub: hub.clone(),
    };

    (create_router(state), event, refs, hub)
}

/// Build a POST request with optional caller identity headers and JSON body.
fn post_request(uri: &str, actor_id: Option<i64>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(id) = actor_id {
        builder = builder.header("x-actor-id", id.to_string());
    }
    match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Seed the event's bracket as `OWNER` and return the response body.
async fn seed_bracket(app: &Router, event_id: i64) -> Value {
    let response = app
        .clone()
        .oneshot(post_request(
            &format!("/api/v1/events/{event_id}/bracket"),
            Some(OWNER),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

/// Declare `winner` on `match_id` as `OWNER` and return (status, body).
async fn declare_winner(app: &Router, match_id: i64, winner: i64) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(post_request(
            &format!("/api/v1/matches/{match_id}/winner"),
            Some(OWNER),
            Some(&json!({ "winner_ref": winner })),
        ))
        .await
        .unwrap();
    let status = response.status();
    (status, read_json(response).await)
}

#[tokio::test]
async fn test_health_check_reports_healthy() {
    let (app, _, _, _) = create_test_server(0).await;

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_start_bracket_requires_identity() {
    let (app, event, _, _) = create_test_server(4).await;

    let response = app
        .oneshot(post_request(
            &format!("/api/v1/events/{}/bracket", event.id),
            None,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["kind"], "authorization");
}

#[tokio::test]
async fn test_start_bracket_rejects_stranger() {
    let (app, event, _, _) = create_test_server(4).await;

    let response = app
        .oneshot(post_request(
            &format!("/api/v1/events/{}/bracket", event.id),
            Some(99),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await;
    assert_eq!(body["kind"], "authorization");
}

#[tokio::test]
async fn test_start_bracket_allows_admin() {
    let (app, event, _, _) = create_test_server(4).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/events/{}/bracket", event.id))
                .header("x-actor-id", "99")
                .header("x-actor-admin", "true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_start_bracket_releases_bracket() {
    let (app, event, entrants, _) = create_test_server(4).await;

    let seeded = seed_bracket(&app, event.id).await;

    assert_eq!(seeded["event_id"], event.id);
    assert_eq!(seeded["round_count"], 2);

    let matches = seeded["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0]["round_number"], 1);
    assert_eq!(matches[0]["slot_a"], entrants[0]);
    assert_eq!(matches[0]["slot_b"], entrants[1]);
    assert_eq!(matches[1]["slot_a"], entrants[2]);
    assert_eq!(matches[1]["slot_b"], entrants[3]);
    assert!(matches[0]["scheduled_time"].is_string());
}

#[tokio::test]
async fn test_start_bracket_twice_conflicts() {
    let (app, event, _, _) = create_test_server(4).await;
    seed_bracket(&app, event.id).await;

    let response = app
        .oneshot(post_request(
            &format!("/api/v1/events/{}/bracket", event.id),
            Some(OWNER),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn test_start_bracket_unknown_event() {
    let (app, _, _, _) = create_test_server(0).await;

    let response = app
        .oneshot(post_request("/api/v1/events/404/bracket", Some(OWNER), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_start_bracket_rejects_odd_field() {
    let (app, event, _, _) = create_test_server(3).await;

    let response = app
        .oneshot(post_request(
            &format!("/api/v1/events/{}/bracket", event.id),
            Some(OWNER),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_get_bracket_is_public() {
    let (app, event, _, _) = create_test_server(4).await;
    seed_bracket(&app, event.id).await;

    let response = app
        .oneshot(get_request(&format!("/api/v1/events/{}/bracket", event.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["event_id"], event.id);
    assert_eq!(body["active_participants"], 4);
    assert_eq!(body["matches"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_bracket_unknown_event() {
    let (app, _, _, _) = create_test_server(0).await;

    let response = app
        .oneshot(get_request("/api/v1/events/404/bracket"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_declare_winner_advances_then_settles() {
    let (app, event, entrants, _) = create_test_server(4).await;
    let seeded = seed_bracket(&app, event.id).await;
    let matches = seeded["matches"].as_array().unwrap();
    let first_id = matches[0]["id"].as_i64().unwrap();
    let second_id = matches[1]["id"].as_i64().unwrap();

    // First resolution opens a half-filled round 2 match.
    let (status, body) = declare_winner(&app, first_id, entrants[0]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "advanced");
    assert_eq!(body["next_match"]["round_number"], 2);
    assert_eq!(body["next_match"]["slot_a"], entrants[0]);
    assert!(body["next_match"]["slot_b"].is_null());
    assert!(body["next_match"]["scheduled_time"].is_null());

    // Second resolution fills the waiting slot.
    let (status, body) = declare_winner(&app, second_id, entrants[2]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "advanced");
    assert_eq!(body["next_match"]["slot_a"], entrants[0]);
    assert_eq!(body["next_match"]["slot_b"], entrants[2]);
    let final_id = body["next_match"]["id"].as_i64().unwrap();

    // Final resolution settles the tournament.
    let (status, body) = declare_winner(&app, final_id, entrants[2]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "tournament_complete");
    assert_eq!(body["champion"], entrants[2]);
}

#[tokio::test]
async fn test_declare_winner_rejects_outsider() {
    let (app, event, _, _) = create_test_server(2).await;
    let seeded = seed_bracket(&app, event.id).await;
    let match_id = seeded["matches"][0]["id"].as_i64().unwrap();

    let (status, body) = declare_winner(&app, match_id, 999).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_declare_winner_twice_conflicts() {
    let (app, event, entrants, _) = create_test_server(2).await;
    let seeded = seed_bracket(&app, event.id).await;
    let match_id = seeded["matches"][0]["id"].as_i64().unwrap();

    declare_winner(&app, match_id, entrants[0]).await;

    let (status, body) = declare_winner(&app, match_id, entrants[1]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn test_declare_winner_unknown_match() {
    let (app, _, _, _) = create_test_server(0).await;

    let (status, body) = declare_winner(&app, 404, 101).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_websocket_route_requires_upgrade_headers() {
    let (app, _, _, _) = create_test_server(0).await;

    let response = app.oneshot(get_request("/ws/101")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
}

#[tokio::test]
async fn test_seed_notifies_connected_entrant() {
    let (app, event, entrants, hub) = create_test_server(2).await;
    let mut rx = hub.register(entrants[0]).await;

    seed_bracket(&app, event.id).await;

    let notification = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("notification timed out")
        .expect("channel closed early");
    assert_eq!(notification.entrant, entrants[0]);
    assert_eq!(notification.title, "Bracket released");
    assert_eq!(notification.link, format!("/events/{}", event.id));
}

#[tokio::test]
async fn test_resolution_notifies_both_finalists() {
    let (app, event, entrants, hub) = create_test_server(2).await;
    let mut champion_rx = hub.register(entrants[0]).await;
    let mut runner_up_rx = hub.register(entrants[1]).await;

    let seeded = seed_bracket(&app, event.id).await;
    let match_id = seeded["matches"][0]["id"].as_i64().unwrap();

    // Drain the seeding notifications first.
    timeout(Duration::from_secs(1), champion_rx.recv())
        .await
        .expect("seed notification timed out");
    timeout(Duration::from_secs(1), runner_up_rx.recv())
        .await
        .expect("seed notification timed out");

    let (status, _) = declare_winner(&app, match_id, entrants[0]).await;
    assert_eq!(status, StatusCode::OK);

    let won = timeout(Duration::from_secs(1), champion_rx.recv())
        .await
        .expect("champion notification timed out")
        .expect("channel closed early");
    assert_eq!(won.title, "Tournament complete");
    assert!(won.message.contains("You won"));

    let lost = timeout(Duration::from_secs(1), runner_up_rx.recv())
        .await
        .expect("runner-up notification timed out")
        .expect("channel closed early");
    assert_eq!(lost.title, "Tournament complete");
    assert!(lost.message.contains("second"));
}
