//! # Knockout
//!
//! A single-elimination tournament bracket engine with transactional match
//! resolution.
//!
//! This library covers the full bracket lifecycle over a pluggable storage
//! gateway: seeding a pending event's confirmed entrants into first-round
//! matches, declaring winners, advancing them round by round until a
//! champion is decided, and fanning out post-commit notifications.
//!
//! ## Architecture
//!
//! An event moves through the bracket in two phases:
//!
//! - **Pending**: entrants register and confirm; no matches exist yet
//! - **Ongoing**: the seeder has released round one; every winner
//!   declaration resolves exactly one match and either advances the winner
//!   into the next round or, at the final round, settles the bracket
//!
//! Each mutation runs in a single transaction against the storage gateway,
//! so concurrent declarations for sibling matches stay consistent and a
//! half-applied bracket can never be observed.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Seeding, match resolution, standings, and scheduling
//! - [`db`]: Storage gateway traits with Postgres and in-memory backends
//! - [`notify`]: Post-commit notification gateways
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use knockout::bracket::models::{EntrantMode, InscriptionRole, InscriptionStatus};
//! use knockout::db::MemBracketStore;
//! use knockout::{Actor, BracketSeeder, LogNotifier};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemBracketStore::new());
//!     let event = store
//!         .insert_event("Spring Open", 1, Utc::now(), EntrantMode::Individual)
//!         .await;
//!     for entrant in 101..=104 {
//!         store
//!             .insert_inscription(
//!                 event.id,
//!                 entrant,
//!                 InscriptionRole::Participant,
//!                 InscriptionStatus::Confirmed,
//!             )
//!             .await;
//!     }
//!
//!     let seeder = BracketSeeder::new(store.clone(), Arc::new(LogNotifier));
//!     let seeded = seeder.start_bracket(event.id, &Actor::user(1)).await?;
//!     println!("released {} first-round matches", seeded.matches.len());
//!     Ok(())
//! }
//! ```

/// Bracket lifecycle: seeding, resolution, standings, and scheduling.
pub mod bracket;
pub use bracket::{
    errors::{BracketError, BracketResult, ErrorKind},
    models::{Actor, Event, Inscription, Match},
    resolver::{MatchResolver, Resolution},
    seeder::{BracketSeeder, SeededBracket},
    standing::StandingQuery,
};

/// Storage gateways and connection management.
pub mod db;
pub use db::{Database, DatabaseConfig};

/// Post-commit notification delivery.
pub mod notify;
pub use notify::{LogNotifier, Notification, NotificationGateway};
