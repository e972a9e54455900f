//! Bracket lifecycle: seeding, match resolution, standings and scheduling.
//!
//! The seeder and resolver are the two mutating entry points. Each runs its
//! whole state change inside one storage transaction and queues entrant
//! notifications for delivery after the commit.

pub mod errors;
pub mod models;
pub mod resolver;
pub mod schedule;
pub mod seeder;
pub mod standing;
