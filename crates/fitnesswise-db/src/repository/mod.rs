//! # Repository Module
//!
//! ```text
//! SessionStore
//!      │  db.slots().put(SlotKey::LiveSession, &session)
//!      │  db.history().archive(&archived)
//!      ▼
//! SlotRepository / HistoryRepository
//!      │  SQL
//!      ▼
//! local_slots / workout_history
//! ```
//!
//! ## Available Repositories
//!
//! - [`slots::SlotRepository`] - Fixed-name JSON slots
//! - [`history::HistoryRepository`] - Append-only archived workouts

pub mod history;
pub mod slots;
