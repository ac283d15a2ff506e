//! # fitnesswise-db: Local Database Layer for FitnessWise
//!
//! The client's local durable state lives in one SQLite file. It is the
//! authoritative copy for recovery: remote replication may fail forever and
//! the session is still here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      FitnessWise Client Data Flow                       │
//! │                                                                         │
//! │  SessionStore mutation (update_set_reps, ...)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  fitnesswise-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SlotRepo      │    │ 001_local_   │  │   │
//! │  │   │ SqlitePool    │◄───│ HistoryRepo   │    │ state.sql    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL mode)                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use fitnesswise_db::{Database, DbConfig, SlotKey};
//!
//! let db = Database::new(DbConfig::new("./fitnesswise.db")).await?;
//! db.slots().put(SlotKey::OwningUserId, &42_i64).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::history::HistoryRepository;
pub use repository::slots::{SlotKey, SlotRepository};
