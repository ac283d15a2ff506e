//! # REST Routes
//!
//! One module per resource. Each exposes a `router()` that is nested under
//! `/api` by [`crate::router`].
//!
//! ```text
//! /api
//! ├── /users       create, get, get by identity uid, patch
//! ├── /workouts    create, list for user, patch
//! ├── /exercises   create, list for workout, patch
//! ├── /sessions    upsert, get for user, delete for user
//! └── /health
//! ```

pub mod exercises;
pub mod health;
pub mod sessions;
pub mod users;
pub mod workouts;
