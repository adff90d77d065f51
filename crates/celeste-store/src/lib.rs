//! # celeste-store
//!
//! Local chat transcript storage for Celeste, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection`. The handle is opened explicitly, runs the schema
//! migrations on open, and provides typed CRUD helpers for chats.

pub mod chats;
pub mod database;
pub mod migrations;
pub mod models;

mod error;

pub use chats::derive_title;
pub use database::Database;
pub use error::StoreError;
pub use models::*;
