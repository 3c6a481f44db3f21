//! Storage adapters. SQLite is the only backend.

pub mod sqlite;
