//! SQLite storage implementation for Pricewatch.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `pricewatch-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for flyers and price history
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! Every write goes through a single writer actor ([`WriteHandle`]) that runs
//! each job in one `IMMEDIATE` transaction; reads use the pool directly.
//!
//! ```text
//!   core (domain, traits)      sweeper (binary)
//!            │                       │
//!            └───────────┬───────────┘
//!                        │
//!                        ▼
//!            storage-sqlite (this crate)
//!                        │
//!                        ▼
//!                    SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod flyers;
pub mod price_history;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

pub use flyers::FlyerRepository;
pub use price_history::PriceHistoryRepository;

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from pricewatch-core for convenience
pub use pricewatch_core::errors::{DatabaseError, Error, Result};
