//! PostgreSQL adapter for the reconciliation ledger
//!
//! Provides the connection pool, embedded migrations, and the
//! [`PgLedgerStore`] implementation of `domain_ledger::LedgerStore`. Queries
//! are runtime-bound so the crate builds without a live database.

pub mod error;
pub mod pool;
pub mod store;

pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig};
pub use store::PgLedgerStore;
