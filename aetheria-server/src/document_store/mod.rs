//! Document store module for persisting record metadata in PostgreSQL.
//!
//! Every collection lives in one `documents` table with the fields kept as
//! JSONB. Equality filters use containment (`@>`) so they hit the GIN index.

pub mod error;
pub mod postgres;

pub use error::DocumentStoreError;
pub use postgres::PostgresDocumentStore;
