//! Aetheria Server Library - REST API components for the image workspace
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod config;
pub mod document_store;
pub mod error;
pub mod handlers;
pub mod multipart;
pub mod openapi;
pub mod owner;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::Config;
pub use document_store::{DocumentStoreError, PostgresDocumentStore};
pub use error::{ApiError, During};
pub use openapi::ApiDoc;
pub use owner::{Owner, OWNER_HEADER};
pub use routes::{create_router, create_router_with_config};
pub use state::AppState;
