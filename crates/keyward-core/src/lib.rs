//! Core library for Keyward.
//!
//! Holds the pieces of the dashboard that are pure logic: the key-creation
//! intent codec that carries a half-filled "create key" form across a page
//! navigation, the query-string plumbing under it, the name-to-domain
//! suggestion table, and the REST data models. Nothing here performs I/O;
//! `keyward-client` talks to the API and `keyward-cli` drives both.

pub mod domains;
pub mod error;
pub mod intent;
pub mod models;
pub mod query;

pub use domains::DomainTable;
pub use error::ModelError;
pub use intent::{
    IntentDraft, KeyCreationIntent, RateLimit, ResumedIntent, decode, decode_query, encode,
    encode_params, resume, wants_auto_open,
};
pub use query::QueryParams;
