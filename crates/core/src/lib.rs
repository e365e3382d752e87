//! Pure domain logic for the dealerdesk bulk data interchange service.
//!
//! Everything in this crate is synchronous, I/O-free, and deterministic:
//! the record model, the row serializer (CSV and SQL upsert batches), the
//! SQL dump parser, the table dependency order, and the apply-result types
//! shared by the database layer and the HTTP boundary.

pub mod apply;
pub mod error;
pub mod ordering;
pub mod record;
pub mod roles;
pub mod serializer;
pub mod sql_parser;
pub mod types;
