//! Token validation helpers.
//!
//! This service does not issue sessions; the identity provider is an
//! external collaborator. We validate its HS256 bearer tokens and read the
//! embedded user id and role.

pub mod jwt;
