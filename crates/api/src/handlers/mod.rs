//! HTTP request handlers, one module per endpoint group.

pub mod backup;
pub mod export;
pub mod restore;
