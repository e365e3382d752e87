//! Role names as stored in the `user_roles` table.

/// Full administrative access, including data export/restore.
pub const ROLE_ADMIN: &str = "admin";

/// Regular back-office user. May not trigger bulk data operations.
pub const ROLE_STAFF: &str = "staff";
