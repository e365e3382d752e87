//! Outbound notifications (currently email only).

pub mod email;
