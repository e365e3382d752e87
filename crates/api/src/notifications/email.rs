//! Backup summary emails via SMTP.
//!
//! Sends a plain-text per-table summary after a backup run. The transport
//! is built per send from [`SmtpConfig`]; if SMTP is not configured the
//! caller skips delivery entirely.

use indexmap::IndexMap;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use dealerdesk_core::types::DbId;

use crate::config::SmtpConfig;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// Send the summary for a finished backup run to the given address.
pub async fn send_backup_summary(
    config: &SmtpConfig,
    to_email: &str,
    run_id: DbId,
    total_records: i64,
    counts: &IndexMap<&str, i64>,
) -> Result<(), EmailError> {
    let email = Message::builder()
        .from(config.from_address.parse()?)
        .to(to_email.parse()?)
        .subject(format!("[DealerDesk] Backup run #{run_id} completed"))
        .header(ContentType::TEXT_PLAIN)
        .body(summary_body(run_id, total_records, counts))
        .map_err(|e| EmailError::Build(e.to_string()))?;

    let mut transport_builder =
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);

    if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        transport_builder =
            transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }

    transport_builder.build().send(email).await?;

    tracing::info!(to = to_email, run_id, "Backup summary email sent");
    Ok(())
}

fn summary_body(run_id: DbId, total_records: i64, counts: &IndexMap<&str, i64>) -> String {
    let mut body = format!(
        "Backup run #{run_id} completed.\n\nTotal records: {total_records}\n\nPer table:\n"
    );
    for (table, count) in counts {
        body.push_str(&format!("  {table}: {count}\n"));
    }
    body
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_body_lists_every_table() {
        let mut counts = IndexMap::new();
        counts.insert("dealers", 12_i64);
        counts.insert("invoices", 0_i64);

        let body = summary_body(7, 12, &counts);

        assert!(body.contains("Backup run #7"));
        assert!(body.contains("Total records: 12"));
        assert!(body.contains("  dealers: 12"));
        assert!(body.contains("  invoices: 0"));
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}
