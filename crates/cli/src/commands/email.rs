//! SMTP diagnostics and a test send, using the settings in the database.

use thiserror::Error;

use proudshop_admin::crypto::{CryptoError, SettingsCipher};
use proudshop_admin::services::email::{EmailError, EmailOptions, Mailer};
use proudshop_admin::settings::{DbSettings, ProcessEnv};
use proudshop_core::{Email, EmailError as AddressError};

use super::DatabaseError;

#[derive(Debug, Error)]
pub enum MailCommandError {
    #[error(transparent)]
    Connect(#[from] DatabaseError),

    #[error("Encryption setup failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Invalid recipient: {0}")]
    Address(#[from] AddressError),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error("SMTP settings incomplete, missing: {0}")]
    NotConfigured(String),
}

async fn mailer() -> Result<Mailer<DbSettings>, MailCommandError> {
    let pool = super::connect().await?;
    let cipher = SettingsCipher::from_env(&ProcessEnv)?;
    Ok(Mailer::new(DbSettings::new(pool, cipher)))
}

/// Print the resolved (masked) SMTP configuration.
pub async fn check() -> Result<(), MailCommandError> {
    let report = mailer().await?.check().await;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|e| e.to_string())
        );
    }

    if report.ok {
        Ok(())
    } else if let Some(error) = report.error {
        Err(MailCommandError::NotConfigured(error))
    } else {
        Err(MailCommandError::NotConfigured(report.missing.join(", ")))
    }
}

/// Try each common SMTP connection mode and print which ones log in.
pub async fn auth_matrix() -> Result<(), MailCommandError> {
    let matrix = mailer().await?.auth_matrix().await?;

    #[allow(clippy::print_stdout)]
    for attempt in &matrix.attempts {
        let status = if attempt.success { "ok" } else { "FAILED" };
        println!(
            "{:<22} {}:{:<5} {status}{}",
            attempt.name,
            attempt.host,
            attempt.port,
            attempt
                .error
                .as_deref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// Send a short test message to `to`.
pub async fn test(to: &str) -> Result<(), MailCommandError> {
    let to = Email::parse(to)?;
    let mailer = mailer().await?;

    let report = mailer.check().await;
    if !report.ok {
        return Err(MailCommandError::NotConfigured(report.missing.join(", ")));
    }

    let options = EmailOptions::new(
        to,
        "ProudShop SMTP test",
        "<p>This is a test message from ProudShop. SMTP delivery works.</p>",
    );

    let message_id = mailer.send_email(&options).await?;
    tracing::info!("Test email sent, message id {}", message_id);
    Ok(())
}
