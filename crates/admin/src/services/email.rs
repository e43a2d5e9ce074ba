//! Outgoing mail over SMTP.
//!
//! Transport settings are resolved on every send, field by field: the
//! settings store first, then the process environment, then a default. A
//! change saved in the back-office therefore takes effect on the next
//! message without a restart.
//!
//! | field    | setting           | env            | default     |
//! |----------|-------------------|----------------|-------------|
//! | host     | `smtp_host`       | `SMTP_HOST`    | (required)  |
//! | port     | `smtp_port`       | `SMTP_PORT`    | 587         |
//! | secure   | `smtp_secure`     | `SMTP_SECURE`  | false       |
//! | user     | `smtp_user`       | `SMTP_USER`    |             |
//! | password | `smtp_password`   | `SMTP_PASSWORD`|             |
//! | from     | `smtp_from_email` | `smtp_user`, `SMTP_USER` |   |
//! | name     | `smtp_from_name`  |                | `ProudShop` |
//!
//! `secure` is true when either the setting or the env var is exactly
//! `"true"`, and selects implicit TLS; otherwise STARTTLS is required.

use std::time::Duration;

use askama::Template;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use proudshop_core::{Email, mask_local_part, setting_keys};

use crate::config::DEFAULT_SITE_NAME;
use crate::settings::{EmailSettings, EnvSource, ProcessEnv, SettingsSource, non_empty};

const DEFAULT_PORT: u16 = 587;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// A required transport field resolved to nothing.
    #[error("SMTP not configured: missing {0}")]
    NotConfigured(&'static str),

    /// A transport field has an unusable value.
    #[error("Invalid SMTP configuration: {0}")]
    InvalidConfig(String),

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Attachment content type did not parse.
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

// =============================================================================
// Transport resolution
// =============================================================================

/// SMTP settings after applying the settings → env → default chain.
#[derive(Clone)]
pub struct TransportConfig {
    pub host: Option<String>,
    pub port: u16,
    pub secure: bool,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub from_email: Option<String>,
    pub from_name: String,
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("user", &self.user)
            .field(
                "password",
                &if self.password.is_some() {
                    "[SET]"
                } else {
                    "[NOT SET]"
                },
            )
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

impl TransportConfig {
    /// Resolve every field from `settings`, then `env`, then defaults.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::InvalidConfig` if the port is not a valid
    /// number. A missing host is not an error here; see [`Self::missing`].
    pub async fn resolve(
        settings: &impl SettingsSource,
        env: &impl EnvSource,
    ) -> Result<Self, EmailError> {
        let stored = EmailSettings::load(settings).await;
        Self::from_layers(stored, env)
    }

    fn from_layers(stored: EmailSettings, env: &impl EnvSource) -> Result<Self, EmailError> {
        let env_var = |name: &str| non_empty(env.var(name));

        let port = match stored.port.or_else(|| env_var("SMTP_PORT")) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                EmailError::InvalidConfig(format!("port must be a number, got {raw:?}"))
            })?,
            None => DEFAULT_PORT,
        };

        let secure = stored.secure.as_deref() == Some("true")
            || env_var("SMTP_SECURE").as_deref() == Some("true");

        let user = stored.user.or_else(|| env_var("SMTP_USER"));
        let password = stored
            .password
            .or_else(|| env_var("SMTP_PASSWORD").map(SecretString::from));
        let from_email = stored.from_email.or_else(|| user.clone());

        Ok(Self {
            host: stored.host.or_else(|| env_var("SMTP_HOST")),
            port,
            secure,
            user,
            password,
            from_email,
            from_name: stored
                .from_name
                .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
        })
    }

    /// Setting keys that must be filled in before mail can be sent with
    /// authentication.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.host.is_none() {
            missing.push(setting_keys::SMTP_HOST);
        }
        if self.user.is_none() {
            missing.push(setting_keys::SMTP_USER);
        }
        if self.password.is_none() {
            missing.push(setting_keys::SMTP_PASSWORD);
        }
        missing
    }

    /// The `From` mailbox.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::NotConfigured` if no sender address resolved, or
    /// `EmailError::InvalidAddress` if it does not parse.
    pub fn sender(&self) -> Result<Mailbox, EmailError> {
        let from = self
            .from_email
            .as_deref()
            .ok_or(EmailError::NotConfigured(setting_keys::SMTP_FROM_EMAIL))?;
        let address: Address = from
            .parse()
            .map_err(|_| EmailError::InvalidAddress(from.to_string()))?;
        Ok(Mailbox::new(Some(self.from_name.clone()), address))
    }

    /// Build the SMTP transport: implicit TLS when `secure`, STARTTLS
    /// otherwise. Credentials are attached only when both halves are set.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::NotConfigured` without a host,
    /// `EmailError::InvalidConfig` for a password with stray whitespace, or
    /// `EmailError::Smtp` if the TLS parameters cannot be built.
    pub fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let host = self
            .host
            .as_deref()
            .ok_or(EmailError::NotConfigured(setting_keys::SMTP_HOST))?;

        let builder = if self.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        }
        .port(self.port);

        let builder = match (&self.user, &self.password) {
            (Some(user), Some(password)) => {
                let password = password.expose_secret();
                if password != password.trim() {
                    return Err(EmailError::InvalidConfig(
                        "SMTP password has leading or trailing whitespace".to_string(),
                    ));
                }
                builder.credentials(Credentials::new(user.clone(), password.to_string()))
            }
            _ => builder,
        };

        Ok(builder.build())
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Result of [`check`]: what is missing and what would be used, masked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailCheck {
    pub ok: bool,
    pub missing: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub config: Option<MailCheckConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailCheckConfig {
    pub host: Option<String>,
    pub port: u16,
    pub secure: bool,
    pub user_masked: Option<String>,
    pub from_email_masked: Option<String>,
    pub from_name: String,
    pub has_password: bool,
}

/// Resolve the transport settings and report on them without sending.
pub async fn check(settings: &impl SettingsSource, env: &impl EnvSource) -> MailCheck {
    match TransportConfig::resolve(settings, env).await {
        Ok(config) => {
            let missing: Vec<String> = config.missing().into_iter().map(String::from).collect();
            MailCheck {
                ok: missing.is_empty(),
                missing,
                error: None,
                config: Some(MailCheckConfig {
                    host: config.host.clone(),
                    port: config.port,
                    secure: config.secure,
                    user_masked: config.user.as_deref().map(mask_local_part),
                    from_email_masked: config.from_email.as_deref().map(mask_local_part),
                    from_name: config.from_name.clone(),
                    has_password: config.password.is_some(),
                }),
            }
        }
        Err(e) => MailCheck {
            ok: false,
            missing: Vec::new(),
            error: Some(e.to_string()),
            config: None,
        },
    }
}

/// Per-attempt timeout for [`auth_matrix`].
const MATRIX_TIMEOUT: Duration = Duration::from_secs(15);
const MATRIX_ERROR_LIMIT: usize = 300;
const MATRIX_HINT: &str = "Zakonisht Hostinger: SSL 465 ose STARTTLS 587. Sigurohuni që password është korrekt (pa hapësira) dhe përdorni adresën e plotë si username.";

/// How an attempt opens the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectMode {
    /// Implicit TLS from the first byte.
    Ssl,
    /// Cleartext, optionally upgraded with STARTTLS.
    Plain,
}

/// One connection strategy tried by [`auth_matrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub mode: ConnectMode,
    pub port: u16,
    pub starttls: bool,
}

impl Strategy {
    const fn new(name: &'static str, mode: ConnectMode, port: u16, starttls: bool) -> Self {
        Self {
            name,
            mode,
            port,
            starttls,
        }
    }
}

/// The configured combination first, then the common fallbacks that
/// differ from it: SSL 465, STARTTLS 587, SSL 587, plain 25.
#[must_use]
pub fn strategies(port: u16, secure: bool) -> Vec<Strategy> {
    let configured = match (secure, port) {
        (true, 465) => Strategy::new("configured-ssl-465", ConnectMode::Ssl, port, false),
        (true, _) => Strategy::new("configured-ssl", ConnectMode::Ssl, port, false),
        (false, 587 | 25 | 2525) => {
            Strategy::new("configured-starttls", ConnectMode::Plain, port, true)
        }
        (false, _) => Strategy::new("configured-plain", ConnectMode::Plain, port, false),
    };

    let fallbacks = [
        ((465, true), Strategy::new("ssl-465", ConnectMode::Ssl, 465, false)),
        ((587, false), Strategy::new("starttls-587", ConnectMode::Plain, 587, true)),
        ((587, true), Strategy::new("ssl-587(forced)", ConnectMode::Ssl, 587, false)),
        ((25, false), Strategy::new("plain-25", ConnectMode::Plain, 25, false)),
    ];

    std::iter::once(configured)
        .chain(
            fallbacks
                .into_iter()
                .filter(|(combo, _)| *combo != (port, secure))
                .map(|(_, strategy)| strategy),
        )
        .collect()
}

/// Outcome of one connect-and-login attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthAttempt {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub mode: ConnectMode,
    pub starttls: bool,
    pub success: bool,
    pub error: Option<String>,
}

/// Report of [`auth_matrix`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthMatrix {
    pub user_masked: String,
    pub attempts: Vec<AuthAttempt>,
    pub hint: String,
}

/// Log in with the configured credentials under each of [`strategies`]
/// and report which combinations work. Nothing is sent.
///
/// # Errors
///
/// Returns `EmailError::NotConfigured` if host, user or password is
/// missing, or `EmailError::InvalidConfig` for an unparsable port.
pub async fn auth_matrix(
    settings: &impl SettingsSource,
    env: &impl EnvSource,
) -> Result<AuthMatrix, EmailError> {
    let config = TransportConfig::resolve(settings, env).await?;
    try_strategies(&config, &strategies(config.port, config.secure)).await
}

/// Run `strategies` in order against the host and credentials in `config`.
///
/// # Errors
///
/// Returns `EmailError::NotConfigured` if host, user or password is
/// missing.
pub async fn try_strategies(
    config: &TransportConfig,
    strategies: &[Strategy],
) -> Result<AuthMatrix, EmailError> {
    let (Some(host), Some(user), Some(password)) = (&config.host, &config.user, &config.password)
    else {
        let missing = config.missing();
        return Err(EmailError::NotConfigured(
            missing.first().copied().unwrap_or(setting_keys::SMTP_HOST),
        ));
    };
    let credentials = Credentials::new(user.clone(), password.expose_secret().to_string());

    let mut attempts = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        let result = attempt(host, credentials.clone(), *strategy).await;
        let error = result.err().map(|e| e.chars().take(MATRIX_ERROR_LIMIT).collect::<String>());
        tracing::info!(
            strategy = strategy.name,
            port = strategy.port,
            success = error.is_none(),
            "SMTP auth attempt"
        );
        attempts.push(AuthAttempt {
            name: strategy.name.to_string(),
            host: host.clone(),
            port: strategy.port,
            mode: strategy.mode,
            starttls: strategy.starttls,
            success: error.is_none(),
            error,
        });
    }

    Ok(AuthMatrix {
        user_masked: mask_local_part(user),
        attempts,
        hint: MATRIX_HINT.to_string(),
    })
}

async fn attempt(host: &str, credentials: Credentials, strategy: Strategy) -> Result<(), String> {
    let builder = match (strategy.mode, strategy.starttls) {
        (ConnectMode::Ssl, _) => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
        (ConnectMode::Plain, true) => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
        (ConnectMode::Plain, false) => {
            Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
        }
    }
    .map_err(|e| e.to_string())?;

    let transport: AsyncSmtpTransport<Tokio1Executor> = builder
        .port(strategy.port)
        .timeout(Some(MATRIX_TIMEOUT))
        .credentials(credentials)
        .build();

    match transport.test_connection().await {
        Ok(true) => Ok(()),
        Ok(false) => Err("connection closed by server".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

// =============================================================================
// Sending
// =============================================================================

/// A file attached to an outgoing message.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content: Vec<u8>,
    /// Defaults to `application/octet-stream`.
    pub content_type: Option<String>,
}

/// One outgoing message.
#[derive(Debug, Clone)]
pub struct EmailOptions {
    pub to: Vec<Email>,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
    /// Overrides the resolved sender address.
    pub from_email: Option<String>,
    /// Overrides the resolved sender name.
    pub from_name: Option<String>,
}

impl EmailOptions {
    #[must_use]
    pub fn new(to: Email, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: vec![to],
            subject: subject.into(),
            html: html.into(),
            attachments: Vec::new(),
            from_email: None,
            from_name: None,
        }
    }
}

/// Build the MIME message and its `Message-ID`.
///
/// # Errors
///
/// Returns an `EmailError` if there are no recipients, an address does not
/// parse, or an attachment content type is invalid.
pub fn build_message(
    config: &TransportConfig,
    options: &EmailOptions,
) -> Result<(Message, String), EmailError> {
    if options.to.is_empty() {
        return Err(EmailError::InvalidAddress("no recipients".to_string()));
    }

    let mut sender_config = config.clone();
    if let Some(from) = &options.from_email {
        sender_config.from_email = Some(from.clone());
    }
    if let Some(name) = &options.from_name {
        sender_config.from_name.clone_from(name);
    }
    let from = sender_config.sender()?;

    let message_id = format!("<{}@{}>", uuid::Uuid::new_v4(), from.email.domain());

    let mut builder = Message::builder()
        .from(from)
        .subject(options.subject.as_str())
        .message_id(Some(message_id.clone()));
    for recipient in &options.to {
        let mailbox: Mailbox = recipient
            .as_str()
            .parse()
            .map_err(|_| EmailError::InvalidAddress(recipient.to_string()))?;
        builder = builder.to(mailbox);
    }

    let html_part = SinglePart::html(options.html.clone());
    let message = if options.attachments.is_empty() {
        builder.singlepart(html_part)?
    } else {
        let mut parts = MultiPart::mixed().singlepart(html_part);
        for attachment in &options.attachments {
            let content_type = ContentType::parse(
                attachment
                    .content_type
                    .as_deref()
                    .unwrap_or("application/octet-stream"),
            )
            .map_err(|e| EmailError::InvalidAttachment(format!("{}: {e}", attachment.filename)))?;
            parts = parts.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }
        builder.multipart(parts)?
    };

    Ok((message, message_id))
}

/// Sends mail with settings resolved per call.
#[derive(Debug, Clone)]
pub struct Mailer<S, E = ProcessEnv> {
    settings: S,
    env: E,
}

impl<S: SettingsSource> Mailer<S, ProcessEnv> {
    pub const fn new(settings: S) -> Self {
        Self {
            settings,
            env: ProcessEnv,
        }
    }
}

impl<S: SettingsSource, E: EnvSource> Mailer<S, E> {
    pub const fn with_env(settings: S, env: E) -> Self {
        Self { settings, env }
    }

    /// Resolve the transport and send one message. No retry.
    ///
    /// Returns the `Message-ID` of the sent message.
    ///
    /// # Errors
    ///
    /// Returns an `EmailError` if configuration is missing or invalid, the
    /// message cannot be built, or the SMTP exchange fails.
    #[instrument(skip(self, options), fields(recipients = options.to.len(), subject = %options.subject))]
    pub async fn send_email(&self, options: &EmailOptions) -> Result<String, EmailError> {
        let config = TransportConfig::resolve(&self.settings, &self.env).await;
        let config = config.inspect_err(|e| tracing::error!(error = %e, "Invalid SMTP settings"))?;
        tracing::debug!(?config, "Resolved SMTP transport");

        let (message, message_id) = build_message(&config, options)?;
        let transport = config.transport()?;

        transport.send(message).await.map_err(|e| {
            tracing::error!(error = %e, host = ?config.host, port = config.port, "Error sending email");
            EmailError::Smtp(e)
        })?;

        tracing::info!(message_id = %message_id, "Email sent");
        Ok(message_id)
    }

    /// Diagnostics for the current settings.
    pub async fn check(&self) -> MailCheck {
        check(&self.settings, &self.env).await
    }

    /// Try the common connection strategies with the current credentials.
    ///
    /// # Errors
    ///
    /// See [`auth_matrix`].
    pub async fn auth_matrix(&self) -> Result<AuthMatrix, EmailError> {
        auth_matrix(&self.settings, &self.env).await
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    site_name: &'a str,
    order_number: &'a str,
    customer_name: &'a str,
    total: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_processing.html")]
struct OrderProcessingHtml<'a> {
    site_name: &'a str,
    order_number: &'a str,
    customer_name: &'a str,
    total: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_shipped.html")]
struct OrderShippedHtml<'a> {
    site_name: &'a str,
    order_number: &'a str,
    customer_name: &'a str,
    tracking_number: &'a str,
}

#[derive(Template)]
#[template(path = "email/marketing_offer.html")]
struct MarketingOfferHtml<'a> {
    site_name: &'a str,
    store_url: &'a str,
    customer_name: &'a str,
    product_name: &'a str,
    discount: &'a str,
}

/// Which canned message to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    OrderConfirmation,
    OrderProcessing,
    OrderShipped,
    MarketingOffer,
}

impl std::str::FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "order_confirmation" => Ok(Self::OrderConfirmation),
            "order_processing" => Ok(Self::OrderProcessing),
            "order_shipped" => Ok(Self::OrderShipped),
            "marketing_offer" => Ok(Self::MarketingOffer),
            _ => Err(format!("unknown email template: {s}")),
        }
    }
}

/// Fields a template may need. Which are required depends on the kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateFields {
    pub customer_name: String,
    pub order_number: Option<String>,
    pub total: Option<String>,
    pub tracking_number: Option<String>,
    pub product_name: Option<String>,
    pub discount: Option<String>,
}

/// A rendered canned message.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Renders the canned order and marketing emails. All interpolated values
/// are HTML-escaped.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    site_name: String,
    store_url: String,
}

impl Default for EmailTemplates {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_NAME, "http://localhost:3000")
    }
}

impl EmailTemplates {
    #[must_use]
    pub fn new(site_name: impl Into<String>, store_url: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            store_url: store_url.into(),
        }
    }

    /// # Errors
    ///
    /// Returns `EmailError::Template` if rendering fails.
    pub fn order_confirmation(
        &self,
        order_number: &str,
        customer_name: &str,
        total: &str,
    ) -> Result<String, EmailError> {
        Ok(OrderConfirmationHtml {
            site_name: &self.site_name,
            order_number,
            customer_name,
            total,
        }
        .render()?)
    }

    /// # Errors
    ///
    /// Returns `EmailError::Template` if rendering fails.
    pub fn order_processing(
        &self,
        order_number: &str,
        customer_name: &str,
        total: &str,
    ) -> Result<String, EmailError> {
        Ok(OrderProcessingHtml {
            site_name: &self.site_name,
            order_number,
            customer_name,
            total,
        }
        .render()?)
    }

    /// # Errors
    ///
    /// Returns `EmailError::Template` if rendering fails.
    pub fn order_shipped(
        &self,
        order_number: &str,
        customer_name: &str,
        tracking_number: &str,
    ) -> Result<String, EmailError> {
        Ok(OrderShippedHtml {
            site_name: &self.site_name,
            order_number,
            customer_name,
            tracking_number,
        }
        .render()?)
    }

    /// # Errors
    ///
    /// Returns `EmailError::Template` if rendering fails.
    pub fn marketing_offer(
        &self,
        customer_name: &str,
        product_name: &str,
        discount: &str,
    ) -> Result<String, EmailError> {
        Ok(MarketingOfferHtml {
            site_name: &self.site_name,
            store_url: &self.store_url,
            customer_name,
            product_name,
            discount,
        }
        .render()?)
    }

    /// Render `kind` with its subject line.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::InvalidConfig` naming the first required field
    /// that is missing, or `EmailError::Template` if rendering fails.
    pub fn render(
        &self,
        kind: TemplateKind,
        fields: &TemplateFields,
    ) -> Result<RenderedEmail, EmailError> {
        fn required<'a>(value: Option<&'a String>, name: &str) -> Result<&'a str, EmailError> {
            value
                .map(String::as_str)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| EmailError::InvalidConfig(format!("{name} is required")))
        }

        let name = fields.customer_name.as_str();
        match kind {
            TemplateKind::OrderConfirmation => {
                let order = required(fields.order_number.as_ref(), "order_number")?;
                let total = required(fields.total.as_ref(), "total")?;
                Ok(RenderedEmail {
                    subject: format!("Konfirmimi i porosisë #{order}"),
                    html: self.order_confirmation(order, name, total)?,
                })
            }
            TemplateKind::OrderProcessing => {
                let order = required(fields.order_number.as_ref(), "order_number")?;
                let total = required(fields.total.as_ref(), "total")?;
                Ok(RenderedEmail {
                    subject: format!("Porosia #{order} është në proces"),
                    html: self.order_processing(order, name, total)?,
                })
            }
            TemplateKind::OrderShipped => {
                let order = required(fields.order_number.as_ref(), "order_number")?;
                let tracking = required(fields.tracking_number.as_ref(), "tracking_number")?;
                Ok(RenderedEmail {
                    subject: format!("Porosia #{order} u nis"),
                    html: self.order_shipped(order, name, tracking)?,
                })
            }
            TemplateKind::MarketingOffer => {
                let product = required(fields.product_name.as_ref(), "product_name")?;
                let discount = required(fields.discount.as_ref(), "discount")?;
                Ok(RenderedEmail {
                    subject: format!("Ofertë e veçantë: {product}"),
                    html: self.marketing_offer(name, product, discount)?,
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::settings::StaticValues;

    async fn resolve(settings: &StaticValues, env: &StaticValues) -> TransportConfig {
        TransportConfig::resolve(settings, env).await.unwrap()
    }

    #[tokio::test]
    async fn test_settings_override_env() {
        let settings = StaticValues::from_pairs([
            ("smtp_host", "smtp.hostinger.com"),
            ("smtp_port", "465"),
            ("smtp_user", "shop@proudshop.al"),
        ]);
        let env = StaticValues::from_pairs([
            ("SMTP_HOST", "smtp.env.example"),
            ("SMTP_PORT", "2525"),
            ("SMTP_USER", "env@example.com"),
            ("SMTP_PASSWORD", "env-pass"),
        ]);

        let config = resolve(&settings, &env).await;
        assert_eq!(config.host.as_deref(), Some("smtp.hostinger.com"));
        assert_eq!(config.port, 465);
        assert_eq!(config.user.as_deref(), Some("shop@proudshop.al"));
        // Not in settings: falls through to env
        assert_eq!(config.password.unwrap().expose_secret(), "env-pass");
    }

    #[tokio::test]
    async fn test_env_overrides_default() {
        let env = StaticValues::from_pairs([("SMTP_HOST", "smtp.env.example"), ("SMTP_PORT", "2525")]);
        let config = resolve(&StaticValues::new(), &env).await;
        assert_eq!(config.host.as_deref(), Some("smtp.env.example"));
        assert_eq!(config.port, 2525);
    }

    #[tokio::test]
    async fn test_defaults() {
        let config = resolve(&StaticValues::new(), &StaticValues::new()).await;
        assert!(config.host.is_none());
        assert_eq!(config.port, 587);
        assert!(!config.secure);
        assert_eq!(config.from_name, "ProudShop");
        assert_eq!(
            config.missing(),
            vec!["smtp_host", "smtp_user", "smtp_password"]
        );
    }

    #[tokio::test]
    async fn test_secure_from_either_source() {
        let on = StaticValues::from_pairs([("smtp_secure", "true")]);
        let off = StaticValues::from_pairs([("smtp_secure", "false")]);
        let env_on = StaticValues::from_pairs([("SMTP_SECURE", "true")]);
        let none = StaticValues::new();

        assert!(resolve(&on, &none).await.secure);
        assert!(resolve(&off, &env_on).await.secure);
        assert!(!resolve(&off, &none).await.secure);
        // Only the exact string counts
        let yes = StaticValues::from_pairs([("smtp_secure", "yes")]);
        assert!(!resolve(&yes, &none).await.secure);
    }

    #[tokio::test]
    async fn test_sender_fallback_chain() {
        let env = StaticValues::from_pairs([("SMTP_USER", "env-user@proudshop.al")]);
        let config = resolve(&StaticValues::new(), &env).await;
        assert_eq!(config.from_email.as_deref(), Some("env-user@proudshop.al"));

        let settings = StaticValues::from_pairs([
            ("smtp_user", "login@proudshop.al"),
            ("smtp_from_email", "info@proudshop.al"),
            ("smtp_from_name", "Proud Shop AL"),
        ]);
        let config = resolve(&settings, &env).await;
        let sender = config.sender().unwrap();
        assert_eq!(sender.email.to_string(), "info@proudshop.al");
        assert_eq!(sender.name.as_deref(), Some("Proud Shop AL"));
    }

    #[tokio::test]
    async fn test_invalid_port() {
        let settings = StaticValues::from_pairs([("smtp_port", "five-eight-seven")]);
        let err = TransportConfig::resolve(&settings, &StaticValues::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EmailError::InvalidConfig(_)));

        let report = check(&settings, &StaticValues::new()).await;
        assert!(!report.ok);
        assert!(report.error.is_some());
    }

    fn strategy_names(port: u16, secure: bool) -> Vec<&'static str> {
        strategies(port, secure).iter().map(|s| s.name).collect()
    }

    #[test]
    fn test_strategies_start_with_configured_combo() {
        assert_eq!(
            strategy_names(587, false),
            ["configured-starttls", "ssl-465", "ssl-587(forced)", "plain-25"]
        );
        assert_eq!(
            strategy_names(465, true),
            ["configured-ssl-465", "starttls-587", "ssl-587(forced)", "plain-25"]
        );
        assert_eq!(
            strategy_names(2626, false),
            ["configured-plain", "ssl-465", "starttls-587", "ssl-587(forced)", "plain-25"]
        );

        let first = strategies(2465, true)[0];
        assert_eq!(first.name, "configured-ssl");
        assert_eq!(first.mode, ConnectMode::Ssl);
        assert_eq!(first.port, 2465);
        assert!(!first.starttls);
    }

    #[tokio::test]
    async fn test_auth_matrix_requires_credentials() {
        let settings = StaticValues::from_pairs([
            ("smtp_host", "mail.example.com"),
            ("smtp_user", "shop@example.com"),
        ]);
        let err = auth_matrix(&settings, &StaticValues::new()).await.unwrap_err();
        assert!(matches!(err, EmailError::NotConfigured("smtp_password")));
    }

    #[tokio::test]
    async fn test_auth_matrix_records_failed_attempts() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let settings = StaticValues::from_pairs([
            ("smtp_host", "127.0.0.1"),
            ("smtp_user", "shop@example.com"),
            ("smtp_password", "pw"),
        ]);
        let config = resolve(&settings, &StaticValues::new()).await;
        let plan = [
            Strategy::new("closed-plain", ConnectMode::Plain, port, false),
            Strategy::new("closed-ssl", ConnectMode::Ssl, port, false),
        ];

        let matrix = try_strategies(&config, &plan).await.unwrap();
        assert_eq!(matrix.user_masked, "s**p@example.com");
        assert_eq!(matrix.attempts.len(), 2);
        for attempt in &matrix.attempts {
            assert!(!attempt.success);
            assert!(attempt.error.as_deref().is_some_and(|e| !e.is_empty()));
            assert_eq!(attempt.port, port);
            assert_eq!(attempt.host, "127.0.0.1");
        }

        let json = serde_json::to_value(&matrix).unwrap();
        assert_eq!(json["attempts"][0]["name"], "closed-plain");
        assert_eq!(json["attempts"][1]["mode"], "SSL");
        assert!(!json.to_string().contains("\"pw\""));
    }

    #[tokio::test]
    async fn test_check_masks_values() {
        let settings = StaticValues::from_pairs([
            ("smtp_host", "smtp.hostinger.com"),
            ("smtp_user", "shop@proudshop.al"),
            ("smtp_password", "pw"),
        ]);
        let report = check(&settings, &StaticValues::new()).await;
        assert!(report.ok);
        assert!(report.missing.is_empty());
        let config = report.config.unwrap();
        assert_eq!(config.user_masked.as_deref(), Some("s**p@proudshop.al"));
        assert!(config.has_password);

        let json = serde_json::to_string(&check(&settings, &StaticValues::new()).await).unwrap();
        assert!(!json.contains("\"pw\""));
    }

    #[tokio::test]
    async fn test_transport_requires_host() {
        let config = resolve(&StaticValues::new(), &StaticValues::new()).await;
        assert!(matches!(
            config.transport(),
            Err(EmailError::NotConfigured("smtp_host"))
        ));
    }

    #[tokio::test]
    async fn test_transport_rejects_padded_password() {
        let settings = StaticValues::from_pairs([
            ("smtp_host", "smtp.hostinger.com"),
            ("smtp_user", "shop@proudshop.al"),
            ("smtp_password", "pw "),
        ]);
        // non_empty keeps inner whitespace; only blank values are dropped
        let config = resolve(&settings, &StaticValues::new()).await;
        assert!(matches!(config.transport(), Err(EmailError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_build_message_with_attachment() {
        let settings = StaticValues::from_pairs([("smtp_from_email", "info@proudshop.al")]);
        let config = resolve(&settings, &StaticValues::new()).await;

        let mut options = EmailOptions::new(
            Email::parse("klient@example.com").unwrap(),
            "Fatura",
            "<p>Faleminderit</p>",
        );
        options.attachments.push(EmailAttachment {
            filename: "fatura.pdf".to_string(),
            content: b"%PDF-1.4".to_vec(),
            content_type: Some("application/pdf".to_string()),
        });

        let (message, message_id) = build_message(&config, &options).unwrap();
        assert!(message_id.ends_with("@proudshop.al>"));

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("fatura.pdf"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains(&message_id));
    }

    #[tokio::test]
    async fn test_build_message_requires_sender() {
        let config = resolve(&StaticValues::new(), &StaticValues::new()).await;
        let options = EmailOptions::new(Email::parse("a@b.al").unwrap(), "s", "<p>x</p>");
        assert!(matches!(
            build_message(&config, &options),
            Err(EmailError::NotConfigured("smtp_from_email"))
        ));
    }

    #[test]
    fn test_templates_escape_fields() {
        let templates = EmailTemplates::default();
        let html = templates
            .order_confirmation("PS-1001", "<script>alert(1)</script>", "€45.00")
            .unwrap();
        assert!(html.contains("PS-1001"));
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Faleminderit për besimin në ProudShop"));
    }

    #[test]
    fn test_marketing_offer_links_to_store() {
        let templates = EmailTemplates::new("ProudShop", "https://proudshop.al");
        let html = templates.marketing_offer("Arta", "Xhaketë lëkure", "20").unwrap();
        assert!(html.contains("https://proudshop.al"));
        assert!(html.contains("20% ZBRITJE"));
    }

    #[test]
    fn test_render_by_kind() {
        let templates = EmailTemplates::default();
        let fields = TemplateFields {
            customer_name: "Arta".to_string(),
            order_number: Some("PS-7".to_string()),
            tracking_number: Some("AL123".to_string()),
            ..TemplateFields::default()
        };

        let shipped = templates.render(TemplateKind::OrderShipped, &fields).unwrap();
        assert_eq!(shipped.subject, "Porosia #PS-7 u nis");
        assert!(shipped.html.contains("AL123"));

        let err = templates
            .render(TemplateKind::OrderConfirmation, &fields)
            .unwrap_err();
        assert!(err.to_string().contains("total"));
    }

    #[test]
    fn test_template_kind_parse() {
        assert_eq!(
            "order-shipped".parse::<TemplateKind>(),
            Ok(TemplateKind::OrderShipped)
        );
        assert_eq!(
            "marketing_offer".parse::<TemplateKind>(),
            Ok(TemplateKind::MarketingOffer)
        );
        assert!("invoice".parse::<TemplateKind>().is_err());
    }
}
