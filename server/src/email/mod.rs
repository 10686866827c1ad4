//! License Email
//!
//! SMTP delivery of license keys to customers after a purchase.

use anyhow::{bail, Context, Result};
use ff_common::Tier;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::AsyncSmtpTransportBuilder;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Config;

type Mailer = AsyncSmtpTransport<Tokio1Executor>;

/// Transport security selected by `SMTP_TLS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    StartTls,
    /// Implicit TLS (usually port 465).
    Tls,
    /// Plaintext, for local relays only.
    None,
}

impl SmtpSecurity {
    /// Unknown values fall back to STARTTLS.
    #[must_use]
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "tls" => Self::Tls,
            "none" => Self::None,
            _ => Self::StartTls,
        }
    }

    fn builder(self, host: &str) -> Result<AsyncSmtpTransportBuilder> {
        Ok(match self {
            Self::StartTls => Mailer::starttls_relay(host)
                .with_context(|| format!("Invalid SMTP host for STARTTLS: {host}"))?,
            Self::Tls => {
                Mailer::relay(host).with_context(|| format!("Invalid SMTP host for TLS: {host}"))?
            }
            Self::None => Mailer::builder_dangerous(host),
        })
    }
}

/// The message a customer receives with their key.
#[derive(Debug, Clone, Copy)]
pub struct LicenseEmail<'a> {
    pub name: &'a str,
    pub license_key: &'a str,
    pub tier: Tier,
}

impl LicenseEmail<'_> {
    pub const SUBJECT: &'static str = "Your FileFlow License Key";

    #[must_use]
    pub fn body(&self) -> String {
        let Self {
            name,
            license_key,
            tier,
        } = *self;
        let tier_name = tier.display_name();
        let machines = tier.max_machines();

        format!(
            "Hello {name},\n\
             \n\
             Thank you for purchasing FileFlow {tier_name}!\n\
             \n\
             Your license key: {license_key}\n\
             \n\
             This license can be activated on up to {machines} machine(s).\n\
             \n\
             To activate your copy of FileFlow:\n\
             1. Open the FileFlow application\n\
             2. Go to Help > Activate License\n\
             3. Enter your license key\n\
             \n\
             If you have any questions, reply to this email and our support team will help.\n"
        )
    }
}

#[derive(Clone)]
pub struct EmailService {
    mailer: Mailer,
    sender: Mailbox,
}

impl EmailService {
    /// Build the SMTP transport. Every `SMTP_*` credential must be set.
    pub fn new(config: &Config) -> Result<Self> {
        let host = setting(config.smtp_host.as_deref(), "SMTP_HOST")?;
        let username = setting(config.smtp_username.as_deref(), "SMTP_USERNAME")?;
        let password = setting(config.smtp_password.as_deref(), "SMTP_PASSWORD")?;
        let sender: Mailbox = setting(config.smtp_from.as_deref(), "SMTP_FROM")?
            .parse()
            .context("SMTP_FROM is not a valid email address")?;

        let mailer = SmtpSecurity::from_setting(&config.smtp_tls)
            .builder(host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(username.to_owned(), password.to_owned()))
            .build();

        Ok(Self { mailer, sender })
    }

    /// Check the SMTP server answers (NOOP).
    pub async fn test_connection(&self) -> Result<()> {
        if !self
            .mailer
            .test_connection()
            .await
            .context("SMTP connection test failed")?
        {
            bail!("SMTP server rejected the connection test");
        }
        Ok(())
    }

    pub async fn send_license_key(
        &self,
        to_email: &str,
        name: &str,
        license_key: &str,
        tier: Tier,
    ) -> Result<()> {
        let message = self.compose(
            to_email,
            &LicenseEmail {
                name,
                license_key,
                tier,
            },
        )?;

        self.mailer
            .send(message)
            .await
            .context("SMTP server refused the license email")?;
        Ok(())
    }

    fn compose(&self, to_email: &str, email: &LicenseEmail<'_>) -> Result<Message> {
        let recipient: Mailbox = to_email
            .parse()
            .with_context(|| format!("Invalid recipient email address: {to_email}"))?;

        Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(LicenseEmail::SUBJECT)
            .body(email.body())
            .context("Failed to build license email")
    }
}

fn setting<'a>(value: Option<&'a str>, var: &str) -> Result<&'a str> {
    value.with_context(|| format!("{var} is required"))
}
