use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

/// Outbound OTP mail. Delivery is best-effort; callers decide whether a
/// failure matters (the signup flow logs and moves on).
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, to: &str, code: &str) -> anyhow::Result<()>;
}

fn otp_subject() -> &'static str {
    "Your OTP Code"
}

fn otp_body(code: &str) -> String {
    format!("Your OTP code is {code}")
}

/// Real sender over SMTP (STARTTLS relay).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let host = cfg.host.as_deref().context("smtp host not configured")?;
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).context("smtp relay")?;
        if let (Some(user), Some(pass)) = (cfg.username.clone(), cfg.password.clone()) {
            builder = builder.credentials(Credentials::new(user, pass));
        }
        let from: Mailbox = cfg.from.parse().context("parse SMTP_FROM")?;
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(&self, to: &str, code: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().context("parse recipient address")?)
            .subject(otp_subject())
            .body(otp_body(code))
            .context("build otp message")?;
        self.transport.send(message).await.context("smtp send")?;
        info!(to_email = %to, "otp email sent");
        Ok(())
    }
}

/// Local dev sender that logs the code instead of sending real email.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, to: &str, code: &str) -> anyhow::Result<()> {
        info!(to_email = %to, code = %code, "otp email send stub");
        Ok(())
    }
}

/// Pick the sender from config: SMTP when a host is set, log stub otherwise.
pub fn from_config(cfg: &SmtpConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    if cfg.host.is_some() {
        Ok(Arc::new(SmtpMailer::new(cfg)?))
    } else {
        info!("SMTP_HOST not set; otp emails will be logged, not sent");
        Ok(Arc::new(LogMailer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_body_contains_code() {
        assert_eq!(otp_body("123456"), "Your OTP code is 123456");
        assert_eq!(otp_subject(), "Your OTP Code");
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mailer = LogMailer;
        mailer
            .send_otp("someone@example.com", "654321")
            .await
            .expect("log mailer should not fail");
    }

    #[test]
    fn from_config_without_host_uses_log_stub() {
        let cfg = SmtpConfig {
            host: None,
            username: None,
            password: None,
            from: "no-reply@marketmint.app".into(),
        };
        assert!(from_config(&cfg).is_ok());
    }

    #[test]
    fn smtp_mailer_rejects_bad_from_address() {
        let cfg = SmtpConfig {
            host: Some("smtp.example.com".into()),
            username: Some("mailer".into()),
            password: Some("secret".into()),
            from: "not an address".into(),
        };
        assert!(SmtpMailer::new(&cfg).is_err());
    }
}
