//! Registration mail sent to a freshly created tenant.
//!
//! Runs as deferred work under the new tenant, after the creating
//! transaction committed.

use std::sync::Arc;

use async_trait::async_trait;
use tenant_directory_sdk::TenantIdentity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> anyhow::Result<()>;
}

/// Issues one-time registration tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, tenant: &TenantIdentity) -> anyhow::Result<String>;
}

/// Random UUID v4 tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidTokenIssuer;

#[async_trait]
impl TokenIssuer for UuidTokenIssuer {
    async fn issue(&self, _tenant: &TenantIdentity) -> anyhow::Result<String> {
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

/// Writes mails to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> anyhow::Result<()> {
        tracing::info!(to = %message.to, subject = %message.subject, "mail not delivered, logged only");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WelcomeOutcome {
    Sent,
    /// Tenant has no email or no domain.
    Skipped,
    /// Transport failed. Logged, not retried.
    MailFailed,
}

pub struct WelcomeNotifier {
    mailer: Arc<dyn Mailer>,
    tokens: Arc<dyn TokenIssuer>,
    scheme: String,
}

impl WelcomeNotifier {
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, tokens: Arc<dyn TokenIssuer>, scheme: impl Into<String>) -> Self {
        Self {
            mailer,
            tokens,
            scheme: scheme.into(),
        }
    }

    /// `<scheme>://<domain>/register?token=<token>`
    #[must_use]
    pub fn register_link(&self, domain: &str, token: &str) -> String {
        format!("{}://{domain}/register?token={token}", self.scheme)
    }

    /// Send the registration mail for `tenant`.
    ///
    /// # Errors
    /// Only when no token could be issued. Mail delivery failures are logged
    /// and reported as [`WelcomeOutcome::MailFailed`].
    pub async fn send_welcome(&self, tenant: &TenantIdentity) -> anyhow::Result<WelcomeOutcome> {
        if tenant.email.trim().is_empty() {
            tracing::warn!(tenant.id = %tenant.id, "tenant has no email, skipping registration mail");
            return Ok(WelcomeOutcome::Skipped);
        }
        if tenant.domain.trim().is_empty() {
            tracing::warn!(tenant.id = %tenant.id, "tenant has no domain, skipping registration mail");
            return Ok(WelcomeOutcome::Skipped);
        }

        let token = self.tokens.issue(tenant).await?;
        let link = self.register_link(&tenant.domain, &token);
        let message = MailMessage {
            to: tenant.email.clone(),
            subject: "Tenant registration".to_owned(),
            body: format!(
                "Welcome, {}.\n\nTo complete your registration open: {link}\n\nThis link is valid for 7 days.",
                tenant.name
            ),
        };

        match self.mailer.send(&message).await {
            Ok(()) => {
                tracing::info!(tenant.id = %tenant.id, "registration mail sent");
                Ok(WelcomeOutcome::Sent)
            }
            Err(e) => {
                tracing::error!(tenant.id = %tenant.id, to = %message.to, error = %e, "failed to send registration mail");
                Ok(WelcomeOutcome::MailFailed)
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tenant_directory_sdk::TenantId;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<MailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for Outbox {
        async fn send(&self, message: &MailMessage) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("smtp unreachable");
            }
            self.sent.lock().push(message.clone());
            Ok(())
        }
    }

    struct FixedToken;

    #[async_trait]
    impl TokenIssuer for FixedToken {
        async fn issue(&self, _tenant: &TenantIdentity) -> anyhow::Result<String> {
            Ok("tok-1".to_owned())
        }
    }

    fn tenant(email: &str, domain: &str) -> TenantIdentity {
        TenantIdentity {
            id: TenantId::new(5),
            domain: domain.to_owned(),
            name: "Acme".to_owned(),
            email: email.to_owned(),
        }
    }

    #[tokio::test]
    async fn sends_link_with_scheme_domain_and_token() {
        let outbox = Arc::new(Outbox::default());
        let notifier = WelcomeNotifier::new(outbox.clone(), Arc::new(FixedToken), "https");

        let outcome = notifier
            .send_welcome(&tenant("owner@acme.example", "acme.example"))
            .await
            .unwrap();

        assert_eq!(outcome, WelcomeOutcome::Sent);
        let sent = outbox.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "owner@acme.example");
        assert!(sent[0].body.contains("https://acme.example/register?token=tok-1"));
        assert!(sent[0].body.contains("Acme"));
    }

    #[tokio::test]
    async fn skips_without_email_or_domain() {
        let outbox = Arc::new(Outbox::default());
        let notifier = WelcomeNotifier::new(outbox.clone(), Arc::new(FixedToken), "https");

        for t in [tenant(" ", "acme.example"), tenant("owner@acme.example", "")] {
            assert_eq!(notifier.send_welcome(&t).await.unwrap(), WelcomeOutcome::Skipped);
        }
        assert!(outbox.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn mail_failure_is_not_an_error() {
        let outbox = Arc::new(Outbox {
            fail: true,
            ..Default::default()
        });
        let notifier = WelcomeNotifier::new(outbox, Arc::new(UuidTokenIssuer), "http");
        let outcome = notifier
            .send_welcome(&tenant("owner@acme.example", "acme.example"))
            .await
            .unwrap();
        assert_eq!(outcome, WelcomeOutcome::MailFailed);
    }

    #[test]
    fn register_link_format() {
        let link = WelcomeNotifier::new(Arc::new(LogMailer), Arc::new(UuidTokenIssuer), "http")
            .register_link("a.example", "t");
        assert_eq!(link, "http://a.example/register?token=t");
    }
}
