use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

use crate::config::Config;

const RESET_SUBJECT: &str = "Reset your Oktavian password";

/// Build the frontend link a user follows to redeem a reset token.
pub fn reset_link(frontend_url: &str, token: Uuid) -> anyhow::Result<url::Url> {
    let mut link = url::Url::parse(frontend_url)
        .map_err(|e| anyhow::anyhow!("invalid frontend url '{frontend_url}': {e}"))?
        .join("reset-password")?;
    link.query_pairs_mut()
        .append_pair("token", &token.to_string());
    Ok(link)
}

/// Email a password reset link to `to`. Without SMTP the link is only logged.
#[tracing::instrument(skip(config, token), fields(%to), err)]
pub async fn send_password_reset(config: &Config, to: &str, token: Uuid) -> anyhow::Result<()> {
    let link = reset_link(&config.frontend_url, token)?;
    if config.smtp_host.is_none() {
        tracing::info!(%link, "SMTP not configured, reset link not emailed");
        return Ok(());
    }

    let minutes = config.reset_token_ttl_secs / 60;
    let body = format!(
        "A password reset was requested for your Oktavian account.\n\n\
         Open the link below to choose a new password. It expires in {minutes} minutes \
         and can be used once.\n\n{link}\n\n\
         If you did not request this, you can ignore this email.\n"
    );
    send(config, to, RESET_SUBJECT, &body).await
}

/// Send a plain-text email via SMTP.
///
/// Returns early (with a warning log) if SMTP is not configured.
/// Rejects newlines in `to` and `subject` to prevent header injection.
#[tracing::instrument(skip(config, body), fields(%to), err)]
pub async fn send(config: &Config, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
    let Some(ref smtp_host) = config.smtp_host else {
        tracing::warn!("SMTP not configured, email not sent");
        return Ok(());
    };

    if to.contains(['\n', '\r']) {
        anyhow::bail!("email 'to' address contains invalid characters");
    }
    if subject.contains(['\n', '\r']) {
        anyhow::bail!("email subject contains invalid characters");
    }

    let from: Mailbox = config
        .smtp_from
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid smtp_from address '{}': {e}", config.smtp_from))?;
    let to_mailbox: Mailbox = to
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid recipient address '{to}': {e}"))?;

    let message = Message::builder()
        .from(from)
        .to(to_mailbox)
        .subject(subject)
        .body(body.to_owned())
        .map_err(|e| anyhow::anyhow!("failed to build email: {e}"))?;

    let mut transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
        .map_err(|e| anyhow::anyhow!("SMTP relay setup failed: {e}"))?
        .port(config.smtp_port);
    if let Some(ref username) = config.smtp_username {
        let password = config.smtp_password.as_deref().unwrap_or("");
        transport = transport.credentials(Credentials::new(username.clone(), password.to_owned()));
    }
    let transport = transport.build();

    // One retry on transient failure
    if let Err(first_err) = transport.send(message.clone()).await {
        tracing::warn!(error = %first_err, "email send failed, retrying once");
        transport
            .send(message)
            .await
            .map_err(|e| anyhow::anyhow!("email send failed after retry: {e}"))?;
    }
    tracing::info!(to, subject, "email sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            listen: String::new(),
            database_url: String::new(),
            valkey_url: String::new(),
            jwt_secret: "test".into(),
            token_ttl_hours: 1,
            registration_secret: None,
            reset_token_ttl_secs: 3600,
            smtp_host: None,
            smtp_port: 587,
            smtp_from: "test@example.com".into(),
            smtp_username: None,
            smtp_password: None,
            frontend_url: "https://oktavian.example.org/app/".into(),
            admin_email: "admin@example.com".into(),
            admin_password: None,
            cors_origins: Vec::new(),
            trust_proxy_headers: false,
        }
    }

    #[test]
    fn reset_link_carries_token() {
        let token = Uuid::new_v4();
        let link = reset_link("https://oktavian.example.org/app/", token).unwrap();
        assert_eq!(link.path(), "/app/reset-password");
        assert_eq!(link.query(), Some(format!("token={token}").as_str()));
    }

    #[test]
    fn reset_link_rejects_bad_base() {
        assert!(reset_link("not a url", Uuid::new_v4()).is_err());
    }

    #[tokio::test]
    async fn reset_without_smtp_is_noop() {
        let result = send_password_reset(&test_config(), "user@example.com", Uuid::new_v4()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn reject_newline_in_to() {
        let mut config = test_config();
        config.smtp_host = Some("localhost".into());
        let result = send(
            &config,
            "user@example.com\nBcc: evil@attacker.com",
            "test",
            "body",
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reject_newline_in_subject() {
        let mut config = test_config();
        config.smtp_host = Some("localhost".into());
        let result = send(
            &config,
            "user@example.com",
            "test\r\nBcc: evil@attacker.com",
            "body",
        )
        .await;
        assert!(result.is_err());
    }
}
