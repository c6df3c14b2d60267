use crate::config::AppConfig;
use async_trait::async_trait;
use lettre::{
    transport::smtp::authentication::{Credentials, Mechanism},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Seam between the relay and the mail service, so the relay can be
/// exercised against a recording double in tests.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, message: Message) -> Result<(), MailerError>;

    /// Checks that the mail service is reachable and accepts the configured
    /// credentials.
    async fn check_connection(&self) -> Result<bool, MailerError>;
}

/// Production mailer backed by a shared SMTP transport, built once at
/// startup and never mutated afterwards.
pub struct SmtpMailer(AsyncSmtpTransport<Tokio1Executor>);

impl SmtpMailer {
    pub fn from_config(config: &AppConfig) -> Result<Self, MailerError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::from_url(&config.smtp_url)
            .map_err(MailerError::Transport)?
            .authentication(vec![Mechanism::Plain]);

        // Credentials are only attached over TLS. With a plain smtp:// URL
        // the transport authenticates with nothing and the server rejects
        // the session, rather than the password crossing the wire in clear.
        if config.smtp_url.starts_with("smtps://") {
            builder = builder.credentials(Credentials::new(
                config.email_user.clone(),
                config.email_pass.clone(),
            ));
        }

        Ok(Self(builder.build()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), MailerError> {
        self.0
            .send(message)
            .await
            .map(|_| ())
            .map_err(MailerError::Transport)
    }

    async fn check_connection(&self) -> Result<bool, MailerError> {
        self.0
            .test_connection()
            .await
            .map_err(MailerError::Transport)
    }
}

#[derive(Debug)]
pub enum MailerError {
    Transport(lettre::transport::smtp::Error),
    Refused(String),
}

impl std::fmt::Display for MailerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailerError::Transport(error) => write!(f, "{error}"),
            MailerError::Refused(reason) => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for MailerError {}

#[cfg(test)]
pub mod test_support {
    use super::{Mailer, MailerError};
    use async_trait::async_trait;
    use lettre::Message;
    use std::sync::Mutex;

    /// Records every delivered message, formatted to wire form. Fails every
    /// send with the given reason when poisoned.
    #[derive(Default)]
    pub struct FakeMailer {
        sent: Mutex<Vec<String>>,
        refuse_with: Option<String>,
    }

    impl FakeMailer {
        pub fn new() -> Self {
            Default::default()
        }

        pub fn refusing(reason: impl Into<String>) -> Self {
            Self {
                sent: Default::default(),
                refuse_with: Some(reason.into()),
            }
        }

        pub fn sent_messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(&self, message: Message) -> Result<(), MailerError> {
            if let Some(reason) = self.refuse_with.as_ref() {
                return Err(MailerError::Refused(reason.clone()));
            }
            self.sent
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(&message.formatted()).into_owned());
            Ok(())
        }

        async fn check_connection(&self) -> Result<bool, MailerError> {
            Ok(true)
        }
    }
}
