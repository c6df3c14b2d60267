use lettre::message::Mailbox;
use std::{fmt::Display, path::PathBuf};

pub const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SMTP_URL: &str = "smtps://smtp.gmail.com";
const DEFAULT_STATIC_DIR: &str = "site";

const EMAIL_USER_VAR: &str = "EMAIL_USER";
const EMAIL_PASS_VAR: &str = "EMAIL_PASS";
const ADMIN_EMAIL_VAR: &str = "ADMIN_EMAIL";

/// Run mode of the server. Only gates whether delivery-failure detail is
/// included in HTTP responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    pub fn is_development(self) -> bool {
        matches!(self, RunMode::Development)
    }
}

/// Process configuration, read once from the environment before the server
/// binds its port.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Outbound account identifier. Doubles as the SMTP username and the
    /// From address of relayed messages.
    pub email_user: String,
    /// Outbound account credential (SMTP password).
    pub email_pass: String,
    /// Administrator recipient address.
    pub admin_email: String,
    pub from_mailbox: Mailbox,
    pub admin_mailbox: Mailbox,
    pub port: u16,
    pub run_mode: RunMode,
    pub smtp_url: String,
    pub static_dir: PathBuf,
}

impl AppConfig {
    /// Reads the configuration from the environment. All missing required
    /// variables are collected before reporting so the operator sees the
    /// complete list at once.
    pub fn from_env() -> Result<Self, EnvironmentError> {
        let email_user = read_var(EMAIL_USER_VAR);
        let email_pass = read_var(EMAIL_PASS_VAR);
        let admin_email = read_var(ADMIN_EMAIL_VAR);

        let missing: Vec<&'static str> = [
            (EMAIL_USER_VAR, &email_user),
            (EMAIL_PASS_VAR, &email_pass),
            (ADMIN_EMAIL_VAR, &admin_email),
        ]
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect();
        if !missing.is_empty() {
            return Err(EnvironmentError::MissingVariables(missing));
        }

        let email_user = email_user.unwrap();
        let email_pass = email_pass.unwrap();
        let admin_email = admin_email.unwrap();

        let from_mailbox = email_user
            .parse()
            .map_err(|_| EnvironmentError::InvalidMailbox(EMAIL_USER_VAR))?;
        let admin_mailbox = admin_email
            .parse()
            .map_err(|_| EnvironmentError::InvalidMailbox(ADMIN_EMAIL_VAR))?;

        let port = match std::env::var("PORT") {
            Ok(value) => value
                .parse()
                .map_err(|_| EnvironmentError::InvalidPort(value))?,
            Err(_) => DEFAULT_PORT,
        };

        let run_mode = match std::env::var("RUN_MODE") {
            Ok(value) if value == "development" => RunMode::Development,
            _ => RunMode::Production,
        };

        let smtp_url = std::env::var("SMTP_URL").unwrap_or_else(|_| DEFAULT_SMTP_URL.into());
        let static_dir = std::env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| DEFAULT_STATIC_DIR.into());

        Ok(Self {
            email_user,
            email_pass,
            admin_email,
            from_mailbox,
            admin_mailbox,
            port,
            run_mode,
            smtp_url,
            static_dir,
        })
    }
}

// An empty value is as unusable as an absent one.
fn read_var(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum EnvironmentError {
    MissingVariables(Vec<&'static str>),
    InvalidMailbox(&'static str),
    InvalidPort(String),
}

impl Display for EnvironmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvironmentError::MissingVariables(names) => {
                write!(
                    f,
                    "Missing required environment variables: {}",
                    names.join(", ")
                )
            }
            EnvironmentError::InvalidMailbox(name) => {
                write!(f, "{name} does not contain a valid email address")
            }
            EnvironmentError::InvalidPort(value) => write!(f, "Invalid PORT value: {value}"),
        }
    }
}

impl std::error::Error for EnvironmentError {}

#[cfg(test)]
mod tests {
    use super::{AppConfig, EnvironmentError, RunMode, DEFAULT_PORT};
    use googletest::prelude::*;
    use serial_test::serial;
    use test_support::temp_env::TemporaryEnv;

    fn required_variables_set() -> Vec<TemporaryEnv> {
        vec![
            TemporaryEnv::new("EMAIL_USER", "site@example.com"),
            TemporaryEnv::new("EMAIL_PASS", "hunter2"),
            TemporaryEnv::new("ADMIN_EMAIL", "admin@example.com"),
            TemporaryEnv::unset("PORT"),
            TemporaryEnv::unset("RUN_MODE"),
            TemporaryEnv::unset("SMTP_URL"),
            TemporaryEnv::unset("STATIC_DIR"),
        ]
    }

    #[googletest::test]
    #[serial]
    fn reads_configuration_with_defaults() -> Result<()> {
        let _env = required_variables_set();

        let config = AppConfig::from_env().unwrap();

        expect_that!(config.email_user, eq("site@example.com"));
        expect_that!(config.admin_email, eq("admin@example.com"));
        expect_that!(config.port, eq(DEFAULT_PORT));
        expect_that!(config.run_mode, eq(RunMode::Production));
        expect_that!(config.smtp_url, starts_with("smtps://"));
        verify_that!(config.static_dir.to_string_lossy(), eq("site"))
    }

    #[googletest::test]
    #[serial]
    fn reports_all_missing_variables_at_once() -> Result<()> {
        let mut env = required_variables_set();
        env.push(TemporaryEnv::unset("EMAIL_USER"));
        env.push(TemporaryEnv::unset("ADMIN_EMAIL"));

        let result = AppConfig::from_env();

        verify_that!(
            result,
            err(matches_pattern!(EnvironmentError::MissingVariables(
                container_eq(vec!["EMAIL_USER", "ADMIN_EMAIL"])
            )))
        )
    }

    #[googletest::test]
    #[serial]
    fn treats_empty_required_variable_as_missing() -> Result<()> {
        let mut env = required_variables_set();
        env.push(TemporaryEnv::new("EMAIL_PASS", ""));

        let result = AppConfig::from_env();

        verify_that!(
            result,
            err(matches_pattern!(EnvironmentError::MissingVariables(
                container_eq(vec!["EMAIL_PASS"])
            )))
        )
    }

    #[googletest::test]
    #[serial]
    fn missing_variable_diagnostic_never_contains_values() -> Result<()> {
        let mut env = required_variables_set();
        env.push(TemporaryEnv::unset("EMAIL_USER"));

        let error = AppConfig::from_env().unwrap_err();

        verify_that!(format!("{error}"), not(contains_substring("hunter2")))
    }

    #[googletest::test]
    #[serial]
    fn honours_port_and_run_mode_overrides() -> Result<()> {
        let mut env = required_variables_set();
        env.push(TemporaryEnv::new("PORT", "8080"));
        env.push(TemporaryEnv::new("RUN_MODE", "development"));

        let config = AppConfig::from_env().unwrap();

        expect_that!(config.port, eq(8080));
        verify_that!(config.run_mode, eq(RunMode::Development))
    }

    #[googletest::test]
    #[serial]
    fn rejects_unparseable_port() -> Result<()> {
        let mut env = required_variables_set();
        env.push(TemporaryEnv::new("PORT", "not-a-port"));

        let result = AppConfig::from_env();

        verify_that!(
            result,
            err(matches_pattern!(EnvironmentError::InvalidPort(eq(
                "not-a-port"
            ))))
        )
    }

    #[googletest::test]
    #[serial]
    fn rejects_unparseable_admin_mailbox() -> Result<()> {
        let mut env = required_variables_set();
        env.push(TemporaryEnv::new("ADMIN_EMAIL", "not a mailbox"));

        let result = AppConfig::from_env();

        verify_that!(
            result,
            err(matches_pattern!(EnvironmentError::InvalidMailbox(eq(
                "ADMIN_EMAIL"
            ))))
        )
    }
}
