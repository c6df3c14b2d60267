use crate::{
    config::{AppConfig, RunMode},
    mailer::Mailer,
    AppState,
};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lettre::message::{Mailbox, MultiPart};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{error, info, warn};

static EMAIL_SHAPE: OnceLock<Regex> = OnceLock::new();

// Deliberately loose: local@domain.tld with no whitespace and no extra '@'.
fn email_shape() -> &'static Regex {
    EMAIL_SHAPE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

/// Validates contact-form submissions and relays them to the administrator
/// by email.
pub struct ContactFormRelay<MailerT: Mailer> {
    from: Mailbox,
    admin: Mailbox,
    run_mode: RunMode,
    mailer: MailerT,
}

impl<MailerT: Mailer> ContactFormRelay<MailerT> {
    pub fn new(config: &AppConfig, mailer: MailerT) -> Self {
        Self {
            from: config.from_mailbox.clone(),
            admin: config.admin_mailbox.clone(),
            run_mode: config.run_mode,
            mailer,
        }
    }

    pub async fn handle(&self, submission: ContactFormSubmission) -> Response {
        info!("Received contact form submission: {submission:?}");
        match self.process(submission).await {
            Ok(()) => (
                StatusCode::OK,
                Json(ApiResponse::success("Message sent successfully")),
            )
                .into_response(),
            Err(error) => {
                error.log();
                error.into_response(self.run_mode)
            }
        }
    }

    async fn process(&self, submission: ContactFormSubmission) -> Result<(), ContactFormError> {
        let validated = submission.validate()?;
        let email = self.construct_email(&validated)?;
        match self.mailer.send(email).await {
            Ok(()) => Ok(()),
            Err(error) => Err(ContactFormError::Delivery {
                description: format!("Error sending message: {error}"),
            }),
        }
    }

    fn construct_email(
        &self,
        submission: &ValidatedSubmission,
    ) -> Result<lettre::Message, ContactFormError> {
        let mut builder = lettre::Message::builder()
            .from(self.from.clone())
            .to(self.admin.clone())
            .subject(format!(
                "New Contact Form Submission from {}",
                submission.name
            ));
        // The submitter is not the envelope sender, so expose them via
        // Reply-To. Skipped if the display form does not parse as a mailbox.
        if let Ok(reply_to) = format!("{} <{}>", submission.name, submission.email).parse() {
            builder = builder.reply_to(reply_to);
        }
        builder
            .multipart(MultiPart::alternative_plain_html(
                submission.plain_body(),
                submission.html_body(),
            ))
            .map_err(|error| ContactFormError::Delivery {
                description: format!("Error building message: {error}"),
            })
    }

    pub async fn verify_mail_service(&self) {
        match self.mailer.check_connection().await {
            Ok(true) => info!("Server is ready to send emails"),
            Ok(false) => warn!("Mail service connection test failed"),
            Err(error) => error!("Mail service verification failed: {error}"),
        }
    }
}

/// Raw request-body form of a submission, before validation.
#[derive(Deserialize, Debug, Default)]
pub struct ContactFormSubmission {
    name: Option<String>,
    email: Option<String>,
    profession: Option<String>,
    message: Option<String>,
}

impl ContactFormSubmission {
    fn validate(&self) -> Result<ValidatedSubmission, ContactFormError> {
        let ContactFormSubmission {
            name: Some(name),
            email: Some(email),
            profession: Some(profession),
            message: Some(message),
        } = self
        else {
            return Err(ContactFormError::MissingFields);
        };
        if [name, email, profession, message]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(ContactFormError::MissingFields);
        }
        if !email_shape().is_match(email) {
            return Err(ContactFormError::InvalidEmailAddress);
        }
        Ok(ValidatedSubmission {
            name,
            email,
            profession,
            message,
        })
    }
}

struct ValidatedSubmission<'a> {
    name: &'a str,
    email: &'a str,
    profession: &'a str,
    message: &'a str,
}

impl ValidatedSubmission<'_> {
    fn plain_body(&self) -> String {
        format!(
            "Name: {}\nEmail: {}\nProfession: {}\nMessage: {}\n",
            self.name, self.email, self.profession, self.message
        )
    }

    fn html_body(&self) -> String {
        format!(
            "<h3>New Contact Form Submission</h3>\
             <p><strong>Name:</strong> {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Profession:</strong> {}</p>\
             <p><strong>Message:</strong> {}</p>",
            escape_html(self.name),
            escape_html(self.email),
            escape_html(self.profession),
            escape_html(self.message)
        )
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Serialize, Debug)]
pub struct ApiResponse {
    success: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiResponse {
    fn success(message: &'static str) -> Self {
        Self {
            success: true,
            message,
            error: None,
        }
    }

    fn failure(message: &'static str) -> Self {
        Self {
            success: false,
            message,
            error: None,
        }
    }
}

#[derive(Debug)]
pub enum ContactFormError {
    MissingFields,
    InvalidEmailAddress,
    Delivery { description: String },
}

impl ContactFormError {
    fn log(&self) {
        match self {
            ContactFormError::MissingFields => {
                warn!("Validation failed: missing or empty required fields");
            }
            ContactFormError::InvalidEmailAddress => {
                warn!("Validation failed: invalid email address");
            }
            ContactFormError::Delivery { description } => {
                error!("Error sending contact form email: {description}");
            }
        }
    }

    fn into_response(self, run_mode: RunMode) -> Response {
        match self {
            ContactFormError::MissingFields => (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::failure("Please fill in all fields")),
            )
                .into_response(),
            ContactFormError::InvalidEmailAddress => (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::failure("Please enter a valid email address")),
            )
                .into_response(),
            ContactFormError::Delivery { description } => {
                let mut response =
                    ApiResponse::failure("Failed to send message. Please try again later.");
                if run_mode.is_development() {
                    response.error = Some(description);
                }
                (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
            }
        }
    }
}

impl std::fmt::Display for ContactFormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactFormError::MissingFields => write!(f, "Missing or empty required fields"),
            ContactFormError::InvalidEmailAddress => write!(f, "Invalid email address"),
            ContactFormError::Delivery { description } => write!(f, "{description}"),
        }
    }
}

impl std::error::Error for ContactFormError {}

pub async fn send_contact_form<MailerT: Mailer>(
    State(state): State<AppState<MailerT>>,
    SubmissionBody(submission): SubmissionBody,
) -> Response {
    state.relay.handle(submission).await
}

/// Decodes the request body as JSON or URL-encoded form data, chosen by
/// Content-Type. A body that fails to decode becomes an empty submission,
/// which the presence check then rejects.
pub struct SubmissionBody(pub ContactFormSubmission);

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for SubmissionBody {
    type Rejection = std::convert::Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
        let Ok(bytes) = Bytes::from_request(req, state).await else {
            return Ok(Self(ContactFormSubmission::default()));
        };
        let submission = if is_form {
            serde_urlencoded::from_bytes(&bytes).unwrap_or_default()
        } else {
            serde_json::from_slice(&bytes).unwrap_or_default()
        };
        Ok(Self(submission))
    }
}
