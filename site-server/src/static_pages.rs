use crate::{mailer::Mailer, AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::path::Path;
use tracing::error;

pub const LANDING_PAGE: &str = "index.html";
pub const CONTACT_PAGE: &str = "contact.html";

pub async fn landing_page<MailerT: Mailer>(State(state): State<AppState<MailerT>>) -> Response {
    serve_page(&state.static_dir, LANDING_PAGE, StatusCode::OK).await
}

pub async fn contact_page<MailerT: Mailer>(State(state): State<AppState<MailerT>>) -> Response {
    serve_page(&state.static_dir, CONTACT_PAGE, StatusCode::OK).await
}

/// Soft fallback: any path that matches neither a route nor a static asset
/// answers with the landing page content under status 404.
pub async fn fallback<MailerT: Mailer>(State(state): State<AppState<MailerT>>) -> Response {
    serve_page(&state.static_dir, LANDING_PAGE, StatusCode::NOT_FOUND).await
}

async fn serve_page(static_dir: &Path, file: &str, status: StatusCode) -> Response {
    match tokio::fs::read_to_string(static_dir.join(file)).await {
        Ok(content) => (status, Html(content)).into_response(),
        Err(error) => {
            error!("Unable to read static page {file}: {error}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
