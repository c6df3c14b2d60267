pub mod config;
pub mod mailer;
pub mod relay;
pub mod static_pages;

use axum::{
    handler::Handler,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use config::AppConfig;
use mailer::Mailer;
use relay::ContactFormRelay;
use std::{path::PathBuf, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// State shared by all request handlers. Built once at startup and read-only
/// afterwards.
pub struct AppState<MailerT: Mailer> {
    pub relay: Arc<ContactFormRelay<MailerT>>,
    pub static_dir: PathBuf,
}

impl<MailerT: Mailer> AppState<MailerT> {
    pub fn new(config: &AppConfig, mailer: MailerT) -> Self {
        Self {
            relay: Arc::new(ContactFormRelay::new(config, mailer)),
            static_dir: config.static_dir.clone(),
        }
    }
}

impl<MailerT: Mailer> Clone for AppState<MailerT> {
    fn clone(&self) -> Self {
        Self {
            relay: self.relay.clone(),
            static_dir: self.static_dir.clone(),
        }
    }
}

pub fn build_router<MailerT: Mailer>(state: AppState<MailerT>) -> Router {
    // Unmatched paths and methods all take the soft 404 fallback, with real
    // static assets still served from the static root.
    let static_assets = ServeDir::new(&state.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(static_pages::fallback::<MailerT>.with_state(state.clone()));
    Router::new()
        .route(
            "/",
            get(static_pages::landing_page::<MailerT>).fallback(static_pages::fallback::<MailerT>),
        )
        .route(
            "/contact",
            get(static_pages::contact_page::<MailerT>).fallback(static_pages::fallback::<MailerT>),
        )
        .route(
            "/api/contact",
            post(relay::send_contact_form::<MailerT>)
                .fallback(static_pages::fallback::<MailerT>),
        )
        .fallback_service(static_assets)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
