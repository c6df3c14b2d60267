use site_server::{build_router, config::AppConfig, mailer::SmtpMailer, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };
    info!(
        "Email configuration: account {}, administrator recipient {}",
        config.email_user, config.admin_email
    );

    let mailer = SmtpMailer::from_config(&config)?;
    let state = AppState::new(&config, mailer);

    // Eager connectivity check; routes do not wait for its outcome.
    let relay = state.relay.clone();
    tokio::spawn(async move { relay.verify_mail_service().await });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Server is running on port {}", config.port);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
