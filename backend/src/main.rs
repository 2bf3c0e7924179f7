//! Service entry-point: installs the fatal hooks, then serves the API.

mod server;

use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use faultline::AppSettings;
use faultline::fatal::{
    install_uncaught_exception_hook, install_unhandled_rejection_hook, process_exit,
    unhandled_rejections,
};
use faultline::inbound::http::tokens::TokenVerifier;
use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    install_uncaught_exception_hook(process_exit());

    let settings = AppSettings::load()
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let mode = settings.error_mode();
    let secret = settings.jwt_secret().ok_or_else(|| {
        std::io::Error::other("FAULTLINE_JWT_SECRET must be set to verify tokens")
    })?;

    let (rejections, watch) = unhandled_rejections();

    let bind_addr = (settings.host().to_owned(), settings.port());
    info!(host = %bind_addr.0, port = bind_addr.1, ?mode, "starting server");
    let server = create_server(ServerConfig::new(
        mode,
        bind_addr,
        TokenVerifier::hs256(secret.as_bytes()),
        rejections,
    ))?;

    let mut rejection_hook =
        install_unhandled_rejection_hook(watch, Some(server.handle()), process_exit());
    server.await?;

    // A stop requested by the rejection hook also lands here; finish the
    // fatal exit instead of returning success.
    if let Some(rejection) = rejection_hook.take_trigger() {
        rejection_hook.join().await.map_err(std::io::Error::other)?;
        return Err(std::io::Error::other(format!(
            "stopped after unhandled rejection in {}: {}",
            rejection.name, rejection.message
        )));
    }
    Ok(())
}
