//! Server construction and middleware wiring.

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::body::{EitherBody, BoxBody};
use actix_web::{App, HttpServer, web};

use faultline::fatal::RejectionReporter;
use faultline::inbound::http::tokens::{TokenVerifier, verify_token};
use faultline::inbound::http::{ErrorMode, catch_async, unmatched_route};
use faultline::middleware::NormalizeErrors;

/// Settings the HTTP server is built from.
pub struct ServerConfig {
    pub(crate) mode: ErrorMode,
    pub(crate) bind_addr: (String, u16),
    pub(crate) verifier: TokenVerifier,
    pub(crate) rejections: RejectionReporter,
}

impl ServerConfig {
    /// Construct a server configuration.
    ///
    /// `rejections` is registered as app data; handlers that start background
    /// work spawn it through [`RejectionReporter::spawn`] so a failure there
    /// shuts the service down.
    #[must_use]
    pub fn new(
        mode: ErrorMode,
        bind_addr: (String, u16),
        verifier: TokenVerifier,
        rejections: RejectionReporter,
    ) -> Self {
        Self {
            mode,
            bind_addr,
            verifier,
            rejections,
        }
    }
}

fn build_app(
    mode: ErrorMode,
    verifier: web::Data<TokenVerifier>,
    rejections: web::Data<RejectionReporter>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<EitherBody<BoxBody>>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api/v1").route(
        "/tokens/verify",
        web::post().to(catch_async(verify_token)),
    );

    App::new()
        .app_data(verifier)
        .app_data(rejections)
        .wrap(NormalizeErrors::new(mode))
        .service(api)
        .default_service(web::to(unmatched_route))
}

/// Construct an Actix HTTP server from `config`.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(config: ServerConfig) -> std::io::Result<Server> {
    let ServerConfig {
        mode,
        bind_addr,
        verifier,
        rejections,
    } = config;
    let verifier = web::Data::new(verifier);
    let rejections = web::Data::new(rejections);

    let server = HttpServer::new(move || build_app(mode, verifier.clone(), rejections.clone()))
        .bind(bind_addr)?
        .run();
    Ok(server)
}
