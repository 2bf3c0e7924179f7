//! Middleware funnelling every failure through one renderer.
//!
//! Actix attaches the error a handler returned to the response it built.
//! [`NormalizeErrors`] recovers that error, turns it back into a
//! [`Failure`], and replaces the response with the envelope for the
//! configured [`ErrorMode`]. Errors raised by inner services come back as
//! errors whose response is that same envelope. Successful responses pass
//! through untouched.

use std::task::{Context, Poll};

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::InternalError;
use actix_web::{Error, HttpResponse};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::debug;

use crate::domain::Failure;
use crate::inbound::http::error::{ErrorMode, render_failure};

/// Recover a [`Failure`] from an Actix error.
///
/// Failures raised by this crate are unwrapped as-is. Anything else is
/// wrapped as an unexpected failure that keeps the framework's status code.
#[must_use]
pub fn failure_from_actix(error: &Error) -> Failure {
    if let Some(failure) = error.as_error::<Failure>() {
        return failure.clone();
    }
    let status = error.as_response_error().status_code();
    Failure::unexpected_with("HttpError", error.to_string(), Some(status.as_u16()))
}

/// Middleware rendering failures for a fixed [`ErrorMode`].
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use faultline::inbound::http::{ErrorMode, unmatched_route};
/// use faultline::middleware::NormalizeErrors;
///
/// let _app = App::new()
///     .wrap(NormalizeErrors::new(ErrorMode::Production))
///     .default_service(web::to(unmatched_route));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NormalizeErrors {
    mode: ErrorMode,
}

impl NormalizeErrors {
    /// Render failures with `mode`.
    #[must_use]
    pub fn new(mode: ErrorMode) -> Self {
        Self { mode }
    }

    /// Mode the middleware renders with.
    #[must_use]
    pub fn mode(&self) -> ErrorMode {
        self.mode
    }
}

impl<S, B> Transform<S, ServiceRequest> for NormalizeErrors
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = NormalizeErrorsMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(NormalizeErrorsMiddleware {
            service,
            mode: self.mode,
        }))
    }
}

/// Service wrapper produced by [`NormalizeErrors`].
///
/// Applications should not use this type directly.
pub struct NormalizeErrorsMiddleware<S> {
    service: S,
    mode: ErrorMode,
}

impl<S, B> Service<ServiceRequest> for NormalizeErrorsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let mode = self.mode;
        // The router needs sole ownership of the request; never clone it here.
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = match fut.await {
                Ok(res) => res,
                Err(error) => {
                    debug!(%error, "inner service failed");
                    let response = render(&error, mode);
                    return Err(InternalError::from_response(error, response).into());
                }
            };
            let Some(error) = res.response().error() else {
                return Ok(res.map_into_left_body());
            };
            let response = render(error, mode);
            let (req, _) = res.into_parts();
            Ok(ServiceResponse::new(req, response).map_into_right_body())
        })
    }
}

fn render(error: &Error, mode: ErrorMode) -> HttpResponse {
    render_failure(failure_from_actix(error), mode)
}
