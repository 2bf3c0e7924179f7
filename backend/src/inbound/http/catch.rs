//! Adapter forwarding handler failures into the error pipeline.
//!
//! Handlers may fail with any error convertible into [`Failure`]. Wrapping
//! them with [`catch_async`] keeps their extractor signature and guarantees
//! the failure reaches the normalising middleware instead of being answered
//! by whatever `ResponseError` impl the original error type carries.

use actix_web::Handler;
use futures_util::future::LocalBoxFuture;

use crate::domain::Failure;

/// Handler wrapper produced by [`catch_async`].
#[derive(Clone)]
pub struct CatchAsync<H> {
    handler: H,
}

/// Wrap an async handler so its failures are forwarded as [`Failure`]s.
///
/// # Examples
/// ```
/// use actix_web::{App, HttpResponse, web};
/// use faultline::domain::OperationalError;
/// use faultline::inbound::http::catch_async;
///
/// async fn get_tour(path: web::Path<u32>) -> Result<HttpResponse, OperationalError> {
///     Err(OperationalError::not_found(format!("No tour found with ID {path}")))
/// }
///
/// let _app = App::new().route("/tours/{id}", web::get().to(catch_async(get_tour)));
/// ```
pub fn catch_async<H>(handler: H) -> CatchAsync<H> {
    CatchAsync { handler }
}

impl<H, Args, R, E> Handler<Args> for CatchAsync<H>
where
    H: Handler<Args, Output = Result<R, E>>,
    H::Future: 'static,
    E: Into<Failure> + 'static,
    R: 'static,
{
    type Output = Result<R, Failure>;
    type Future = LocalBoxFuture<'static, Self::Output>;

    fn call(&self, args: Args) -> Self::Future {
        let fut = self.handler.call(args);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    //! Tests for forwarding handler outcomes.

    use super::*;
    use crate::domain::{FailureKind, OperationalError};
    use actix_web::{HttpResponse, web};
    use rstest::rstest;

    async fn succeeding(path: web::Path<String>) -> Result<String, OperationalError> {
        Ok(format!("hello {path}"))
    }

    async fn failing() -> Result<HttpResponse, Failure> {
        Err(Failure::cast("id", "wwwww"))
    }

    async fn failing_operational() -> Result<HttpResponse, OperationalError> {
        Err(OperationalError::new("Tour is sold out", 409))
    }

    #[rstest]
    #[actix_web::test]
    async fn success_passes_through_unchanged() {
        let wrapped = catch_async(succeeding);
        let outcome = wrapped
            .call((web::Path::from("world".to_owned()),))
            .await;
        assert_eq!(outcome.ok().as_deref(), Some("hello world"));
    }

    #[rstest]
    #[actix_web::test]
    async fn failures_are_forwarded_as_is() {
        let wrapped = catch_async(failing);
        let Err(failure) = wrapped.call(()).await else {
            panic!("handler failure must be forwarded");
        };
        assert!(matches!(
            failure.kind(),
            FailureKind::Cast { path, value } if path == "id" && value == "wwwww"
        ));
    }

    #[rstest]
    #[actix_web::test]
    async fn handler_errors_are_converted_into_failures() {
        let wrapped = catch_async(failing_operational);
        let Err(failure) = wrapped.call(()).await else {
            panic!("handler failure must be forwarded");
        };
        assert!(failure.is_operational());
        assert_eq!(failure.status_code(), 409);
        assert_eq!(failure.message(), "Tour is sold out");
    }
}
