//! Catch-all handler for requests no route matched.

use actix_web::{HttpRequest, HttpResponse};

use crate::domain::{Failure, OperationalError};

/// Forward a 404 naming the unmatched path into the error pipeline.
///
/// The handler never answers on its own; rendering is left to the
/// normalising middleware. Register it with `App::default_service`.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use faultline::inbound::http::unmatched_route;
///
/// let _app = App::new().default_service(web::to(unmatched_route));
/// ```
pub async fn unmatched_route(req: HttpRequest) -> Result<HttpResponse, Failure> {
    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.path().to_owned(), ToString::to_string);
    Err(OperationalError::not_found(format!("Can't find {target} on this server!")).into())
}

#[cfg(test)]
mod tests {
    //! Tests for the catch-all handler.

    use super::*;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    #[rstest]
    #[case("/api/v1/nowhere", "Can't find /api/v1/nowhere on this server!")]
    #[case("/tours?page=2", "Can't find /tours?page=2 on this server!")]
    #[actix_web::test]
    async fn forwards_a_404_naming_the_path(#[case] uri: &str, #[case] expected: &str) {
        let req = TestRequest::get().uri(uri).to_http_request();
        let Err(failure) = unmatched_route(req).await else {
            panic!("unmatched routes must never answer directly");
        };
        assert_eq!(failure.status_code(), 404);
        assert!(failure.is_operational());
        assert_eq!(failure.message(), expected);
    }
}
