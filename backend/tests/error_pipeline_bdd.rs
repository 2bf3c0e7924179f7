//! Behaviour tests for the failure response pipeline.
//!
//! Each scenario boots an in-process Actix app wrapped in the normalising
//! middleware and checks the envelope a client receives.

use std::cell::RefCell;

use actix_web::{App, HttpResponse, test as actix_test, web};
use faultline::domain::Failure;
use faultline::inbound::http::{ApiResult, ErrorMode, catch_async, unmatched_route};
use faultline::middleware::NormalizeErrors;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;

async fn missing_tour() -> ApiResult<HttpResponse> {
    Err(Failure::unexpected_with(
        "ReferenceError",
        "tour is not defined",
        None,
    ))
}

async fn tour_by_id(id: web::Path<String>) -> ApiResult<HttpResponse> {
    Err(Failure::cast("_id", id.into_inner()))
}

async fn register_user() -> ApiResult<HttpResponse> {
    Err(Failure::duplicate_key(
        "E11000 duplicate key error collection: natours.users index: email_1 dup key: { email: \"ada@example.com\" }",
    ))
}

enum Request {
    Get(String),
    RegisterUser,
}

struct Reply {
    status: u16,
    body: Value,
}

struct PipelineWorld {
    mode: RefCell<ErrorMode>,
    reply: RefCell<Option<Reply>>,
}

impl PipelineWorld {
    fn new() -> Self {
        Self {
            mode: RefCell::new(ErrorMode::Production),
            reply: RefCell::new(None),
        }
    }

    fn send(&self, request: Request) {
        let mode = *self.mode.borrow();
        let reply = actix_web::rt::System::new().block_on(async move {
            let app = actix_test::init_service(
                App::new()
                    .wrap(NormalizeErrors::new(mode))
                    .route("/api/v1/tours/boom", web::get().to(catch_async(missing_tour)))
                    .route("/api/v1/tours/{id}", web::get().to(catch_async(tour_by_id)))
                    .route("/api/v1/users", web::post().to(catch_async(register_user)))
                    .default_service(web::to(unmatched_route)),
            )
            .await;
            let req = match request {
                Request::Get(path) => actix_test::TestRequest::get().uri(&path),
                Request::RegisterUser => actix_test::TestRequest::post().uri("/api/v1/users"),
            };
            let res = actix_test::call_service(&app, req.to_request()).await;
            let status = res.status().as_u16();
            let body: Value = actix_test::read_body_json(res).await;
            Reply { status, body }
        });
        *self.reply.borrow_mut() = Some(reply);
    }

    fn with_reply<F>(&self, f: F)
    where
        F: FnOnce(&Reply),
    {
        let reply = self.reply.borrow();
        f(reply.as_ref().expect("a request should have been sent"));
    }
}

#[fixture]
fn world() -> PipelineWorld {
    PipelineWorld::new()
}

#[given("the service runs in {environment} mode")]
fn the_service_runs_in_mode(world: &PipelineWorld, environment: String) {
    *world.mode.borrow_mut() = ErrorMode::from_environment(Some(&environment));
}

#[when("the client requests {path}")]
fn the_client_requests(world: &PipelineWorld, path: String) {
    world.send(Request::Get(path));
}

#[when("the client registers a user with a taken email")]
fn the_client_registers_a_user_with_a_taken_email(world: &PipelineWorld) {
    world.send(Request::RegisterUser);
}

#[then("the response status is {status}")]
fn the_response_status_is(world: &PipelineWorld, status: u16) {
    world.with_reply(|reply| assert_eq!(reply.status, status));
}

#[then("the response status label is {label}")]
fn the_response_status_label_is(world: &PipelineWorld, label: String) {
    world.with_reply(|reply| assert_eq!(reply.body["status"], label.as_str()));
}

#[then("the response message is {message}")]
fn the_response_message_is(world: &PipelineWorld, message: String) {
    world.with_reply(|reply| assert_eq!(reply.body["message"], message.as_str()));
}

#[then("the response names the duplicated email")]
fn the_response_names_the_duplicated_email(world: &PipelineWorld) {
    world.with_reply(|reply| {
        assert_eq!(
            reply.body["message"],
            "Duplicate field value: \"ada@example.com\"."
        );
    });
}

#[then("the response carries no diagnostics")]
fn the_response_carries_no_diagnostics(world: &PipelineWorld) {
    world.with_reply(|reply| {
        let fields = reply.body.as_object().expect("body should be an object");
        assert_eq!(fields.len(), 2, "unexpected fields in {}", reply.body);
    });
}

#[then("the response carries the raw failure")]
fn the_response_carries_the_raw_failure(world: &PipelineWorld) {
    world.with_reply(|reply| {
        assert_eq!(reply.body["error"]["message"], "tour is not defined");
    });
}

#[then("the raw failure is named {name}")]
fn the_raw_failure_is_named(world: &PipelineWorld, name: String) {
    world.with_reply(|reply| assert_eq!(reply.body["error"]["name"], name.as_str()));
}

#[then("the response stack starts with {prefix}")]
fn the_response_stack_starts_with(world: &PipelineWorld, prefix: String) {
    world.with_reply(|reply| {
        let stack = reply.body["stack"].as_str().expect("stack should be a string");
        assert!(stack.starts_with(&prefix), "stack was {stack}");
    });
}

#[scenario(
    path = "tests/features/error_pipeline.feature",
    name = "Production hides unexpected failures"
)]
fn production_hides_unexpected_failures(world: PipelineWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/error_pipeline.feature",
    name = "Production translates malformed identifiers"
)]
fn production_translates_malformed_identifiers(world: PipelineWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/error_pipeline.feature",
    name = "Production translates duplicate keys"
)]
fn production_translates_duplicate_keys(world: PipelineWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/error_pipeline.feature",
    name = "Development exposes the raw failure"
)]
fn development_exposes_the_raw_failure(world: PipelineWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/error_pipeline.feature",
    name = "Unmatched routes are reported as operational 404s"
)]
fn unmatched_routes_are_reported_as_operational_404s(world: PipelineWorld) {
    drop(world);
}
