//! End-to-end tests: the real router over an in-memory SQLite store, driven
//! with `tower::ServiceExt::oneshot`.

use std::{collections::HashMap, sync::Arc};

use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode, header},
};
use chrono::{Datelike, Duration, Utc};
use internlink_api::{AppState, api_router};
use internlink_auth::{
  IdentityResolver, IdentityVerifier, Passwords, TokenIssuer, VerifiedIdentity,
};
use internlink_core::{
  Error, Result,
  principal::{OAuthProvider, PrincipalKind, PrincipalRef},
  workflow::ApplicationWorkflow,
};
use internlink_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &[u8] = b"http-test-secret-http-test-secret";

/// Accepts a fixed set of tokens, each standing for one Google identity.
#[derive(Default)]
struct StubVerifier {
  tokens: HashMap<String, VerifiedIdentity>,
}

impl StubVerifier {
  fn with(mut self, token: &str, subject: &str, email: &str) -> Self {
    self.tokens.insert(token.into(), VerifiedIdentity {
      provider:    OAuthProvider::Google,
      subject:     subject.into(),
      email:       email.into(),
      given_name:  Some("Grace".into()),
      family_name: Some("Hopper".into()),
    });
    self
  }
}

impl IdentityVerifier for StubVerifier {
  async fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
    self.tokens.get(token).cloned().ok_or(Error::InvalidCredentials)
  }
}

async fn app_with(verifier: StubVerifier) -> Router {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let tokens = Arc::new(TokenIssuer::new(SECRET, Duration::hours(24)).unwrap());
  api_router(AppState {
    identity: IdentityResolver::new(store.clone(), Passwords::with_cost(8, 1).unwrap(), tokens),
    workflow: ApplicationWorkflow::new(store),
    verifier: Arc::new(verifier),
  })
}

async fn app() -> Router { app_with(StubVerifier::default()).await }

async fn call(
  app:    &Router,
  method: Method,
  uri:    &str,
  token:  Option<&str>,
  body:   Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, json)
}

fn student_body(email: &str) -> Value {
  json!({
    "email": email,
    "password": "correct horse",
    "firstName": "Ada",
    "lastName": "Lovelace",
    "universityName": "University of London",
    "department": "Mathematics",
    "currentYear": 2,
    "graduationYear": Utc::now().year() + 2,
  })
}

fn company_body(email: &str) -> Value {
  json!({
    "email": email,
    "password": "correct horse",
    "companyName": "Analytical Engines Ltd",
    "industry": "Hardware",
  })
}

async fn register_and_login(app: &Router, kind: &str, body: Value) -> String {
  let email = body["email"].as_str().unwrap().to_owned();
  let (status, _) = call(app, Method::POST, &format!("/auth/register/{kind}"), None, Some(body)).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, resp) = call(
    app,
    Method::POST,
    "/auth/login",
    None,
    Some(json!({ "email": email, "password": "correct horse" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  resp["data"]["token"].as_str().unwrap().to_owned()
}

async fn open_project(app: &Router, company_token: &str) -> String {
  let (status, resp) = call(
    app,
    Method::POST,
    "/projects",
    Some(company_token),
    Some(json!({ "title": "Backend internship" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  resp["data"]["projectId"].as_str().unwrap().to_owned()
}

// ── Envelope ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_response_is_enveloped() {
  let app = app().await;

  let (status, body) = call(&app, Method::POST, "/auth/register/student", None, Some(student_body("a@example.com"))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["success"], true);
  assert_eq!(body["statusCode"], 201);
  assert!(body["timestamp"].is_string());
  assert_eq!(body["data"]["email"], "a@example.com");
  assert_eq!(body["data"]["userType"], "student");
  assert_eq!(body["data"]["firstName"], "Ada");
  assert!(body["data"].get("passwordHash").is_none());

  let (status, body) = call(&app, Method::GET, "/nowhere", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["success"], false);
  assert_eq!(body["statusCode"], 404);

  let (status, body) = call(&app, Method::PUT, "/auth/login", None, None).await;
  assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
  assert_eq!(body["success"], false);
  assert_eq!(body["statusCode"], 405);
  assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
  let app = app().await;
  let (status, body) = call(&app, Method::POST, "/auth/login", None, Some(json!({ "email": 5 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);
  assert!(body["errors"].is_array());
}

// ── Identity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_registration_conflicts() {
  let app = app().await;
  call(&app, Method::POST, "/auth/register/student", None, Some(student_body("dup@example.com"))).await;
  let (status, body) = call(&app, Method::POST, "/auth/register/company", None, Some(company_body("DUP@example.com"))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn registration_validates_profile() {
  let app = app().await;
  let mut body = student_body("v@example.com");
  body["currentYear"] = json!(12);
  let (status, body) = call(&app, Method::POST, "/auth/register/student", None, Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["errors"][0].as_str().unwrap().contains("currentYear"));
}

#[tokio::test]
async fn failed_logins_look_identical() {
  let app = app().await;
  call(&app, Method::POST, "/auth/register/student", None, Some(student_body("pw@example.com"))).await;

  let (s1, b1) = call(&app, Method::POST, "/auth/login", None, Some(json!({ "email": "pw@example.com", "password": "wrong password" }))).await;
  let (s2, b2) = call(&app, Method::POST, "/auth/login", None, Some(json!({ "email": "ghost@example.com", "password": "correct horse" }))).await;

  assert_eq!(s1, StatusCode::UNAUTHORIZED);
  assert_eq!(s2, StatusCode::UNAUTHORIZED);
  assert_eq!(b1["message"], b2["message"]);
  assert_eq!(b1["errors"], b2["errors"]);
}

#[tokio::test]
async fn me_requires_a_valid_session() {
  let app = app().await;
  let token = register_and_login(&app, "company", company_body("hr@example.com")).await;

  let (status, body) = call(&app, Method::GET, "/auth/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["userType"], "company");
  assert_eq!(body["data"]["companyName"], "Analytical Engines Ltd");
  assert_eq!(body["data"]["hasPassword"], true);

  let (status, _) = call(&app, Method::GET, "/auth/me", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  let (status, _) = call(&app, Method::GET, "/auth/me", Some("garbage"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_session_is_unauthorized() {
  let app = app().await;
  let issuer = TokenIssuer::new(SECRET, Duration::hours(1)).unwrap();
  let stale = issuer
    .issue_at(
      PrincipalRef { principal_id: Uuid::new_v4(), kind: PrincipalKind::Student },
      Utc::now() - Duration::hours(2),
    )
    .unwrap();

  let (status, body) = call(&app, Method::GET, "/applications/mine", Some(&stale.token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["message"], "session token has expired");
}

#[tokio::test]
async fn google_login_creates_then_reuses_account() {
  let app = app_with(StubVerifier::default().with("tok-g", "sub-g", "grace@example.com")).await;
  let body = json!({
    "idToken": "tok-g",
    "userType": "student",
    "universityName": "Yale",
    "department": "Mathematics",
    "currentYear": 3,
    "graduationYear": Utc::now().year() + 1,
  });

  let (status, first) = call(&app, Method::POST, "/auth/google-login", None, Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(first["data"]["isNewUser"], true);
  assert_eq!(first["data"]["kind"], "student");

  let (status, second) = call(&app, Method::POST, "/auth/google-login", None, Some(body)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(second["data"]["isNewUser"], false);
  assert_eq!(second["data"]["principalId"], first["data"]["principalId"]);

  let token = second["data"]["token"].as_str().unwrap();
  let (_, me) = call(&app, Method::GET, "/auth/me", Some(token), None).await;
  assert_eq!(me["data"]["firstName"], "Grace");
  assert_eq!(me["data"]["linkedProviders"], json!(["google"]));
  assert_eq!(me["data"]["hasPassword"], false);
}

#[tokio::test]
async fn google_login_kind_mismatch_conflicts() {
  let app = app_with(StubVerifier::default().with("tok-hr", "sub-hr", "hr@example.com")).await;
  call(&app, Method::POST, "/auth/register/company", None, Some(company_body("hr@example.com"))).await;

  let (status, body) = call(
    &app,
    Method::POST,
    "/auth/google-login",
    None,
    Some(json!({ "idToken": "tok-hr", "userType": "student" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn google_login_accepts_provider_token_field() {
  let app = app_with(StubVerifier::default().with("tok-p", "sub-p", "pt@example.com")).await;
  let (status, body) = call(
    &app,
    Method::POST,
    "/auth/google-login",
    None,
    Some(json!({ "providerToken": "tok-p", "userType": "company", "companyName": "Hopper Labs", "industry": "Software" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["data"]["kind"], "company");
}

#[tokio::test]
async fn google_login_with_bad_token_is_unauthorized() {
  let app = app().await;
  let (status, _) = call(
    &app,
    Method::POST,
    "/auth/google-login",
    None,
    Some(json!({ "idToken": "forged", "userType": "company" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Applications ────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_for_unknown_student_is_not_a_duplicate() {
  let app = app().await;
  let company = register_and_login(&app, "company", company_body("c@example.com")).await;
  let project = open_project(&app, &company).await;

  let ghost = TokenIssuer::new(SECRET, Duration::hours(1))
    .unwrap()
    .issue(PrincipalRef { principal_id: Uuid::new_v4(), kind: PrincipalKind::Student })
    .unwrap();
  let (status, body) = call(
    &app,
    Method::POST,
    &format!("/projects/{project}/applications"),
    Some(&ghost.token),
    Some(json!({})),
  )
  .await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["success"], false);
  assert_eq!(body["message"], "internal server error");
}

#[tokio::test]
async fn session_kind_is_enforced() {
  let app = app().await;
  let student = register_and_login(&app, "student", student_body("s@example.com")).await;
  let company = register_and_login(&app, "company", company_body("c@example.com")).await;
  let project = open_project(&app, &company).await;

  let (status, _) = call(&app, Method::POST, "/projects", Some(&student), Some(json!({ "title": "x" }))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let uri = format!("/projects/{project}/applications");
  let (status, _) = call(&app, Method::POST, &uri, Some(&company), Some(json!({}))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&app, Method::GET, "/applications/mine", Some(&company), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&app, Method::POST, &uri, None, Some(json!({}))).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_path_id_is_a_validation_error() {
  let app = app().await;
  let student = register_and_login(&app, "student", student_body("s@example.com")).await;
  let (status, body) = call(&app, Method::GET, "/applications/not-a-uuid", Some(&student), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn submit_without_body_and_duplicate_submit() {
  let app = app().await;
  let student = register_and_login(&app, "student", student_body("s@example.com")).await;
  let company = register_and_login(&app, "company", company_body("c@example.com")).await;
  let project = open_project(&app, &company).await;
  let uri = format!("/projects/{project}/applications");

  let (status, first) = call(&app, Method::POST, &uri, Some(&student), None).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(first["data"]["status"], "pending");
  assert!(first["data"]["coverLetter"].is_null());

  let (status, body) = call(&app, Method::POST, &uri, Some(&student), Some(json!({ "coverLetter": "again" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(
    body["message"]
      .as_str()
      .unwrap()
      .contains(first["data"]["applicationId"].as_str().unwrap())
  );

  let (status, _) = call(&app, Method::POST, &format!("/projects/{}/applications", Uuid::new_v4()), Some(&student), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn scenario_submit_forbidden_accept_then_terminal() {
  let app = app().await;
  let student_a = register_and_login(&app, "student", student_body("a@students.example")).await;
  let company_c = register_and_login(&app, "company", company_body("c@corp.example")).await;
  let company_d = register_and_login(&app, "company", company_body("d@corp.example")).await;
  let project_p = open_project(&app, &company_c).await;

  let (status, submitted) = call(
    &app,
    Method::POST,
    &format!("/projects/{project_p}/applications"),
    Some(&student_a),
    Some(json!({ "coverLetter": "I would love to join." })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let application = submitted["data"]["applicationId"].as_str().unwrap().to_owned();
  let uri = format!("/applications/{application}");

  // Another company may neither review nor read it.
  let (status, _) = call(&app, Method::PATCH, &uri, Some(&company_d), Some(json!({ "status": "accepted" }))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call(&app, Method::GET, &uri, Some(&company_d), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, accepted) = call(&app, Method::PATCH, &uri, Some(&company_c), Some(json!({ "status": "ACCEPTED" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(accepted["data"]["status"], "accepted");
  assert!(accepted["data"]["reviewedAt"].is_string());

  let (status, body) = call(&app, Method::PATCH, &uri, Some(&company_c), Some(json!({ "status": "rejected" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["success"], false);

  // The applicant sees the outcome.
  let (status, mine) = call(&app, Method::GET, "/applications/mine", Some(&student_a), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(mine["data"][0]["status"], "accepted");

  let (status, listed) = call(&app, Method::GET, &format!("/projects/{project_p}/applications"), Some(&company_c), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(listed["data"].as_array().unwrap().len(), 1);

  let (status, _) = call(&app, Method::GET, &format!("/projects/{project_p}/applications"), Some(&company_d), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn another_students_application_is_not_found() {
  let app = app().await;
  let owner = register_and_login(&app, "student", student_body("owner@example.com")).await;
  let snoop = register_and_login(&app, "student", student_body("snoop@example.com")).await;
  let company = register_and_login(&app, "company", company_body("c@example.com")).await;
  let project = open_project(&app, &company).await;

  let (_, submitted) = call(&app, Method::POST, &format!("/projects/{project}/applications"), Some(&owner), None).await;
  let uri = format!("/applications/{}", submitted["data"]["applicationId"].as_str().unwrap());

  let (status, _) = call(&app, Method::GET, &uri, Some(&owner), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = call(&app, Method::GET, &uri, Some(&snoop), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = call(&app, Method::GET, &format!("/applications/{}", Uuid::new_v4()), Some(&snoop), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_status_in_review_body_is_rejected() {
  let app = app().await;
  let student = register_and_login(&app, "student", student_body("s@example.com")).await;
  let company = register_and_login(&app, "company", company_body("c@example.com")).await;
  let project = open_project(&app, &company).await;
  let (_, submitted) = call(&app, Method::POST, &format!("/projects/{project}/applications"), Some(&student), None).await;
  let uri = format!("/applications/{}", submitted["data"]["applicationId"].as_str().unwrap());

  let (status, _) = call(&app, Method::PATCH, &uri, Some(&company), Some(json!({ "status": "withdrawn" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(&app, Method::PATCH, &uri, Some(&company), Some(json!({ "status": "pending" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
}
