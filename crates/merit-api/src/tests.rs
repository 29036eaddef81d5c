//! Router tests driven through `tower::ServiceExt::oneshot` against the
//! in-memory backend.

use std::{sync::Arc, sync::atomic::Ordering};

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Method, Request, StatusCode},
};
use merit_core::{
  AchievementService,
  directory::{Lecturer, Role, Student},
  memory::MemoryBackend,
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{
  ApiState, api_router,
  identity::{USER_ID_HEADER, USER_ROLE_HEADER},
};

struct Harness {
  backend: MemoryBackend,
  router:  Router,
  student: Uuid,
  advisor: Uuid,
  admin:   Uuid,
}

fn harness() -> Harness {
  let backend = MemoryBackend::default();
  let student = Uuid::new_v4();
  let advisor = Uuid::new_v4();
  let lecturer_id = Uuid::new_v4();

  backend.directory.add_lecturer(Lecturer {
    id:            lecturer_id,
    user_id:       advisor,
    lecturer_code: "L001".into(),
    full_name:     "Dr. Sari".into(),
  });
  backend.directory.add_student(Student {
    id:           Uuid::new_v4(),
    user_id:      student,
    student_code: "NIM123".into(),
    full_name:    "Panji".into(),
    advisor_id:   Some(lecturer_id),
  });

  let state = Arc::new(ApiState::new(AchievementService::new(backend.clone())));
  Harness {
    backend,
    router: api_router(state),
    student,
    advisor,
    admin: Uuid::new_v4(),
  }
}

fn request(method: Method, uri: &str, user: Uuid, role: Role, body: Option<Value>) -> Request<Body> {
  let builder = Request::builder()
    .method(method)
    .uri(uri)
    .header(USER_ID_HEADER, user.to_string())
    .header(USER_ROLE_HEADER, role.to_string());
  match body {
    Some(v) => builder
      .header("content-type", "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
  let resp = router.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, body)
}

fn competition() -> Value {
  json!({
    "achievement_type": "competition",
    "title": "Juara 1",
    "description": "Lomba nasional",
    "tags": ["coding"],
    "details": { "rank": "1", "injected": "x", "eventDate": "2024-05-17T09:00:00Z" }
  })
}

async fn create(h: &Harness) -> String {
  let (status, body) = send(
    &h.router,
    request(Method::POST, "/achievements", h.student, Role::Student, Some(competition())),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["data"]["id"].as_str().unwrap().to_owned()
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_identity_is_unauthorized() {
  let h = harness();
  let req = Request::builder().uri("/achievements").body(Body::empty()).unwrap();
  let (status, body) = send(&h.router, req).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn unknown_role_is_unauthorized() {
  let h = harness();
  let req = Request::builder()
    .uri("/achievements")
    .header(USER_ID_HEADER, h.student.to_string())
    .header(USER_ROLE_HEADER, "dean")
    .body(Body::empty())
    .unwrap();
  let (status, _) = send(&h.router, req).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_envelope() {
  let h = harness();
  let (status, body) = send(
    &h.router,
    request(Method::POST, "/achievements", h.student, Role::Student, Some(competition())),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["status"], "success");
  assert_eq!(body["data"]["status"], "draft");
  assert!(body["data"]["reference_id"].is_string());
  assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn create_missing_title_is_validation_error() {
  let h = harness();
  let (status, body) = send(
    &h.router,
    request(
      Method::POST,
      "/achievements",
      h.student,
      Role::Student,
      Some(json!({"achievement_type": "competition", "title": ""})),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["status"], "error");
  assert!(body["errors"][0].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
  let h = harness();
  let req = Request::builder()
    .method(Method::POST)
    .uri("/achievements")
    .header(USER_ID_HEADER, h.student.to_string())
    .header(USER_ROLE_HEADER, "student")
    .header("content-type", "application/json")
    .body(Body::from("{not json"))
    .unwrap();
  let (status, body) = send(&h.router, req).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn end_to_end_competition_flow() {
  let h = harness();
  let id = create(&h).await;

  let (status, _) = send(
    &h.router,
    request(Method::POST, &format!("/achievements/{id}/submit"), h.student, Role::Student, None),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = send(
    &h.router,
    request(Method::POST, &format!("/achievements/{id}/verify"), h.advisor, Role::Advisor, None),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["status"], "verified");

  let (status, body) = send(
    &h.router,
    request(Method::GET, &format!("/achievements/{id}"), h.student, Role::Student, None),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["status"], "verified");
  assert_eq!(body["data"]["event_date"], "2024-05-17");
  assert_eq!(body["data"]["details"]["rank"], "1");
  assert!(body["data"]["details"].get("injected").is_none());

  let (status, _) = send(
    &h.router,
    request(Method::POST, &format!("/achievements/{id}/verify"), h.advisor, Role::Advisor, None),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reject_then_history() {
  let h = harness();
  let id = create(&h).await;
  send(
    &h.router,
    request(Method::POST, &format!("/achievements/{id}/submit"), h.student, Role::Student, None),
  )
  .await;

  let (status, _) = send(
    &h.router,
    request(
      Method::POST,
      &format!("/achievements/{id}/reject"),
      h.admin,
      Role::Admin,
      Some(json!({"note": "certificate missing"})),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = send(
    &h.router,
    request(Method::GET, &format!("/achievements/{id}/history"), h.student, Role::Student, None),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let statuses: Vec<_> = body["data"]
    .as_array()
    .unwrap()
    .iter()
    .map(|e| e["status"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(statuses, ["draft", "submitted", "rejected"]);
  assert_eq!(body["data"][2]["note"], "certificate missing");
}

#[tokio::test]
async fn student_cannot_verify() {
  let h = harness();
  let id = create(&h).await;
  let (status, body) = send(
    &h.router,
    request(Method::POST, &format!("/achievements/{id}/verify"), h.student, Role::Student, None),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn unknown_id_is_not_found_and_bad_id_is_bad_request() {
  let h = harness();
  let (status, _) = send(
    &h.router,
    request(
      Method::GET,
      &format!("/achievements/{}", Uuid::new_v4()),
      h.student,
      Role::Student,
      None,
    ),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) =
    send(&h.router, request(Method::GET, "/achievements/not-a-uuid", h.student, Role::Student, None))
      .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_submitted_is_bad_request() {
  let h = harness();
  let id = create(&h).await;
  send(
    &h.router,
    request(Method::POST, &format!("/achievements/{id}/submit"), h.student, Role::Student, None),
  )
  .await;

  let (status, _) = send(
    &h.router,
    request(Method::DELETE, &format!("/achievements/{id}"), h.student, Role::Student, None),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_failure_is_generic_500() {
  let h = harness();
  h.backend.content.faults.insert.store(true, Ordering::SeqCst);

  let (status, body) = send(
    &h.router,
    request(Method::POST, "/achievements", h.student, Role::Student, Some(competition())),
  )
  .await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["message"], "internal server error");
}

#[tokio::test]
async fn concurrent_write_is_conflict() {
  let h = harness();
  let id = create(&h).await;
  h.backend.references.faults.race.store(true, Ordering::SeqCst);

  let (status, _) = send(
    &h.router,
    request(Method::POST, &format!("/achievements/{id}/submit"), h.student, Role::Student, None),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

// ─── Attachments ─────────────────────────────────────────────────────────────

fn multipart(user: Uuid, uri: &str, files: &[(&str, &[u8])]) -> Request<Body> {
  let boundary = "merit-test-boundary";
  let mut body = Vec::new();
  for (name, bytes) in files {
    body.extend_from_slice(
      format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; \
         filename=\"{name}\"\r\nContent-Type: application/pdf\r\n\r\n"
      )
      .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

  Request::builder()
    .method(Method::POST)
    .uri(uri)
    .header(USER_ID_HEADER, user.to_string())
    .header(USER_ROLE_HEADER, "student")
    .header("content-type", format!("multipart/form-data; boundary={boundary}"))
    .body(Body::from(body))
    .unwrap()
}

#[tokio::test]
async fn attachments_are_appended() {
  let h = harness();
  let id = create(&h).await;
  let uri = format!("/achievements/{id}/attachments");

  let (status, body) = send(
    &h.router,
    multipart(h.student, &uri, &[("a.pdf", b"%PDF-a"), ("b.pdf", b"%PDF-b")]),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["data"].as_array().unwrap().len(), 2);
  assert_eq!(body["data"][0]["file_name"], "a.pdf");
  assert_eq!(body["data"][0]["file_type"], "application/pdf");

  let (_, detail) = send(
    &h.router,
    request(Method::GET, &format!("/achievements/{id}"), h.student, Role::Student, None),
  )
  .await;
  assert_eq!(detail["data"]["attachments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn attachment_without_files_is_bad_request() {
  let h = harness();
  let id = create(&h).await;
  let (status, _) =
    send(&h.router, multipart(h.student, &format!("/achievements/{id}/attachments"), &[])).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Reads and admin ─────────────────────────────────────────────────────────

#[tokio::test]
async fn advisor_list_shows_only_submitted() {
  let h = harness();
  let draft = create(&h).await;
  let submitted = create(&h).await;
  send(
    &h.router,
    request(
      Method::POST,
      &format!("/achievements/{submitted}/submit"),
      h.student,
      Role::Student,
      None,
    ),
  )
  .await;

  let (status, body) =
    send(&h.router, request(Method::GET, "/achievements", h.advisor, Role::Advisor, None)).await;
  assert_eq!(status, StatusCode::OK);
  let ids: Vec<_> = body["data"].as_array().unwrap().iter().map(|s| s["id"].clone()).collect();
  assert_eq!(ids, vec![json!(submitted)]);
  assert!(!ids.contains(&json!(draft)));
  assert_eq!(body["data"][0]["student_name"], "Panji");
}

#[tokio::test]
async fn admin_endpoints_require_admin() {
  let h = harness();
  let id = create(&h).await;

  let (status, _) = send(
    &h.router,
    request(Method::GET, "/admin/achievements/orphans", h.student, Role::Student, None),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = send(
    &h.router,
    request(Method::GET, &format!("/admin/achievements/{id}/inspect"), h.admin, Role::Admin, None),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["consistent"], true);
  assert_eq!(body["data"]["reference"]["status"], "draft");
}

#[tokio::test]
async fn orphan_left_by_failed_compensation_is_listed() {
  let h = harness();
  h.backend.references.faults.insert.store(true, Ordering::SeqCst);
  h.backend.content.faults.soft_delete.store(true, Ordering::SeqCst);

  let (status, _) = send(
    &h.router,
    request(Method::POST, "/achievements", h.student, Role::Student, Some(competition())),
  )
  .await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

  let (status, body) = send(
    &h.router,
    request(Method::GET, "/admin/achievements/orphans", h.admin, Role::Admin, None),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"].as_array().unwrap().len(), 1);
  assert_eq!(body["data"][0]["title"], "Juara 1");
}
