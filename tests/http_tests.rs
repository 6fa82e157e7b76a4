//! End-to-end tests for the HTTP surface.
//!
//! Requests go straight into the router with `tower::ServiceExt::oneshot`,
//! backed by an in-memory database.

use axum::Router;
use axum::body::Body;
use axum::http::request::Builder as RequestBuilder;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use std::sync::Arc;
use task_tracker::db::Database;
use task_tracker::types::{TaskFields, TaskQuery, UserId};
use task_tracker::web::{AppState, build_router};
use tower::ServiceExt;

const FORM: &str = "application/x-www-form-urlencoded";

struct TestApp {
    db: Arc<Database>,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().expect("in-memory database"));
        let router = build_router(AppState::new(db.clone(), chrono::Duration::hours(1)));
        Self { db, router }
    }

    async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.expect("request")
    }

    /// Sign up through the form and return the session cookie pair.
    async fn signup(&self, username: &str) -> String {
        let body = format!("username={username}&password1=pw12345&password2=pw12345");
        let res = self.send(post_form("/signup/", &body, None)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/tasks/");
        session_cookie(&res)
    }

    fn user_id(&self, username: &str) -> UserId {
        self.db.get_user_by_username(username).expect("user").id
    }
}

fn with_cookie(builder: RequestBuilder, cookie: Option<&str>) -> RequestBuilder {
    match cookie {
        Some(cookie) => builder.header(header::COOKIE, cookie),
        None => builder,
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    with_cookie(Request::builder().method("GET").uri(uri), cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    with_cookie(Request::builder().method("POST").uri(uri), cookie)
        .header(header::CONTENT_TYPE, FORM)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    with_cookie(Request::builder().method("POST").uri(uri), cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str, cookie: Option<&str>) -> Request<Body> {
    with_cookie(Request::builder().method("POST").uri(uri), cookie)
        .body(Body::empty())
        .unwrap()
}

fn location(res: &Response) -> String {
    res.headers()[header::LOCATION].to_str().unwrap().to_string()
}

fn session_cookie(res: &Response) -> String {
    let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn body_text(res: Response) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = TestApp::new();
    let res = app.send(get("/health", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "healthy");
}

#[tokio::test]
async fn anonymous_requests_redirect_to_signin() {
    let app = TestApp::new();
    let res = app.send(get("/tasks/", None)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/signin/?next=%2Ftasks%2F");
}

#[tokio::test]
async fn signup_rejects_mismatched_passwords() {
    let app = TestApp::new();
    let res = app
        .send(post_form(
            "/signup/",
            "username=alice&password1=one&password2=two",
            None,
        ))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(res).await.contains("Passwords do not match"));
}

#[tokio::test]
async fn signup_rejects_taken_username() {
    let app = TestApp::new();
    app.signup("alice").await;
    let res = app
        .send(post_form(
            "/signup/",
            "username=alice&password1=pw&password2=pw",
            None,
        ))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(res).await.contains("Username already exists"));
}

#[tokio::test]
async fn signin_follows_next_and_logout_ends_session() {
    let app = TestApp::new();
    app.signup("alice").await;

    let res = app
        .send(post_form(
            "/signin/",
            "username=alice&password=wrong&next=%2Ftasks_completed%2F",
            None,
        ))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(res).await.contains("Username or password is incorrect"));

    let res = app
        .send(post_form(
            "/signin/",
            "username=alice&password=pw12345&next=%2Ftasks_completed%2F",
            None,
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/tasks_completed/");
    let cookie = session_cookie(&res);

    let res = app.send(get("/logout/", Some(&cookie))).await;
    assert_eq!(location(&res), "/");

    let res = app.send(get("/tasks/", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(location(&res).starts_with("/signin/"));
}

#[tokio::test]
async fn create_task_shows_in_pending_list() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;

    let res = app
        .send(post_form(
            "/tasks/create/",
            "title=Buy+milk&description=2+liters&important=on",
            Some(&cookie),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(location(&res).starts_with("/tasks/?msg="));

    let alice = app.user_id("alice");
    let tasks = app.db.list_tasks(alice, &TaskQuery::pending()).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Buy milk");
    assert!(tasks[0].important);
    assert!(tasks[0].completed_at.is_none());

    let res = app.send(get(&location(&res), Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("Buy milk"));
    assert!(html.contains("Tarea creada con éxito."));
}

#[tokio::test]
async fn create_task_with_empty_title_rerenders_form() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;

    let res = app
        .send(post_form("/tasks/create/", "title=&description=x", Some(&cookie)))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(res).await.contains("Ingrese tipos de datos correctos"));

    let alice = app.user_id("alice");
    assert!(app.db.list_tasks(alice, &TaskQuery::pending()).unwrap().is_empty());
}

#[tokio::test]
async fn complete_moves_task_to_completed_list() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    let alice = app.user_id("alice");
    let task = app
        .db
        .create_task(alice, &TaskFields::new("Buy milk"), None)
        .unwrap();

    let res = app
        .send(post_empty(&format!("/tasks/{}/complete/", task.id), Some(&cookie)))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let res = app.send(get("/tasks/", Some(&cookie))).await;
    assert!(!body_text(res).await.contains("Buy milk"));

    let res = app.send(get("/tasks_completed/", Some(&cookie))).await;
    assert!(body_text(res).await.contains("Buy milk"));
    assert!(app.db.get_task(alice, task.id).unwrap().completed());
}

#[tokio::test]
async fn post_only_actions_reject_get() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    let alice = app.user_id("alice");
    let task = app.db.create_task(alice, &TaskFields::new("A"), None).unwrap();
    let sub = app
        .db
        .create_task(alice, &TaskFields::new("a"), Some(task.id))
        .unwrap();

    for (uri, message) in [
        (format!("/tasks/{}/complete/", task.id), "Método no permitido"),
        (format!("/tasks/{}/delete/", task.id), "Método no permitido"),
        (
            format!("/tasks/{}/subtasks/{}/toggle_completion/", task.id, sub.id),
            "Método no permitido para completar la subtarea",
        ),
        (
            format!("/tasks/{}/subtasks/{}/delete/", task.id, sub.id),
            "Método no permitido para eliminar la subtarea",
        ),
    ] {
        let res = app.send(get(&uri, Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED, "{uri}");
        assert_eq!(body_json(res).await["error"], message, "{uri}");
    }

    assert!(!app.db.get_task(alice, task.id).unwrap().completed());
}

#[tokio::test]
async fn subtask_create_and_toggle_round_trip() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    let alice = app.user_id("alice");
    let task = app.db.create_task(alice, &TaskFields::new("Trip"), None).unwrap();

    let res = app
        .send(post_form(
            &format!("/tasks/{}/subtasks/create/", task.id),
            "title=Pack",
            Some(&cookie),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["message"], "Subtarea creada con éxito.");

    let subtasks = app.db.list_subtasks(alice, task.id).unwrap();
    assert_eq!(subtasks.len(), 1);
    let toggle = format!(
        "/tasks/{}/subtasks/{}/toggle_completion/",
        task.id, subtasks[0].id
    );

    let res = app.send(post_empty(&toggle, Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["completed"], true);
    assert_eq!(json["all_subtasks_completed"], true);

    let res = app.send(post_empty(&toggle, Some(&cookie))).await;
    let json = body_json(res).await;
    assert_eq!(json["completed"], false);
    assert_eq!(json["all_subtasks_completed"], false);
}

#[tokio::test]
async fn subtask_create_with_invalid_form_returns_errors() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    let alice = app.user_id("alice");
    let task = app.db.create_task(alice, &TaskFields::new("Trip"), None).unwrap();

    let req = with_cookie(
        Request::builder()
            .method("POST")
            .uri(format!("/tasks/{}/subtasks/create/", task.id)),
        Some(&cookie),
    )
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(r#"{"title": ""}"#))
    .unwrap();

    let res = app.send(req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body_json(res).await;
    assert_eq!(json["error"], "Formulario inválido.");
    assert!(json["errors"]["title"].is_array());
    assert!(app.db.list_subtasks(alice, task.id).unwrap().is_empty());
}

#[tokio::test]
async fn other_users_tasks_are_404() {
    let app = TestApp::new();
    app.signup("alice").await;
    let bob_cookie = app.signup("bob").await;
    let alice = app.user_id("alice");
    let task = app.db.create_task(alice, &TaskFields::new("Secret"), None).unwrap();
    let sub = app
        .db
        .create_task(alice, &TaskFields::new("Inner"), Some(task.id))
        .unwrap();

    let res = app.send(get(&format!("/tasks/{}/", task.id), Some(&bob_cookie))).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .send(post_empty(&format!("/tasks/{}/delete/", task.id), Some(&bob_cookie)))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .send(post_empty(
            &format!("/tasks/{}/subtasks/{}/toggle_completion/", task.id, sub.id),
            Some(&bob_cookie),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    assert!(app.db.get_task(alice, task.id).is_ok());
    assert!(!app.db.get_subtask(alice, task.id, sub.id).unwrap().completed());
}

#[tokio::test]
async fn delete_subtask_returns_message() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    let alice = app.user_id("alice");
    let task = app.db.create_task(alice, &TaskFields::new("A"), None).unwrap();
    let sub = app
        .db
        .create_task(alice, &TaskFields::new("a"), Some(task.id))
        .unwrap();

    let res = app
        .send(post_empty(
            &format!("/tasks/{}/subtasks/{}/delete/", task.id, sub.id),
            Some(&cookie),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["message"], "Subtarea eliminada con éxito.");
    assert!(app.db.list_subtasks(alice, task.id).unwrap().is_empty());
}

#[tokio::test]
async fn undecodable_subtask_body_is_json_400() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    let alice = app.user_id("alice");
    let task = app.db.create_task(alice, &TaskFields::new("Trip"), None).unwrap();
    let uri = format!("/tasks/{}/subtasks/create/", task.id);

    let wrong_type = post_json(&uri, r#"{"title": 5}"#, Some(&cookie));
    let not_json = post_json(&uri, "not json", Some(&cookie));
    let plain_text = with_cookie(Request::builder().method("POST").uri(&uri), Some(&cookie))
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("title=x"))
        .unwrap();

    for req in [wrong_type, not_json, plain_text] {
        let res = app.send(req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            res.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "application/json"
        );
        let json = body_json(res).await;
        assert_eq!(json["error"], "Formulario inválido.");
        assert!(json["errors"]["__all__"].is_array());
    }

    assert!(app.db.list_subtasks(alice, task.id).unwrap().is_empty());
}

#[tokio::test]
async fn subtask_update_returns_message_or_errors() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    let alice = app.user_id("alice");
    let task = app.db.create_task(alice, &TaskFields::new("Trip"), None).unwrap();
    let sub = app
        .db
        .create_task(alice, &TaskFields::new("Pack"), Some(task.id))
        .unwrap();
    let uri = format!("/tasks/{}/subtasks/{}/update/", task.id, sub.id);

    let res = app
        .send(post_form(&uri, "title=Pack+bags&important=on", Some(&cookie)))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await["message"],
        "Subtarea actualizada con éxito."
    );
    let updated = app.db.get_subtask(alice, task.id, sub.id).unwrap();
    assert_eq!(updated.title, "Pack bags");
    assert!(updated.important);

    let res = app
        .send(post_json(&uri, r#"{"title": "  "}"#, Some(&cookie)))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body_json(res).await;
    assert_eq!(json["error"], "Formulario inválido.");
    assert!(json["errors"]["title"].is_array());
    assert_eq!(
        app.db.get_subtask(alice, task.id, sub.id).unwrap().title,
        "Pack bags"
    );
}

#[tokio::test]
async fn subtask_detail_page_shows_subtask() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    let alice = app.user_id("alice");
    let task = app.db.create_task(alice, &TaskFields::new("Trip"), None).unwrap();
    let sub = app
        .db
        .create_task(
            alice,
            &TaskFields::new("Pack & go").with_description("Two bags"),
            Some(task.id),
        )
        .unwrap();

    let res = app
        .send(get(
            &format!("/tasks/{}/subtasks/{}/", task.id, sub.id),
            Some(&cookie),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("Pack &amp; go"));
    assert!(html.contains("Two bags"));
    assert!(html.contains("Pendiente"));

    let other = app.db.create_task(alice, &TaskFields::new("Other"), None).unwrap();
    let res = app
        .send(get(
            &format!("/tasks/{}/subtasks/{}/", other.id, sub.id),
            Some(&cookie),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_edit_redirects_or_rerenders_with_errors() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;
    let alice = app.user_id("alice");
    let task = app.db.create_task(alice, &TaskFields::new("Old"), None).unwrap();
    let uri = format!("/tasks/{}/", task.id);

    let res = app
        .send(post_form(&uri, "title=New&description=d", Some(&cookie)))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(location(&res).starts_with(&format!("/tasks/{}/?msg=", task.id)));
    assert_eq!(app.db.get_task(alice, task.id).unwrap().title, "New");

    let res = app.send(post_form(&uri, "title=", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let html = body_text(res).await;
    assert!(html.contains("Error updating task"));
    assert!(html.contains("This field is required."));
    assert_eq!(app.db.get_task(alice, task.id).unwrap().title, "New");
}

#[tokio::test]
async fn non_integer_ids_are_not_found() {
    let app = TestApp::new();
    let cookie = app.signup("alice").await;

    let res = app.send(get("/tasks/abc/", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(body_text(res).await.contains("No encontrado."));

    let res = app
        .send(post_empty(
            "/tasks/1/subtasks/abc/toggle_completion/",
            Some(&cookie),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(res).await["error"], "No encontrado.");
}
