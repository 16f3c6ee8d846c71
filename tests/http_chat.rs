use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use conference_bot::Survey;
use conference_bot::http::{HttpState, router};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

fn app() -> Router {
    router(HttpState::new(
        Survey::with_defaults().unwrap(),
        16,
        Duration::from_secs(60),
    ))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn say(app: &Router, id: &str, text: &str) -> Value {
    let (status, reply) = send(
        app,
        "POST",
        &format!("/sessions/{id}/messages"),
        Some(json!({ "text": text })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    reply
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_full_session_over_http() {
    let app = app();
    let (status, created) = send(&app, "POST", "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["reply"]["step"], "greeting");
    let id = created["session_id"].as_str().unwrap().to_string();

    say(&app, &id, "Alex").await;
    let reply = say(&app, &id, "zxqv blorp").await;
    assert_eq!(reply["error"], json!({"kind": "no_match", "registry": "sector"}));
    assert_eq!(reply["step"], "ask_sector");

    let reply = say(&app, &id, "we handle billing queries and broadband issues").await;
    assert_eq!(reply["options"][0]["number"], 1);
    assert_eq!(reply["options"][0]["name"], "Telecommunications");

    let reply = say(&app, &id, "9").await;
    assert_eq!(reply["error"]["kind"], "invalid_selection");
    assert_eq!(reply["step"], "confirm_sector");

    say(&app, &id, "1").await;
    say(&app, &id, "automation and recruitment challenges").await;
    say(&app, &id, "1").await;

    let (status, _) = send(&app, "GET", &format!("/sessions/{id}/export"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    say(&app, &id, "2").await;
    say(&app, &id, "We still need to map our hiring pipeline.").await;
    let reply = say(&app, &id, "No, that's all").await;
    assert_eq!(reply["complete"], true);

    let (status, envelope) = send(&app, "GET", &format!("/sessions/{id}/export"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["sessionId"], id.as_str());
    assert_eq!(envelope["data"]["sector"], "Telecommunications");
    assert_eq!(envelope["data"]["planningScore"], 2);
    assert!(envelope["data"].get("resolutionPlan").is_none());

    let (status, _) = send(&app, "DELETE", &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, "GET", &format!("/sessions/{id}/export"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 404);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = app();
    let id = uuid::Uuid::new_v4();
    let (status, _) = send(
        &app,
        "POST",
        &format!("/sessions/{id}/messages"),
        Some(json!({ "text": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_categories_listing() {
    let (status, body) = send(&app(), "GET", "/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sectors"].as_array().unwrap().len(), 14);
    assert_eq!(body["headwinds"][4]["name"], "Shifting workplace realities");
}
