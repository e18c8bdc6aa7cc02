mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::*;
use paper_generator::api::{create_router, AppState};
use paper_generator::{Database, GenerationError};
use serde_json::{json, Value};
use std::sync::Arc;

async fn create_test_server(client: Arc<ScriptedClient>) -> (TestServer, Database) {
    let (paper_service, db) = service_with(client, &["sk-test-key"]).await;
    let app = create_router(AppState { paper_service });
    (TestServer::new(app).unwrap(), db)
}

#[tokio::test]
async fn test_health() {
    let (server, _db) = create_test_server(ScriptedClient::new()).await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], "ok");
}

#[tokio::test]
async fn test_api_create_user() {
    let (server, _db) = create_test_server(ScriptedClient::new()).await;

    let response = server
        .post("/api/v1/users")
        .json(&json!({ "username": "alice" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"]["id"].is_i64());

    let duplicate = server
        .post("/api/v1/users")
        .json(&json!({ "username": "alice" }))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);

    let missing = server.post("/api/v1/users").json(&json!({})).await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = missing.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_api_create_paper() {
    let client = ScriptedClient::new().reply(&four_section_completion());
    let (server, db) = create_test_server(client).await;
    seed_users(&db, 7).await;

    let response = server
        .post("/api/v1/papers")
        .json(&json!({
            "title": "Cell Biology",
            "content": { "grade_level": "10", "timeline": "45 min" },
            "user_id": 7
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["title"], "Cell Biology");
    assert_eq!(body["data"]["grade_level"], "10");
    assert_eq!(body["data"]["timeline"], "45 min");
    assert_eq!(body["data"]["questions"].as_array().unwrap().len(), 37);
    assert!(body["data"].get("error").is_none());
}

#[tokio::test]
async fn test_api_create_paper_without_user_id() {
    let client = ScriptedClient::new().reply(&four_section_completion());
    let (server, db) = create_test_server(client.clone()).await;

    let response = server
        .post("/api/v1/papers")
        .json(&json!({ "title": "Cell Biology", "content": "cells" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("user_id is required"));
    assert_eq!(db.count_papers().await.unwrap(), 0);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_api_fallback_paper_reports_error() {
    let client = ScriptedClient::new().fail(GenerationError::RemoteStatus {
        status: 429,
        body: "rate limited".to_string(),
    });
    let (server, db) = create_test_server(client).await;
    seed_users(&db, 1).await;

    let response = server
        .post("/api/v1/users/1/papers")
        .json(&json!({ "title": "Algebra", "content": "linear equations" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let questions = body["data"]["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 8);
    assert_eq!(questions[0], "Q: What is the main idea of Algebra?");
    assert!(body["data"]["error"].as_str().unwrap().contains("429"));
}

#[tokio::test]
async fn test_api_create_paper_for_user_requires_content() {
    let (server, db) = create_test_server(ScriptedClient::new()).await;
    seed_users(&db, 1).await;

    let response = server
        .post("/api/v1/users/1/papers")
        .json(&json!({ "title": "Algebra" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(db.count_papers().await.unwrap(), 0);
}

#[tokio::test]
async fn test_api_create_paper_for_unknown_user() {
    let (server, _db) = create_test_server(ScriptedClient::new()).await;

    let response = server
        .post("/api/v1/users/99/papers")
        .json(&json!({ "title": "Algebra", "content": "fractions" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_get_paper_and_user_papers() {
    let client = ScriptedClient::new().reply("Short Answer\nQ: What is a prime?\nQ: What is a factor?");
    let (server, db) = create_test_server(client).await;
    seed_users(&db, 1).await;

    let created: Value = server
        .post("/api/v1/users/1/papers")
        .json(&json!({ "title": "Number Theory", "content": "primes" }))
        .await
        .json();
    let paper_id = created["data"]["id"].as_i64().unwrap();

    let response = server.get(&format!("/api/v1/papers/{}", paper_id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["title"], "Number Theory");
    assert_eq!(body["data"]["user_id"], 1);
    assert_eq!(
        body["data"]["questions"],
        json!(["Q: What is a prime?", "Q: What is a factor?"])
    );

    let listed: Value = server.get("/api/v1/users/1/papers").await.json();
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["id"], paper_id);

    server.get("/api/v1/papers/12345").await.assert_status(StatusCode::NOT_FOUND);
    server.get("/api/v1/users/55/papers").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_regenerate_question() {
    let client = ScriptedClient::new()
        .reply("Short Answer\nQ: Original wording")
        .reply("Q: Fresh wording")
        .reply("Q: Fresh wording again");
    let (server, db) = create_test_server(client).await;
    seed_users(&db, 1).await;

    let created: Value = server
        .post("/api/v1/users/1/papers")
        .json(&json!({ "title": "Physics", "content": "motion" }))
        .await
        .json();
    let paper_id = created["data"]["id"].as_i64().unwrap();
    let question_id = db.get_questions_for_paper(paper_id).await.unwrap()[0].id;
    let path = format!("/api/v1/papers/{}/questions/{}/regenerate", paper_id, question_id);

    let response = server
        .put(&path)
        .json(&json!({ "extra_prompt": "use a falling apple" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["text"], "Q: Fresh wording");

    // Body is optional
    let response = server.put(&path).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["text"], "Q: Fresh wording again");

    let malformed = server.put(&path).text("{ \"extra_prompt\": ").await;
    malformed.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = malformed.json();
    assert!(body["error"].as_str().unwrap().contains("Invalid JSON body"));
    let stored = db.get_question(question_id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Q: Fresh wording again");

    server
        .put(&format!("/api/v1/papers/{}/questions/9999/regenerate", paper_id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_generate_new_question() {
    let client = ScriptedClient::new()
        .reply("Short Answer\nQ: Only question")
        .fail(GenerationError::RemoteStatus {
            status: 500,
            body: "boom".to_string(),
        })
        .reply("Added question");
    let (server, db) = create_test_server(client).await;
    seed_users(&db, 1).await;

    let created: Value = server
        .post("/api/v1/users/1/papers")
        .json(&json!({ "title": "Chemistry", "content": "acids" }))
        .await
        .json();
    let paper_id = created["data"]["id"].as_i64().unwrap();
    let path = format!("/api/v1/papers/{}/questions/generate", paper_id);

    let failed = server.post(&path).await;
    failed.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(db.count_questions().await.unwrap(), 1);

    let response = server.post(&path).await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["data"]["text"], "Q: Added question");
    assert_eq!(body["data"]["question_paper_id"], paper_id);
    assert_eq!(db.count_questions().await.unwrap(), 2);

    let missing = server.post("/api/v1/papers/4242/questions/generate").await;
    missing.assert_status(StatusCode::NOT_FOUND);
    let body: Value = missing.json();
    assert_eq!(body["error"], "Paper not found");
}
