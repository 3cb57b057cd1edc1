use httpmock::prelude::*;
use pmrun::collection::{Collection, Environment, VariableEntry};
use pmrun::config::EngineConfig;
use pmrun::engine::Engine;
use pmrun::error::RequestError;
use pretty_assertions::assert_eq;
use serde_json::json;
use tracing::Dispatch;

fn engine() -> Engine {
    Engine::new(EngineConfig::default(), Dispatch::none()).expect("engine builds")
}

fn collection(value: serde_json::Value) -> Collection {
    serde_json::from_value(value).expect("valid collection")
}

#[tokio::test]
async fn resolves_variables_and_runs_tests() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/users")
                .header("Authorization", "Bearer secret123");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"users":[{"id":7,"name":"Ada"}]}"#);
        })
        .await;

    let mut collection = collection(json!({
        "info": { "name": "Demo" },
        "variable": [{ "key": "baseUrl", "value": server.base_url() }],
        "item": [{
            "name": "Users",
            "item": [{
                "name": "List users",
                "request": {
                    "method": "get",
                    "header": [
                        { "key": "Authorization", "value": "Bearer {{apiKey}}" },
                        { "key": "X-Skipped", "value": "1", "disabled": true }
                    ],
                    "url": { "raw": "{{baseUrl}}/api/users" }
                },
                "event": [{
                    "listen": "test",
                    "script": { "exec": [
                        "pm.test('status is 200', () => pm.response.to.have.status(200));",
                        "pm.test('first user', () => {",
                        "  pm.response.to.have.jsonBody('users.0.name', 'Ada');",
                        "});",
                        "pm.test('header present', () => pm.response.to.have.header('Content-Type'));",
                        "pm.environment.set('userId', String(pm.response.json().users[0].id));"
                    ]}
                }]
            }]
        }]
    }));
    let mut environment = Environment {
        name: "local".to_string(),
        values: vec![VariableEntry::new("apiKey", "secret123")],
        ..Environment::default()
    };

    let run = engine()
        .run_request(
            &mut collection,
            &["Users".to_string()],
            "List users",
            Some(&mut environment),
        )
        .await
        .expect("request found");

    mock.assert_async().await;
    assert!(run.passed(), "{run:?}");
    assert_eq!(run.response.status_code, 200);
    assert!(run.response.request.url.starts_with(&server.base_url()));
    assert_eq!(
        run.response.request.header("Authorization"),
        Some("Bearer secret123")
    );
    assert_eq!(run.response.request.header("X-Skipped"), None);
    assert_eq!(run.tests.passed_count(), 3);
    assert!(environment
        .values
        .contains(&VariableEntry::new("userId", "7")));
}

#[tokio::test]
async fn prerequest_mutation_is_visible_to_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/items")
                .header("X-Token", "generated")
                .body(r#"{"name":"widget"}"#);
            then.status(201).body("created");
        })
        .await;

    let mut collection = collection(json!({
        "variable": [{ "key": "baseUrl", "value": server.base_url() }],
        "event": [{
            "listen": "prerequest",
            "script": { "exec": "pm.collectionVariables.set('token', 'generated');" }
        }],
        "item": [{
            "name": "Create",
            "request": {
                "method": "POST",
                "header": [{ "key": "X-Token", "value": "{{token}}" }],
                "body": { "mode": "raw", "raw": "{\"name\":\"{{itemName}}\"}" },
                "url": "{{baseUrl}}/items"
            },
            "event": [
                {
                    "listen": "prerequest",
                    "script": { "exec": "pm.collectionVariables.set('itemName', 'widget');" }
                },
                {
                    "listen": "test",
                    "script": { "exec": [
                        "pm.test('created', () => pm.response.to.have.status(201));",
                        "pm.test('wrong status', () => pm.response.to.have.status(200));"
                    ]}
                }
            ]
        }]
    }));

    let run = engine()
        .run_request(&mut collection, &[], "Create", None)
        .await
        .expect("request found");

    mock.assert_async().await;
    assert!(run.prerequest.passed());
    assert_eq!(run.response.status_code, 201);
    assert_eq!(run.response.body, "created");
    assert!(!run.passed());
    assert!(run.tests.get("created").is_some_and(|t| t.passed));
    let failed = run.tests.get("wrong status").expect("recorded");
    assert!(!failed.passed);
    assert_eq!(
        failed.message.as_deref(),
        Some("expected response status to be 200 but got 201")
    );
    assert!(collection
        .variable
        .contains(&VariableEntry::new("token", "generated")));
}

#[tokio::test]
async fn failed_request_skips_tests() {
    let mut collection = collection(json!({
        "item": [{
            "name": "Broken",
            "request": { "method": "GET", "url": "http://127.0.0.1:1/unreachable" },
            "event": [{
                "listen": "test",
                "script": { "exec": "pm.test('never', () => {});" }
            }]
        }]
    }));

    let run = engine()
        .run_request(&mut collection, &[], "Broken", None)
        .await
        .expect("request found");

    assert!(matches!(
        run.response.error,
        Some(RequestError::Transport(_)) | Some(RequestError::Build(_))
    ));
    assert!(run.tests.outcomes.is_empty());
    assert!(!run.passed());
}

#[tokio::test]
async fn script_timeout_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/slow");
            then.status(200);
        })
        .await;

    let config = EngineConfig {
        script_timeout_ms: 100,
        ..EngineConfig::default()
    };
    let engine = Engine::new(config, Dispatch::none()).expect("engine builds");
    let mut collection = collection(json!({
        "item": [{
            "name": "Slow",
            "request": { "method": "GET", "url": server.url("/slow") },
            "event": [{
                "listen": "test",
                "script": { "exec": [
                    "pm.collectionVariables.set('before', 'yes');",
                    "while (true) {}"
                ]}
            }]
        }]
    }));

    let run = engine
        .run_request(&mut collection, &[], "Slow", None)
        .await
        .expect("request found");

    assert!(run.tests.timed_out());
    assert!(!run.passed());
    assert!(collection
        .variable
        .contains(&VariableEntry::new("before", "yes")));
}
