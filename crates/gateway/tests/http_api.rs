#![allow(clippy::unwrap_used)]

//! End-to-end coverage of the HTTP surface against a live listener.

mod common;

use reqwest::StatusCode;
use serde_json::Value;

use common::spawn_broker;

async fn post_form(addr: std::net::SocketAddr, path: &str, body: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}{path}"))
        .body(body.to_string())
        .send()
        .await
        .unwrap()
}

async fn envelope(response: reqwest::Response) -> Value {
    let v: Value = response.json().await.unwrap();
    v
}

#[tokio::test]
async fn create_put_take_delete_lifecycle() {
    let (addr, _registry) = spawn_broker(None).await;
    let client = reqwest::Client::new();

    // create with no body
    let response = post_form(addr, "/queues", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = envelope(response).await;
    assert_eq!(body["success"], Value::Bool(true));
    assert_eq!(body["message"], Value::Null);
    let queue = body["payload"].as_str().unwrap().to_string();
    assert_eq!(queue.len(), 36);

    // the new queue is listed
    let listed = envelope(
        client
            .get(format!("http://{addr}/queues"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(listed["payload"], serde_json::json!([queue]));

    // put buffers, take consumes, second take finds nothing
    let body = envelope(post_form(addr, "/put", &format!("name={queue}&value=hello")).await).await;
    assert_eq!(body["success"], Value::Bool(true));
    assert_eq!(body["payload"], Value::Null);

    let body = envelope(post_form(addr, "/take", &format!("name={queue}")).await).await;
    assert_eq!(body["payload"]["key"], Value::Null);
    assert_eq!(body["payload"]["value"], Value::String("hello".into()));

    let body = envelope(post_form(addr, "/take", &format!("name={queue}")).await).await;
    assert_eq!(body["success"], Value::Bool(true));
    assert_eq!(body["payload"], Value::Null);

    // delete, then info answers 404
    let response = client
        .delete(format!("http://{addr}/queue"))
        .body(format!("name={queue}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(envelope(response).await["payload"], Value::Null);

    let response = post_form(addr, "/queue", &format!("name={queue}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = envelope(response).await;
    assert_eq!(body["success"], Value::Bool(false));
    assert_eq!(
        body["message"],
        Value::String("queue does not exist".into())
    );
}

#[tokio::test]
async fn keyed_items_match_keyed_takes_first() {
    let (addr, _registry) = spawn_broker(None).await;

    let body = envelope(post_form(addr, "/queues", "").await).await;
    let queue = body["payload"].as_str().unwrap().to_string();

    post_form(addr, "/put", &format!("name={queue}&key=A&value=v1")).await;
    post_form(addr, "/put", &format!("name={queue}&value=v2")).await;

    let body = envelope(post_form(addr, "/take", &format!("name={queue}&key=A")).await).await;
    assert_eq!(body["payload"]["key"], Value::String("A".into()));
    assert_eq!(body["payload"]["value"], Value::String("v1".into()));

    let body = envelope(post_form(addr, "/take", &format!("name={queue}")).await).await;
    assert_eq!(body["payload"]["key"], Value::Null);
    assert_eq!(body["payload"]["value"], Value::String("v2".into()));
}

#[tokio::test]
async fn take_key_match_is_case_insensitive() {
    let (addr, _registry) = spawn_broker(None).await;
    let body = envelope(post_form(addr, "/queues", "").await).await;
    let queue = body["payload"].as_str().unwrap().to_string();

    post_form(addr, "/put", &format!("name={queue}&key=KEY&value=v")).await;
    let body = envelope(post_form(addr, "/take", &format!("name={queue}&key=key")).await).await;
    assert_eq!(body["payload"]["value"], Value::String("v".into()));
}

#[tokio::test]
async fn peek_reads_without_consuming() {
    let (addr, _registry) = spawn_broker(None).await;
    let body = envelope(post_form(addr, "/queues", "").await).await;
    let queue = body["payload"].as_str().unwrap().to_string();

    post_form(addr, "/put", &format!("name={queue}&value=v")).await;

    let body = envelope(post_form(addr, "/peek", &format!("name={queue}")).await).await;
    assert_eq!(body["payload"]["value"], Value::String("v".into()));

    // still there
    let body = envelope(post_form(addr, "/take", &format!("name={queue}")).await).await;
    assert_eq!(body["payload"]["value"], Value::String("v".into()));

    // peek on the now-empty queue succeeds with a null payload
    let body = envelope(post_form(addr, "/peek", &format!("name={queue}")).await).await;
    assert_eq!(body["success"], Value::Bool(true));
    assert_eq!(body["payload"], Value::Null);
}

#[tokio::test]
async fn queue_info_returns_the_canonical_name() {
    let (addr, _registry) = spawn_broker(None).await;
    let body = envelope(post_form(addr, "/queues", "").await).await;
    let queue = body["payload"].as_str().unwrap().to_string();

    // case-insensitive lookup resolves to the canonical lowercase id
    let upper = queue.to_uppercase();
    let body = envelope(post_form(addr, "/queue", &format!("name={upper}")).await).await;
    assert_eq!(body["payload"]["name"], Value::String(queue));
}

#[tokio::test]
async fn create_with_a_chosen_name_adopts_it() {
    let (addr, _registry) = spawn_broker(None).await;
    let chosen = "0f47ac10-58cc-4372-a567-0e02b2c3d479";

    let body = envelope(post_form(addr, "/queues", &format!("name={chosen}")).await).await;
    assert_eq!(body["payload"], Value::String(chosen.into()));

    // creating again with the same name returns the same queue
    let body = envelope(post_form(addr, "/queues", &format!("name={chosen}")).await).await;
    assert_eq!(body["payload"], Value::String(chosen.into()));
}

#[tokio::test]
async fn malformed_ids_are_rejected_with_400() {
    let (addr, _registry) = spawn_broker(None).await;

    // lengths 35 and 37, and a non-hex id of the right length
    for name in [
        "0f47ac10-58cc-4372-a567-0e02b2c3d47",
        "0f47ac10-58cc-4372-a567-0e02b2c3d4790",
        "zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz",
    ] {
        let response = post_form(addr, "/take", &format!("name={name}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{name}");
        let body = envelope(response).await;
        assert_eq!(body["message"], Value::String("invalid queue id".into()));
    }
}

#[tokio::test]
async fn put_without_value_is_400_and_empty_value_is_accepted() {
    let (addr, _registry) = spawn_broker(None).await;
    let body = envelope(post_form(addr, "/queues", "").await).await;
    let queue = body["payload"].as_str().unwrap().to_string();

    let response = post_form(addr, "/put", &format!("name={queue}&key=k")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = envelope(response).await;
    assert_eq!(
        body["message"],
        Value::String("missing parameter 'value'".into())
    );

    // an empty value is still a value
    let response = post_form(addr, "/put", &format!("name={queue}&value=")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = envelope(post_form(addr, "/take", &format!("name={queue}")).await).await;
    assert_eq!(body["payload"]["value"], Value::String(String::new()));
}

#[tokio::test]
async fn unknown_queue_is_404() {
    let (addr, _registry) = spawn_broker(None).await;
    let absent = "11111111-2222-4333-8444-555555555555";

    for path in ["/take", "/peek", "/put"] {
        let body = format!("name={absent}&value=v");
        let response = post_form(addr, path, &body).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn wrong_methods_are_405_envelopes() {
    let (addr, _registry) = spawn_broker(None).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/take"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = envelope(response).await;
    assert_eq!(body["success"], Value::Bool(false));
    assert_eq!(body["message"], Value::String("method not supported".into()));

    let response = client
        .put(format!("http://{addr}/queues"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn responses_carry_the_json_content_type() {
    let (addr, _registry) = spawn_broker(None).await;
    let response = post_form(addr, "/queues", "").await;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(content_type, "application/json");
}
