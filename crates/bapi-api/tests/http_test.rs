//! HTTP integration tests against the simulated backend

mod common;

use bapi_core::{Message, Severity, COMMIT_FUNCTION, ROLLBACK_FUNCTION};
use bapi_sim::signatures::{BP_CREATE, BP_GET_DETAIL, USER_CHANGE, USER_DELETE};
use std::time::Duration;

use bapi_core::DestinationConfig;
use bapi_sim::{Script, SimConfig, UserRecord};
use common::TestServer;
use serde_json::{json, Value};

async fn body(response: reqwest::Response) -> Value {
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_create_partner_sends_only_provided_fields_and_commits() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/business-partners"))
        .json(&json!({"Company": "Acme", "City": "Berlin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json = body(response).await;
    assert_eq!(json["committed"], true);
    assert_eq!(json["id"], "0100000003");
    assert_eq!(json["messages"][0]["severity"], "success");

    let journal = server.system.journal();
    let names: Vec<_> = journal.iter().map(|c| c.name()).collect();
    assert_eq!(names, vec![BP_CREATE, COMMIT_FUNCTION]);

    let header = &journal[0].structures["HEADERDATA"];
    assert_eq!(header.names().collect::<Vec<_>>(), vec!["CITY", "COMPANY_NAME"]);

    let stored = server.system.partner("0100000003").unwrap();
    assert_eq!(stored.text("COMPANY_NAME").as_deref(), Some("Acme"));
    assert_eq!(stored.text("CITY").as_deref(), Some("Berlin"));
}

#[tokio::test]
async fn test_client_disconnect_does_not_abandon_transaction() {
    let sim = SimConfig {
        latency_ms: 200,
        ..Default::default()
    };
    let server =
        TestServer::start_with_backend(sim, DestinationConfig::default(), |state| state).await;

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(250))
        .build()
        .unwrap();
    let result = impatient
        .post(server.url("/business-partners"))
        .json(&json!({"company": "Acme"}))
        .send()
        .await;
    assert!(result.is_err());

    // The transaction keeps running server-side until it is committed
    let mut waited = Duration::ZERO;
    while server.system.calls_to(COMMIT_FUNCTION) == 0 && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        waited += Duration::from_millis(50);
    }

    assert_eq!(
        server.system.journal_names(),
        vec![BP_CREATE, COMMIT_FUNCTION]
    );
    assert_eq!(server.system.partner_count(), 4);
    assert!(server.system.partner("0100000003").is_some());
}

#[tokio::test]
async fn test_create_without_exported_id_still_reports_commit() {
    let server = TestServer::start().await;
    server.system.script(
        BP_CREATE,
        Script::Messages(vec![Message::new(Severity::Success, "EPM_BP", "000", "done")]),
    );

    let response = server
        .client
        .post(server.url("/business-partners"))
        .json(&json!({"company": "Acme"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json = body(response).await;
    assert_eq!(json["committed"], true);
    assert_eq!(json["id"], "");
    assert_eq!(
        server.system.journal_names(),
        vec![BP_CREATE, COMMIT_FUNCTION]
    );
}

#[tokio::test]
async fn test_invalid_country_rolls_back() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/business-partners"))
        .json(&json!({"company": "Acme", "country": "XX"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let json = body(response).await;
    assert_eq!(json["error"], "business_error");
    assert_eq!(json["messages"][0]["severity"], "error");
    assert_eq!(json["messages"][0]["text"], "Invalid country code");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("Invalid country code"));

    assert_eq!(
        server.system.journal_names(),
        vec![BP_CREATE, ROLLBACK_FUNCTION]
    );
    assert_eq!(server.system.partner_count(), 3);
}

#[tokio::test]
async fn test_messages_keep_backend_order() {
    let server = TestServer::start().await;
    server.system.script(
        BP_CREATE,
        Script::Messages(vec![
            Message::new(Severity::Warning, "EPM_BP", "020", "A"),
            Message::new(Severity::Info, "EPM_BP", "021", "B"),
            Message::new(Severity::Success, "EPM_BP", "000", "C"),
        ]),
    );

    let response = server
        .client
        .post(server.url("/business-partners"))
        .json(&json!({"company": "Acme"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json = body(response).await;

    let texts: Vec<_> = json["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["A", "B", "C"]);
    assert_eq!(json["committed"], true);
}

#[tokio::test]
async fn test_read_is_idempotent_and_never_commits() {
    let server = TestServer::start().await;
    let url = server.url("/business-partners/0100000000");

    let first = body(server.client.get(&url).send().await.unwrap()).await;
    let second = body(server.client.get(&url).send().await.unwrap()).await;

    assert_eq!(first, second);
    assert_eq!(first["id"], "0100000000");
    assert_eq!(first["company"], "SAP");
    assert_eq!(first["city"], "Walldorf");
    assert_eq!(
        server.system.journal_names(),
        vec![BP_GET_DETAIL, BP_GET_DETAIL]
    );
}

#[tokio::test]
async fn test_unknown_partner_is_business_error() {
    let server = TestServer::start().await;

    let response = server
        .client
        .get(server.url("/business-partners/0999999999"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let json = body(response).await;
    assert_eq!(json["error"], "business_error");
    assert_eq!(server.system.calls_to(ROLLBACK_FUNCTION), 0);
}

#[tokio::test]
async fn test_update_partner_then_delete() {
    let server = TestServer::start().await;

    let response = server
        .client
        .put(server.url("/business-partners/0100000001"))
        .json(&json!({"City": "Hamburg"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let change = &server.system.journal()[0];
    assert_eq!(change.scalars.text("BP_ID").as_deref(), Some("0100000001"));
    assert_eq!(
        change.structures["HEADERDATAX"].text("CITY").as_deref(),
        Some("X")
    );
    assert_eq!(change.structures["HEADERDATAX"].len(), 1);

    let stored = server.system.partner("0100000001").unwrap();
    assert_eq!(stored.text("CITY").as_deref(), Some("Hamburg"));
    assert_eq!(stored.text("COMPANY_NAME").as_deref(), Some("Becker Berlin"));

    let response = server
        .client
        .delete(server.url("/business-partners/0100000001"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(server.system.partner("0100000001").is_none());
}

#[tokio::test]
async fn test_update_without_fields_is_rejected() {
    let server = TestServer::start().await;

    let response = server
        .client
        .put(server.url("/business-partners/0100000001"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert!(server.system.journal().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/business-partners"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(body(response).await["error"], "bad_request");
    assert!(server.system.journal().is_empty());
}

#[tokio::test]
async fn test_malformed_query_is_json_bad_request() {
    let server = TestServer::start().await;

    let response = server
        .client
        .get(server.url("/flights?max_rows=abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let json = body(response).await;
    assert_eq!(json["error"], "bad_request");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("Failed to deserialize query string"));
    assert!(server.system.journal().is_empty());
}

#[tokio::test]
async fn test_update_user_email_only() {
    let server = TestServer::start().await;
    server
        .system
        .insert_user("JDOE", UserRecord::new("John", "Doe", "old@example.com"));

    let response = server
        .client
        .put(server.url("/users/jdoe"))
        .json(&json!({"Email": "a@b.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(body(response).await["id"], "JDOE");

    let change = &server.system.journal()[0];
    assert_eq!(change.name(), USER_CHANGE);
    assert_eq!(change.scalars.text("USERNAME").as_deref(), Some("JDOE"));
    assert_eq!(
        change.structures["ADDRESS"].names().collect::<Vec<_>>(),
        vec!["E_MAIL"]
    );
    assert_eq!(
        change.structures["ADDRESSX"].names().collect::<Vec<_>>(),
        vec!["E_MAIL"]
    );
    assert!(!change.structures.contains_key("LOGONDATA"));

    let user = server.system.user("JDOE").unwrap();
    assert_eq!(user.address.text("E_MAIL").as_deref(), Some("a@b.com"));
    assert_eq!(user.address.text("LASTNAME").as_deref(), Some("Doe"));
    assert_eq!(user.address.text("FIRSTNAME").as_deref(), Some("John"));
}

#[tokio::test]
async fn test_create_and_read_user() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/users"))
        .json(&json!({
            "username": "jdoe",
            "password": "Init1234!",
            "first_name": "John",
            "last_name": "Doe",
            "email": "john@example.com",
            "valid_from": "20250101",
            "valid_to": "2025-12-31"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let create = &server.system.journal()[0];
    let logon = &create.structures["LOGONDATA"];
    assert_eq!(logon.text("USTYP").as_deref(), Some("A"));
    assert_eq!(logon.text("CLASS").as_deref(), Some("DEFAULT"));
    assert_eq!(
        create.structures["PASSWORD"].text("BAPIPWD").as_deref(),
        Some("Init1234!")
    );

    let json = body(
        server
            .client
            .get(server.url("/users/JDoe"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json["username"], "JDOE");
    assert_eq!(json["last_name"], "Doe");
    assert_eq!(json["valid_from"], "2025-01-01");
    assert_eq!(json["valid_to"], "2025-12-31");
    assert_eq!(json["user_type"], "A");
}

#[tokio::test]
async fn test_duplicate_user_rolls_back() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/users"))
        .json(&json!({"username": "developer", "last_name": "Again"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(server.system.calls_to(ROLLBACK_FUNCTION), 1);
}

#[tokio::test]
async fn test_get_user_lists_roles() {
    let server = TestServer::start().await;

    let json = body(
        server
            .client
            .get(server.url("/users/developer"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json["username"], "DEVELOPER");
    assert_eq!(json["roles"][0], "SAP_BC_DWB_ABAPDEVELOPER");
}

#[tokio::test]
async fn test_delete_user_runs_in_transaction() {
    let server = TestServer::start().await;

    let response = server
        .client
        .delete(server.url("/users/developer"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        server.system.journal_names(),
        vec![USER_DELETE, COMMIT_FUNCTION]
    );
    assert!(server.system.user("DEVELOPER").is_none());
}

#[tokio::test]
async fn test_delete_unknown_user_is_runtime_error() {
    let server = TestServer::start().await;

    let response = server
        .client
        .delete(server.url("/users/nobody"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(body(response).await["error"], "remote_runtime_error");
    assert_eq!(
        server.system.journal_names(),
        vec![USER_DELETE, ROLLBACK_FUNCTION]
    );
}

#[tokio::test]
async fn test_commit_failure_is_server_error_with_messages() {
    let server = TestServer::start().await;
    server.system.script(
        COMMIT_FUNCTION,
        Script::RuntimeError("update task terminated".to_string()),
    );

    let response = server
        .client
        .post(server.url("/business-partners"))
        .json(&json!({"company": "Acme"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let json = body(response).await;
    assert_eq!(json["error"], "transaction_failed");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("update task terminated"));
    assert_eq!(json["messages"][0]["severity"], "success");
    assert_eq!(server.system.partner_count(), 3);
}

#[tokio::test]
async fn test_unknown_destination_is_connection_error() {
    let server = TestServer::start_with(Default::default(), |state| {
        bapi_api::AppState::new(
            std::sync::Arc::new(bapi_core::DestinationRegistry::new()),
            "NOWHERE",
        )
        .with_user_delete_function(state.user_delete_function())
    })
    .await;

    let response = server
        .client
        .get(server.url("/business-partners/0100000000"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(body(response).await["error"], "connection_error");
    assert!(server.system.journal().is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_is_connection_error() {
    let server = TestServer::start().await;
    server.system.set_unreachable(true);

    let response = server
        .client
        .post(server.url("/business-partners"))
        .json(&json!({"company": "Acme"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(body(response).await["error"], "connection_error");
}

#[tokio::test]
async fn test_configured_user_delete_function() {
    let server = TestServer::start_with(Default::default(), |state| {
        state.with_user_delete_function("Z_USER_DELETE")
    })
    .await;

    let response = server
        .client
        .delete(server.url("/users/developer"))
        .send()
        .await
        .unwrap();
    // Not in the simulated repository
    assert_eq!(response.status(), 500);
    assert_eq!(body(response).await["error"], "interface_mismatch");
    assert!(server.system.user("DEVELOPER").is_some());
}

#[tokio::test]
async fn test_list_flights() {
    let server = TestServer::start().await;

    let json = body(
        server
            .client
            .get(server.url("/flights?airline=lh&max_rows=2"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    let flights = json["flights"].as_array().unwrap();
    assert_eq!(flights.len(), 2);
    assert!(flights.iter().all(|f| f["airline_id"] == "LH"));
    assert_eq!(flights[0]["city_to"], "NEW YORK");
    assert_eq!(flights[0]["flight_date"], "2026-11-02");

    let default = body(
        server
            .client
            .get(server.url("/flights"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(default["flights"].as_array().unwrap().len(), 3);
    assert_eq!(server.system.calls_to(COMMIT_FUNCTION), 0);
}
