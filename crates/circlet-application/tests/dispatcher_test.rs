mod common;

use circlet_core::CircletError;
use circlet_core::auth::LoginCredentials;
use circlet_core::location::{LocationTelemetry, UserContext};
use circlet_core::message::Thread;
use circlet_core::session::{CredentialRepository, InMemoryCredentialRepository, StoredDeviceId};
use circlet_interaction::api::{DEVICES_CE_ID, DEVICES_CE_TYPE, DEVICES_PATH, MOBILE_USER_AGENT};
use circlet_interaction::request_builder::BOOTSTRAP_BASIC_AUTH;
use circlet_interaction::{HttpMethod, RequestOptions};
use common::{BASE, Fixture, NOW_MS, devices_json};
use serde_json::{Value, json};
use std::time::Duration;

const LOCATION_URL: &str = "https://iphone.life360.com/v4/locations";

// ============================================================================
// Login and session restore
// ============================================================================

#[tokio::test]
async fn test_login_persists_token_and_resolves_user() {
    let fx = Fixture::new();
    fx.gateway.respond(
        HttpMethod::Post,
        "/v3/oauth2/token.json",
        200,
        r#"{"access_token": "tok-1", "expires_in": 3600, "token_type": "Bearer"}"#,
    );
    fx.gateway
        .respond(HttpMethod::Get, "/v3/users/me", 200, r#"{"id": "u1", "firstName": "Ann"}"#);

    let outcome = fx
        .dispatcher
        .login(&LoginCredentials::new("ann@example.com", "secret"))
        .await
        .unwrap();

    assert_eq!(outcome.user_id, "u1");
    assert_eq!(outcome.expires_at, NOW_MS + 3_600_000);
    assert!(fx.store.is_ready().await);

    let stored = fx.repository.load_token().await.unwrap().unwrap();
    assert_eq!(stored.token, "tok-1");
    assert_eq!(stored.expires_at, NOW_MS + 3_600_000);

    let requests = fx.gateway.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, format!("{BASE}/v3/oauth2/token.json"));
    assert_eq!(requests[0].header("Authorization"), Some(BOOTSTRAP_BASIC_AUTH));
    let body: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(
        body,
        json!({"grant_type": "password", "username": "ann@example.com", "password": "secret"})
    );
    assert_eq!(requests[1].header("Authorization"), Some("Bearer tok-1"));
}

#[tokio::test]
async fn test_login_without_expiry_uses_default_lifetime() {
    let fx = Fixture::new();
    fx.gateway
        .respond(HttpMethod::Post, "/v3/oauth2/token.json", 200, r#"{"access_token": "tok"}"#);
    fx.gateway.respond(HttpMethod::Get, "/v3/users/me", 200, r#"{"id": "u1"}"#);

    let outcome = fx
        .dispatcher
        .login(&LoginCredentials::new("a", "b"))
        .await
        .unwrap();
    assert_eq!(outcome.expires_at, NOW_MS + 360_000 * 1000);
}

#[tokio::test]
async fn test_login_accepts_expiry_sent_as_string() {
    let fx = Fixture::new();
    fx.gateway.respond(
        HttpMethod::Post,
        "/v3/oauth2/token.json",
        200,
        r#"{"access_token": "tok", "expires_in": "3600"}"#,
    );
    fx.gateway.respond(HttpMethod::Get, "/v3/users/me", 200, r#"{"id": "u1"}"#);

    let outcome = fx
        .dispatcher
        .login(&LoginCredentials::new("a", "b"))
        .await
        .unwrap();
    assert_eq!(outcome.expires_at, NOW_MS + 3_600_000);
    assert_eq!(fx.store.access_token().await.as_deref(), Some("tok"));
}

#[tokio::test]
async fn test_login_response_without_token_is_parse_failure() {
    let fx = Fixture::new();
    fx.gateway
        .respond(HttpMethod::Post, "/v3/oauth2/token.json", 200, r#"{"error": "nope"}"#);

    let err = fx
        .dispatcher
        .login(&LoginCredentials::new("a", "b"))
        .await
        .unwrap_err();

    assert!(err.is_parse(), "unexpected error: {err:?}");
    assert!(fx.store.access_token().await.is_none());
    assert!(fx.repository.load_token().await.unwrap().is_none());
    assert_eq!(fx.gateway.request_count(), 1);
}

#[tokio::test]
async fn test_rejected_login_surfaces_http_error() {
    let fx = Fixture::new();
    fx.gateway
        .respond(HttpMethod::Post, "/v3/oauth2/token.json", 400, "invalid_grant");

    let err = fx
        .dispatcher
        .login(&LoginCredentials::new("a", "wrong"))
        .await
        .unwrap_err();
    assert_eq!(err, CircletError::http(400, "invalid_grant"));
}

#[tokio::test]
async fn test_bearer_request_without_token_never_reaches_gateway() {
    let fx = Fixture::new();

    let err = fx.dispatcher.list_circles().await.unwrap_err();
    assert_eq!(err, CircletError::NoCredentials);

    let err = fx.dispatcher.circle_members("c1").await.unwrap_err();
    assert!(err.is_no_credentials());
    assert_eq!(fx.gateway.request_count(), 0);
}

#[tokio::test]
async fn test_unauthorized_keeps_token() {
    let fx = Fixture::new().ready().await;
    fx.gateway
        .respond(HttpMethod::Get, "/v3/circles", 401, r#"{"message": "Unauthorized"}"#);

    let err = fx.dispatcher.list_circles().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(err.is_unauthorized());
    assert_eq!(fx.store.access_token().await.as_deref(), Some("tok"));
    assert_eq!(fx.repository.load_token().await.unwrap().unwrap().token, "tok");
}

#[tokio::test]
async fn test_check_auth_status_without_stored_token() {
    let fx = Fixture::new();

    let status = fx.dispatcher.check_auth_status().await;
    assert!(!status.is_authenticated);
    assert!(status.user.is_none());
    assert_eq!(fx.gateway.request_count(), 0);
}

#[tokio::test]
async fn test_check_auth_status_restores_session() {
    let fx = Fixture::new();
    fx.store.save("tok", 60).await;
    fx.gateway.respond(HttpMethod::Get, "/v3/users/me", 200, r#"{"id": "u9"}"#);

    let status = fx.dispatcher.check_auth_status().await;
    assert!(status.is_authenticated);
    assert_eq!(status.user.unwrap().id, "u9");
    assert_eq!(fx.store.current_user_id().await.as_deref(), Some("u9"));
}

#[tokio::test]
async fn test_check_auth_status_rejected_keeps_stored_token() {
    let fx = Fixture::new();
    fx.store.save("tok", 60).await;
    fx.gateway.respond(HttpMethod::Get, "/v3/users/me", 401, "");

    let status = fx.dispatcher.check_auth_status().await;
    assert!(!status.is_authenticated);
    assert_eq!(fx.repository.load_token().await.unwrap().unwrap().token, "tok");
}

// ============================================================================
// Circles and device resolution
// ============================================================================

#[tokio::test]
async fn test_select_circle_adopts_owned_device() {
    let fx = Fixture::new().ready().await;
    fx.gateway.respond(
        HttpMethod::Get,
        DEVICES_PATH,
        200,
        &devices_json(&[("d-other", "u2"), ("d-mine", "u1")]),
    );

    let resolution = fx.dispatcher.select_circle("c1").await.unwrap();

    assert_eq!(resolution.device_id, "d-mine");
    assert!(resolution.adopted);
    assert_eq!(fx.store.device_id().await.as_deref(), Some("d-mine"));
    assert_eq!(fx.store.current_circle_id().await.as_deref(), Some("c1"));
    assert_eq!(
        fx.repository.load_device_id().await.unwrap().unwrap().id,
        "d-mine"
    );

    let request = fx.gateway.last_request();
    assert_eq!(request.url, format!("{BASE}{DEVICES_PATH}"));
    assert_eq!(request.header("circleid"), Some("c1"));
    assert_eq!(request.header("ce-id"), Some(DEVICES_CE_ID));
    assert_eq!(request.header("ce-type"), Some(DEVICES_CE_TYPE));
    assert_eq!(request.header("ce-source"), Some("/iOS"));
    assert_eq!(request.header("ce-specversion"), Some("1.0"));
    assert_eq!(request.header("ce-time"), Some("2023-11-14T22:13:20.000Z"));
    assert_eq!(request.header("User-Agent"), Some(MOBILE_USER_AGENT));
    assert_eq!(request.header("Authorization"), Some("Bearer tok"));
}

#[tokio::test]
async fn test_select_circle_without_owned_device_keeps_previous() {
    let fx = Fixture::with_repository(InMemoryCredentialRepository::with_records(
        None,
        Some(StoredDeviceId::new("d-old")),
    ));
    fx.store.load_persisted().await;
    let fx = fx.ready().await;
    fx.gateway
        .respond(HttpMethod::Get, DEVICES_PATH, 200, &devices_json(&[("d-x", "u2")]));

    let err = fx.dispatcher.select_circle("c1").await.unwrap_err();

    assert_eq!(err, CircletError::device_not_found("c1"));
    assert_eq!(fx.store.device_id().await.as_deref(), Some("d-old"));
    // The device id travels on every request once known.
    assert_eq!(fx.gateway.last_request().header("X-Device-ID"), Some("d-old"));
}

#[tokio::test]
async fn test_select_circle_requires_ready_session() {
    let fx = Fixture::new();
    fx.store.save("tok", 60).await;

    let err = fx.dispatcher.select_circle("c1").await.unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(fx.gateway.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_resolution_of_superseded_circle_is_dropped() {
    let fx = Fixture::new().ready().await;
    fx.gateway.respond_when(
        |r| r.url.ends_with(DEVICES_PATH) && r.header("circleid") == Some("a"),
        200,
        &devices_json(&[("dev-a", "u1")]),
        Some(Duration::from_millis(50)),
    );
    fx.gateway.respond_when(
        |r| r.url.ends_with(DEVICES_PATH) && r.header("circleid") == Some("b"),
        200,
        &devices_json(&[("dev-b", "u1")]),
        None,
    );

    let (a, b) = tokio::join!(
        fx.dispatcher.select_circle("a"),
        fx.dispatcher.select_circle("b")
    );

    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(!a.adopted);
    assert!(b.adopted);
    assert_eq!(fx.store.current_circle_id().await.as_deref(), Some("b"));
    assert_eq!(fx.store.device_id().await.as_deref(), Some("dev-b"));
    assert_eq!(
        fx.repository.load_device_id().await.unwrap().unwrap().id,
        "dev-b"
    );
}

#[tokio::test]
async fn test_circle_details_cached_only_for_selected_circle() {
    let fx = Fixture::new().ready().await;
    fx.gateway
        .respond(HttpMethod::Get, DEVICES_PATH, 200, &devices_json(&[("d1", "u1")]));
    fx.gateway.respond(
        HttpMethod::Get,
        "/v3/circles/c1",
        200,
        r#"{"id": "c1", "name": "Family", "members": [
            {"id": "u1", "firstName": "Ann", "lastName": "Lee",
             "location": {"latitude": "35.1", "longitude": 139.2, "battery": 80}}
        ]}"#,
    );
    fx.gateway.respond(
        HttpMethod::Get,
        "/v3/circles/c2",
        200,
        r#"{"id": "c2", "name": "Work", "members": []}"#,
    );

    fx.dispatcher.select_circle("c1").await.unwrap();
    let circle = fx.dispatcher.circle_details("c1").await.unwrap();
    let location = circle.members[0].location.as_ref().unwrap();
    assert_eq!(location.longitude, "139.2");
    assert_eq!(location.battery.as_deref(), Some("80"));
    assert_eq!(fx.store.circle_snapshot().await.unwrap().id, "c1");

    fx.dispatcher.circle_details("c2").await.unwrap();
    assert_eq!(fx.store.circle_snapshot().await.unwrap().id, "c1");
}

#[tokio::test]
async fn test_circle_without_members_is_parse_failure() {
    let fx = Fixture::new().ready().await;
    fx.gateway
        .respond(HttpMethod::Get, "/v3/circles/c1", 200, r#"{"id": "c1", "name": "x"}"#);

    let err = fx.dispatcher.circle_details("c1").await.unwrap_err();
    match err {
        CircletError::Parse { body, .. } => assert!(body.contains("\"c1\"")),
        other => panic!("Expected Parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_members_and_member_lookup() {
    let fx = Fixture::new().ready().await;
    fx.gateway.respond(
        HttpMethod::Get,
        "/v3/circles/c1/members",
        200,
        r#"{"members": [{"id": "u1", "firstName": "Ann", "lastName": "Lee"}, {"id": "u2"}]}"#,
    );
    fx.gateway.respond(
        HttpMethod::Get,
        "/v3/circles/c1/members/u2",
        200,
        r#"{"id": "u2", "firstName": "Bob", "lastName": ""}"#,
    );

    let members = fx.dispatcher.circle_members("c1").await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(members[1].location.is_none());

    let member = fx.dispatcher.member("c1", "u2").await.unwrap();
    assert_eq!(member.display_name(), "Bob");
}

// ============================================================================
// Location updates
// ============================================================================

#[tokio::test]
async fn test_update_location_requires_device_id() {
    let fx = Fixture::new().ready().await;

    let err = fx
        .dispatcher
        .update_location(&LocationTelemetry::new("35.0", "139.0"))
        .await
        .unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(fx.gateway.request_count(), 0);
}

#[tokio::test]
async fn test_update_location_rejects_invalid_coordinates() {
    let fx = Fixture::new().ready().await;
    fx.store.save_device_id("d1").await;

    for (lat, lon) in [("abc", "1"), ("91", "0"), ("0", "-181"), ("NaN", "0")] {
        let err = fx
            .dispatcher
            .update_location(&LocationTelemetry::new(lat, lon))
            .await
            .unwrap_err();
        assert!(err.is_precondition(), "{lat},{lon}: {err:?}");
    }
    assert_eq!(fx.gateway.request_count(), 0);
}

#[tokio::test]
async fn test_update_location_sends_envelope_header() {
    let fx = Fixture::new().ready().await;
    fx.store.save_device_id("d1").await;
    fx.gateway.respond(HttpMethod::Put, "/v4/locations", 200, "");

    let mut telemetry = LocationTelemetry::new("35.6812", "139.7671");
    telemetry.battery = Some("77".into());
    let response = fx.dispatcher.update_location(&telemetry).await.unwrap();
    assert_eq!(response, Value::Null);

    let request = fx.gateway.last_request();
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(request.url, LOCATION_URL);
    assert!(request.body.is_none());
    assert_eq!(request.header("X-Device-ID"), Some("d1"));
    assert_eq!(request.header("Authorization"), Some("Bearer tok"));

    let context = UserContext::decode(request.header("X-UserContext").unwrap()).unwrap();
    assert_eq!(context.geolocation.lat, "35.6812");
    assert_eq!(context.geolocation.timestamp, (NOW_MS / 1000).to_string());
    assert_eq!(context.geolocation.alt, "0.0");
    assert_eq!(context.device.battery, "77");
    assert_eq!(context.flags.precise_location, "fullAccuracy");
}

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn test_blank_message_never_reaches_gateway() {
    let fx = Fixture::new().ready().await;
    let receivers = vec!["u2".to_string()];

    for text in ["", "   ", "\n\t"] {
        let err = fx
            .dispatcher
            .send_message("c1", text, &receivers)
            .await
            .unwrap_err();
        assert!(err.is_precondition());
    }
    assert!(fx.dispatcher.send_message("", "hi", &receivers).await.unwrap_err().is_precondition());
    assert!(fx.dispatcher.send_message("c1", "hi", &[]).await.unwrap_err().is_precondition());
    assert_eq!(fx.gateway.request_count(), 0);
}

#[tokio::test]
async fn test_send_message_stringifies_receivers() {
    let fx = Fixture::new().ready().await;
    fx.gateway
        .respond(HttpMethod::Post, "/v3/circles/c1/threads/message", 200, r#"{"ok": true}"#);

    let receivers = vec!["u2".to_string(), "u3".to_string()];
    let response = fx.dispatcher.send_message("c1", "hello", &receivers).await.unwrap();
    assert_eq!(response, json!({"ok": true}));

    let body: Value =
        serde_json::from_str(fx.gateway.last_request().body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"message": "hello", "receiverIds": "[\"u2\",\"u3\"]"}));
}

fn thread(id: &str) -> Thread {
    serde_json::from_value(json!({
        "id": id,
        "circleId": "c1",
        "names": {"u1": {"name": "Ann"}, "u2": {"name": "Bob"}}
    }))
    .unwrap()
}

#[tokio::test]
async fn test_open_thread_merges_pages() {
    let fx = Fixture::new().ready().await;
    fx.store.set_current_circle("c1").await;
    fx.gateway.respond(
        HttpMethod::Get,
        "/v3/circles/c1/threads/t1",
        200,
        r#"{"messages": [
            {"id": "m2", "senderId": "u2", "text": "second", "timestamp": 20},
            {"id": "m1", "senderId": "u1", "text": "first", "timestamp": "10"}
        ]}"#,
    );

    let messages = fx.dispatcher.open_thread(thread("t1")).await.unwrap();
    let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2"]);

    fx.gateway.respond(
        HttpMethod::Get,
        "/v3/circles/c1/threads/t1",
        200,
        r#"{"messages": [
            {"id": "m2", "senderId": "u2", "text": "edited", "timestamp": 20},
            {"id": "m3", "senderId": "u2", "text": "third", "timestamp": 30}
        ]}"#,
    );
    let messages = fx.dispatcher.refresh_selected_thread().await.unwrap();
    let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);
    assert_eq!(messages[1].text.as_deref(), Some("second"));
}

#[tokio::test]
async fn test_page_for_deselected_thread_is_dropped() {
    let fx = Fixture::new().ready().await;
    fx.store.set_current_circle("c1").await;
    fx.gateway.respond(HttpMethod::Get, "/v3/circles/c1/threads/t1", 200, r#"{}"#);
    fx.dispatcher.open_thread(thread("t1")).await.unwrap();

    fx.store.set_current_circle("c2").await;
    fx.gateway.respond(
        HttpMethod::Get,
        "/v3/circles/c1/threads/t1",
        200,
        r#"{"messages": [{"id": "m1", "senderId": "u2", "text": "late", "timestamp": 1}]}"#,
    );

    let page = fx.dispatcher.thread_messages("c1", "t1").await.unwrap();
    assert_eq!(page.len(), 1);
    assert!(fx.store.chat().await.messages().is_empty());
    assert!(fx.dispatcher.refresh_selected_thread().await.unwrap_err().is_precondition());
}

#[tokio::test]
async fn test_send_to_selected_thread_targets_other_participants() {
    let fx = Fixture::new().ready().await;
    fx.store.set_current_circle("c1").await;
    fx.gateway.respond(HttpMethod::Get, "/v3/circles/c1/threads/t1", 200, r#"{"messages": []}"#);
    fx.gateway
        .respond(HttpMethod::Post, "/v3/circles/c1/threads/message", 200, "");

    assert!(fx.dispatcher.send_to_selected_thread("hi").await.unwrap_err().is_precondition());

    fx.dispatcher.open_thread(thread("t1")).await.unwrap();
    fx.dispatcher.send_to_selected_thread("hi").await.unwrap();

    let body: Value =
        serde_json::from_str(fx.gateway.last_request().body.as_deref().unwrap()).unwrap();
    assert_eq!(body["receiverIds"], "[\"u2\"]");
}

#[tokio::test]
async fn test_focus_circle_keeps_open_thread_when_unchanged() {
    let fx = Fixture::new().ready().await;
    fx.gateway.respond(HttpMethod::Get, "/v3/circles/c1/threads/t1", 200, r#"{"messages": []}"#);

    assert!(fx.dispatcher.focus_circle(" ").await.unwrap_err().is_precondition());

    fx.dispatcher.focus_circle("c1").await.unwrap();
    assert_eq!(fx.store.current_circle_id().await.as_deref(), Some("c1"));
    fx.dispatcher.open_thread(thread("t1")).await.unwrap();

    fx.dispatcher.focus_circle("c1").await.unwrap();
    assert_eq!(fx.store.chat().await.thread().map(|t| t.id.as_str()), Some("t1"));

    fx.dispatcher.focus_circle("c2").await.unwrap();
    assert!(fx.store.chat().await.thread().is_none());
    // Chat focus never looks up devices.
    assert_eq!(fx.gateway.request_count(), 1);
}

#[tokio::test]
async fn test_focus_circle_drops_pending_device_resolution() {
    let fx = Fixture::new().ready().await;
    fx.gateway.respond_when(
        |r| r.url.ends_with(DEVICES_PATH),
        200,
        &devices_json(&[("d1", "u1")]),
        Some(Duration::from_millis(50)),
    );

    let (resolution, focus) = tokio::join!(
        fx.dispatcher.select_circle("c1"),
        fx.dispatcher.focus_circle("c2")
    );

    focus.unwrap();
    assert!(!resolution.unwrap().adopted);
    assert!(fx.store.device_id().await.is_none());
    assert_eq!(fx.store.current_circle_id().await.as_deref(), Some("c2"));
}

#[tokio::test]
async fn test_open_circle_thread_focuses_circle() {
    let fx = Fixture::new().ready().await;
    fx.gateway.respond(
        HttpMethod::Get,
        "/v3/circles/c1/threads/t1",
        200,
        r#"{"messages": [{"id": "m1", "senderId": "u2", "text": "hi", "timestamp": 1}]}"#,
    );

    let messages = fx.dispatcher.open_circle_thread("c1", thread("t1")).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(fx.store.current_circle_id().await.as_deref(), Some("c1"));
    assert_eq!(fx.store.chat().await.circle_id(), Some("c1"));

    let err = fx
        .dispatcher
        .open_circle_thread("c2", thread("t1"))
        .await
        .unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(fx.store.current_circle_id().await.as_deref(), Some("c1"));
    assert_eq!(fx.gateway.request_count(), 1);
}

#[tokio::test]
async fn test_list_threads() {
    let fx = Fixture::new().ready().await;
    fx.gateway.respond(
        HttpMethod::Get,
        "/v3/circles/threads",
        200,
        r#"{"threads": [{"id": "t1", "circleId": "c1", "names": {}}]}"#,
    );

    let threads = fx.dispatcher.list_threads().await.unwrap();
    assert_eq!(threads.threads.len(), 1);
}

// ============================================================================
// Developer mode and logout
// ============================================================================

#[tokio::test]
async fn test_dev_request_is_gated() {
    let fx = Fixture::new().ready().await;
    fx.gateway
        .respond(HttpMethod::Get, "/v3/circles", 200, r#"{"circles": []}"#);

    let err = fx
        .dispatcher
        .dev_request(RequestOptions::get("/v3/circles"))
        .await
        .unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(fx.gateway.request_count(), 0);

    assert!(fx.dispatcher.toggle_dev_mode());
    let value = fx
        .dispatcher
        .dev_request(RequestOptions::get("/v3/circles"))
        .await
        .unwrap();
    assert_eq!(value, json!({"circles": []}));

    assert!(!fx.dispatcher.toggle_dev_mode());
}

#[tokio::test]
async fn test_logout_forgets_session_in_memory() {
    let fx = Fixture::new().ready().await;
    fx.dispatcher.logout().await;

    assert!(!fx.store.is_ready().await);
    assert!(fx.dispatcher.list_circles().await.unwrap_err().is_no_credentials());
    assert!(fx.repository.load_token().await.unwrap().is_some());
}
