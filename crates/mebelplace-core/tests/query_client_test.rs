// Integration tests for `QueryClient` against a wiremock backend.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mebelplace_api::executor::RequestDescriptor;
use mebelplace_api::{ApiClient, Credential, TransportConfig};
use mebelplace_core::{CoreError, EntryState, QueryClient, keys};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, QueryClient) {
    let server = MockServer::start().await;
    let transport = TransportConfig::new(Url::parse(&server.uri()).unwrap());
    let api = ApiClient::new(&transport).unwrap();
    (server, QueryClient::new(api))
}

fn envelope(data: serde_json::Value) -> serde_json::Value {
    json!({ "data": data, "status": 200 })
}

#[derive(Debug, Deserialize, PartialEq)]
struct Request {
    id: u64,
    title: String,
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fresh_query_is_served_from_cache() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/requests/5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({ "id": 5, "title": "Wardrobe" }))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let key = keys::requests::by_id(5);
    let first = client.query::<Request>(&key, "/requests/5").await.unwrap();
    let second = client.query::<Request>(&key, "/requests/5").await.unwrap();

    assert_eq!(first.title, "Wardrobe");
    assert_eq!(first, second);
    assert_eq!(client.cache().state(&key), Some(EntryState::Fresh));
}

#[tokio::test]
async fn test_filtered_queries_are_cached_per_filter() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/requests"))
        .and(query_param("status", "open"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!([{ "id": 1, "title": "Sofa" }]))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/requests"))
        .and(query_param("status", "closed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!([{ "id": 2, "title": "Shelf" }]))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let open_key = keys::requests::list(Some("open"));
    let closed_key = keys::requests::list(Some("closed"));
    let open_params = [("status", "open".to_owned())];
    let closed_params = [("status", "closed".to_owned())];

    let open = client
        .query_with_params::<Vec<Request>>(&open_key, "/requests", &open_params)
        .await
        .unwrap();
    let again = client
        .query_with_params::<Vec<Request>>(&open_key, "/requests", &open_params)
        .await
        .unwrap();
    let closed = client
        .query_with_params::<Vec<Request>>(&closed_key, "/requests", &closed_params)
        .await
        .unwrap();

    assert_eq!(open[0].title, "Sofa");
    assert_eq!(open, again);
    assert_eq!(closed[0].title, "Shelf");

    // Both filters live in the requests family.
    client.cache().invalidate(&keys::requests::all());
    assert_eq!(client.cache().state(&open_key), Some(EntryState::Stale));
    assert_eq!(client.cache().state(&closed_key), Some(EntryState::Stale));
}

#[tokio::test]
async fn test_mutation_invalidates_family_and_read_refetches() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/requests"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(envelope(json!({ "id": 11, "title": "Kitchen" }))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/requests"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!([{ "id": 11, "title": "Kitchen" }]))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let list = keys::requests::list(None);
    let before = client.query::<Vec<Request>>(&list, "/requests").await.unwrap();
    assert!(before.is_empty());

    let created: Request = client
        .mutate(
            RequestDescriptor::post("/requests")
                .json(&json!({ "title": "Kitchen" }))
                .unwrap(),
            &[keys::requests::all()],
        )
        .await
        .unwrap();
    assert_eq!(created.id, 11);
    assert_eq!(client.cache().state(&list), Some(EntryState::Stale));

    let after = client.query::<Vec<Request>>(&list, "/requests").await.unwrap();
    assert_eq!(after.len(), 1);
}

#[tokio::test]
async fn test_failed_mutation_keeps_cache_fresh() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "price required" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let list = keys::orders::list(None);
    client
        .query::<Vec<serde_json::Value>>(&list, "/orders")
        .await
        .unwrap();

    let err = client
        .mutate::<serde_json::Value>(
            RequestDescriptor::post("/orders").json(&json!({})).unwrap(),
            &[keys::orders::all()],
        )
        .await
        .unwrap_err();

    assert_eq!(err.api().and_then(mebelplace_api::Error::status), Some(422));
    assert_eq!(client.cache().state(&list), Some(EntryState::Fresh));

    // Still served from cache: the GET mock expects exactly one call.
    client
        .query::<Vec<serde_json::Value>>(&list, "/orders")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_login_seeds_current_user_and_logout_clears() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "user": { "id": 3, "username": "master3" },
            "accessToken": "abc",
            "refreshToken": "r1"
        }))))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({ "count": 2 }))))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let password = SecretString::from("pw".to_owned());
    client.login("+77001234567", &password, None).await.unwrap();

    let user = client.current_user().unwrap();
    assert_eq!(user["username"], "master3");

    client
        .query::<serde_json::Value>(
            &keys::notifications::unread_count(),
            "/notifications/unread-count",
        )
        .await
        .unwrap();
    assert_eq!(client.cache().len(), 2);

    client.logout().await.unwrap();
    assert!(client.cache().is_empty());
    assert!(client.current_user().is_none());
    assert!(!client.api().credentials().is_authenticated());
}

#[tokio::test]
async fn test_cancelled_query_applies_nothing() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/videos/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(envelope(json!([]))),
        )
        .mount(&server)
        .await;

    let key = keys::videos::feed(1);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client
        .query_until::<Vec<serde_json::Value>>(&key, "/videos/feed", &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Cancelled));
    assert_eq!(client.cache().state(&key), Some(EntryState::Stale));
}

#[tokio::test]
async fn test_failed_refresh_clears_cache_via_session_watch() {
    let (server, client) = setup().await;
    client
        .api()
        .credentials()
        .set(Credential::new("old").with_refresh_token("r1"));
    client
        .cache()
        .set(&keys::auth::current_user(), json!({ "id": 3 }));

    Mock::given(method("GET"))
        .and(path("/chats"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let watcher = client.watch_session(cancel.clone());

    let err = client
        .query::<Vec<serde_json::Value>>(&keys::chats::all(), "/chats")
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    // The watcher runs on its own task; give it a moment to observe the event.
    for _ in 0..50 {
        if client.current_user().is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(client.current_user().is_none());

    cancel.cancel();
    watcher.await.unwrap();
}
