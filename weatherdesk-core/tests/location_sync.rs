//! Saved-location sync against a mock REST collection.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use serde_json::{Value, json};
use weatherdesk_core::{
    Error, HttpClient, LocationChanges, LocationDraft, LocationId, LocationSyncService, OpState,
    SyncEvent, SyncObserver, SyncOp,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn location(id: u64, name: &str, city: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "city": city,
        "country": "NO",
        "notes": format!("notes for {name}")
    })
}

fn draft() -> LocationDraft {
    LocationDraft {
        name: "Cabin".to_string(),
        city: "Bergen".to_string(),
        country: "NO".to_string(),
        notes: Some("rainy".to_string()),
    }
}

async fn service_for(server: &MockServer) -> (LocationSyncService, HttpClient) {
    service_with(server, HttpClient::new().unwrap())
}

fn service_with(server: &MockServer, http: HttpClient) -> (LocationSyncService, HttpClient) {
    let url = format!("{}/posts", server.uri());
    (LocationSyncService::new(http.clone(), &url).unwrap(), http)
}

async fn mount_listing(server: &MockServer, listing: Value) {
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing))
        .mount(server)
        .await;
}

/// Mount a listing and load it into the service.
async fn seeded(server: &MockServer, listing: Value) -> (LocationSyncService, HttpClient) {
    mount_listing(server, listing).await;

    let (svc, http) = service_for(server).await;
    svc.refresh_all().await.unwrap();
    (svc, http)
}

/// Like `seeded`, but the client gives up on anything slower than 300ms,
/// so a delayed mock stands in for a dead connection.
async fn seeded_with_short_timeout(server: &MockServer, listing: Value) -> LocationSyncService {
    mount_listing(server, listing).await;

    let http = HttpClient::with_timeout(Duration::from_millis(300)).unwrap();
    let (svc, _) = service_with(server, http);
    svc.refresh_all().await.unwrap();
    svc
}

fn stalled() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(location(101, "Late", "Oslo")).set_delay(Duration::from_secs(3))
}

#[derive(Default)]
struct Recorder(Mutex<Vec<SyncEvent>>);

impl SyncObserver for Recorder {
    fn on_event(&self, event: &SyncEvent) {
        self.0.lock().push(event.clone());
    }
}

#[tokio::test]
async fn test_refresh_all_loads_collection_in_order() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(
        &server,
        json!([location(2, "Work", "Oslo"), location(1, "Home", "Tromsø")]),
    )
    .await;

    let all = svc.all();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, LocationId(2));
    assert_eq!(all[1].name, "Home");
    assert_eq!(all[1].notes.as_deref(), Some("notes for Home"));
}

#[tokio::test]
async fn test_refresh_all_is_idempotent() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(&server, json!([location(1, "Home", "Oslo"), location(2, "Work", "Oslo")])).await;

    let first = svc.all();
    let second = svc.refresh_all().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second, svc.all());
}

#[tokio::test]
async fn test_refresh_failure_keeps_previous_list() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(&server, json!([location(1, "Home", "Oslo")])).await;
    server.reset().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = svc.refresh_all().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(svc.all().len(), 1);
}

#[tokio::test]
async fn test_refresh_with_repeated_ids_is_rejected_whole() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(&server, json!([location(1, "Home", "Oslo")])).await;
    server.reset().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([location(5, "A", "X"), location(5, "B", "Y")])),
        )
        .mount(&server)
        .await;

    let err = svc.refresh_all().await.unwrap_err();
    assert!(matches!(err, Error::DuplicateId(LocationId(5))));
    assert_eq!(svc.all()[0].id, LocationId(1));
}

#[tokio::test]
async fn test_create_adds_server_echoed_record() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/posts"))
        .and(body_json(json!({
            "name": "Cabin",
            "city": "Bergen",
            "country": "NO",
            "notes": "rainy"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 101,
            "name": "Cabin",
            "city": "Bergen",
            "country": "NO",
            "notes": "rainy"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (svc, _) = service_for(&server).await;
    let created = svc.create(&draft()).await.unwrap();

    assert_eq!(created.id, LocationId(101));
    let all = svc.all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0], created);
    assert_eq!(all[0].city, "Bergen");
}

#[tokio::test]
async fn test_failed_create_leaves_store_unchanged() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(&server, json!([location(1, "Home", "Oslo")])).await;

    Mock::given(method("POST"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&server)
        .await;

    let before = svc.all();
    let err = svc.create(&draft()).await.unwrap_err();

    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
    assert_eq!(svc.all(), before);
}

#[tokio::test]
async fn test_create_response_without_id_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "name": "Cabin" })))
        .mount(&server)
        .await;

    let (svc, _) = service_for(&server).await;
    let err = svc.create(&draft()).await.unwrap_err();

    assert!(matches!(err, Error::Parse(_)));
    assert!(svc.all().is_empty());
}

#[tokio::test]
async fn test_create_with_already_known_id_is_rejected() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(&server, json!([location(101, "Home", "Oslo")])).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(location(101, "Cabin", "Bergen")))
        .mount(&server)
        .await;

    let err = svc.create(&draft()).await.unwrap_err();

    assert!(matches!(err, Error::DuplicateId(LocationId(101))));
    assert_eq!(svc.all().len(), 1);
    assert_eq!(svc.all()[0].name, "Home");
}

#[tokio::test]
async fn test_update_merges_response() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(&server, json!([location(1, "Home", "Oslo"), location(2, "Work", "Oslo")])).await;

    Mock::given(method("PUT"))
        .and(path("/posts/1"))
        .and(body_json(json!({ "name": "Renamed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "name": "Renamed" })))
        .expect(1)
        .mount(&server)
        .await;

    let changes = LocationChanges { name: Some("Renamed".into()), ..Default::default() };
    let updated = svc.update(LocationId(1), &changes).await.unwrap();

    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.city, "Oslo");
    assert_eq!(updated.notes.as_deref(), Some("notes for Home"));

    let all = svc.all();
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().filter(|l| l.id == LocationId(1)).count(), 1);
    assert_eq!(all[0], updated);
}

#[tokio::test]
async fn test_update_response_fields_win() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(&server, json!([location(1, "Home", "Oslo")])).await;

    Mock::given(method("PUT"))
        .and(path("/posts/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": 1, "name": "Home (server)", "city": "Bærum" })),
        )
        .mount(&server)
        .await;

    let changes = LocationChanges { name: Some("Home (client)".into()), ..Default::default() };
    let updated = svc.update(LocationId(1), &changes).await.unwrap();

    assert_eq!(updated.name, "Home (server)");
    assert_eq!(updated.city, "Bærum");
}

#[tokio::test]
async fn test_failed_update_leaves_record_untouched() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(&server, json!([location(1, "Home", "Oslo")])).await;

    Mock::given(method("PUT"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let before = svc.all();
    let changes = LocationChanges { name: Some("Renamed".into()), ..Default::default() };
    let err = svc.update(LocationId(1), &changes).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(svc.all(), before);
}

#[tokio::test]
async fn test_update_of_unknown_id_makes_no_request() {
    let server = MockServer::start().await;
    let (svc, http) = seeded(&server, json!([location(1, "Home", "Oslo")])).await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let calls_before = http.calls();
    let changes = LocationChanges { name: Some("x".into()), ..Default::default() };
    let err = svc.update(LocationId(99), &changes).await.unwrap_err();

    assert!(matches!(err, Error::NotFound(LocationId(99))));
    assert_eq!(http.calls(), calls_before);
}

#[tokio::test]
async fn test_delete_success_removes_record() {
    let server = MockServer::start().await;
    let (svc, http) = seeded(&server, json!([location(42, "Home", "Oslo"), location(7, "Work", "Oslo")])).await;

    Mock::given(method("DELETE"))
        .and(path("/posts/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    svc.delete(LocationId(42)).await.unwrap();

    assert!(svc.get(LocationId(42)).is_none());
    assert_eq!(svc.all().len(), 1);

    let trace = http.last_trace().unwrap();
    assert_eq!(trace.method.as_str(), "DELETE");
    assert!(trace.url.ends_with("/posts/42"));
    assert_eq!(trace.status, Some(200));
}

#[tokio::test]
async fn test_delete_with_empty_body_still_removes() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(&server, json!([location(42, "Home", "Oslo")])).await;

    Mock::given(method("DELETE"))
        .and(path("/posts/42"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    svc.delete(LocationId(42)).await.unwrap();
    assert!(svc.all().is_empty());
}

#[tokio::test]
async fn test_delete_with_plain_text_body_still_removes() {
    let server = MockServer::start().await;
    let (svc, http) = seeded(&server, json!([location(42, "Home", "Oslo")])).await;

    Mock::given(method("DELETE"))
        .and(path("/posts/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    svc.delete(LocationId(42)).await.unwrap();

    assert!(svc.get(LocationId(42)).is_none());
    assert_eq!(http.last_trace().unwrap().body, json!("OK"));
}

#[tokio::test]
async fn test_create_with_plain_text_success_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_string("Created"))
        .mount(&server)
        .await;

    let (svc, _) = service_for(&server).await;
    let err = svc.create(&draft()).await.unwrap_err();

    assert!(matches!(err, Error::Parse(_)));
    assert!(svc.all().is_empty());
}

#[tokio::test]
async fn test_create_without_response_leaves_store_unchanged() {
    let server = MockServer::start().await;
    let svc = seeded_with_short_timeout(&server, json!([location(1, "Home", "Oslo")])).await;

    Mock::given(method("POST")).respond_with(stalled()).mount(&server).await;

    let before = svc.all();
    let err = svc.create(&draft()).await.unwrap_err();

    assert!(matches!(err, Error::Network(_)), "unexpected error: {err:?}");
    assert_eq!(svc.all(), before);
}

#[tokio::test]
async fn test_update_without_response_leaves_store_unchanged() {
    let server = MockServer::start().await;
    let svc = seeded_with_short_timeout(&server, json!([location(1, "Home", "Oslo")])).await;

    Mock::given(method("PUT")).respond_with(stalled()).mount(&server).await;

    let before = svc.all();
    let changes = LocationChanges { name: Some("Renamed".into()), ..Default::default() };
    let err = svc.update(LocationId(1), &changes).await.unwrap_err();

    assert!(matches!(err, Error::Network(_)), "unexpected error: {err:?}");
    assert_eq!(svc.all(), before);
}

#[tokio::test]
async fn test_delete_without_response_keeps_record() {
    let server = MockServer::start().await;
    let svc = seeded_with_short_timeout(&server, json!([location(42, "Home", "Oslo")])).await;

    Mock::given(method("DELETE")).respond_with(stalled()).mount(&server).await;

    let before = svc.all();
    let err = svc.delete(LocationId(42)).await.unwrap_err();

    assert!(matches!(err, Error::Network(_)), "unexpected error: {err:?}");
    assert_eq!(svc.all(), before);
}

#[tokio::test]
async fn test_refresh_loads_records_without_our_fields() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(
        &server,
        json!([{ "userId": 1, "id": 1, "title": "sunt aut facere", "body": "quia et suscipit" }]),
    )
    .await;

    let all = svc.all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, LocationId(1));
    assert_eq!(all[0].name, "");
    assert_eq!(all[0].notes, None);
}

#[tokio::test]
async fn test_delete_failure_keeps_record() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(&server, json!([location(42, "Home", "Oslo")])).await;

    Mock::given(method("DELETE"))
        .and(path("/posts/42"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = svc.delete(LocationId(42)).await.unwrap_err();

    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Failed to delete location");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
    assert!(svc.get(LocationId(42)).is_some());
}

#[tokio::test]
async fn test_delete_of_locally_absent_id_is_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/posts/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (svc, _) = service_for(&server).await;
    assert!(svc.delete(LocationId(3)).await.is_ok());
    assert!(svc.all().is_empty());
}

#[tokio::test]
async fn test_operations_on_different_ids_run_independently() {
    let server = MockServer::start().await;
    let (svc, _) = seeded(&server, json!([location(1, "Home", "Oslo"), location(2, "Work", "Oslo")])).await;

    Mock::given(method("DELETE"))
        .and(path("/posts/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/posts/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 2, "notes": "moved" })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(location(101, "Cabin", "Bergen")))
        .mount(&server)
        .await;

    let changes = LocationChanges { notes: Some("moved".into()), ..Default::default() };
    let new_location = draft();
    let (deleted, updated, created) = tokio::join!(
        svc.delete(LocationId(1)),
        svc.update(LocationId(2), &changes),
        svc.create(&new_location),
    );

    deleted.unwrap();
    assert_eq!(updated.unwrap().notes.as_deref(), Some("moved"));
    assert_eq!(created.unwrap().id, LocationId(101));

    let ids: Vec<u64> = svc.all().iter().map(|l| l.id.0).collect();
    assert_eq!(ids, vec![2, 101]);
}

#[tokio::test]
async fn test_observer_sees_each_transition() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(location(101, "Cabin", "Bergen")))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (mut svc, _) = service_for(&server).await;
    let recorder = Arc::new(Recorder::default());
    svc.subscribe(recorder.clone());

    svc.create(&draft()).await.unwrap();
    svc.delete(LocationId(101)).await.unwrap_err();

    let events = recorder.0.lock();
    let seen: Vec<(SyncOp, Option<LocationId>, bool)> = events
        .iter()
        .map(|e| (e.op, e.id, matches!(e.state, OpState::Failed(_))))
        .collect();

    assert_eq!(
        seen,
        vec![
            (SyncOp::Create, None, false),
            (SyncOp::Create, Some(LocationId(101)), false),
            (SyncOp::Delete, Some(LocationId(101)), false),
            (SyncOp::Delete, Some(LocationId(101)), true),
        ]
    );
    assert_eq!(events[0].state, OpState::InFlight);
    assert_eq!(events[1].state, OpState::Committed);
    assert_eq!(events[2].state, OpState::InFlight);
}
