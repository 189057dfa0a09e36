use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use cadtra_lib::{
    models::{DistanceUnit, SessionRecord},
    route::{polyline, LocationFix},
    session::{
        Completion, CompletionError, CompletionListener, SessionController, SessionState,
        SessionUploader,
    },
    settings::ClientSettings,
    sync::{ApiEndpoint, NoopRefresher, SyncError},
    AppContext,
};
use chrono::Utc;
use httpmock::prelude::*;
use tokio::sync::mpsc;

// Roughly 100 m of latitude.
const STEP_DEG: f64 = 0.0008993;

fn listener() -> (CompletionListener, mpsc::UnboundedReceiver<Completion>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener: CompletionListener = Arc::new(move |completion| {
        let _ = tx.send(completion);
    });
    (listener, rx)
}

fn context_for(server: &MockServer, unit: DistanceUnit) -> AppContext {
    let settings = ClientSettings {
        server: ApiEndpoint::new(server.host(), server.port()),
        distance_unit: unit,
        ..ClientSettings::default()
    };
    let context = AppContext::new(settings, Arc::new(NoopRefresher));
    context.tokens.set("runner-token");
    context
}

fn north_from(origin_ms: i64, i: usize) -> LocationFix {
    LocationFix::new(
        37.0 + i as f64 * STEP_DEG,
        -122.0,
        origin_ms + i as i64 * 1000,
    )
}

#[tokio::test]
async fn run_is_measured_and_uploaded() {
    let server = MockServer::start_async().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/users/me/logs")
                .header("authorization", "Bearer runner-token");
            then.status(201);
        })
        .await;

    let (listener, mut completions) = listener();
    let controller = context_for(&server, DistanceUnit::Miles).session_controller(listener);
    let origin = Utc::now().timestamp_millis();

    assert!(controller.start().await);
    for i in 0..3 {
        assert!(controller.on_location(north_from(origin, i)));
    }
    assert_eq!(controller.pause_resume().await, Some(SessionState::Paused));
    assert!(!controller.on_location(north_from(origin, 10)));
    assert_eq!(controller.pause_resume().await, Some(SessionState::Running));

    let record = controller.stop().await.expect("record");
    assert_eq!(controller.state().await, SessionState::Idle);
    assert!((record.distance() - 0.1243).abs() < 0.001);
    assert_eq!(polyline::decode(record.encoded_route()).unwrap().len(), 3);

    let completion = completions.recv().await.expect("completion");
    assert!(completion.is_success());
    upload.assert_async().await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(completions.try_recv().is_err());
}

#[tokio::test]
async fn metric_users_get_meters() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/users/me/logs");
            then.status(201);
        })
        .await;

    let (listener, mut completions) = listener();
    let controller = context_for(&server, DistanceUnit::Meters).session_controller(listener);
    let origin = Utc::now().timestamp_millis();

    controller.start().await;
    controller.on_location(north_from(origin, 0));
    controller.on_location(north_from(origin, 1));
    let record = controller.stop().await.expect("record");

    assert_eq!(record.unit(), DistanceUnit::Meters);
    assert!((record.distance() - 100.0).abs() < 0.5);
    assert!(completions.recv().await.expect("completion").is_success());
}

#[tokio::test]
async fn failed_upload_reports_once_and_can_be_retried() {
    let server = MockServer::start_async().await;
    let mut outage = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/users/me/logs");
            then.status(503).body("maintenance");
        })
        .await;

    let (listener, mut completions) = listener();
    let controller = context_for(&server, DistanceUnit::Miles).session_controller(listener);

    controller.start().await;
    controller.stop().await.expect("record");

    let failed = completions.recv().await.expect("completion");
    match &failed.result {
        Err(CompletionError::Upload(SyncError::Status { status, message })) => {
            assert_eq!(*status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(controller.snapshot().await.has_failed_upload);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(completions.try_recv().is_err());

    outage.delete_async().await;
    let recovered = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/users/me/logs");
            then.status(201);
        })
        .await;

    assert!(controller.retry_upload().await);
    let retried = completions.recv().await.expect("retry completion");
    assert_eq!(retried.session_id, failed.session_id);
    assert!(retried.is_success());
    recovered.assert_async().await;
    assert!(!controller.retry_upload().await);
}

struct Discard;

#[async_trait]
impl SessionUploader for Discard {
    async fn upload(&self, _record: &SessionRecord) -> Result<(), SyncError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn elapsed_ticks_follow_the_session() {
    let (listener, mut completions) = listener();
    let controller = SessionController::new(Arc::new(Discard), listener, Duration::from_secs(1));

    controller.start().await;
    let mut ticks = controller.subscribe_elapsed();

    let mut last = None;
    while let Some(tick) = ticks.recv().await {
        let done = tick.elapsed_seconds >= 3;
        last = Some(tick);
        if done {
            break;
        }
    }
    let last = last.expect("ticks while running");
    assert_eq!(last.elapsed_seconds, 3);
    assert_eq!(last.formatted, "00:03");

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Running);
    assert_eq!(snapshot.time, "00:03");

    let record = controller.stop().await.expect("record");
    assert_eq!(record.active_seconds(), Some(3));

    // Stopping sends the final value and ends the stream.
    let mut rest = Vec::new();
    while let Some(tick) = ticks.recv().await {
        rest.push(tick.formatted);
    }
    assert_eq!(rest.last().map(String::as_str), Some("00:03"));
    assert_eq!(controller.snapshot().await.time, "00:00");
    assert!(completions.recv().await.expect("completion").is_success());
}
