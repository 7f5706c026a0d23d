use std::sync::Arc;
use std::time::Duration;

use driftwatch_core_types::ConnectionState;
use driftwatch_event_stream::{
    EventStreamConnector, ScriptStep, ScriptedSource, StreamConfig, StreamNotice,
};
use driftwatch_state_center::EventBuffer;
use driftwatch_transport::StreamError;

fn event(n: usize) -> String {
    serde_json::json!({
        "age": 30 + n, "gender": 0, "pulse_rate": 70, "systolic_bp": 118,
        "diastolic_bp": 76, "glucose": 5.0, "height": 1.65, "weight": 61,
        "bmi": 22.4, "family_diabetes": 0, "hypertensive": 0,
        "family_hypertension": 0, "cardiovascular_disease": 0, "stroke": 0,
        "prediction": n % 2, "timestamp": format!("2024-05-01T10:{:02}:00", n % 60)
    })
    .to_string()
}

async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn long_run_keeps_only_newest_fifty() {
    let steps = (0..75).map(|n| ScriptStep::Message(event(n))).collect();
    let source = ScriptedSource::new().session(steps);
    let config = StreamConfig::default();
    let buffer = Arc::new(EventBuffer::new(config.buffer_capacity));
    let connector = EventStreamConnector::new(Arc::new(source.clone()), buffer.clone(), config);

    connector.start();
    settle().await;

    let snapshot = buffer.snapshot();
    assert_eq!(snapshot.len(), 50);
    assert_eq!(snapshot[0].features.age, 104.0);
    assert_eq!(snapshot[49].features.age, 55.0);
    assert_eq!(connector.status().received, 75);
    connector.stop().await;
}

#[tokio::test(start_paused = true)]
async fn survives_flapping_connection() {
    let source = ScriptedSource::new()
        .session(vec![
            ScriptStep::Message(event(1)),
            ScriptStep::Pause(Duration::from_millis(200)),
            ScriptStep::Fail(StreamError::Interrupted("connection reset".into())),
        ])
        .refuse(StreamError::Connect("connection refused".into()))
        .session(vec![ScriptStep::Message(event(2))]);
    let buffer = Arc::new(EventBuffer::default());
    let connector = EventStreamConnector::new(
        Arc::new(source.clone()),
        buffer.clone(),
        StreamConfig::default(),
    );
    let mut notices = connector.subscribe();
    let mut status = connector.watch_status();

    connector.start();
    settle().await;
    tokio::time::advance(Duration::from_millis(200)).await;
    settle().await;
    assert_eq!(status.borrow_and_update().state, ConnectionState::Reconnecting);

    tokio::time::advance(Duration::from_millis(3_000)).await;
    settle().await;
    assert_eq!(source.open_count(), 2);
    assert_eq!(connector.status().state, ConnectionState::Reconnecting);

    tokio::time::advance(Duration::from_millis(3_000)).await;
    settle().await;
    assert_eq!(source.open_count(), 3);
    assert_eq!(connector.status().state, ConnectionState::Open);
    assert_eq!(connector.status().reconnects, 2);
    assert_eq!(source.max_live(), 1);

    let stamps: Vec<String> = buffer.snapshot().into_iter().map(|r| r.timestamp).collect();
    assert_eq!(stamps, vec!["2024-05-01T10:02:00", "2024-05-01T10:01:00"]);

    let mut seen = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        seen.push(match notice {
            StreamNotice::Opened => "opened",
            StreamNotice::Event(_) => "event",
            StreamNotice::Disconnected { .. } => "disconnected",
        });
    }
    assert_eq!(
        seen,
        vec!["opened", "event", "disconnected", "disconnected", "opened", "event"]
    );
    connector.stop().await;
}
