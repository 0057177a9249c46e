//! End-to-end: poll → track → notify, with subscribers registered over HTTP.

mod helpers;

use anyhow::Result;
use evwatch::{
    core::{PushSubscription, StatusSource},
    notification::Notifier,
    poller::Poller,
    registry::SubscriptionRegistry,
    tracker::{Availability, Transition},
};
use helpers::{subscription_json, FakeStatusSource, RecordingPushSender, TestAppBuilder};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_rising_edge_reaches_http_subscribers_and_prunes_gone() -> Result<()> {
    // The first background fetch is held until subscribers exist.
    let source = FakeStatusSource::gated(json!({ "status": "Occupied" }));
    let sender = RecordingPushSender::new();
    sender.mark_gone("https://push.example.com/2");

    let app = TestAppBuilder::new()
        .with_source(source.clone())
        .with_sender(sender.clone())
        .start()
        .await?;

    for n in 1..=3 {
        let response = app
            .client
            .post(app.url("/api/subscribe"))
            .json(&subscription_json(&format!("https://push.example.com/{n}")))
            .send()
            .await?;
        assert_eq!(response.status(), 200);
    }
    assert_eq!(app.registry.len(), 3);

    source.set_status("Available");
    source.release(1);

    let sent = sender.wait_for(3, Duration::from_secs(5)).await;
    assert_eq!(sent.len(), 3);
    for (_, payload) in &sent {
        assert_eq!(payload.title, "EV Station available");
        assert_eq!(payload.body, "Station status changed to \"Available\".");
        assert_eq!(payload.url, "/");
    }

    // Pruning runs after every delivery settles.
    tokio::time::timeout(Duration::from_secs(5), async {
        while app.registry.len() != 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    assert!(app.registry.get("https://push.example.com/2").is_none());
    assert!(app.registry.get("https://push.example.com/1").is_some());
    assert!(app.registry.get("https://push.example.com/3").is_some());

    app.shutdown().await
}

#[tokio::test]
async fn test_four_tick_scenario() -> Result<()> {
    let source = FakeStatusSource::open(json!({ "status": "Available" }));
    let sender = RecordingPushSender::new();
    let registry = SubscriptionRegistry::new();
    registry.add(PushSubscription {
        endpoint: "https://push.example.com/1".to_string(),
        ..Default::default()
    })?;
    let notifier = Notifier::new(registry, Some(sender.clone()), "/");
    let mut poller = Poller::new(
        source.clone() as Arc<dyn StatusSource>,
        notifier,
        Duration::from_secs(600),
    );

    // Tick 1: unknown → available.
    let outcome = poller.tick().await?;
    assert_eq!(outcome.transition, Transition::RisingEdge);
    assert_eq!(sender.sent().len(), 1);

    // Tick 2: available again, suppressed.
    let outcome = poller.tick().await?;
    assert_eq!(outcome.transition, Transition::StillAvailable);
    assert_eq!(sender.sent().len(), 1);

    // Tick 3: occupied.
    source.set_status("Occupied");
    poller.tick().await?;
    assert_eq!(poller.availability(), Availability::Occupied);
    assert_eq!(sender.sent().len(), 1);

    // Tick 4: a new rising edge.
    source.set_status("Available");
    let outcome = poller.tick().await?;
    assert!(outcome.transition.is_rising_edge());
    assert_eq!(sender.sent().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_without_push_backend_rising_edge_is_silent() -> Result<()> {
    let source = FakeStatusSource::open(json!({ "status": "Available" }));
    let registry = SubscriptionRegistry::new();
    registry.add(PushSubscription {
        endpoint: "https://push.example.com/1".to_string(),
        ..Default::default()
    })?;
    let notifier = Notifier::new(registry.clone(), None, "/");
    let mut poller = Poller::new(source, notifier, Duration::from_secs(600));

    let outcome = poller.tick().await?;

    assert!(outcome.transition.is_rising_edge());
    assert_eq!(outcome.dispatch.unwrap_or_default().attempted, 0);
    assert_eq!(registry.len(), 1);
    Ok(())
}
