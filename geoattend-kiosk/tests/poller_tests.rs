//! Status poller timing, budget and cancellation (paused tokio clock)

mod helpers;

use geoattend_kiosk::poller::{PollError, PollOutcome, PollPolicy, PollState, StatusPoller};
use helpers::{pending, registered, reply, ScriptedBackend};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const INTERVAL: Duration = Duration::from_millis(3000);

fn poller(backend: &Arc<ScriptedBackend>) -> StatusPoller {
    StatusPoller::new(
        backend.clone(),
        PollPolicy {
            interval: INTERVAL,
            max_attempts: 10,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_pending_then_registered() {
    let backend = Arc::new(ScriptedBackend::new().with_statuses([
        pending(),
        pending(),
        registered("A. Kumar", "FAC123"),
    ]));
    let mut poller = poller(&backend);
    let states = poller.subscribe();
    let started = Instant::now();

    let outcome = poller.run("42", "FAC123", &CancellationToken::new()).await;

    match outcome {
        PollOutcome::Finished(PollState::Registered(attendee)) => {
            assert_eq!(attendee.name, "A. Kumar");
            assert_eq!(attendee.registration_id, "FAC123");
        }
        other => panic!("expected Registered, got {:?}", other),
    }
    assert_eq!(backend.status_calls(), 3);
    assert_eq!(started.elapsed(), INTERVAL * 2, "first query runs immediately");
    assert!(matches!(*states.borrow(), PollState::Registered(_)));
}

#[tokio::test(start_paused = true)]
async fn test_budget_exhaustion_is_still_processing() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut poller = poller(&backend);

    let outcome = poller.run("42", "FAC123", &CancellationToken::new()).await;

    assert_eq!(
        outcome,
        PollOutcome::Finished(PollState::StillProcessing { attempts: 10 })
    );
    assert_eq!(backend.status_calls(), 10);

    // Nothing keeps polling after the terminal state
    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(backend.status_calls(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_stops_immediately() {
    let backend = Arc::new(
        ScriptedBackend::new().with_statuses([reply(404, r#"{"detail":"Attendance not found"}"#)]),
    );
    let mut poller = poller(&backend);

    let outcome = poller.run("42", "FAC123", &CancellationToken::new()).await;

    assert_eq!(
        outcome,
        PollOutcome::Finished(PollState::Error(PollError::NotFound(
            "Attendance not found".to_string()
        )))
    );
    assert_eq!(backend.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_is_not_retried() {
    let backend = Arc::new(ScriptedBackend::new().with_statuses([pending(), reply(500, "boom")]));
    let mut poller = poller(&backend);

    let outcome = poller.run("42", "FAC123", &CancellationToken::new()).await;

    assert!(matches!(
        outcome,
        PollOutcome::Finished(PollState::Error(PollError::Http { status: 500, .. }))
    ));
    assert_eq!(backend.status_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_queries_never_overlap() {
    let backend = Arc::new(ScriptedBackend::new().with_delay(Duration::from_millis(7000)));
    let mut poller = StatusPoller::new(
        backend.clone(),
        PollPolicy {
            interval: INTERVAL,
            max_attempts: 4,
        },
    );

    let outcome = poller.run("42", "FAC123", &CancellationToken::new()).await;

    assert_eq!(
        outcome,
        PollOutcome::Finished(PollState::StillProcessing { attempts: 4 })
    );
    assert_eq!(backend.max_in_flight(), 1);
    assert_eq!(backend.status_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_timer() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut poller = poller(&backend);
    let states = poller.subscribe();
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(4000)).await;
        canceller.cancel();
    });

    let outcome = poller.run("42", "FAC123", &cancel).await;

    assert_eq!(outcome, PollOutcome::Cancelled);
    assert_eq!(backend.status_calls(), 2);
    assert_eq!(*states.borrow(), PollState::Pending { attempts: 2 });

    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(backend.status_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reply_after_cancel_is_discarded() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_delay(Duration::from_millis(5000))
            .with_statuses([registered("A. Kumar", "FAC123")]),
    );
    let mut poller = poller(&backend);
    let states = poller.subscribe();
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        canceller.cancel();
    });

    let outcome = poller.run("42", "FAC123", &cancel).await;

    assert_eq!(outcome, PollOutcome::Cancelled);
    assert_eq!(*states.borrow(), PollState::Loading);
}
