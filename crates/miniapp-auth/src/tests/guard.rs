//! SessionGuard lifecycle.

use super::harness::{FakeAuthApi, Fixture};
use crate::{Bootstrap, GuardState, GuardView, SessionGuard};
use async_trait::async_trait;
use credential_store::SessionCredential;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct PanickingBootstrap;

#[async_trait]
impl Bootstrap for PanickingBootstrap {
    async fn bootstrap(&self, _wait_for_data: bool) -> bool {
        panic!("identity exchange blew up");
    }
}

struct SlowFailingBootstrap {
    calls: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl Bootstrap for SlowFailingBootstrap {
    async fn bootstrap(&self, _wait_for_data: bool) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        false
    }
}

struct CountingBootstrap {
    calls: AtomicUsize,
    result: bool,
}

#[async_trait]
impl Bootstrap for CountingBootstrap {
    async fn bootstrap(&self, _wait_for_data: bool) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
    }
}

#[tokio::test]
async fn existing_credential_admits_without_bootstrap() {
    let fixture = Fixture::new();
    fixture
        .credentials
        .set_credential(&SessionCredential::new("tok"))
        .unwrap();
    let counting = Arc::new(CountingBootstrap {
        calls: AtomicUsize::new(0),
        result: false,
    });

    let guard = SessionGuard::mount(counting.clone(), &fixture.credentials);

    assert_eq!(guard.state(), GuardState::Admitted);
    assert_eq!(guard.view(), GuardView::Protected);
    tokio::task::yield_now().await;
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn late_message_moves_checking_to_admitted() {
    let fixture = Fixture::new().without_host();
    let bus = fixture.bus.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        bus.post(json!({"user_id": 42}));
    });

    let guard = SessionGuard::mount(Arc::new(fixture.bootstrapper()), &fixture.credentials);
    assert_eq!(guard.view(), GuardView::Loading);

    assert_eq!(guard.settled().await, GuardState::Admitted);
    assert!(fixture.credentials.has_credential());
}

#[tokio::test(start_paused = true)]
async fn no_identity_within_timeout_fails_with_reload_prompt() {
    let fixture = Fixture::new().without_host();

    let guard = SessionGuard::mount(Arc::new(fixture.bootstrapper()), &fixture.credentials);

    assert_eq!(guard.settled().await, GuardState::Failed);
    assert_eq!(
        guard.view(),
        GuardView::RedirectToLogin {
            reload_prompt: true
        }
    );
    assert_eq!(fixture.api.call_count(), 0);
}

#[tokio::test]
async fn panicking_bootstrap_counts_as_failure() {
    let fixture = Fixture::new();
    let guard = SessionGuard::mount(Arc::new(PanickingBootstrap), &fixture.credentials);
    assert_eq!(guard.settled().await, GuardState::Failed);
}

#[tokio::test(start_paused = true)]
async fn teardown_mid_check_suppresses_updates_but_lets_io_finish() {
    let fixture = Fixture::new().with_api(FakeAuthApi::with_latency(Duration::from_millis(500)));
    fixture.host.set_init_data(Some("user_id=8".to_string()));

    let guard = SessionGuard::mount(Arc::new(fixture.bootstrapper()), &fixture.credentials);
    let observer = guard.subscribe();
    tokio::time::sleep(Duration::from_millis(100)).await;
    guard.unmount();

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(*observer.borrow(), GuardState::Checking);
    assert_eq!(fixture.api.calls_to("login").len(), 1);
    assert!(fixture.credentials.has_credential());
}

#[tokio::test]
async fn retry_reruns_bootstrap_after_failure() {
    let fixture = Fixture::new();
    let counting = Arc::new(CountingBootstrap {
        calls: AtomicUsize::new(0),
        result: false,
    });

    let guard = SessionGuard::mount(counting.clone(), &fixture.credentials);
    assert_eq!(guard.settled().await, GuardState::Failed);

    guard.retry();
    assert_eq!(guard.state(), GuardState::Checking);
    assert_eq!(guard.settled().await, GuardState::Failed);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn credential_loss_rechecks() {
    let fixture = Fixture::new();
    fixture
        .credentials
        .set_credential(&SessionCredential::new("tok"))
        .unwrap();
    let counting = Arc::new(CountingBootstrap {
        calls: AtomicUsize::new(0),
        result: true,
    });

    let guard = SessionGuard::mount(counting.clone(), &fixture.credentials);
    fixture.credentials.clear_credential().unwrap();
    guard.credential_lost();

    assert_eq!(guard.settled().await, GuardState::Admitted);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retry_is_ignored_unless_failed() {
    let fixture = Fixture::new();
    fixture
        .credentials
        .set_credential(&SessionCredential::new("tok"))
        .unwrap();
    let counting = Arc::new(CountingBootstrap {
        calls: AtomicUsize::new(0),
        result: true,
    });

    let guard = SessionGuard::mount(counting.clone(), &fixture.credentials);
    guard.retry();
    tokio::task::yield_now().await;

    assert_eq!(guard.state(), GuardState::Admitted);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_retries_start_one_bootstrap() {
    let fixture = Fixture::new();
    let slow = Arc::new(SlowFailingBootstrap {
        calls: AtomicUsize::new(0),
        delay: Duration::from_millis(200),
    });

    let guard = Arc::new(SessionGuard::mount(slow.clone(), &fixture.credentials));
    assert_eq!(guard.settled().await, GuardState::Failed);

    let barrier = Arc::new(tokio::sync::Barrier::new(8));
    let retries: Vec<_> = (0..8)
        .map(|_| {
            let guard = guard.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                guard.retry();
            })
        })
        .collect();
    for retry in retries {
        retry.await.unwrap();
    }

    assert_eq!(guard.settled().await, GuardState::Failed);
    assert_eq!(slow.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn credential_lost_is_ignored_unless_admitted() {
    let fixture = Fixture::new();
    let counting = Arc::new(CountingBootstrap {
        calls: AtomicUsize::new(0),
        result: false,
    });

    let guard = SessionGuard::mount(counting.clone(), &fixture.credentials);
    assert_eq!(guard.settled().await, GuardState::Failed);

    guard.credential_lost();
    tokio::task::yield_now().await;

    assert_eq!(guard.state(), GuardState::Failed);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}
