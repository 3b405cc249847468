// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::*;
use crate::credential::{CredentialPair, MemoryBackend};

struct MockEndpoint {
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    gate: Notify,
    gated: bool,
    stall_first: bool,
    result: Result<RefreshedTokens, u16>,
}

impl MockEndpoint {
    fn ok(access: &str) -> Self {
        Self::with_result(Ok(RefreshedTokens { access: access.to_owned(), refresh: None }))
    }

    fn failing(status: u16) -> Self {
        Self::with_result(Err(status))
    }

    fn with_result(result: Result<RefreshedTokens, u16>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            gate: Notify::new(),
            gated: false,
            stall_first: false,
            result,
        }
    }

    fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RefreshEndpoint for MockEndpoint {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(refresh_token.to_owned());
        if self.stall_first && n == 0 {
            std::future::pending::<()>().await;
        }
        if self.gated {
            self.gate.notified().await;
        }
        match &self.result {
            Ok(tokens) => Ok(tokens.clone()),
            Err(status) => Err(ApiError::ServerRejected { status: *status, body: String::new() }),
        }
    }
}

struct Fixture {
    store: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    events: broadcast::Sender<SessionEvent>,
    endpoint: Arc<MockEndpoint>,
}

impl Fixture {
    fn new(pair: Option<CredentialPair>, endpoint: MockEndpoint) -> Self {
        let store = CredentialStore::new(Arc::new(MemoryBackend::new()));
        if let Some(pair) = pair {
            store.replace(pair);
        }
        let (events, _) = broadcast::channel(16);
        Self {
            store: Arc::new(store),
            coordinator: Arc::new(RefreshCoordinator::new()),
            events,
            endpoint: Arc::new(endpoint),
        }
    }

    fn spawn(&self, stale: Option<&'static str>) -> JoinHandle<RefreshOutcome> {
        let coordinator = Arc::clone(&self.coordinator);
        let endpoint = Arc::clone(&self.endpoint);
        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        tokio::spawn(async move { coordinator.recover(&*endpoint, &store, &events, stale).await })
    }

    async fn recover(&self, stale: Option<&str>) -> RefreshOutcome {
        self.coordinator.recover(&*self.endpoint, &self.store, &self.events, stale).await
    }

    async fn wait_for_queue(&self, n: usize) {
        for _ in 0..10_000 {
            if self.coordinator.is_refreshing() && self.coordinator.queued() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        assert!(self.coordinator.queued() >= n, "queue never reached {n}");
    }
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() -> anyhow::Result<()> {
    let fx = Fixture::new(Some(CredentialPair::new("a1", "r1")), MockEndpoint::ok("a2").gated());
    let handles: Vec<_> = (0..8).map(|_| fx.spawn(Some("a1"))).collect();

    fx.wait_for_queue(7).await;
    fx.endpoint.gate.notify_one();

    for handle in handles {
        assert_eq!(handle.await?, RefreshOutcome::Refreshed("a2".into()));
    }
    assert_eq!(fx.endpoint.calls(), 1);
    assert_eq!(*fx.endpoint.seen.lock(), vec!["r1".to_owned()]);
    assert_eq!(fx.store.snapshot(), Some(CredentialPair::new("a2", "r1")));
    assert!(!fx.coordinator.is_refreshing());
    assert_eq!(fx.coordinator.queued(), 0);
    Ok(())
}

#[tokio::test]
async fn waiters_are_released_in_arrival_order() -> anyhow::Result<()> {
    let fx = Fixture::new(Some(CredentialPair::new("a1", "r1")), MockEndpoint::ok("a2").gated());
    let released = Arc::new(Mutex::new(Vec::new()));

    let leader = fx.spawn(Some("a1"));
    fx.wait_for_queue(0).await;
    let mut waiters = Vec::new();
    for i in 0..5 {
        let coordinator = Arc::clone(&fx.coordinator);
        let endpoint = Arc::clone(&fx.endpoint);
        let store = Arc::clone(&fx.store);
        let events = fx.events.clone();
        let released = Arc::clone(&released);
        waiters.push(tokio::spawn(async move {
            let outcome = coordinator.recover(&*endpoint, &store, &events, Some("a1")).await;
            released.lock().push(i);
            outcome
        }));
        fx.wait_for_queue(i + 1).await;
    }

    fx.endpoint.gate.notify_one();
    assert_eq!(leader.await?, RefreshOutcome::Refreshed("a2".into()));
    for waiter in waiters {
        assert_eq!(waiter.await?, RefreshOutcome::Refreshed("a2".into()));
    }
    assert_eq!(*released.lock(), vec![0, 1, 2, 3, 4]);
    Ok(())
}

#[tokio::test]
async fn refresh_failure_expires_every_waiter() -> anyhow::Result<()> {
    let fx = Fixture::new(Some(CredentialPair::new("a1", "r1")), MockEndpoint::failing(401).gated());
    let mut rx = fx.events.subscribe();
    let handles: Vec<_> = (0..5).map(|_| fx.spawn(Some("a1"))).collect();

    fx.wait_for_queue(4).await;
    fx.endpoint.gate.notify_one();

    for handle in handles {
        assert_eq!(handle.await?, RefreshOutcome::Expired);
    }
    assert_eq!(fx.endpoint.calls(), 1);
    assert!(fx.store.is_empty());
    assert!(matches!(rx.recv().await?, SessionEvent::Expired { .. }));
    Ok(())
}

#[tokio::test]
async fn missing_refresh_token_short_circuits() -> anyhow::Result<()> {
    let fx = Fixture::new(Some(CredentialPair::access_only("a1")), MockEndpoint::ok("a2"));
    let mut rx = fx.events.subscribe();
    assert_eq!(fx.recover(Some("a1")).await, RefreshOutcome::Expired);
    assert_eq!(fx.endpoint.calls(), 0);
    assert!(fx.store.is_empty());
    assert!(matches!(rx.recv().await?, SessionEvent::Expired { .. }));
    Ok(())
}

#[tokio::test]
async fn empty_store_short_circuits_without_an_event() {
    let fx = Fixture::new(None, MockEndpoint::ok("a2"));
    let mut rx = fx.events.subscribe();
    assert_eq!(fx.recover(None).await, RefreshOutcome::Expired);
    assert_eq!(fx.endpoint.calls(), 0);
    assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
}

#[tokio::test]
async fn stale_401_after_refresh_reuses_current_token() {
    let fx = Fixture::new(Some(CredentialPair::new("a2", "r1")), MockEndpoint::ok("a3"));
    assert_eq!(fx.recover(Some("a1")).await, RefreshOutcome::Refreshed("a2".into()));
    assert_eq!(fx.endpoint.calls(), 0);
}

#[tokio::test]
async fn unauthenticated_request_picks_up_existing_token() {
    let fx = Fixture::new(Some(CredentialPair::new("a1", "r1")), MockEndpoint::ok("a2"));
    assert_eq!(fx.recover(None).await, RefreshOutcome::Refreshed("a1".into()));
    assert_eq!(fx.endpoint.calls(), 0);
}

#[tokio::test]
async fn each_settled_cycle_allows_a_new_one() {
    let fx = Fixture::new(Some(CredentialPair::new("a1", "r1")), MockEndpoint::ok("a2"));
    assert_eq!(fx.recover(Some("a1")).await, RefreshOutcome::Refreshed("a2".into()));
    // The new token is rejected too: a fresh cycle starts.
    assert_eq!(fx.recover(Some("a2")).await, RefreshOutcome::Refreshed("a2".into()));
    assert_eq!(fx.endpoint.calls(), 2);
}

#[tokio::test]
async fn rotated_refresh_token_is_stored() {
    let endpoint = MockEndpoint::with_result(Ok(RefreshedTokens {
        access: "a2".into(),
        refresh: Some("r2".into()),
    }));
    let fx = Fixture::new(Some(CredentialPair::new("a1", "r1")), endpoint);
    assert_eq!(fx.recover(Some("a1")).await, RefreshOutcome::Refreshed("a2".into()));
    assert_eq!(fx.store.snapshot(), Some(CredentialPair::new("a2", "r2")));
}

#[tokio::test]
async fn success_emits_refreshed_event() -> anyhow::Result<()> {
    let fx = Fixture::new(Some(CredentialPair::new("a1", "r1")), MockEndpoint::ok("a2"));
    let mut rx = fx.events.subscribe();
    fx.recover(Some("a1")).await;
    assert_eq!(rx.recv().await?, SessionEvent::Refreshed);
    Ok(())
}

#[tokio::test]
async fn abandoned_leader_hands_over_to_a_waiter() -> anyhow::Result<()> {
    let mut endpoint = MockEndpoint::ok("a2");
    endpoint.stall_first = true;
    let fx = Fixture::new(Some(CredentialPair::new("a1", "r1")), endpoint);

    let leader = fx.spawn(Some("a1"));
    fx.wait_for_queue(0).await;
    let waiter = fx.spawn(Some("a1"));
    fx.wait_for_queue(1).await;

    leader.abort();
    assert_eq!(waiter.await?, RefreshOutcome::Refreshed("a2".into()));
    assert_eq!(fx.endpoint.calls(), 2);
    assert!(!fx.coordinator.is_refreshing());
    Ok(())
}

#[tokio::test]
async fn logout_during_refresh_is_not_undone() -> anyhow::Result<()> {
    let fx = Fixture::new(Some(CredentialPair::new("a1", "r1")), MockEndpoint::ok("a2").gated());
    let leader = fx.spawn(Some("a1"));
    fx.wait_for_queue(0).await;

    fx.store.clear();
    fx.endpoint.gate.notify_one();

    assert_eq!(leader.await?, RefreshOutcome::Expired);
    assert!(fx.store.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_refresh_keeps_a_newer_login() -> anyhow::Result<()> {
    let fx = Fixture::new(Some(CredentialPair::new("a1", "r1")), MockEndpoint::failing(401).gated());
    let leader = fx.spawn(Some("a1"));
    fx.wait_for_queue(0).await;

    fx.store.replace(CredentialPair::new("b1", "s1"));
    fx.endpoint.gate.notify_one();

    assert_eq!(leader.await?, RefreshOutcome::Refreshed("b1".into()));
    assert_eq!(fx.store.snapshot(), Some(CredentialPair::new("b1", "s1")));
    Ok(())
}
