//! Integration tests for the login state machine
//!
//! These tests drive `AuthManager` against hand-written fakes and observe the
//! published login statuses:
//! - Connectivity budget exhaustion
//! - Recovery after transient connectivity loss
//! - Concurrent login attempts
//! - Re-login after logout

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    ConnectivityProbe, CredentialStore, LoginRequest, LoginResponse, PlaylistBatch,
    RemoteCatalogClient, RemoteDevice, StoredCredentials, TrackBatch,
};
use chrono::{DateTime, Utc};
use core_auth::{AuthError, AuthManager, LoginState, Session};
use core_runtime::config::LoginSettings;
use core_runtime::events::{EventBus, EventStream, LoginStatus};
use core_runtime::notifier::LoginNotifier;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Fakes
// ============================================================================

/// Probe answering from a script; answers `fallback` once the script is used up.
struct ScriptedProbe {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    fn new(script: &[bool], fallback: bool) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectivityProbe for ScriptedProbe {
    async fn probe(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

/// Remote accepting one password; optionally holds logins until released.
struct FakeRemote {
    password: String,
    logins: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl FakeRemote {
    fn new(password: &str) -> Self {
        Self {
            password: password.to_string(),
            logins: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn gated(password: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(password)
        }
    }
}

#[async_trait]
impl RemoteCatalogClient for FakeRemote {
    async fn login(&self, request: LoginRequest) -> BridgeResult<LoginResponse> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match request.credentials {
            bridge_traits::LoginCredentials::Password { password, .. }
                if password == self.password =>
            {
                Ok(LoginResponse::accepted("issued-token"))
            }
            bridge_traits::LoginCredentials::Token { token, .. } if token == "issued-token" => {
                Ok(LoginResponse::accepted("issued-token"))
            }
            _ => Ok(LoginResponse::rejected()),
        }
    }

    async fn logout(&self) -> BridgeResult<()> {
        Ok(())
    }

    async fn get_all_tracks(&self) -> BridgeResult<Option<TrackBatch>> {
        Err(BridgeError::NotAvailable("not used".to_string()))
    }

    async fn get_updated_tracks(&self, _since: DateTime<Utc>) -> BridgeResult<Option<TrackBatch>> {
        Err(BridgeError::NotAvailable("not used".to_string()))
    }

    async fn get_all_playlists(&self) -> BridgeResult<Option<PlaylistBatch>> {
        Err(BridgeError::NotAvailable("not used".to_string()))
    }

    async fn get_stream_url(
        &self,
        _track_id: &str,
        _device_id: u64,
    ) -> BridgeResult<Option<String>> {
        Ok(None)
    }

    async fn get_account_devices(&self) -> BridgeResult<Option<Vec<RemoteDevice>>> {
        Ok(Some(vec![]))
    }
}

#[derive(Default)]
struct MemoryStore {
    stored: Mutex<Option<StoredCredentials>>,
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn save(&self, credentials: &StoredCredentials) -> BridgeResult<()> {
        *self.stored.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }

    async fn load(&self) -> BridgeResult<Option<StoredCredentials>> {
        Ok(self.stored.lock().unwrap().clone())
    }
}

struct Harness {
    manager: Arc<AuthManager>,
    probe: Arc<ScriptedProbe>,
    remote: Arc<FakeRemote>,
    statuses: EventStream,
}

fn harness(remote: FakeRemote, probe: ScriptedProbe, retry_delay: Duration) -> Harness {
    let remote = Arc::new(remote);
    let probe = Arc::new(probe);
    let notifier = LoginNotifier::new(EventBus::new(64));
    let statuses = notifier.subscribe();
    let manager = AuthManager::new(
        remote.clone(),
        probe.clone(),
        Arc::new(MemoryStore::default()),
        notifier,
        LoginSettings {
            retry_delay,
            ..LoginSettings::default()
        },
    );
    Harness {
        manager: Arc::new(manager),
        probe,
        remote,
        statuses,
    }
}

fn drain(stream: &mut EventStream) -> Vec<LoginStatus> {
    let mut statuses = Vec::new();
    while let Some(Ok(event)) = stream.try_recv() {
        statuses.extend(event.login_status());
    }
    statuses
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_exhausted_budget_emits_single_no_connection() {
    let mut h = harness(
        FakeRemote::new("pw"),
        ScriptedProbe::new(&[false, false, false], true),
        Duration::from_millis(1),
    );
    let session = Session::new();

    let result = h.manager.master_login(&session, "jane", "pw", 3).await;

    assert!(matches!(result, Err(AuthError::NoConnection { attempts: 3 })));
    assert_eq!(h.probe.calls(), 3);
    assert_eq!(h.remote.logins.load(Ordering::SeqCst), 0);
    assert_eq!(session.state(), LoginState::LoggedOut);
    assert_eq!(
        drain(&mut h.statuses),
        vec![LoginStatus::Busy, LoginStatus::FailureNoConnection]
    );
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_transient_outage() {
    let mut h = harness(
        FakeRemote::new("pw"),
        ScriptedProbe::new(&[false, false], true),
        Duration::from_secs(10),
    );
    let session = Session::new();
    let started = tokio::time::Instant::now();

    h.manager
        .master_login(&session, "jane", "pw", 12)
        .await
        .unwrap();

    // Two failed probes, two fixed delays, no delay after the third probe
    assert_eq!(h.probe.calls(), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(30));
    assert!(session.is_logged_in());
    assert_eq!(
        drain(&mut h.statuses),
        vec![LoginStatus::Busy, LoginStatus::Success]
    );
}

#[tokio::test]
async fn test_wrong_password() {
    let mut h = harness(
        FakeRemote::new("pw"),
        ScriptedProbe::new(&[], true),
        Duration::from_millis(1),
    );
    let session = Session::new();

    let result = h.manager.master_login(&session, "jane", "nope", 1).await;

    assert!(matches!(result, Err(AuthError::BadCredentials)));
    assert_eq!(
        drain(&mut h.statuses),
        vec![LoginStatus::Busy, LoginStatus::FailureBadCredentials]
    );
}

#[tokio::test]
async fn test_second_login_while_first_in_flight_is_refused() {
    let gate = Arc::new(Notify::new());
    let mut h = harness(
        FakeRemote::gated("pw", gate.clone()),
        ScriptedProbe::new(&[], true),
        Duration::from_millis(1),
    );
    let session = Arc::new(Session::new());

    let first = {
        let manager = h.manager.clone();
        let session = session.clone();
        tokio::spawn(async move { manager.master_login(&session, "jane", "pw", 1).await })
    };
    while h.remote.logins.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    assert!(session.is_logging_in());

    let second = h.manager.master_login(&session, "jane", "pw", 1).await;
    assert!(matches!(second, Err(AuthError::LoginInProgress)));

    gate.notify_one();
    first.await.unwrap().unwrap();
    assert!(session.is_logged_in());
    assert_eq!(
        drain(&mut h.statuses),
        vec![LoginStatus::Busy, LoginStatus::Success]
    );
}

#[tokio::test]
async fn test_token_login_after_master_login_and_logout() {
    let h = harness(
        FakeRemote::new("pw"),
        ScriptedProbe::new(&[], true),
        Duration::from_millis(1),
    );

    let first = Session::new();
    h.manager.master_login(&first, "jane", "pw", 1).await.unwrap();

    // A fresh session re-authenticates with the stored token
    let second = Session::new();
    let snapshot = h.manager.token_login(&second, 1).await.unwrap();
    assert_eq!(snapshot.login_name.as_deref(), Some("jane"));

    h.manager.logout(&second).await.unwrap();
    let third = Session::new();
    assert!(matches!(
        h.manager.token_login(&third, 1).await,
        Err(AuthError::NoStoredCredentials)
    ));
}
