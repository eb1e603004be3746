//! # Authentication Manager
//!
//! Drives the login state machine against the remote catalog service.
//!
//! ## Overview
//!
//! Two login modes are supported:
//! - **Master login** exchanges a user/password pair for a long-lived token
//!   and binds a device identifier to it.
//! - **Token login** re-authenticates with a previously stored
//!   (login, token) pair without prompting the user.
//!
//! Both modes wait for connectivity first, probing up to an attempt budget
//! with a fixed delay between probes. Every transition is published on the
//! [`LoginNotifier`]: `Busy` when the attempt starts, then exactly one of
//! `Success`, `FailureNoConnection` or `FailureBadCredentials`.
//!
//! Rejected credentials invalidate any stored token so a stale token is not
//! silently retried on the next automatic login.
//!
//! Callers that run the attempt in the background split it in two:
//! `begin_*_login` enters `LoggingIn` and publishes `Busy` on the caller's
//! thread, and [`AuthManager::finish_login`] does the rest on the task.
//!
//! ## Usage
//!
//! ```ignore
//! let manager = AuthManager::new(remote, probe, store, notifier, LoginSettings::default());
//! let session = Session::new();
//!
//! manager.master_login(&session, "jane@example.com", "hunter2", 12).await?;
//! assert!(session.is_logged_in());
//! ```

use bridge_traits::{
    BridgeError, ConnectivityProbe, CredentialStore, LoginCredentials, LoginRequest,
    RemoteCatalogClient, StoredCredentials,
};
use core_runtime::config::LoginSettings;
use core_runtime::events::{AuthEvent, CoreEvent, LoginStatus};
use core_runtime::logging::redact_login;
use core_runtime::notifier::LoginNotifier;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::device;
use crate::error::{AuthError, Result};
use crate::types::{LoginSession, Session};

/// A login attempt that has entered `LoggingIn` and published `Busy`.
///
/// Dropping it without [`AuthManager::finish_login`] leaves the session in
/// `LoggingIn`.
#[must_use = "a pending login must be finished"]
pub struct PendingLogin {
    credentials: LoginCredentials,
    device_id: String,
}

impl PendingLogin {
    pub fn mode(&self) -> &'static str {
        if self.credentials.is_token() {
            "token"
        } else {
            "master"
        }
    }
}

impl fmt::Debug for PendingLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingLogin")
            .field("mode", &self.mode())
            .field("device_id", &self.device_id)
            .finish()
    }
}

pub struct AuthManager {
    remote: Arc<dyn RemoteCatalogClient>,
    probe: Arc<dyn ConnectivityProbe>,
    credentials: Arc<dyn CredentialStore>,
    notifier: LoginNotifier,
    settings: LoginSettings,
}

impl AuthManager {
    pub fn new(
        remote: Arc<dyn RemoteCatalogClient>,
        probe: Arc<dyn ConnectivityProbe>,
        credentials: Arc<dyn CredentialStore>,
        notifier: LoginNotifier,
        settings: LoginSettings,
    ) -> Self {
        Self {
            remote,
            probe,
            credentials,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &LoginSettings {
        &self.settings
    }

    pub fn notifier(&self) -> &LoginNotifier {
        &self.notifier
    }

    /// Credentials persisted by the last successful master login.
    pub async fn stored_credentials(&self) -> Result<Option<StoredCredentials>> {
        self.credentials.load().await.map_err(AuthError::CredentialStore)
    }

    /// Log in with a user/password pair.
    ///
    /// On success the login, token and device id are saved to the credential
    /// store before the session turns `LoggedIn` and `Success` is published.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidInput` - blank user or password; nothing is published
    /// - `AuthError::LoginInProgress` / `AuthError::AlreadyLoggedIn` - wrong state
    /// - `AuthError::NoConnection` - no connectivity within `attempts` probes
    /// - `AuthError::BadCredentials` - the service rejected the pair
    /// - `AuthError::Remote` - the login call itself failed
    #[instrument(skip(self, session, password), fields(user = %redact_login(user)))]
    pub async fn master_login(
        &self,
        session: &Session,
        user: &str,
        password: &str,
        attempts: u32,
    ) -> Result<LoginSession> {
        let pending = self.begin_master_login(session, user, password)?;
        self.finish_login(session, pending, attempts).await
    }

    /// Log in with the stored (login, token) pair.
    ///
    /// # Errors
    ///
    /// `AuthError::NoStoredCredentials` when nothing usable is stored; the
    /// session is left untouched in that case. Otherwise as
    /// [`AuthManager::master_login`].
    #[instrument(skip(self, session))]
    pub async fn token_login(&self, session: &Session, attempts: u32) -> Result<LoginSession> {
        let pending = self.begin_token_login(session).await?;
        self.finish_login(session, pending, attempts).await
    }

    /// Validate a user/password pair and move the session to `LoggingIn`.
    ///
    /// `Busy` is published before this returns. The caller must drive the
    /// returned [`PendingLogin`] through [`AuthManager::finish_login`].
    pub fn begin_master_login(
        &self,
        session: &Session,
        user: &str,
        password: &str,
    ) -> Result<PendingLogin> {
        validate_input("user", user)?;
        validate_input("password", password)?;

        let user = user.trim().to_string();
        let device_id = self.device_id_for(&user);
        let credentials = LoginCredentials::Password {
            user,
            password: password.to_string(),
        };

        self.begin(session, credentials, device_id)
    }

    /// Load the stored (login, token) pair and move the session to
    /// `LoggingIn`.
    pub async fn begin_token_login(&self, session: &Session) -> Result<PendingLogin> {
        let stored = self
            .stored_credentials()
            .await?
            .filter(|stored| stored.has_token() && !stored.login.trim().is_empty())
            .ok_or(AuthError::NoStoredCredentials)?;

        let device_id = if stored.device_id.trim().is_empty() {
            self.device_id_for(&stored.login)
        } else {
            stored.device_id.clone()
        };
        let credentials = LoginCredentials::Token {
            user: stored.login,
            token: stored.token.unwrap_or_default(),
        };

        self.begin(session, credentials, device_id)
    }

    /// Wait for connectivity, authenticate and settle the session.
    ///
    /// Publishes exactly one terminal status.
    #[instrument(skip_all, fields(mode = pending.mode()))]
    pub async fn finish_login(
        &self,
        session: &Session,
        pending: PendingLogin,
        attempts: u32,
    ) -> Result<LoginSession> {
        let PendingLogin {
            credentials,
            device_id,
        } = pending;

        match self.authenticate(&credentials, &device_id, attempts).await {
            Ok(token) => {
                let user = credentials.user().to_string();
                let stored =
                    StoredCredentials::new(user.clone(), Some(token.clone()), device_id.clone());
                if let Err(e) = self.credentials.save(&stored).await {
                    warn!(error = %e, "Failed to persist credentials; login kept in memory only");
                }

                let stream_device_id = self.stream_device_id().await;
                let snapshot = session.complete_login(user, token, device_id, stream_device_id);

                info!(stream_device_id, "Logged in");
                self.notifier.publish(LoginStatus::Success);
                Ok(snapshot)
            }
            Err(e) => {
                session.fail_login();
                if matches!(e, AuthError::BadCredentials) {
                    self.invalidate_stored_token().await;
                }

                warn!(error = %e, "Login failed");
                self.notifier
                    .publish(e.login_status().unwrap_or(LoginStatus::FailureNoConnection));
                Err(e)
            }
        }
    }

    /// End the session: invalidate it remotely, drop the stored token and
    /// move the session to `LoggedOut`.
    ///
    /// Remote and credential store failures are logged; the local session is
    /// ended regardless.
    #[instrument(skip(self, session))]
    pub async fn logout(&self, session: &Session) -> Result<()> {
        if !session.is_logged_in() {
            return Err(AuthError::NotLoggedIn);
        }

        if let Err(e) = self.remote.logout().await {
            warn!(error = %e, "Remote logout failed");
        }
        if let Err(e) = self.credentials.invalidate_token().await {
            warn!(error = %e, "Failed to clear stored token");
        }

        session.end()?;
        info!("Logged out");
        Ok(())
    }

    /// Probe until reachable, at most `attempts` times.
    ///
    /// Sleeps the configured retry delay between probes, not after the last.
    pub async fn wait_for_connectivity(&self, attempts: u32) -> Result<()> {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            debug!(attempt, attempts, "Checking for internet connection");
            if self.probe.probe().await {
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        }
        Err(AuthError::NoConnection { attempts })
    }

    fn device_id_for(&self, login: &str) -> String {
        self.settings
            .hardware_device_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| device::synthesize_device_id(login))
    }

    fn begin(
        &self,
        session: &Session,
        credentials: LoginCredentials,
        device_id: String,
    ) -> Result<PendingLogin> {
        session.begin_login()?;
        self.notifier.publish(LoginStatus::Busy);
        Ok(PendingLogin {
            credentials,
            device_id,
        })
    }

    /// Connectivity gate plus the remote login call; returns the token to keep.
    async fn authenticate(
        &self,
        credentials: &LoginCredentials,
        device_id: &str,
        attempts: u32,
    ) -> Result<String> {
        self.wait_for_connectivity(attempts).await?;

        let response = self
            .remote
            .login(LoginRequest {
                credentials: credentials.clone(),
                device_id: device_id.to_string(),
            })
            .await
            .map_err(|e| match e {
                BridgeError::Unauthorized(_) => AuthError::BadCredentials,
                other => AuthError::Remote(other),
            })?;

        if !response.accepted {
            return Err(AuthError::BadCredentials);
        }

        let issued = response.token.filter(|token| !token.is_empty());
        match (issued, credentials) {
            (Some(token), _) => Ok(token),
            // A token login may be accepted without a new token being issued
            (None, LoginCredentials::Token { token, .. }) => Ok(token.clone()),
            (None, LoginCredentials::Password { .. }) => Err(AuthError::Remote(
                BridgeError::OperationFailed("login accepted without a token".to_string()),
            )),
        }
    }

    async fn stream_device_id(&self) -> u64 {
        match self.remote.get_account_devices().await {
            Ok(Some(devices)) => device::resolve_stream_device_id(&devices),
            Ok(None) => {
                debug!("No device list returned; using the non-device stream path");
                0
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch account devices");
                0
            }
        }
    }

    async fn invalidate_stored_token(&self) {
        match self.credentials.invalidate_token().await {
            Ok(()) => {
                let _ = self
                    .notifier
                    .event_bus()
                    .emit(CoreEvent::Auth(AuthEvent::TokenInvalidated));
            }
            Err(e) => warn!(error = %e, "Failed to invalidate stored token"),
        }
    }
}

fn validate_input(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AuthError::InvalidInput {
            field: field.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}
