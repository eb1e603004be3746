use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{PoisonError, RwLock};

use crate::error::{AuthError, Result};

/// Login state machine.
///
/// ```text
/// Idle ──login──► LoggingIn ──accepted──► LoggedIn ──logout──► LoggedOut
///                    │                                            │
///                    └──no connection / rejected──► LoggedOut ◄───┘
/// LoggedOut ──login──► LoggingIn
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoginState {
    #[default]
    Idle,
    LoggingIn,
    LoggedIn,
    LoggedOut,
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginState::Idle => write!(f, "Idle"),
            LoginState::LoggingIn => write!(f, "LoggingIn"),
            LoginState::LoggedIn => write!(f, "LoggedIn"),
            LoginState::LoggedOut => write!(f, "LoggedOut"),
        }
    }
}

/// Login session state, copied out of [`Session`] for callers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginSession {
    pub login_name: Option<String>,
    pub token: Option<String>,
    /// Device identifier presented at login
    pub device_id: Option<String>,
    /// Numeric device id used for stream requests; 0 when none is bound
    pub stream_device_id: u64,
    pub state: LoginState,
}

impl LoginSession {
    pub fn is_logging_in(&self) -> bool {
        self.state == LoginState::LoggingIn
    }

    pub fn is_logged_in(&self) -> bool {
        self.state == LoginState::LoggedIn
    }
}

impl fmt::Debug for LoginSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginSession")
            .field("login_name", &self.login_name)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("device_id", &self.device_id)
            .field("stream_device_id", &self.stream_device_id)
            .field("state", &self.state)
            .finish()
    }
}

/// Shared, mutable login session.
///
/// Created empty; one instance lives for one login lifetime and is replaced
/// by a fresh one at logout rather than reset in place.
#[derive(Debug, Default)]
pub struct Session {
    inner: RwLock<LoginSession>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session already in the given state, e.g. rebuilt by a host that keeps
    /// the login in another process.
    pub fn from_login(login: LoginSession) -> Self {
        Self {
            inner: RwLock::new(login),
        }
    }

    pub fn snapshot(&self) -> LoginSession {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> LoginState {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).state
    }

    pub fn is_logging_in(&self) -> bool {
        self.state() == LoginState::LoggingIn
    }

    pub fn is_logged_in(&self) -> bool {
        self.state() == LoginState::LoggedIn
    }

    pub fn stream_device_id(&self) -> u64 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .stream_device_id
    }

    /// `Idle`/`LoggedOut` → `LoggingIn`.
    pub(crate) fn begin_login(&self) -> Result<()> {
        let mut session = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match session.state {
            LoginState::LoggingIn => Err(AuthError::LoginInProgress),
            LoginState::LoggedIn => Err(AuthError::AlreadyLoggedIn),
            LoginState::Idle | LoginState::LoggedOut => {
                session.state = LoginState::LoggingIn;
                Ok(())
            }
        }
    }

    /// `LoggingIn` → `LoggedIn`.
    pub(crate) fn complete_login(
        &self,
        login_name: String,
        token: String,
        device_id: String,
        stream_device_id: u64,
    ) -> LoginSession {
        let mut session = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *session = LoginSession {
            login_name: Some(login_name),
            token: Some(token),
            device_id: Some(device_id),
            stream_device_id,
            state: LoginState::LoggedIn,
        };
        session.clone()
    }

    /// `LoggingIn` → `LoggedOut`.
    pub(crate) fn fail_login(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .state = LoginState::LoggedOut;
    }

    /// `LoggedIn` → `LoggedOut`, dropping everything the session held.
    pub(crate) fn end(&self) -> Result<()> {
        let mut session = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if session.state != LoginState::LoggedIn {
            return Err(AuthError::NotLoggedIn);
        }
        *session = LoginSession {
            state: LoginState::LoggedOut,
            ..LoginSession::default()
        };
        Ok(())
    }
}
