use bridge_traits::error::BridgeError;
use core_runtime::events::LoginStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No internet connection after {attempts} attempt(s)")]
    NoConnection { attempts: u32 },

    #[error("Credentials rejected by the remote service")]
    BadCredentials,

    #[error("A login is already in progress")]
    LoginInProgress,

    #[error("Already logged in")]
    AlreadyLoggedIn,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("No stored credentials to log in with")]
    NoStoredCredentials,

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Credential store error: {0}")]
    CredentialStore(BridgeError),

    #[error("Remote service error: {0}")]
    Remote(BridgeError),
}

impl AuthError {
    /// Terminal status published for a login attempt that ended with this
    /// error, `None` for errors raised before the attempt started.
    pub fn login_status(&self) -> Option<LoginStatus> {
        match self {
            AuthError::NoConnection { .. } | AuthError::Remote(_) => {
                Some(LoginStatus::FailureNoConnection)
            }
            AuthError::BadCredentials => Some(LoginStatus::FailureBadCredentials),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
