use thiserror::Error;

use crate::shared::user_id::UserId;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("no user name supplied")]
    Missing,
    #[error("invalid user name '{0}': use 1-64 characters from A-Z a-z 0-9 _ . -")]
    Malformed(String),
    #[error("unknown user '{0}'")]
    Unknown(String),
}

/// What a caller presents to prove who they are.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// An authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
}

/// Domain interface for resolving credentials into an identity.
///
/// The classification core only ever sees the resulting [`UserId`].
pub trait AuthProvider: Send + Sync {
    fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError>;
}
