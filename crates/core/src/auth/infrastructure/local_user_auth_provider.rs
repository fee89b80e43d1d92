use std::collections::HashSet;

use crate::auth::domain::auth_provider::{AuthError, AuthProvider, Credentials, Identity};
use crate::shared::user_id::UserId;

const MAX_USER_ID_LEN: usize = 64;

/// Trusts the supplied user name once it is a safe identifier, optionally
/// restricted to a fixed set of users.
#[derive(Default)]
pub struct LocalUserAuthProvider {
    allowed: Option<HashSet<String>>,
}

impl LocalUserAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed_users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(users.into_iter().map(Into::into).collect()),
        }
    }
}

fn is_valid_user_id(name: &str) -> bool {
    name.len() <= MAX_USER_ID_LEN
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

impl AuthProvider for LocalUserAuthProvider {
    fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let name = credentials.username.trim();
        if name.is_empty() {
            return Err(AuthError::Missing);
        }
        if !is_valid_user_id(name) {
            return Err(AuthError::Malformed(name.to_string()));
        }
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(name) {
                return Err(AuthError::Unknown(name.to_string()));
            }
        }
        Ok(Identity {
            user_id: UserId::new(name),
        })
    }
}
