use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of the user a classification run belongs to.
///
/// Only an [`AuthProvider`](crate::auth::domain::auth_provider::AuthProvider)
/// hands these out, so a `UserId` is always safe to use as a storage-key
/// namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
