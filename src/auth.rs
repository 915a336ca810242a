//! Login and session restore

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::User;
use crate::session::{fingerprint, SessionKeys};
use crate::store::IssueStore;

/// Message shown for any failed sign-in
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// An authenticated user together with the marker that keeps them signed in
#[derive(Debug, Clone, PartialEq)]
pub struct SignedIn {
    pub user: User,
    pub marker: String,
}

/// Anonymous or authenticated
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    Anonymous,
    Authenticated(SignedIn),
}

impl Session {
    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated(signed_in) => Some(&signed_in.user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }
}

/// Gate in front of every dashboard view
pub struct AuthGate<'a> {
    store: &'a dyn IssueStore,
    keys: &'a SessionKeys,
}

impl<'a> AuthGate<'a> {
    pub(crate) fn new(store: &'a dyn IssueStore, keys: &'a SessionKeys) -> Self {
        Self { store, keys }
    }

    /// Succeeds iff a stored row matches both username and password exactly
    pub async fn login(&self, username: &str, password: &str) -> Result<SignedIn> {
        if username.is_empty() || password.is_empty() {
            return Err(Error::auth("Username and password are required"));
        }

        match self.store.find_user(username, password).await? {
            Some(user) => {
                info!(username = %user.username, "signed in");
                let marker = self.keys.issue(&user)?;
                Ok(SignedIn { user, marker })
            }
            None => {
                warn!(username, "rejected sign-in");
                Err(Error::auth(INVALID_CREDENTIALS))
            }
        }
    }

    /// Re-establish a session from a marker found in the URL.
    ///
    /// The marker must carry a valid signature, must not be expired, and its
    /// credential fingerprint must match the user's current row.
    pub async fn restore(&self, marker: &str) -> Result<SignedIn> {
        let claims = self.keys.verify(marker).map_err(|e| {
            warn!(error = %e, "rejected session marker");
            Error::auth("Session expired, please sign in again")
        })?;

        let user = self
            .store
            .find_user_by_username(&claims.sub)
            .await?
            .ok_or_else(|| Error::auth("Session expired, please sign in again"))?;

        if fingerprint(&user.username, &user.password) != claims.cred {
            warn!(username = %user.username, "credential changed since marker was issued");
            return Err(Error::auth("Session expired, please sign in again"));
        }

        Ok(SignedIn {
            user,
            marker: marker.to_string(),
        })
    }

    /// Resolve an optional marker into a session; invalid markers are anonymous
    pub async fn session(&self, marker: Option<&str>) -> Result<Session> {
        let Some(marker) = marker.filter(|m| !m.is_empty()) else {
            return Ok(Session::Anonymous);
        };
        match self.restore(marker).await {
            Ok(signed_in) => Ok(Session::Authenticated(signed_in)),
            Err(Error::Auth(_)) => Ok(Session::Anonymous),
            Err(e) => Err(e),
        }
    }
}
