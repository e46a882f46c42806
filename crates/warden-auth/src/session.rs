//! Opaque session tokens.
//!
//! Tokens are random UUIDs mapped to a principal and an expiry. They live
//! in memory only: a restart logs everybody out.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};
use warden_core::PrincipalId;

use crate::{AuthError, AuthenticatedUser, Authenticator};

/// An issued session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// Principal the session belongs to.
    pub principal_id: PrincipalId,
    /// Email used to log in.
    pub email: String,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-memory session table.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    /// Creates a store whose sessions last `ttl`.
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Issues a new session for `principal_id`.
    pub fn issue(&self, principal_id: PrincipalId, email: impl Into<String>) -> Session {
        let session = Session {
            token: uuid::Uuid::new_v4().to_string(),
            principal_id,
            email: email.into(),
            expires_at: Utc::now()
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.token.clone(), session.clone());
        log::debug!("Issued session for principal {principal_id}");
        session
    }

    /// Looks up a live session. Expired sessions are removed on sight.
    pub fn validate(&self, token: &str) -> Result<Session, AuthError> {
        let now = Utc::now();
        let found = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned();
        match found {
            None => Err(AuthError::InvalidToken),
            Some(session) if session.is_expired(now) => {
                self.revoke(token);
                Err(AuthError::Expired)
            }
            Some(session) => Ok(session),
        }
    }

    /// Ends one session. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }

    /// Ends every session of `principal_id`. Returns how many were ended.
    pub fn revoke_principal(&self, principal_id: PrincipalId) -> usize {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, s| s.principal_id != principal_id);
        let revoked = before - sessions.len();
        if revoked > 0 {
            log::info!("Revoked {revoked} session(s) of principal {principal_id}");
        }
        revoked
    }

    /// Drops expired sessions. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        before - sessions.len()
    }

    /// Number of sessions held, expired or not.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no sessions are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Authenticator for SessionStore {
    fn authenticate(
        &self,
        token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<AuthenticatedUser, AuthError>> + Send + '_>> {
        let result = self.validate(token).map(|s| AuthenticatedUser {
            principal_id: s.principal_id,
            email: s.email,
        });
        Box::pin(async move { result })
    }
}
