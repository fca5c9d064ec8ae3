use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session has been signed out")]
    SignedOut,
    #[error("No owner configured; set owner_id or EVENTFLOW_OWNER_ID")]
    Unconfigured,
}

/// The authenticated user all store calls act for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Principal {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Source of the current principal.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current(&self) -> Result<Principal, SessionError>;
    async fn sign_out(&self) -> Result<(), SessionError>;
}

/// Identity taken from configuration. Signing out makes it unavailable for
/// the rest of the process.
pub struct ConfiguredIdentity {
    principal: Principal,
    signed_out: AtomicBool,
}

impl ConfiguredIdentity {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            signed_out: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, SessionError> {
        let id = config.owner_id.ok_or(SessionError::Unconfigured)?;
        Ok(Self::new(Principal {
            id,
            email: config.owner_email.clone(),
        }))
    }
}

#[async_trait]
impl IdentityProvider for ConfiguredIdentity {
    async fn current(&self) -> Result<Principal, SessionError> {
        if self.signed_out.load(Ordering::Acquire) {
            return Err(SessionError::SignedOut);
        }
        Ok(self.principal.clone())
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        self.signed_out.store(true, Ordering::Release);
        Ok(())
    }
}

/// Session context passed explicitly to everything that talks to the store.
///
/// Acquired once at startup and invalidated by [`Session::sign_out`]; clones
/// share the same lifecycle.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    principal: Principal,
    active: AtomicBool,
    provider: Arc<dyn IdentityProvider>,
}

impl Session {
    pub async fn acquire(provider: Arc<dyn IdentityProvider>) -> Result<Self, SessionError> {
        let principal = provider.current().await?;
        tracing::info!("Session started for {}", principal.id);
        Ok(Self {
            inner: Arc::new(SessionInner {
                principal,
                active: AtomicBool::new(true),
                provider,
            }),
        })
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    pub fn principal(&self) -> Result<&Principal, SessionError> {
        if !self.is_active() {
            return Err(SessionError::SignedOut);
        }
        Ok(&self.inner.principal)
    }

    pub fn owner_id(&self) -> Result<Uuid, SessionError> {
        self.principal().map(|principal| principal.id)
    }

    pub async fn sign_out(&self) -> Result<(), SessionError> {
        if !self.inner.active.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.provider.sign_out().await?;
        tracing::info!("Signed out {}", self.inner.principal.id);
        Ok(())
    }
}
