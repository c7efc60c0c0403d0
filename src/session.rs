//! Two-state session gate driven by the auth provider's status callback.
//!
//! The role carried in the profile is a display hint only. Nothing in this
//! crate treats it as an authorization boundary.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::AppError;
use crate::kv::{KeyValueStore, Namespace};
use crate::models::{AuthUser, RegisterRequest, Role, UserProfile};
use crate::remote::RemoteStore;

const SESSION_KEY: &str = "current";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticated { profile: UserProfile },
}

impl SessionState {
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Authenticated { profile } => Some(profile),
            SessionState::Unauthenticated => None,
        }
    }
}

pub struct SessionGate {
    remote: Arc<dyn RemoteStore>,
    kv: Arc<dyn KeyValueStore>,
    state: RwLock<SessionState>,
}

impl SessionGate {
    pub fn new(remote: Arc<dyn RemoteStore>, kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            remote,
            kv,
            state: RwLock::new(SessionState::Unauthenticated),
        }
    }

    /// Reloads the cached profile so a restart does not sign the user out.
    pub async fn restore(&self) -> Result<SessionState, AppError> {
        if let Some(raw) = self.kv.get(Namespace::Session, SESSION_KEY).await? {
            match serde_json::from_str::<UserProfile>(&raw) {
                Ok(profile) => {
                    info!("restored session for {}", profile.uid);
                    *self.state.write().await = SessionState::Authenticated { profile };
                }
                Err(e) => warn!("discarding unreadable cached session: {}", e),
            }
        }
        Ok(self.state().await)
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn is_teacher(&self) -> bool {
        self.state
            .read()
            .await
            .profile()
            .is_some_and(|p| p.role == Role::Teacher)
    }

    pub async fn on_auth_state_changed(
        &self,
        user: Option<AuthUser>,
    ) -> Result<SessionState, AppError> {
        let Some(user) = user else {
            *self.state.write().await = SessionState::Unauthenticated;
            self.kv.delete(Namespace::Session, SESSION_KEY).await?;
            info!("signed out");
            return Ok(SessionState::Unauthenticated);
        };

        let profile = match self.remote.fetch_profile(&user.uid).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                let profile = UserProfile::fallback_for(&user);
                info!("no profile for {}, writing default", user.uid);
                if let Err(e) = self.remote.put_profile(&profile).await {
                    warn!("failed to write default profile for {}: {}", user.uid, e);
                }
                profile
            }
            Err(e) => {
                warn!("profile fetch failed for {}, using default: {}", user.uid, e);
                UserProfile::fallback_for(&user)
            }
        };

        self.enter(profile).await
    }

    /// Creates the profile for a freshly registered account. The remote
    /// write is not awaited for success; failures are only logged.
    pub async fn register(&self, req: RegisterRequest) -> Result<SessionState, AppError> {
        if req.name.trim().is_empty() {
            return Err(AppError::BadRequest("name is required".to_string()));
        }

        let profile = UserProfile {
            uid: req.uid,
            name: req.name,
            email: req.email,
            role: req.role,
            avatar: None,
            created_at: Utc::now(),
        };

        let remote = Arc::clone(&self.remote);
        let written = profile.clone();
        tokio::spawn(async move {
            if let Err(e) = remote.put_profile(&written).await {
                warn!("failed to store profile for {}: {}", written.uid, e);
            }
        });

        self.enter(profile).await
    }

    async fn enter(&self, profile: UserProfile) -> Result<SessionState, AppError> {
        let raw = serde_json::to_string(&profile)?;
        if let Err(e) = self.kv.put(Namespace::Session, SESSION_KEY, &raw).await {
            warn!("failed to cache session for {}: {}", profile.uid, e);
        }

        info!("signed in as {} ({:?})", profile.uid, profile.role);
        let state = SessionState::Authenticated { profile };
        *self.state.write().await = state.clone();
        Ok(state)
    }
}
