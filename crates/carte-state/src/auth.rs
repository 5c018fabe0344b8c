//! Signed-in user state, and the controller driving the auth service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use carte_core::UserProfile;
use carte_db::AuthService;

use crate::async_phase::{AsyncPhase, Rejection};
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    #[default]
    Idle,
    Loading,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthState {
    pub user: Option<UserProfile>,
    /// Login and logout progress.
    pub status: AuthStatus,
    pub error: Option<String>,
    /// Account deletion in progress.
    pub loading: bool,
    /// Outcome of the last account deletion; `None` before any attempt.
    pub success: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuthAction {
    Login(AsyncPhase<UserProfile>),
    Logout(AsyncPhase<()>),
    DeleteAccount(AsyncPhase<()>),
    SetUser(Option<UserProfile>),
    /// Clear the account deletion flags and the error.
    Reset,
}

pub fn reduce(mut state: AuthState, action: AuthAction) -> AuthState {
    match action {
        AuthAction::Login(phase) => match phase {
            AsyncPhase::Pending => {
                state.status = AuthStatus::Loading;
                state.error = None;
            }
            AsyncPhase::Fulfilled(user) => {
                state.status = AuthStatus::Idle;
                state.user = Some(user);
                state.error = None;
            }
            AsyncPhase::Rejected(reason) => {
                state.status = AuthStatus::Failed;
                state.error = Some(reason);
            }
        },
        AuthAction::Logout(phase) => match phase {
            AsyncPhase::Pending => {
                state.status = AuthStatus::Loading;
                state.error = None;
            }
            AsyncPhase::Fulfilled(()) => {
                state.status = AuthStatus::Idle;
                state.user = None;
                state.error = None;
            }
            AsyncPhase::Rejected(reason) => {
                state.status = AuthStatus::Failed;
                state.error = Some(reason);
            }
        },
        AuthAction::DeleteAccount(phase) => match phase {
            AsyncPhase::Pending => {
                state.loading = true;
                state.error = None;
                state.success = None;
            }
            AsyncPhase::Fulfilled(()) => {
                state.loading = false;
                state.success = Some(true);
            }
            AsyncPhase::Rejected(reason) => {
                state.loading = false;
                state.error = Some(reason);
                state.success = Some(false);
            }
        },
        AuthAction::SetUser(user) => state.user = user,
        AuthAction::Reset => {
            state.loading = false;
            state.error = None;
            state.success = None;
        }
    }
    state
}

/// Runs auth operations and records their phases in [`AuthState`].
#[derive(Clone)]
pub struct AuthController {
    state: StateStore<AuthState, AuthAction>,
    service: Arc<AuthService>,
}

impl AuthController {
    pub fn new(service: Arc<AuthService>) -> Self {
        Self {
            state: StateStore::new(reduce),
            service,
        }
    }

    pub fn state(&self) -> &StateStore<AuthState, AuthAction> {
        &self.state
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, Rejection> {
        self.state.dispatch(AuthAction::Login(AsyncPhase::Pending));
        let result = self.service.login(email, password).await.map_err(|e| {
            error!(subsystem = "state", component = "auth", error = %e, "Login rejected");
            Rejection::new(e.to_string())
        });
        self.state.dispatch(AuthAction::Login(result.clone().into()));
        if let Ok(user) = &result {
            info!(subsystem = "state", component = "auth", role = %user.role, "Signed in");
        }
        result
    }

    pub async fn logout(&self) -> Result<(), Rejection> {
        self.state.dispatch(AuthAction::Logout(AsyncPhase::Pending));
        let result = self.service.logout().await.map_err(|e| {
            error!(subsystem = "state", component = "auth", error = %e, "Logout rejected");
            Rejection::new(e.to_string())
        });
        self.state.dispatch(AuthAction::Logout(result.clone().into()));
        result
    }

    pub async fn delete_account(
        &self,
        email: &str,
        password: &str,
        user_id: &str,
    ) -> Result<(), Rejection> {
        self.state.dispatch(AuthAction::DeleteAccount(AsyncPhase::Pending));
        let result = self
            .service
            .delete_account(email, password, user_id)
            .await
            .map_err(|e| {
                error!(subsystem = "state", component = "auth", error = %e, "Account deletion rejected");
                Rejection::new(format!("Failed to delete account: {}", e))
            });
        self.state
            .dispatch(AuthAction::DeleteAccount(result.clone().into()));
        if result.is_ok() {
            self.state.dispatch(AuthAction::SetUser(None));
        }
        result
    }
}
