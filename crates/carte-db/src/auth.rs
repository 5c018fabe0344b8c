//! Sign-in, sign-out, and account removal over an [`AuthProvider`].
//!
//! Every signed-in user has a profile document `users/<uid>`; the first login
//! creates it with the `user` role.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use carte_core::defaults::USERS_COLLECTION;
use carte_core::{AuthProvider, DocumentStore, Error, Result, Role, UserProfile};

use crate::users::profile_fields;

pub struct AuthService {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn DocumentStore>,
}

impl AuthService {
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self { auth, store }
    }

    /// Sign in and return the user's profile, creating it on first login.
    #[instrument(skip(self, password), fields(subsystem = "auth", component = "auth", op = "login"))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let user = self.auth.sign_in(email, password).await.map_err(|e| {
            warn!(error = %e, "Error logging in");
            e
        })?;

        if let Some(doc) = self.store.get(USERS_COLLECTION, &user.uid).await? {
            return doc.decode();
        }

        let email = user.email.clone().unwrap_or_else(|| email.to_string());
        self.store
            .set(USERS_COLLECTION, &user.uid, profile_fields(&email, Role::User), false)
            .await
            .map_err(|e| {
                error!(uid = %user.uid, error = %e, "Failed to create user profile");
                e
            })?;

        info!(uid = %user.uid, "User profile created on first login");
        Ok(UserProfile {
            id: user.uid,
            email,
            role: Role::User,
        })
    }

    pub async fn logout(&self) -> Result<()> {
        self.auth.sign_out().await.map_err(|e| {
            error!(subsystem = "auth", error = %e, "Error signing out");
            e
        })?;
        info!(subsystem = "auth", "User signed out");
        Ok(())
    }

    /// Permanently delete the account of `user_id` after re-authenticating.
    #[instrument(skip(self, password), fields(subsystem = "auth", component = "auth", op = "delete_account"))]
    pub async fn delete_account(&self, email: &str, password: &str, user_id: &str) -> Result<()> {
        if email.trim().is_empty() || password.is_empty() || user_id.trim().is_empty() {
            return Err(Error::Validation("Missing required fields".to_string()));
        }

        let user = self.auth.sign_in(email, password).await?;
        if user.uid != user_id {
            warn!(uid = %user.uid, "Account deletion requested for another user");
            return Err(Error::Forbidden("Invalid User ID".to_string()));
        }

        self.auth.delete_user(&user).await.map_err(|e| {
            error!(error = %e, "Failed to delete account");
            e
        })?;
        info!(uid = %user.uid, "Account deleted");
        Ok(())
    }

    /// Role of the signed-in user; `None` when signed out or without a profile.
    pub async fn current_role(&self) -> Result<Option<Role>> {
        let Some(user) = self.auth.current_user() else {
            return Ok(None);
        };
        let profile: Option<UserProfile> = self
            .store
            .get(USERS_COLLECTION, &user.uid)
            .await?
            .map(|doc| doc.decode())
            .transpose()?;
        Ok(profile.map(|p| p.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryAuthProvider, InMemoryDocumentStore};

    fn service() -> (Arc<InMemoryAuthProvider>, Arc<InMemoryDocumentStore>, AuthService) {
        let auth = Arc::new(InMemoryAuthProvider::new());
        let store = Arc::new(InMemoryDocumentStore::new());
        let service = AuthService::new(auth.clone(), store.clone());
        (auth, store, service)
    }

    #[tokio::test]
    async fn test_first_login_creates_profile() {
        let (auth, store, service) = service();
        let uid = auth.register("chef@example.com", "pw").unwrap();

        let profile = service.login("chef@example.com", "pw").await.unwrap();

        assert_eq!(profile.id, uid);
        assert_eq!(profile.role, Role::User);
        assert!(store.contains(USERS_COLLECTION, &uid));
        assert_eq!(service.current_role().await.unwrap(), Some(Role::User));
    }

    #[tokio::test]
    async fn test_login_keeps_existing_profile() {
        let (auth, store, service) = service();
        let uid = auth.register("owner@example.com", "pw").unwrap();
        store
            .insert(USERS_COLLECTION, &uid, profile_fields("owner@example.com", Role::Admin))
            .unwrap();

        let profile = service.login("owner@example.com", "pw").await.unwrap();

        assert!(profile.is_admin());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let (auth, store, service) = service();
        auth.register("chef@example.com", "pw").unwrap();

        let result = service.login("chef@example.com", "nope").await;

        assert!(matches!(result, Err(Error::Unauthorized(_))));
        assert!(store.is_empty(USERS_COLLECTION));
    }

    #[tokio::test]
    async fn test_logout_clears_role() {
        let (auth, _store, service) = service();
        auth.register("chef@example.com", "pw").unwrap();
        service.login("chef@example.com", "pw").await.unwrap();

        service.logout().await.unwrap();

        assert_eq!(service.current_role().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_account_checks_inputs_and_uid() {
        let (auth, _store, service) = service();
        let uid = auth.register("chef@example.com", "pw").unwrap();

        assert!(matches!(
            service.delete_account("", "pw", &uid).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.delete_account("chef@example.com", "pw", "someone-else").await,
            Err(Error::Forbidden(_))
        ));
        assert!(auth.has_account("chef@example.com"));

        service
            .delete_account("chef@example.com", "pw", &uid)
            .await
            .unwrap();
        assert!(!auth.has_account("chef@example.com"));
    }
}
