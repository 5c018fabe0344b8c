//! Staff profiles and role management.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{error, info, instrument, warn};

use carte_core::defaults::USERS_COLLECTION;
use carte_core::{DocumentStore, Error, Fields, Result, Role, UserProfile};

/// Lists staff profiles and lets administrators manage them.
pub struct UserManager {
    store: Arc<dyn DocumentStore>,
}

fn require_admin(actor: &UserProfile, action: &str) -> Result<()> {
    if !actor.is_admin() {
        warn!(
            subsystem = "auth",
            component = "users",
            actor = %actor.id,
            action,
            "Non-admin attempted a user mutation"
        );
        return Err(Error::Forbidden(format!(
            "Only administrators can {}",
            action
        )));
    }
    Ok(())
}

pub(crate) fn profile_fields(email: &str, role: Role) -> Fields {
    let mut fields = Fields::new();
    fields.insert("email".to_string(), JsonValue::String(email.to_string()));
    fields.insert("role".to_string(), JsonValue::String(role.to_string()));
    fields
}

impl UserManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Every staff profile, in store order.
    pub async fn list_users(&self) -> Result<Vec<UserProfile>> {
        let docs = self.store.get_all(USERS_COLLECTION).await.map_err(|e| {
            error!(component = "users", error = %e, "Failed to fetch users");
            e
        })?;

        Ok(docs
            .iter()
            .filter_map(|doc| match doc.decode::<UserProfile>() {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(component = "users", doc_id = %doc.id, error = %e, "Skipping malformed user profile");
                    None
                }
            })
            .collect())
    }

    /// A single profile, or `None`.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.store
            .get(USERS_COLLECTION, user_id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// Create a profile ahead of the user's first login.
    #[instrument(skip(self, actor), fields(subsystem = "auth", component = "users", op = "add_user"))]
    pub async fn add_user(&self, actor: &UserProfile, email: &str, role: Role) -> Result<UserProfile> {
        require_admin(actor, "add users")?;
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::Validation(format!("Invalid email address: {}", email)));
        }

        let id = self
            .store
            .add(USERS_COLLECTION, profile_fields(email, role))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to add user");
                e
            })?;

        info!(doc_id = %id, "User profile created");
        Ok(UserProfile {
            id,
            email: email.to_string(),
            role,
        })
    }

    /// Change a user's role.
    #[instrument(skip(self, actor), fields(subsystem = "auth", component = "users", op = "update_role"))]
    pub async fn update_role(&self, actor: &UserProfile, user_id: &str, role: Role) -> Result<()> {
        require_admin(actor, "change roles")?;

        let mut fields = Fields::new();
        fields.insert("role".to_string(), JsonValue::String(role.to_string()));
        self.store
            .update(USERS_COLLECTION, user_id, fields)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update role");
                e
            })?;

        info!("Role updated");
        Ok(())
    }
}
