use anyhow::Context;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{insert, new_id, ChangeKind, DataStore};
use crate::auth::password::{check_policy, hash_password, verify_password};
use crate::auth::services::is_valid_email;
use crate::error::AuthError;
use crate::model::{Role, User, UserStatus};
use crate::remote::{Collection, Record};

const DEFAULT_NAME: &str = "New User";

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Login {
    pub user: User,
    /// Remote session opened for this login, if the store is remote-backed.
    pub session: Option<Uuid>,
}

fn avatar_for(name: &str) -> String {
    let encoded: String = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("+");
    format!("https://ui-avatars.com/api/?name={encoded}&background=random")
}

/// Only ACTIVE accounts may log in.
fn check_status(user: &User) -> Result<(), AuthError> {
    match user.status {
        UserStatus::Active => Ok(()),
        UserStatus::Pending => Err(AuthError::PendingApproval),
        UserStatus::Rejected => Err(AuthError::Deactivated),
    }
}

impl DataStore {
    pub async fn login_with_password(&self, email: &str, password: &str) -> Result<Login, AuthError> {
        let email = email.trim().to_lowercase();
        match &self.remote {
            Some(_) => self.login_remote(&email, password).await,
            None => self.login_local(&email, password),
        }
    }

    fn login_local(&self, email: &str, password: &str) -> Result<Login, AuthError> {
        let user = self.user_by_email(email).ok_or(AuthError::UserNotFound)?;

        // bundled sample users carry no credentials and accept any password
        if let Some(hash) = self.credentials.read().get(&user.id) {
            let ok = verify_password(password, hash).unwrap_or_else(|e| {
                warn!(user_id = %user.id, error = %e, "stored hash unreadable");
                false
            });
            if !ok {
                warn!(user_id = %user.id, "login invalid password");
                return Err(AuthError::InvalidCredentials);
            }
        }

        check_status(&user)?;
        info!(user_id = %user.id, "user logged in");
        Ok(Login { user, session: None })
    }

    async fn login_remote(&self, email: &str, password: &str) -> Result<Login, AuthError> {
        let Some(remote) = &self.remote else {
            return self.login_local(email, password);
        };

        let session = remote
            .sign_in(email, password)
            .await
            .map_err(AuthError::Remote)?
            .ok_or(AuthError::InvalidCredentials)?;

        if let Err(e) = self.reload().await {
            warn!(error = %e, "reload after login failed; using cached data");
        }

        let Some(user) = self.user(&session.user_id) else {
            warn!(user_id = %session.user_id, "authenticated account has no profile");
            self.sign_out(Some(session.id)).await;
            return Err(AuthError::ProfileNotFound);
        };

        if let Err(e) = check_status(&user) {
            info!(user_id = %user.id, status = user.status.as_str(), "login refused by status");
            self.sign_out(Some(session.id)).await;
            return Err(e);
        }

        info!(user_id = %user.id, session_id = %session.id, "user logged in");
        Ok(Login {
            user,
            session: Some(session.id),
        })
    }

    /// Registers a PENDING employee. Does not log in.
    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        check_policy(password)?;
        if self.user_by_email(&email).is_some() {
            warn!(email = %email, "email already registered");
            return Err(AuthError::EmailTaken);
        }

        let name = match name.trim() {
            "" => DEFAULT_NAME.to_string(),
            n => n.to_string(),
        };

        let (id, hash) = match &self.remote {
            Some(remote) => {
                let id = remote
                    .sign_up(&email, password)
                    .await
                    .map_err(AuthError::Remote)?;
                (id, None)
            }
            None => {
                let hash = hash_password(password).map_err(AuthError::Remote)?;
                (new_id(), Some(hash))
            }
        };

        let user = User {
            id,
            avatar_url: Some(avatar_for(&name)),
            name,
            email,
            role: Role::Employee,
            status: UserStatus::Pending,
            department_id: None,
            org_level: None,
            job_profile_id: None,
            manager_id: None,
        };

        // the profile row is written synchronously so the caller learns about failure
        if let Some(remote) = &self.remote {
            remote
                .upsert(&Record::User(user.clone()))
                .await
                .context("account created but profile insert failed")
                .map_err(AuthError::Remote)?;
        }

        insert(&mut self.write_data().users, user.clone(), "user")?;
        if let Some(hash) = hash {
            self.credentials.write().insert(user.id.clone(), hash);
        }
        self.changed(Collection::Users, &user.id, ChangeKind::Added);
        self.log_activity("Self-Registration", &user.name);
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Terminates the remote session, if any. Failures are only logged.
    pub async fn sign_out(&self, session: Option<Uuid>) {
        let (Some(remote), Some(session_id)) = (&self.remote, session) else {
            return;
        };
        match remote.sign_out(session_id).await {
            Ok(()) => debug!(%session_id, "remote session closed"),
            Err(e) => warn!(%session_id, error = %e, "remote sign-out failed"),
        }
    }
}
