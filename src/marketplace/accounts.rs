//! Registration, login and profile management

use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use rand::RngExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task;
use tracing::{info, instrument, warn};

use super::{new_id, require_text};
use crate::models::{BuyerProfile, Profile, Role, SupplierProfile, User};
use crate::store::{Collection, Store};
use crate::{OnTymError, Result};

const MIN_PASSWORD_LEN: usize = 8;

/// Role-tagged profile as it appears on the wire: `{"role": "buyer", ...fields}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ProfileBody {
    Buyer(BuyerProfile),
    Supplier(SupplierProfile),
}

impl From<ProfileBody> for Profile {
    fn from(body: ProfileBody) -> Self {
        match body {
            ProfileBody::Buyer(buyer) => Profile::Buyer(buyer),
            ProfileBody::Supplier(supplier) => Profile::Supplier(supplier),
        }
    }
}

impl From<Profile> for ProfileBody {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Buyer(buyer) => ProfileBody::Buyer(buyer),
            Profile::Supplier(supplier) => ProfileBody::Supplier(supplier),
        }
    }
}

/// A user as returned to clients; never carries the password hash
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileBody,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone_number: user.phone_number,
            profile: user.profile.into(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Registration input
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub profile: Profile,
}

/// Partial profile update. The role itself cannot change.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub profile: Option<Profile>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| OnTymError::store(format!("password salt: {e}")))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| OnTymError::store(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

#[derive(Clone)]
pub struct Accounts {
    users: Collection<User>,
    emails: Collection<String>,
    names: Collection<String>,
    /// Serialises uniqueness checks with the batch that claims the email and username
    registration: Arc<Mutex<()>>,
}

impl Accounts {
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            users: store.users.clone(),
            emails: store.user_emails.clone(),
            names: store.user_names.clone(),
            registration: Arc::new(Mutex::new(())),
        }
    }

    #[instrument(skip_all, fields(username = %account.username))]
    pub async fn register(&self, account: NewAccount) -> Result<User> {
        let username = account.username.trim().to_string();
        let email = normalize_email(&account.email);

        require_text("username", &username)?;
        if !email.contains('@') {
            return Err(OnTymError::validation("a valid email address is required"));
        }
        if account.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(OnTymError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        account.profile.validate()?;

        let password = account.password;
        let password_hash = task::spawn_blocking(move || hash_password(&password)).await??;

        let _guard = self.registration.lock().await;
        if self.emails.get(&email).await?.is_some() {
            return Err(OnTymError::conflict("User already exists"));
        }
        if self.names.get(&username).await?.is_some() {
            return Err(OnTymError::conflict("Username is already taken"));
        }

        let now = Utc::now();
        let user = User {
            id: new_id(),
            username,
            email,
            password_hash,
            phone_number: account.phone_number.filter(|p| !p.trim().is_empty()),
            profile: account.profile,
            created_at: now,
            updated_at: now,
        };

        let mut batch = self.users.batch();
        batch
            .put(&self.users, &user.id, &user)?
            .put(&self.emails, &user.email, &user.id)?
            .put(&self.names, &user.username, &user.id)?;
        batch.commit().await?;

        info!(user_id = %user.id, role = %user.role(), "Registered user");
        Ok(user)
    }

    /// Check credentials. Unknown email and wrong password are indistinguishable.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);

        let Some(user_id) = self.emails.get(&email).await? else {
            info!("Login for unknown email");
            return Err(OnTymError::Unauthorized);
        };
        let Some(user) = self.users.get(&user_id).await? else {
            warn!(%user_id, "Email index points at a missing user");
            return Err(OnTymError::Unauthorized);
        };

        let stored = user.password_hash.clone();
        let password = password.to_string();
        let matches = task::spawn_blocking(move || verify_password(&password, &stored)).await?;

        if matches {
            info!(user_id = %user.id, "User logged in");
            Ok(user)
        } else {
            info!(user_id = %user.id, "Password mismatch");
            Err(OnTymError::Unauthorized)
        }
    }

    pub async fn find(&self, user_id: &str) -> Result<Option<User>> {
        self.users.get(user_id).await
    }

    pub async fn get(&self, user_id: &str) -> Result<User> {
        self.find(user_id)
            .await?
            .ok_or_else(|| OnTymError::not_found("User"))
    }

    /// The user, if it exists and has `role`
    pub async fn require_role(&self, user_id: &str, role: Role) -> Result<User> {
        let user = self.get(user_id).await?;
        if user.role() != role {
            return Err(OnTymError::forbidden(format!("This action requires a {role} account")));
        }
        Ok(user)
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<User> {
        let _guard = self.registration.lock().await;
        let mut user = self.get(user_id).await?;

        if let Some(profile) = update.profile {
            if profile.role() != user.role() {
                return Err(OnTymError::validation(format!(
                    "role cannot change from {} to {}",
                    user.role(),
                    profile.role()
                )));
            }
            profile.validate()?;
            user.profile = profile;
        }

        if let Some(phone) = update.phone_number {
            let phone = phone.trim().to_string();
            user.phone_number = (!phone.is_empty()).then_some(phone);
        }

        let mut old_username = None;
        if let Some(username) = update.username {
            let username = username.trim().to_string();
            require_text("username", &username)?;
            if username != user.username {
                if self.names.get(&username).await?.is_some() {
                    return Err(OnTymError::conflict("Username is already taken"));
                }
                old_username = Some(std::mem::replace(&mut user.username, username));
            }
        }

        user.updated_at = Utc::now();
        let mut batch = self.users.batch();
        batch.put(&self.users, &user.id, &user)?;
        if let Some(old) = old_username {
            batch
                .put(&self.names, &user.username, &user.id)?
                .remove(&self.names, &old);
        }
        batch.commit().await?;

        info!(user_id = %user.id, "Updated profile");
        Ok(user)
    }
}
