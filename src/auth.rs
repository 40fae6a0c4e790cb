use crate::{
    error::{EcoShareError, Result},
    storage::{Database, User},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

/// Bearer credential supplied with every mutating call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Accepts an `Authorization` header value with or without the
    /// `Bearer` scheme, which matches case-insensitively.
    pub fn from_header(value: &str) -> Self {
        let value = value.trim();
        let token = match value.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token,
            _ => value,
        };
        Self(token.trim().to_string())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

/// A user whose credential has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider {
    fn authenticate(&self, credential: &Credential) -> Result<Identity>;
}

impl IdentityProvider for Database {
    fn authenticate(&self, credential: &Credential) -> Result<Identity> {
        if credential.token().is_empty() {
            return Err(EcoShareError::Auth("missing bearer token".to_string()));
        }

        match self.find_user_by_token(credential.token())? {
            Some(user) => Ok(user.into()),
            None => {
                debug!("Rejected unknown bearer token");
                Err(EcoShareError::Auth("invalid bearer token".to_string()))
            }
        }
    }
}

/// Creates a user and issues the token that identifies them.
pub fn register_user(db: &Database, name: &str) -> Result<(Identity, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EcoShareError::Validation("name is required".to_string()));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        created_at: Utc::now(),
    };
    let token = Uuid::new_v4().simple().to_string();

    db.insert_user(&user, &token)?;
    info!("Registered user {} ({})", user.name, user.id);

    Ok((user.into(), token))
}
