use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use crate::{
    models::{NewUser, RegisterUserRequest, User},
    repository::{Repository, RepositoryError},
};

/// CredentialError
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already exists")]
    EmailTaken,
    #[error("field `{0}` is required")]
    MissingField(&'static str),
    #[error("password hashing error: {0}")]
    Hashing(String),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CredentialError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => CredentialError::EmailTaken,
            other => CredentialError::Repository(other),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Hashes a password into an Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Returns false for a wrong password and for a hash that cannot be parsed.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// register
///
/// Creates an account. Email uniqueness is left to the repository, which
/// reports a duplicate as `RepositoryError::Conflict`.
pub async fn register(
    repo: &dyn Repository,
    request: RegisterUserRequest,
) -> Result<User, CredentialError> {
    let name = request.name.trim();
    let email = normalize_email(&request.email);

    if name.is_empty() {
        return Err(CredentialError::MissingField("name"));
    }
    if email.is_empty() {
        return Err(CredentialError::MissingField("email"));
    }
    if request.password.is_empty() {
        return Err(CredentialError::MissingField("password"));
    }

    let password_hash = hash_password(&request.password)?;
    let user = repo
        .create_user(NewUser {
            name: name.to_string(),
            email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, "registered new user");
    Ok(user)
}

/// authenticate
///
/// Resolves an email/password pair to a user. Unknown email and wrong password
/// are indistinguishable to the caller.
pub async fn authenticate(
    repo: &dyn Repository,
    email: &str,
    password: &str,
) -> Result<User, CredentialError> {
    let credentials = repo
        .find_credentials_by_email(&normalize_email(email))
        .await?
        .ok_or(CredentialError::InvalidCredentials)?;

    if !verify_password(password, &credentials.password_hash) {
        tracing::debug!(user_id = credentials.id, "password mismatch");
        return Err(CredentialError::InvalidCredentials);
    }

    Ok(credentials.user())
}
