use anyhow::anyhow;
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::NaiveDateTime;
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Staff account. The password hash never leaves the process: it is
/// skipped on serialization, so JWT claims built from this struct carry
/// only the identity fields.
#[derive(
    Debug, Clone, sqlx::FromRow, Serialize, Deserialize, actix_jwt_auth_middleware::FromRequest,
)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_superuser: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl User {
    pub fn new(
        username: &str,
        email: &str,
        password: &str,
        is_superuser: bool,
    ) -> anyhow::Result<Self> {
        if !matches_pattern(&USERNAME_RE, username, "username")? {
            return Err(anyhow!(
                "Username must be at least 3 characters and contain only letters, numbers, or underscores."
            ));
        }
        if !matches_pattern(&EMAIL_RE, email, "email")? {
            return Err(anyhow!("Invalid email address."));
        }
        if !matches_pattern(&PASSWORD_RE, password, "password")? {
            return Err(anyhow!(
                "Password must be at least 8 characters long and include at least one lowercase letter, one uppercase letter, and one number."
            ));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {e}"))?
            .to_string();

        Ok(User {
            id: 0,
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            is_superuser,
            created_at: None,
            updated_at: None,
        })
    }

    pub fn verify_password(&self, password: &str) -> anyhow::Result<()> {
        let hash = PasswordHash::new(&self.password_hash)
            .map_err(|e| anyhow!("Stored password hash is unreadable: {e}"))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .map_err(|e| anyhow!("Password does not match: {e}"))
    }
}

static USERNAME_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,}$").ok());
static EMAIL_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").ok());
static PASSWORD_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(?=.*[a-z])(?=.*[A-Z])(?=.*\d).{8,}$").ok());

fn matches_pattern(re: &Lazy<Option<Regex>>, value: &str, what: &str) -> anyhow::Result<bool> {
    match &**re {
        Some(re) => re
            .is_match(value)
            .map_err(|e| anyhow!("Regex error for {what}: {e}")),
        None => Err(anyhow!(
            "The {what} pattern failed to compile. Rejecting all values."
        )),
    }
}
