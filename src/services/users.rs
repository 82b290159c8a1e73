//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        enums::Role,
        user::{CreateUser, UpdateProfile, UpdateUser, User, UserClaims, UserQuery},
    },
    repository::{
        users::{NewUser, UserChanges},
        Repository,
    },
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate user by email and return a JWT token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&user.password, password)? {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Create the configured administrator when no user exists yet
    pub async fn ensure_admin(&self) -> AppResult<()> {
        let (Some(email), Some(password)) = (&self.config.admin_email, &self.config.admin_password) else {
            return Ok(());
        };
        if self.repository.users.count().await? > 0 {
            return Ok(());
        }

        let hash = hash_password(password)?;
        let admin = self
            .repository
            .users
            .create(&NewUser {
                name: "Administrador",
                last_name: None,
                email,
                course: None,
                role: Role::Admin,
                password_hash: &hash,
            })
            .await?;
        tracing::info!(user_id = %admin.id, email = %admin.email, "Bootstrap administrator created");
        Ok(())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// List users
    pub async fn list(&self, query: &UserQuery) -> AppResult<Vec<User>> {
        self.repository.users.list(query).await
    }

    /// Create a new user
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        if self.repository.users.email_exists(&user.email, None).await? {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let hash = hash_password(&user.password)?;
        self.repository
            .users
            .create(&NewUser {
                name: user.name.trim(),
                last_name: user.last_name.as_deref(),
                email: &user.email,
                course: user.course.as_deref(),
                role: user.role.unwrap_or(Role::Profesor),
                password_hash: &hash,
            })
            .await
    }

    /// Update an existing user
    pub async fn update_user(
        &self,
        id: Uuid,
        acting_user: Uuid,
        user: UpdateUser,
    ) -> AppResult<User> {
        check_own_role_change(id, acting_user, user.role)?;
        if let Some(ref email) = user.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
        }

        let password_hash = user.password.as_deref().map(hash_password).transpose()?;

        self.repository
            .users
            .update(
                id,
                &UserChanges {
                    name: user.name,
                    last_name: user.last_name,
                    email: user.email,
                    course: user.course,
                    role: user.role,
                    password_hash,
                },
            )
            .await
    }

    /// Delete a user without loan history
    pub async fn delete_user(&self, id: Uuid, acting_user: Uuid) -> AppResult<()> {
        if id == acting_user {
            return Err(AppError::BadRequest("Cannot delete your own account".to_string()));
        }
        if self.repository.users.has_loans(id).await? {
            return Err(AppError::Conflict(
                "User has loan history and cannot be deleted".to_string(),
            ));
        }
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Update user's own profile
    pub async fn update_profile(&self, user_id: Uuid, profile: UpdateProfile) -> AppResult<User> {
        let user = self.repository.users.get_by_id(user_id).await?;

        if let Some(ref email) = profile.email {
            if self.repository.users.email_exists(email, Some(user_id)).await? {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
        }

        // If changing password, verify current password
        let password_hash = match profile.new_password {
            Some(ref new_password) => {
                let current_password = profile.current_password.as_ref().ok_or_else(|| {
                    AppError::Validation("Current password required to change password".to_string())
                })?;
                if !verify_password(&user.password, current_password)? {
                    return Err(AppError::Authentication(
                        "Current password is incorrect".to_string(),
                    ));
                }
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        self.repository
            .users
            .update(
                user_id,
                &UserChanges {
                    name: profile.name,
                    last_name: profile.last_name,
                    email: profile.email,
                    course: profile.course,
                    role: None,
                    password_hash,
                },
            )
            .await
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Administrators cannot demote their own account
fn check_own_role_change(id: Uuid, acting_user: Uuid, role: Option<Role>) -> AppResult<()> {
    match role {
        Some(role) if id == acting_user && role != Role::Admin => Err(AppError::BadRequest(
            "Cannot change your own role".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("profesor123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "profesor123").unwrap());
        assert!(!verify_password(&hash, "admin123").unwrap());
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(verify_password("not-a-hash", "x").is_err());
    }

    #[test]
    fn test_admin_cannot_demote_self() {
        let admin = Uuid::new_v4();
        let other = Uuid::new_v4();

        let err = check_own_role_change(admin, admin, Some(Role::Profesor)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(check_own_role_change(admin, admin, Some(Role::Admin)).is_ok());
        assert!(check_own_role_change(admin, admin, None).is_ok());
        assert!(check_own_role_change(other, admin, Some(Role::Profesor)).is_ok());
    }
}
