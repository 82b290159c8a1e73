//! Users repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::Role,
        user::{User, UserQuery},
    },
};

/// Column values for an insert, password already hashed
#[derive(Debug)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub last_name: Option<&'a str>,
    pub email: &'a str,
    pub course: Option<&'a str>,
    pub role: Role,
    pub password_hash: &'a str,
}

/// Column changes for an update, password already hashed
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub course: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by email (authentication)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email.trim())
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// List users with optional search
    pub async fn list(&self, query: &UserQuery) -> AppResult<Vec<User>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM users WHERE TRUE");

        if let Some(ref search) = query.search {
            let pattern = format!("%{}%", search.trim());
            builder
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(role) = query.role {
            builder.push(" AND role = ").push_bind(role);
        }
        builder.push(" ORDER BY name, last_name");

        let users = builder.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    /// Count users
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Create a user
    pub async fn create(&self, user: &NewUser<'_>) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, last_name, email, course, role, password)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.last_name)
        .bind(user.email.trim())
        .bind(user.course)
        .bind(user.role)
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_db(e, "Email already exists"))
    }

    /// Update a user
    pub async fn update(&self, id: Uuid, changes: &UserChanges) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                course = COALESCE($5, course),
                role = COALESCE($6, role),
                password = COALESCE($7, password),
                updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.last_name)
        .bind(changes.email.as_deref().map(str::trim))
        .bind(&changes.course)
        .bind(changes.role)
        .bind(&changes.password_hash)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_db(e, "Email already exists"))?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Delete a user
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_db(e, "User is still referenced"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    /// Check whether any loan references the user
    pub async fn has_loans(&self, id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE user_id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
