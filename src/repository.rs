use crate::models::{NewResource, NewUser, Resource, ResourceQuery, User, UserCredentials};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// RepositoryError
///
/// Durable-store failures. `Conflict` is the only variant a caller is expected
/// to act on (duplicate email on registration).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            _ => RepositoryError::Database(err),
        }
    }
}

/// Repository Trait
///
/// The persistence contract consumed by the submission workflow, the retrieval
/// filter and the credential layer. Handlers only ever see `Arc<dyn Repository>`,
/// so Postgres and the in-memory store are interchangeable.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Resources ---
    /// Atomically inserts one row and returns it with the assigned id.
    async fn insert_resource(&self, resource: NewResource) -> Result<Resource, RepositoryError>;
    /// Returns every row matching the query, ordered by ascending id.
    async fn scan_resources(&self, query: &ResourceQuery) -> Result<Vec<Resource>, RepositoryError>;

    // --- Users ---
    async fn get_user(&self, id: i64) -> Result<Option<User>, RepositoryError>;
    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError>;
    /// Fails with `RepositoryError::Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const RESOURCE_COLUMNS: &str = "id, title, subject_name, semester, branch, batch, note_type, \
     filename, status, uploaded_by, created_at";

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Ids come from `BIGSERIAL`, so concurrent
/// inserts are serialized by the database and never share an id.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn insert_resource(&self, resource: NewResource) -> Result<Resource, RepositoryError> {
        let sql = format!(
            "INSERT INTO resources \
                 (title, subject_name, semester, branch, batch, note_type, filename, status, uploaded_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {RESOURCE_COLUMNS}"
        );

        sqlx::query_as::<_, Resource>(&sql)
            .bind(&resource.title)
            .bind(&resource.subject_name)
            .bind(&resource.semester)
            .bind(&resource.branch)
            .bind(&resource.batch)
            .bind(&resource.note_type)
            .bind(&resource.filename)
            .bind(resource.status.as_str())
            .bind(&resource.uploaded_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("insert_resource error: {:?}", e);
                RepositoryError::from(e)
            })
    }

    /// scan_resources
    ///
    /// Builds the predicate with `QueryBuilder` so every user-supplied value is a
    /// bound parameter. The status membership clause is always present.
    async fn scan_resources(&self, query: &ResourceQuery) -> Result<Vec<Resource>, RepositoryError> {
        if query.statuses.is_empty() {
            return Ok(vec![]);
        }

        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE status IN ("));
        let mut statuses = builder.separated(", ");
        for status in &query.statuses {
            statuses.push_bind(status.as_str());
        }
        statuses.push_unseparated(")");

        if let Some(branch) = &query.branch {
            builder.push(" AND branch = ");
            builder.push_bind(branch.clone());
        }

        if let Some(semester) = &query.semester {
            builder.push(" AND semester = ");
            builder.push_bind(semester.clone());
        }

        if let Some(note_type) = &query.note_type {
            builder.push(" AND note_type = ");
            builder.push_bind(note_type.clone());
        }

        builder.push(" ORDER BY id ASC");

        builder
            .build_query_as::<Resource>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("scan_resources error: {:?}", e);
                RepositoryError::from(e)
            })
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        Ok(sqlx::query_as::<_, UserCredentials>(
            "SELECT id, name, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// create_user
    ///
    /// Relies on the `UNIQUE` constraint on `email`; a violation surfaces as
    /// `RepositoryError::Conflict` through the `From<sqlx::Error>` impl.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        Ok(sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, name, email",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?)
    }
}

#[derive(Default)]
struct MemoryTables {
    resources: Vec<Resource>,
    users: Vec<UserCredentials>,
    last_resource_id: i64,
    last_user_id: i64,
}

/// InMemoryRepository
///
/// `Repository` kept entirely in process memory. Used when no `DATABASE_URL` is
/// configured locally and throughout the test suite. A single write lock covers
/// id allocation and the push, so ids are unique and increasing.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<MemoryTables>,
    /// When true, resource operations return `RepositoryError::Unavailable`.
    pub should_fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Every stored resource regardless of status, in insertion order.
    pub async fn all_resources(&self) -> Vec<Resource> {
        self.tables.read().await.resources.clone()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::Unavailable(
                "in-memory repository configured to fail".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert_resource(&self, resource: NewResource) -> Result<Resource, RepositoryError> {
        self.check_available()?;

        let mut tables = self.tables.write().await;
        tables.last_resource_id += 1;
        let stored = resource.into_resource(tables.last_resource_id, Utc::now());
        tables.resources.push(stored.clone());
        Ok(stored)
    }

    async fn scan_resources(&self, query: &ResourceQuery) -> Result<Vec<Resource>, RepositoryError> {
        self.check_available()?;

        let tables = self.tables.read().await;
        Ok(tables
            .resources
            .iter()
            .filter(|resource| query.matches(resource))
            .cloned()
            .collect())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).map(UserCredentials::user))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }

        tables.last_user_id += 1;
        let stored = UserCredentials {
            id: tables.last_user_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
        };
        tables.users.push(stored.clone());
        Ok(stored.user())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModerationStatus;

    fn new_resource(branch: &str, status: ModerationStatus) -> NewResource {
        NewResource {
            title: "Calc Notes".to_string(),
            subject_name: "Calculus".to_string(),
            semester: "3".to_string(),
            branch: branch.to_string(),
            batch: "2024".to_string(),
            note_type: "Lecture Notes".to_string(),
            filename: "abc_calc.pdf".to_string(),
            status,
            uploaded_by: "Asha".to_string(),
        }
    }

    fn visible() -> ResourceQuery {
        ResourceQuery {
            statuses: ModerationStatus::VISIBLE.to_vec(),
            branch: None,
            semester: None,
            note_type: None,
        }
    }

    #[tokio::test]
    async fn test_in_memory_ids_are_fresh_and_increasing() {
        let repo = InMemoryRepository::new();
        let a = repo.insert_resource(new_resource("CS", ModerationStatus::Approved)).await.unwrap();
        let b = repo.insert_resource(new_resource("CS", ModerationStatus::Approved)).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_in_memory_concurrent_inserts_get_unique_ids() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.insert_resource(new_resource("CS", ModerationStatus::Approved))
                    .await
                    .unwrap()
                    .id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 32);
    }

    #[tokio::test]
    async fn test_in_memory_scan_applies_status_and_filters() {
        let repo = InMemoryRepository::new();
        repo.insert_resource(new_resource("CS", ModerationStatus::Approved)).await.unwrap();
        repo.insert_resource(new_resource("CS", ModerationStatus::Pending)).await.unwrap();
        repo.insert_resource(new_resource("ME", ModerationStatus::Verified)).await.unwrap();

        let all = repo.scan_resources(&visible()).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);

        let cs = repo
            .scan_resources(&ResourceQuery {
                branch: Some("CS".to_string()),
                ..visible()
            })
            .await
            .unwrap();
        assert_eq!(cs.len(), 1);
        assert_eq!(cs[0].id, 1);
    }

    #[tokio::test]
    async fn test_in_memory_duplicate_email_conflicts() {
        let repo = InMemoryRepository::new();
        let user = NewUser {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: "hash".to_string(),
        };
        repo.create_user(user.clone()).await.unwrap();
        let second = repo.create_user(user).await;
        assert!(matches!(second, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_in_memory_failing_rejects_resource_operations() {
        let repo = InMemoryRepository::new_failing();
        assert!(repo.scan_resources(&visible()).await.is_err());
        assert!(
            repo.insert_resource(new_resource("CS", ModerationStatus::Approved))
                .await
                .is_err()
        );
    }
}
