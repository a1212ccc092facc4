use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

/// The one `note_type` value that can be held back for moderation.
pub const QUESTION_BANK: &str = "Question Bank";

// --- Identity & Users ---

/// Identity
///
/// The projection of a user that the resource workflow is allowed to see.
/// It is resolved once per request by the `AuthUser` extractor and passed by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Identity {
    pub id: i64,
    pub display_name: String,
}

/// User
///
/// A registered account from the `users` table. The password hash is kept in
/// `UserCredentials` and never leaves the credential layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            display_name: self.name.clone(),
        }
    }
}

/// Full `users` row, including the Argon2 PHC string. Internal only.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl UserCredentials {
    pub fn user(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Insert payload for a new account. `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

// --- Resources ---

/// ModerationStatus
///
/// `pending` resources are hidden from every listing. `approved` and `verified`
/// are both visible; nothing in this service moves a resource into `verified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ModerationStatus {
    Pending,
    #[default]
    Approved,
    Verified,
}

impl ModerationStatus {
    /// Statuses that ordinary listings may return.
    pub const VISIBLE: [ModerationStatus; 2] = [ModerationStatus::Approved, ModerationStatus::Verified];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Verified => "verified",
        }
    }

    pub fn is_visible(&self) -> bool {
        Self::VISIBLE.contains(self)
    }
}

#[derive(Debug, Error)]
#[error("unknown moderation status: {0}")]
pub struct UnknownStatus(pub String);

impl TryFrom<String> for ModerationStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(ModerationStatus::Pending),
            "approved" => Ok(ModerationStatus::Approved),
            "verified" => Ok(ModerationStatus::Verified),
            _ => Err(UnknownStatus(value)),
        }
    }
}

/// Resource
///
/// An uploaded academic artifact from the `resources` table. Rows are written
/// once by the submission workflow and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Resource {
    pub id: i64,
    pub title: String,
    pub subject_name: String,
    pub semester: String,
    pub branch: String,
    pub batch: String,
    pub note_type: String,
    // Blob Store handle, resolvable through GET /download/{filename}.
    pub filename: String,
    #[sqlx(try_from = "String")]
    pub status: ModerationStatus,
    // Display name snapshot taken at upload time.
    pub uploaded_by: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Everything the repository needs to insert a resource; `id` and
/// `created_at` are assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    pub title: String,
    pub subject_name: String,
    pub semester: String,
    pub branch: String,
    pub batch: String,
    pub note_type: String,
    pub filename: String,
    pub status: ModerationStatus,
    pub uploaded_by: String,
}

impl NewResource {
    pub fn into_resource(self, id: i64, created_at: DateTime<Utc>) -> Resource {
        Resource {
            id,
            title: self.title,
            subject_name: self.subject_name,
            semester: self.semester,
            branch: self.branch,
            batch: self.batch,
            note_type: self.note_type,
            filename: self.filename,
            status: self.status,
            uploaded_by: self.uploaded_by,
            created_at,
        }
    }
}

/// ResourceMeta
///
/// The descriptive half of an upload form. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ResourceMeta {
    pub title: String,
    pub subject_name: String,
    pub semester: String,
    pub branch: String,
    pub batch: String,
    pub note_type: String,
}

/// Raw upload body plus the name the client gave it.
#[derive(Debug, Clone, Default)]
pub struct FilePayload {
    pub original_filename: String,
    pub bytes: Vec<u8>,
}

// --- Retrieval ---

/// ResourceFilter
///
/// Optional exact-match tag filters accepted by GET /resources.
/// Empty strings are treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default, utoipa::IntoParams)]
#[ts(export)]
pub struct ResourceFilter {
    pub branch: Option<String>,
    pub semester: Option<String>,
    pub note_type: Option<String>,
}

/// ResourceQuery
///
/// The predicate handed to `Repository::scan_resources`: status membership
/// AND every present field constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    pub statuses: Vec<ModerationStatus>,
    pub branch: Option<String>,
    pub semester: Option<String>,
    pub note_type: Option<String>,
}

impl ResourceQuery {
    /// In-process evaluation of the predicate, used by the in-memory repository.
    pub fn matches(&self, resource: &Resource) -> bool {
        fn field_matches(constraint: &Option<String>, value: &str) -> bool {
            constraint.as_deref().is_none_or(|wanted| wanted == value)
        }

        self.statuses.contains(&resource.status)
            && field_matches(&self.branch, &resource.branch)
            && field_matches(&self.semester, &resource.semester)
            && field_matches(&self.note_type, &resource.note_type)
    }
}

// --- Request / Response Payloads ---

/// RegisterUserRequest
///
/// Input payload for POST /register. The password is hashed before it reaches storage.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// LoginRequest
///
/// Input payload for POST /login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// TokenResponse
///
/// Bearer token issued on successful login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime of the token in seconds.
    pub expires_in: i64,
    pub user: User,
}

/// UploadResponse
///
/// Result of POST /resources: the stored record plus a message suitable for
/// showing to the uploader.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UploadResponse {
    pub resource: Resource,
    pub message: String,
}
