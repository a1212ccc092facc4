use crate::{
    AppState,
    auth::{AuthUser, issue_token},
    credentials,
    error::{AppResult, ValidationError},
    models::{
        FilePayload, Identity, LoginRequest, RegisterUserRequest, Resource, ResourceFilter,
        TokenResponse, UploadResponse, User,
    },
    retrieval,
    submission::{Submission, SubmissionWorkflow, confirmation_message},
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        multipart::{Field, Multipart},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use utoipa::ToSchema;

/// UploadForm
///
/// Documentation-only description of the multipart body accepted by POST /resources.
#[derive(ToSchema)]
pub struct UploadForm {
    pub title: String,
    /// Also accepted as `subjectName`.
    pub subject_name: String,
    pub semester: String,
    pub branch: String,
    pub batch: String,
    #[schema(example = "Question Bank")]
    pub note_type: String,
    /// Checkbox: present means the uploader asks for moderator review.
    pub ask_verification: Option<String>,
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

async fn text_field(field: Field<'_>) -> AppResult<String> {
    Ok(field.text().await?)
}

/// An HTML checkbox is submitted only when ticked; explicit negatives are honoured
/// for non-browser clients.
fn checkbox_ticked(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "off" | "no"
    )
}

/// read_submission
///
/// Collects the multipart form into a `Submission`. Unknown fields are ignored;
/// missing ones are left empty and rejected later by validation.
async fn read_submission(mut multipart: Multipart) -> AppResult<Submission> {
    let mut submission = Submission::default();
    let mut saw_file = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let original_filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                submission.file = FilePayload {
                    original_filename,
                    bytes: bytes.to_vec(),
                };
                saw_file = true;
            }
            "title" => submission.meta.title = text_field(field).await?,
            "subjectName" | "subject_name" => submission.meta.subject_name = text_field(field).await?,
            "semester" => submission.meta.semester = text_field(field).await?,
            "branch" => submission.meta.branch = text_field(field).await?,
            "batch" => submission.meta.batch = text_field(field).await?,
            "note_type" => submission.meta.note_type = text_field(field).await?,
            "ask_verification" => {
                submission.requested_verification = checkbox_ticked(&text_field(field).await?)
            }
            other => tracing::debug!(field = other, "ignoring unknown upload field"),
        }
    }

    if !saw_file {
        return Err(ValidationError::MissingFile.into());
    }

    Ok(submission)
}

// --- Handlers ---

/// register_user
///
/// [Public Route] Creates an account. Responds 409 when the email is taken.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Missing field"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = credentials::register(state.repo.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// login
///
/// [Public Route] Exchanges email and password for a bearer token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let user =
        credentials::authenticate(state.repo.as_ref(), &payload.email, &payload.password).await?;
    let access_token = issue_token(&state.config, &user)?;

    tracing::info!(user_id = user.id, "user logged in");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.jwt_ttl_secs,
        user,
    }))
}

/// get_me
///
/// [Authenticated Route] Returns the caller's identity as the resource workflow sees it.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Identity", body = Identity))
)]
pub async fn get_me(auth_user: AuthUser) -> Json<Identity> {
    Json(auth_user.identity())
}

/// upload_resource
///
/// [Authenticated Route] Stores the uploaded file and records the resource.
/// A question bank uploaded with `ask_verification` is stored `pending` and will
/// not appear in listings.
#[utoipa::path(
    post,
    path = "/resources",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Uploaded", body = UploadResponse),
        (status = 400, description = "Invalid form"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn upload_resource(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let submission = read_submission(multipart).await?;

    let workflow = SubmissionWorkflow::new(
        state.repo.clone(),
        state.storage.clone(),
        state.config.max_upload_bytes,
    );
    let resource = workflow.submit(submission, &auth_user.identity()).await?;

    let message = confirmation_message(resource.status).to_string();
    Ok((StatusCode::CREATED, Json(UploadResponse { resource, message })))
}

/// list_resources
///
/// [Authenticated Route] Lists approved and verified resources, narrowed by the
/// optional exact-match `branch`, `semester` and `note_type` filters.
#[utoipa::path(
    get,
    path = "/resources",
    params(ResourceFilter),
    responses((status = 200, description = "Visible resources", body = [Resource]))
)]
pub async fn list_resources(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ResourceFilter>,
) -> AppResult<Json<Vec<Resource>>> {
    let resources = retrieval::list_visible(&state.repo, &auth_user.identity(), &filter).await?;
    Ok(Json(resources))
}

/// download_resource
///
/// [Authenticated Route] Streams a stored file back by its handle.
#[utoipa::path(
    get,
    path = "/download/{filename}",
    params(("filename" = String, Path, description = "Handle returned at upload")),
    responses(
        (status = 200, description = "File bytes"),
        (status = 404, description = "No such file")
    )
)]
pub async fn download_resource(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<impl IntoResponse> {
    let bytes = state.storage.fetch(&filename).await?;
    let disposition = format!("attachment; filename=\"{filename}\"");

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
