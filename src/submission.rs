use crate::{
    error::{SubmissionError, ValidationError},
    models::{FilePayload, Identity, ModerationStatus, NewResource, QUESTION_BANK, Resource, ResourceMeta},
    repository::RepositoryState,
    storage::StorageState,
};

/// initial_status
///
/// The moderation rule: a question bank whose uploader asked for review starts
/// `pending`; everything else is `approved` immediately.
pub fn initial_status(note_type: &str, requested_verification: bool) -> ModerationStatus {
    if note_type == QUESTION_BANK && requested_verification {
        ModerationStatus::Pending
    } else {
        ModerationStatus::Approved
    }
}

/// Message shown to the uploader once the resource is stored.
pub fn confirmation_message(status: ModerationStatus) -> &'static str {
    match status {
        ModerationStatus::Pending => "Uploaded successfully. Waiting for teacher approval.",
        _ => "Uploaded successfully.",
    }
}

/// Trims every field and rejects blanks, naming the first offending field.
pub fn validate_meta(meta: ResourceMeta) -> Result<ResourceMeta, ValidationError> {
    fn required(value: String, field: &'static str) -> Result<String, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField(field));
        }
        Ok(trimmed.to_string())
    }

    Ok(ResourceMeta {
        title: required(meta.title, "title")?,
        subject_name: required(meta.subject_name, "subjectName")?,
        semester: required(meta.semester, "semester")?,
        branch: required(meta.branch, "branch")?,
        batch: required(meta.batch, "batch")?,
        note_type: required(meta.note_type, "note_type")?,
    })
}

pub fn validate_payload(file: &FilePayload, max_upload_bytes: usize) -> Result<(), ValidationError> {
    if file.original_filename.trim().is_empty() {
        return Err(ValidationError::MissingFile);
    }
    if file.bytes.is_empty() {
        return Err(ValidationError::EmptyFile);
    }
    if file.bytes.len() > max_upload_bytes {
        return Err(ValidationError::PayloadTooLarge {
            size: file.bytes.len(),
            limit: max_upload_bytes,
        });
    }
    Ok(())
}

/// Submission
///
/// One upload request as seen by the workflow.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub meta: ResourceMeta,
    pub file: FilePayload,
    /// The uploader asked for a moderator to review this before it is listed.
    pub requested_verification: bool,
}

/// SubmissionWorkflow
///
/// Validates an upload, writes the blob, then inserts the record. The blob write
/// is awaited before the insert starts, so a stored resource never points at a
/// missing file. If the insert fails the blob is left behind and only logged.
#[derive(Clone)]
pub struct SubmissionWorkflow {
    repo: RepositoryState,
    storage: StorageState,
    max_upload_bytes: usize,
}

impl SubmissionWorkflow {
    pub fn new(repo: RepositoryState, storage: StorageState, max_upload_bytes: usize) -> Self {
        Self {
            repo,
            storage,
            max_upload_bytes,
        }
    }

    pub async fn submit(
        &self,
        submission: Submission,
        acting_user: &Identity,
    ) -> Result<Resource, SubmissionError> {
        let meta = validate_meta(submission.meta)?;
        validate_payload(&submission.file, self.max_upload_bytes)?;

        let status = initial_status(&meta.note_type, submission.requested_verification);

        let filename = self
            .storage
            .store(&submission.file.original_filename, submission.file.bytes)
            .await
            .map_err(|e| {
                tracing::error!(user_id = acting_user.id, "blob write failed: {:?}", e);
                SubmissionError::BlobStore(e)
            })?;

        let record = NewResource {
            title: meta.title,
            subject_name: meta.subject_name,
            semester: meta.semester,
            branch: meta.branch,
            batch: meta.batch,
            note_type: meta.note_type,
            filename: filename.clone(),
            status,
            uploaded_by: acting_user.display_name.clone(),
        };

        let resource = self.repo.insert_resource(record).await.map_err(|e| {
            tracing::warn!(%filename, "resource insert failed, blob left unreferenced");
            SubmissionError::Repository(e)
        })?;

        tracing::info!(
            resource_id = resource.id,
            status = resource.status.as_str(),
            user_id = acting_user.id,
            "resource submitted"
        );

        Ok(resource)
    }
}
