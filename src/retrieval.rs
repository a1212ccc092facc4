use crate::{
    models::{Identity, ModerationStatus, Resource, ResourceFilter, ResourceQuery},
    repository::{RepositoryError, RepositoryState},
};

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// visible_query
///
/// Turns user-facing filters into a repository predicate. The status clause is
/// fixed to the visible set; nothing a caller passes can widen it.
pub fn visible_query(filter: &ResourceFilter) -> ResourceQuery {
    ResourceQuery {
        statuses: ModerationStatus::VISIBLE.to_vec(),
        branch: present(&filter.branch),
        semester: present(&filter.semester),
        note_type: present(&filter.note_type),
    }
}

/// list_visible
///
/// Returns approved and verified resources matching every supplied filter, in
/// ascending id order. The viewer only has to exist; it never changes what is
/// visible.
pub async fn list_visible(
    repo: &RepositoryState,
    viewer: &Identity,
    filter: &ResourceFilter,
) -> Result<Vec<Resource>, RepositoryError> {
    let query = visible_query(filter);
    let resources = repo.scan_resources(&query).await?;

    tracing::debug!(
        viewer_id = viewer.id,
        count = resources.len(),
        ?filter,
        "listed resources"
    );

    Ok(resources)
}
