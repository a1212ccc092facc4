use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};

/// Slack on top of the file limit for the multipart framing and text fields.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Authenticated Router Module
///
/// Every handler here receives a validated `AuthUser`. The identity is used for
/// attribution on upload; it never changes which resources a listing returns.
pub fn authenticated_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's identity (id and display name).
        .route("/me", get(handlers::get_me))
        // GET /resources?branch=&semester=&note_type=
        // Lists approved/verified resources; `pending` uploads are never returned.
        //
        // POST /resources (multipart/form-data)
        // Uploads a file with its tags. A "Question Bank" with `ask_verification`
        // is held as `pending`.
        .route(
            "/resources",
            get(handlers::list_resources)
                .post(handlers::upload_resource)
                .layer(DefaultBodyLimit::max(max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES))),
        )
        // GET /download/{filename}
        // Returns the stored bytes for a filename handle.
        .route("/download/{filename}", get(handlers::download_resource))
}
