use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use resource_portal::{
    AppState,
    auth::AuthUser,
    config::AppConfig,
    handlers,
    models::{
        LoginRequest, ModerationStatus, NewResource, QUESTION_BANK, RegisterUserRequest, Resource,
        ResourceFilter,
    },
    repository::{InMemoryRepository, Repository},
    storage::{MockStorageService, StorageService},
};
use std::sync::Arc;
use tokio::test;

// --- TEST UTILITIES ---

fn create_test_state(repo: Arc<InMemoryRepository>, storage: MockStorageService) -> AppState {
    AppState {
        repo,
        storage: Arc::new(storage),
        config: AppConfig::default(),
    }
}

fn student_user() -> AuthUser {
    AuthUser {
        id: 1,
        display_name: "Asha".to_string(),
    }
}

fn new_resource(branch: &str, semester: &str, note_type: &str, status: ModerationStatus) -> NewResource {
    NewResource {
        title: format!("{note_type} for {branch}"),
        subject_name: "Data Structures".to_string(),
        semester: semester.to_string(),
        branch: branch.to_string(),
        batch: "2024".to_string(),
        note_type: note_type.to_string(),
        filename: "abc_ds.pdf".to_string(),
        status,
        uploaded_by: "Asha".to_string(),
    }
}

async fn seeded_repo() -> Arc<InMemoryRepository> {
    let repo = Arc::new(InMemoryRepository::new());
    for resource in [
        new_resource("CS", "3", "Lecture Notes", ModerationStatus::Approved),
        new_resource("CS", "3", QUESTION_BANK, ModerationStatus::Pending),
        new_resource("ME", "3", QUESTION_BANK, ModerationStatus::Approved),
        new_resource("CS", "4", QUESTION_BANK, ModerationStatus::Verified),
    ] {
        repo.insert_resource(resource).await.unwrap();
    }
    repo
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- HANDLER TESTS ---

#[test]
async fn test_list_resources_hides_pending() {
    let state = create_test_state(seeded_repo().await, MockStorageService::new());

    let Json(resources) = handlers::list_resources(
        student_user(),
        State(state),
        Query(ResourceFilter::default()),
    )
    .await
    .unwrap();

    assert_eq!(resources.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3, 4]);
    assert!(resources.iter().all(|r| r.status != ModerationStatus::Pending));
}

#[test]
async fn test_list_resources_with_filters() {
    let state = create_test_state(seeded_repo().await, MockStorageService::new());

    let Json(resources) = handlers::list_resources(
        student_user(),
        State(state),
        Query(ResourceFilter {
            branch: Some("CS".to_string()),
            semester: None,
            note_type: Some(QUESTION_BANK.to_string()),
        }),
    )
    .await
    .unwrap();

    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].id, 4);
    assert_eq!(resources[0].status, ModerationStatus::Verified);
}

#[test]
async fn test_list_resources_repository_failure_is_500() {
    let state = create_test_state(
        Arc::new(InMemoryRepository::new_failing()),
        MockStorageService::new(),
    );

    let result = handlers::list_resources(
        student_user(),
        State(state),
        Query(ResourceFilter::default()),
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
async fn test_get_me_returns_identity() {
    let Json(identity) = handlers::get_me(student_user()).await;
    assert_eq!(identity.id, 1);
    assert_eq!(identity.display_name, "Asha");
}

#[test]
async fn test_register_then_login() {
    let repo = Arc::new(InMemoryRepository::new());
    let state = create_test_state(repo, MockStorageService::new());

    let (status, Json(user)) = handlers::register_user(
        State(state.clone()),
        Json(RegisterUserRequest {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password: "hunter22".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user.name, "Asha");

    let Json(token) = handlers::login(
        State(state),
        Json(LoginRequest {
            email: "asha@example.com".to_string(),
            password: "hunter22".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.user.id, user.id);
    assert!(!token.access_token.is_empty());
}

#[test]
async fn test_register_duplicate_email_conflict() {
    let state = create_test_state(Arc::new(InMemoryRepository::new()), MockStorageService::new());
    let request = RegisterUserRequest {
        name: "Asha".to_string(),
        email: "asha@example.com".to_string(),
        password: "hunter22".to_string(),
    };

    let (status, _) = handlers::register_user(State(state.clone()), Json(request.clone()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let err = handlers::register_user(State(state), Json(request))
        .await
        .unwrap_err();

    assert_eq!(err.status, StatusCode::CONFLICT);
    assert_eq!(err.message, "Email already exists");
}

#[test]
async fn test_login_wrong_password_unauthorized() {
    let state = create_test_state(Arc::new(InMemoryRepository::new()), MockStorageService::new());
    let (status, _) = handlers::register_user(
        State(state.clone()),
        Json(RegisterUserRequest {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password: "hunter22".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let err = handlers::login(
        State(state),
        Json(LoginRequest {
            email: "asha@example.com".to_string(),
            password: "hunter23".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status, StatusCode::UNAUTHORIZED);
}

#[test]
async fn test_download_returns_stored_bytes() {
    let storage = MockStorageService::new();
    let filename = storage
        .store("syllabus.pdf", b"syllabus".to_vec())
        .await
        .unwrap();
    let state = create_test_state(Arc::new(InMemoryRepository::new()), storage);

    let response = handlers::download_resource(student_user(), State(state), Path(filename.clone()))
        .await
        .unwrap()
        .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains(&filename));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"syllabus");
}

#[test]
async fn test_download_unknown_file_not_found() {
    let state = create_test_state(Arc::new(InMemoryRepository::new()), MockStorageService::new());

    let err = handlers::download_resource(student_user(), State(state), Path("missing.pdf".to_string()))
        .await
        .err()
        .unwrap();

    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[test]
async fn test_download_traversal_rejected() {
    let state = create_test_state(Arc::new(InMemoryRepository::new()), MockStorageService::new());

    let err = handlers::download_resource(student_user(), State(state), Path("..secret".to_string()))
        .await
        .err()
        .unwrap();

    assert_eq!(err.status, StatusCode::BAD_REQUEST);
}

#[test]
async fn test_error_body_shape() {
    let state = create_test_state(Arc::new(InMemoryRepository::new()), MockStorageService::new());

    let response = handlers::download_resource(student_user(), State(state), Path("missing.pdf".to_string()))
        .await
        .err()
        .unwrap()
        .into_response();

    let body: serde_json::Value = body_json(response).await;
    assert_eq!(body["error"]["status"], 404);
    assert!(body["error"]["message"].as_str().unwrap().contains("missing.pdf"));
}

#[test]
async fn test_listed_resources_serialize_lowercase_status() {
    let state = create_test_state(seeded_repo().await, MockStorageService::new());

    let response = handlers::list_resources(
        student_user(),
        State(state),
        Query(ResourceFilter::default()),
    )
    .await
    .unwrap()
    .into_response();

    let body: Vec<serde_json::Value> = body_json(response).await;
    assert_eq!(body[0]["status"], "approved");
    assert_eq!(body[2]["status"], "verified");

    let typed: Vec<Resource> = serde_json::from_value(serde_json::Value::Array(body)).unwrap();
    assert_eq!(typed.len(), 3);
}
