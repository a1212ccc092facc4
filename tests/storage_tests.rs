use resource_portal::storage::{
    MockStorageService, S3StorageClient, StorageError, StorageService, generate_filename,
    sanitize_filename,
};

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_store_then_fetch() {
        let mock = MockStorageService::new();
        let filename = mock
            .store("lab manual.pdf", b"manual".to_vec())
            .await
            .unwrap();

        assert!(filename.ends_with("_lab_manual.pdf"));
        assert_eq!(mock.fetch(&filename).await.unwrap(), b"manual".to_vec());
    }

    #[tokio::test]
    async fn test_mock_interior_dots_still_resolve() {
        let mock = MockStorageService::new();
        for original in ["Unit 1..3 notes.pdf", "v1..2.pdf", "Ch 1...3.pdf"] {
            let filename = mock.store(original, b"body".to_vec()).await.unwrap();
            assert_eq!(mock.fetch(&filename).await.unwrap(), b"body".to_vec());
        }
    }

    #[tokio::test]
    async fn test_mock_same_name_does_not_overwrite() {
        let mock = MockStorageService::new();
        let first = mock.store("notes.pdf", b"one".to_vec()).await.unwrap();
        let second = mock.store("notes.pdf", b"two".to_vec()).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(mock.len().await, 2);
        assert_eq!(mock.fetch(&first).await.unwrap(), b"one".to_vec());
    }

    #[tokio::test]
    async fn test_mock_clones_share_blobs() {
        let mock = MockStorageService::new();
        let clone = mock.clone();
        let filename = mock.store("a.pdf", b"a".to_vec()).await.unwrap();

        assert!(clone.contains(&filename).await);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        let result = mock.store("test.pdf", b"x".to_vec()).await;
        assert!(matches!(result, Err(StorageError::Backend(_))));
        assert!(mock.is_empty().await);
    }

    #[tokio::test]
    async fn test_mock_sanitization() {
        let mock = MockStorageService::new();
        let filename = mock
            .store("../../etc/passwd", b"root".to_vec())
            .await
            .unwrap();

        assert!(!filename.contains(".."));
        assert!(!filename.contains('/'));
        assert!(filename.ends_with("_passwd"));
    }

    #[tokio::test]
    async fn test_mock_fetch_rejects_traversal() {
        let mock = MockStorageService::new();
        let result = mock.fetch("../uploads/other.pdf").await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_mock_fetch_unknown() {
        let mock = MockStorageService::new();
        let result = mock.fetch("nothing.pdf").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}

#[cfg(test)]
mod naming_tests {
    use super::*;

    #[test]
    fn test_sanitized_names_keep_extension() {
        assert_eq!(sanitize_filename("Sem 5 - OS.pdf"), "Sem_5_-_OS.pdf");
        assert_eq!(sanitize_filename("   "), "");
    }

    #[test]
    fn test_generated_names_are_single_segments() {
        for original in [
            "a/b/c.pdf",
            "..",
            "x\\y.docx",
            "plain.txt",
            "Unit 1..3 notes.pdf",
            "v1..2.pdf",
            "Ch 1...3.pdf",
        ] {
            let name = generate_filename(original);
            assert!(!name.contains('/'));
            assert!(!name.contains('\\'));
            assert!(!name.contains(".."));
        }
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn test_s3_client_creation() {
        let _client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
        )
        .await;
        // Just testing that construction doesn't panic
    }

    #[tokio::test]
    async fn test_s3_fetch_rejects_traversal_before_network() {
        let client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
        )
        .await;

        let result = client.fetch("../secrets").await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));
    }
}
