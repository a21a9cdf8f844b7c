//! Integration tests for error types

#[cfg(test)]
mod tests {
    use vpkg_errors::*;

    #[test]
    fn test_error_conversion() {
        let net_err = NetworkError::Timeout {
            url: "https://example.com".into(),
        };
        let err: Error = net_err.into();
        assert!(matches!(err, Error::Network(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_conversion_message_is_surfaced_verbatim() {
        let err: Error = ConversionError::failed(1, "missing tool\n\n").into();
        assert_eq!(err.user_message(), "xdeb failed with 1:\nmissing tool");
        assert_eq!(err.user_code(), Some("conversion.failed"));
    }

    #[test]
    fn test_consistency_message_lists_shlibs() {
        let err: Error = ConsistencyError::BrokenShlibs {
            shlibs: vec![BrokenShlib {
                shlib: "libx.so.1".into(),
                provider: "libx-1.0_1".into(),
                users: vec!["a".into(), "b".into()],
            }],
        }
        .into();
        assert!(!err.is_retryable());
        assert_eq!(err.user_code(), Some("consistency.broken_shlibs"));
        assert_eq!(
            err.user_message(),
            "inconsistent shlibs: libx.so.1 (provided by: libx-1.0_1; used by: a, b)"
        );
    }

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let storage_err = StorageError::from_io_with_path(&io_err, std::path::Path::new("/x"));
        assert!(matches!(storage_err, StorageError::PathNotFound { .. }));
        let err = Error::io_with_path(&io_err, "/x");
        assert!(matches!(err, Error::Io { path: Some(_), .. }));
    }
}
