/*!
Tests for error handling and error types.
*/

#[cfg(test)]
mod tests {
    use crate::error::AutoBackupError;
    use std::io;

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{\"info\":").unwrap_err()
    }

    #[test]
    fn test_error_display() {
        let error = AutoBackupError::validation("event name is empty");
        assert_eq!(error.to_string(), "Validation error: event name is empty");

        let error = AutoBackupError::invalid_snapshot("missing info block");
        assert_eq!(error.to_string(), "Invalid snapshot: missing info block");

        let error = AutoBackupError::storage("profile store closed");
        assert_eq!(error.to_string(), "Storage error: profile store closed");

        let error = AutoBackupError::InvalidSessionId("not-an-id".to_string());
        assert_eq!(error.to_string(), "Invalid session id: \"not-an-id\"");
    }

    #[test]
    fn test_io_error_carries_path() {
        let error = AutoBackupError::io(
            "/tmp/backups/a.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "Access denied"),
        );

        let message = error.to_string();
        assert!(message.contains("/tmp/backups/a.json"));
        assert!(message.contains("Access denied"));
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_is_not_found() {
        let error = AutoBackupError::io("missing.json", io::Error::from(io::ErrorKind::NotFound));
        assert!(error.is_not_found());
        assert!(!AutoBackupError::storage("x").is_not_found());
    }

    #[test]
    fn test_from_json_error() {
        let error = AutoBackupError::from(json_error());
        assert!(matches!(error, AutoBackupError::Json(_)));
    }

    #[test]
    fn test_error_chain() {
        use std::error::Error as _;

        let error = AutoBackupError::io(
            "staging",
            io::Error::new(io::ErrorKind::PermissionDenied, "Access denied"),
        );

        let source = error.source().expect("io error should expose its source");
        let io_err = source.downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<AutoBackupError>();
        assert_sync::<AutoBackupError>();
    }

    #[test]
    fn test_error_result_type() {
        fn returns_error() -> crate::Result<()> {
            Err(AutoBackupError::config("unreadable config"))
        }

        let result = returns_error();
        assert!(matches!(result, Err(AutoBackupError::Config(_))));
    }
}
