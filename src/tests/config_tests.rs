#[cfg(test)]
mod tests {
    use crate::config::{self, AppConfig, StorageBackend, MAX_TOKEN_TTL_SECS};
    use crate::tests::{test_config, TEST_JWT_SECRET};
    use std::env;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // load() reads the process environment; tests touching it run one at a time.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_temp_config(content: &str) -> NamedTempFile {
        let temp_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        fs::write(temp_file.path(), content).unwrap();
        temp_file
    }

    #[test]
    fn test_valid_config_does_not_error() {
        let _guard = env_guard();
        env::set_var("BOOKLY__AUTH__JWT_SECRET", TEST_JWT_SECRET);
        let result = config::load();
        env::remove_var("BOOKLY__AUTH__JWT_SECRET");
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "sqlite://data/bookly.db");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert!(config.storage.fallback_to_memory);
        assert_eq!(config.auth.token_ttl_secs, 3 * 60 * 60);
        assert_eq!(config.purge.capacity, 10);
        assert_eq!(config.purge.interval().as_secs(), 30);
        assert_eq!(config.auth.min_password_len, 6);
        // No signing secret ships with the defaults.
        assert!(config.auth.jwt_secret.is_empty());
        let err = config::validate(&config).unwrap_err();
        assert!(err.to_string().contains("jwt_secret"));
    }

    #[test]
    fn test_missing_secret_fails_load() {
        let _guard = env_guard();
        env::remove_var("BOOKLY__AUTH__JWT_SECRET");
        let result = config::load();
        assert!(result.unwrap_err().to_string().contains("auth.jwt_secret is not set"));
    }

    #[test]
    fn test_invalid_server_port() {
        let _guard = env_guard();
        env::set_var("BOOKLY__SERVER__PORT", "0");
        let result = config::load();
        env::remove_var("BOOKLY__SERVER__PORT");

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("invalid server.port"));
    }

    #[test]
    fn test_config_from_env() {
        let _guard = env_guard();
        env::set_var("BOOKLY__SERVER__PORT", "3000");
        env::set_var("BOOKLY__STORAGE__BACKEND", "memory");
        env::set_var("BOOKLY__PURGE__CAPACITY", "25");
        env::set_var("BOOKLY__AUTH__JWT_SECRET", TEST_JWT_SECRET);

        let result = config::load();

        env::remove_var("BOOKLY__AUTH__JWT_SECRET");
        env::remove_var("BOOKLY__SERVER__PORT");
        env::remove_var("BOOKLY__STORAGE__BACKEND");
        env::remove_var("BOOKLY__PURGE__CAPACITY");

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.purge.capacity, 25);
        assert_eq!(config.auth.jwt_secret, TEST_JWT_SECRET);
    }

    #[test]
    fn test_config_from_file() {
        let _guard = env_guard();
        let file = write_temp_config(
            r#"
[purge]
capacity = 3
interval_secs = 5

[auth]
jwt_secret = "from-file-0123456789-0123456789-abcdef"
"#,
        );
        env::set_var("BOOKLY_CONFIG", file.path());
        let result = config::load();
        env::remove_var("BOOKLY_CONFIG");

        let config = result.unwrap();
        assert_eq!(config.purge.capacity, 3);
        assert_eq!(config.purge.interval_secs, 5);
        assert_eq!(config.auth.jwt_secret, "from-file-0123456789-0123456789-abcdef");
        // Untouched sections keep their defaults.
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(config::validate(&test_config()).is_ok());

        let mut cfg = test_config();
        cfg.purge.capacity = 0;
        assert!(config::validate(&cfg).unwrap_err().to_string().contains("purge.capacity"));

        let mut cfg = test_config();
        cfg.purge.interval_secs = 0;
        assert!(config::validate(&cfg).unwrap_err().to_string().contains("purge.interval_secs"));

        let mut cfg = test_config();
        cfg.database.query_timeout_secs = 0;
        assert!(config::validate(&cfg).is_err());

        let mut cfg = test_config();
        cfg.auth.token_ttl_secs = 0;
        assert!(config::validate(&cfg).unwrap_err().to_string().contains("token_ttl_secs"));

        let mut cfg = test_config();
        cfg.auth.min_password_len = 0;
        assert!(config::validate(&cfg).unwrap_err().to_string().contains("min_password_len"));
    }

    #[test]
    fn test_validate_rejects_blank_secret() {
        let mut cfg = test_config();
        cfg.auth.jwt_secret = String::new();
        let err = config::validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("jwt_secret is not set"));

        cfg.auth.jwt_secret = "   ".to_string();
        let err = config::validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("jwt_secret is not set"));
    }

    #[test]
    fn test_validate_rejects_placeholder_secret() {
        for placeholder in ["change-me-before-deploying", "CHANGE-ME", "secret"] {
            let mut cfg = test_config();
            cfg.auth.jwt_secret = placeholder.to_string();
            let err = config::validate(&cfg).unwrap_err();
            assert!(err.to_string().contains("placeholder"), "{}: {}", placeholder, err);
        }
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut cfg = test_config();
        cfg.auth.jwt_secret = "a".repeat(31);
        let err = config::validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("at least 32 characters"));

        cfg.auth.jwt_secret = "a".repeat(32);
        assert!(config::validate(&cfg).is_ok());
    }

    #[test]
    fn test_validate_bounds_token_lifetime() {
        let mut cfg = test_config();
        cfg.auth.token_ttl_secs = u64::MAX;
        assert!(config::validate(&cfg).unwrap_err().to_string().contains("token_ttl_secs"));

        cfg.auth.token_ttl_secs = MAX_TOKEN_TTL_SECS + 1;
        assert!(config::validate(&cfg).is_err());

        cfg.auth.token_ttl_secs = MAX_TOKEN_TTL_SECS;
        assert!(config::validate(&cfg).is_ok());
    }

    #[test]
    fn test_sqlite_parent_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let url = format!("sqlite://{}", nested.join("bookly.db").display());

        config::ensure_sqlite_parent_dir(&url).unwrap();
        assert!(nested.is_dir());

        // In-memory and non-sqlite URLs are left alone.
        config::ensure_sqlite_parent_dir("sqlite://:memory:").unwrap();
        config::ensure_sqlite_parent_dir("postgres://localhost/db").unwrap();
    }
}
