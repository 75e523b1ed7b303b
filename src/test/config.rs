#[cfg(test)]
mod tests {
    use serial_test::serial;

    use chrono::Duration;

    use crate::auth::AuthContext;
    use crate::config::AppConfig;
    use crate::error::AppError;

    const KEYS: [&str; 8] = [
        "DATABASE_URL",
        "SECRET_KEY",
        "SESSION_TTL_HOURS",
        "SESSION_COOKIE_SECURE",
        "CORS_ALLOWED_ORIGINS",
        "OTEL_EXPORTER_OTLP_ENDPOINT",
        "HONEYCOMB_API_KEY",
        "APP_ENV",
    ];

    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let mut all: Vec<(&str, Option<&str>)> = KEYS.iter().map(|k| (*k, None)).collect();
        for &(key, value) in vars {
            all.retain(|(k, _)| *k != key);
            all.push((key, Some(value)));
        }

        temp_env::with_vars(all, f);
    }

    #[test]
    #[serial]
    fn test_defaults() {
        with_env(&[], || {
            let config = AppConfig::from_env().expect("Defaults should load");

            assert_eq!(config.database_url, "sqlite://f1_database.db?mode=rwc");
            assert_eq!(config.secret_key, None);
            assert_eq!(config.session_ttl_hours, 24);
            assert!(!config.secure_cookies);
            assert_eq!(config.cors_allowed_origins, vec!["http://localhost:3000"]);
            assert_eq!(config.environment, "development");
            assert!(config.telemetry.is_none());
        });
    }

    #[test]
    #[serial]
    fn test_overrides() {
        with_env(
            &[
                ("DATABASE_URL", "sqlite://other.db"),
                ("SESSION_TTL_HOURS", "2"),
                ("SESSION_COOKIE_SECURE", "true"),
                ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
                ("OTEL_EXPORTER_OTLP_ENDPOINT", "https://api.honeycomb.io:443"),
                ("HONEYCOMB_API_KEY", "abc123"),
                ("APP_ENV", "production"),
            ],
            || {
                let config = AppConfig::from_env().unwrap();

                assert_eq!(config.database_url, "sqlite://other.db");
                assert_eq!(config.session_ttl_hours, 2);
                assert!(config.secure_cookies);
                assert_eq!(
                    config.cors_allowed_origins,
                    vec!["https://a.example", "https://b.example"]
                );
                assert_eq!(config.environment, "production");

                let telemetry = config.telemetry.clone().unwrap();
                assert_eq!(telemetry.otlp_endpoint, "https://api.honeycomb.io:443");
                assert_eq!(telemetry.honeycomb_api_key.as_deref(), Some("abc123"));

                let auth = AuthContext::from_config(&config);
                assert_eq!(auth.session_ttl.num_hours(), 2);
                assert!(auth.secure_cookies);
                assert_eq!(auth.cookie_name, "session_token");
            },
        );
    }

    #[test]
    #[serial]
    fn test_invalid_values_fail() {
        for (key, value) in [
            ("SESSION_TTL_HOURS", "soon"),
            ("SESSION_TTL_HOURS", "0"),
            ("SESSION_TTL_HOURS", "-3"),
            ("SESSION_TTL_HOURS", "8785"),
            ("SESSION_TTL_HOURS", "3000000000"),
            ("SESSION_TTL_HOURS", "9000000000000"),
            ("SESSION_COOKIE_SECURE", "maybe"),
        ] {
            with_env(&[(key, value)], || {
                assert!(
                    AppConfig::from_env().is_err(),
                    "{}={} should be rejected",
                    key,
                    value
                );
            });
        }
    }

    #[test]
    #[serial]
    fn test_blank_values_use_defaults() {
        with_env(&[("DATABASE_URL", "  "), ("SESSION_TTL_HOURS", "")], || {
            let config = AppConfig::from_env().unwrap();

            assert_eq!(config.database_url, "sqlite://f1_database.db?mode=rwc");
            assert_eq!(config.session_ttl_hours, 24);
        });
    }

    #[test]
    #[serial]
    fn test_longest_session_ttl_is_usable() {
        with_env(&[("SESSION_TTL_HOURS", "8784")], || {
            let config = AppConfig::from_env().unwrap();
            let auth = AuthContext::from_config(&config);

            assert_eq!(auth.session_ttl.num_hours(), 8784);
            assert!(auth.session_expiry().is_ok());
        });
    }

    #[test]
    fn test_out_of_range_ttl_does_not_panic() {
        let mut config = test_config_with_ttl(9_000_000_000_000);
        let auth = AuthContext::from_config(&config);
        assert_eq!(auth.session_ttl, Duration::MAX);
        assert!(matches!(auth.session_expiry(), Err(AppError::Internal(_))));

        config.session_ttl_hours = 3_000_000_000;
        let auth = AuthContext::from_config(&config);
        assert!(matches!(auth.session_expiry(), Err(AppError::Internal(_))));
    }

    fn test_config_with_ttl(hours: i64) -> AppConfig {
        AppConfig {
            session_ttl_hours: hours,
            ..crate::test::test_utils::test_config()
        }
    }
}
