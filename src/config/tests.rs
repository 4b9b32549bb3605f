//! Configuration Tests
//!
//! Layering of defaults, TOML file and `POSTABLE_*` environment variables,
//! and normalisation of the broadcast URI list.

#[cfg(test)]
mod tests {
    use crate::config::BrokerConfig;
    use figment::Jail;
    use std::path::Path;

    #[test]
    fn test_defaults_without_any_source() {
        Jail::expect_with(|_jail| {
            let config: BrokerConfig = BrokerConfig::figment(None).extract()?;

            assert_eq!(config.port, 3000);
            assert_eq!(config.host, "0.0.0.0");
            assert_eq!(config.log_level, "info");
            assert!(config.broadcast_targets().is_empty());
            assert!(config.basic_auth().is_none());
            assert!(config.broadcast_timeout().is_none());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "postable.toml",
                r#"
                    port = 4000
                    broadcast = "http://from-file:3000"
                "#,
            )?;
            jail.set_env("POSTABLE_PORT", "5000");

            let config: BrokerConfig = BrokerConfig::figment(None).extract()?;

            assert_eq!(config.port, 5000);
            assert_eq!(config.broadcast_targets().len(), 1);
            assert_eq!(config.broadcast_targets()[0].base_uri, "http://from-file:3000");
            Ok(())
        });
    }

    #[test]
    fn test_explicit_config_path() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", r#"cluster_id = "east-1""#)?;

            let config: BrokerConfig = BrokerConfig::figment(Some(Path::new("custom.toml"))).extract()?;

            assert_eq!(config.resolve_cluster_id().0, "east-1");
            Ok(())
        });
    }

    #[test]
    fn test_broadcast_list_is_normalised() {
        Jail::expect_with(|jail| {
            jail.set_env(
                "POSTABLE_BROADCAST",
                "http://a:3000/; ;http://b:3000// ;;  http://c:3000",
            );

            let config: BrokerConfig = BrokerConfig::figment(None).extract()?;
            let uris: Vec<String> = config
                .broadcast_targets()
                .into_iter()
                .map(|t| t.base_uri)
                .collect();

            assert_eq!(uris, vec!["http://a:3000", "http://b:3000", "http://c:3000"]);
            Ok(())
        });
    }

    #[test]
    fn test_basic_auth_requires_both_values() {
        Jail::expect_with(|jail| {
            jail.set_env("POSTABLE_AUTH_USER", "admin");

            let config: BrokerConfig = BrokerConfig::figment(None).extract()?;
            assert!(config.basic_auth().is_none());

            jail.set_env("POSTABLE_AUTH_PASS", "secret");

            let config: BrokerConfig = BrokerConfig::figment(None).extract()?;
            let credentials = config.basic_auth().expect("auth should be enabled");
            assert_eq!(credentials.username, "admin");
            assert_eq!(credentials.password, "secret");
            Ok(())
        });
    }

    #[test]
    fn test_numeric_env_values_are_read_as_strings() {
        Jail::expect_with(|jail| {
            jail.set_env("POSTABLE_AUTH_USER", "1001");
            jail.set_env("POSTABLE_AUTH_PASS", "12345");
            jail.set_env("POSTABLE_CLUSTER_ID", "7");

            let config = BrokerConfig::load(None).map_err(|e| e.to_string())?;

            let credentials = config.basic_auth().expect("auth should be enabled");
            assert_eq!(credentials.username, "1001");
            assert_eq!(credentials.password, "12345");
            assert_eq!(config.resolve_cluster_id().0, "7");
            Ok(())
        });
    }

    #[test]
    fn test_bool_env_value_is_read_as_string() {
        Jail::expect_with(|jail| {
            jail.set_env("POSTABLE_CLUSTER_ID", "true");

            let config: BrokerConfig = BrokerConfig::figment(None).extract()?;

            assert_eq!(config.cluster_id.as_deref(), Some("true"));
            Ok(())
        });
    }

    #[test]
    fn test_cluster_id_falls_back_to_random() {
        let config = BrokerConfig {
            cluster_id: Some("   ".to_string()),
            ..BrokerConfig::default()
        };

        let first = config.resolve_cluster_id();
        let second = config.resolve_cluster_id();

        assert!(!first.0.is_empty());
        assert_ne!(first, second);
    }

    #[test]
    fn test_bind_addr_and_timeout() {
        let config = BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            broadcast_timeout_ms: Some(1500),
            ..BrokerConfig::default()
        };

        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(
            config.broadcast_timeout(),
            Some(std::time::Duration::from_millis(1500))
        );
    }
}
