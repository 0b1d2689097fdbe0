use modwire_core::config::ResolverConfig;

#[test]
fn test_resolver_config_defaults() {
    let config = ResolverConfig::default();
    assert_eq!(config.max_passes, 64);
}

#[test]
fn test_resolver_config_defaults_from_empty_toml() {
    let config = ResolverConfig::from_toml_str("").unwrap();
    assert_eq!(config, ResolverConfig::default());
}

#[test]
fn test_resolver_config_parse_from_toml() {
    let config = ResolverConfig::from_toml_str("max-passes = 8").unwrap();
    assert_eq!(config.max_passes, 8);
}

#[test]
fn test_resolver_config_rejects_zero_passes() {
    let err = ResolverConfig::from_toml_str("max-passes = 0").unwrap_err();
    assert!(err.to_string().contains("max-passes"), "got: {err}");
}

#[test]
fn test_resolver_config_rejects_negative_passes() {
    assert!(ResolverConfig::from_toml_str("max-passes = -1").is_err());
}

#[test]
fn test_resolver_config_load_missing_file_uses_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let config = ResolverConfig::load(&tmp.path().join("modwire.toml")).unwrap();
    assert_eq!(config, ResolverConfig::default());
}

#[test]
fn test_resolver_config_load_from_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("modwire.toml");
    std::fs::write(&path, "max-passes = 3\n").unwrap();
    let config = ResolverConfig::load(&path).unwrap();
    assert_eq!(config.max_passes, 3);
}

#[test]
fn test_resolver_config_load_reports_parse_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("modwire.toml");
    std::fs::write(&path, "max-passes = \"many\"\n").unwrap();
    let err = ResolverConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("Configuration error"), "got: {err}");
}

#[test]
fn test_resolver_config_roundtrip_serialize() {
    let config = ResolverConfig { max_passes: 5 };
    let s = toml::to_string(&config).unwrap();
    assert!(s.contains("max-passes = 5"), "got: {s}");
    let parsed = ResolverConfig::from_toml_str(&s).unwrap();
    assert_eq!(parsed, config);
}
