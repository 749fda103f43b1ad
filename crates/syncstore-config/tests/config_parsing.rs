use std::{env, fs};

use syncstore_config::{ConfigError, load_config, loader::load_config_with_default_path};

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    // Create a temporary TOML configuration file
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("syncstore.toml");

    let toml_content = r#"
[storage]
backend = "memory"
readonly = false
max_fetch_size = 500

[heartbeat]
read_rate = 0.25
resource_name = "probe"
parent_id = "probes"

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.storage.max_fetch_size, 500);
    assert_eq!(cfg.heartbeat.read_rate, 0.25);
    assert_eq!(cfg.heartbeat.resource_name, "probe");
    assert_eq!(cfg.logging.level.to_ascii_lowercase(), "debug");

    // 2) Env override should win over file
    unsafe {
        env::set_var("SYNCSTORE__STORAGE__MAX_FETCH_SIZE", "42");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.storage.max_fetch_size, 42);
    // cleanup env var
    unsafe {
        env::remove_var("SYNCSTORE__STORAGE__MAX_FETCH_SIZE");
    }

    // 3) Invalid config should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[storage]
max_fetch_size = 0
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(err.to_string().contains("max_fetch_size must be > 0"));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let cfg = load_config_with_default_path(Some(dir.path().join("absent.toml")))
        .expect("defaults are valid");
    assert_eq!(cfg.storage.backend, "memory");
    assert_eq!(cfg.heartbeat.parent_id, "__heartbeat__");
}
