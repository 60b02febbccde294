// ABOUTME: Integration tests for config loading through the process environment
// ABOUTME: Config path discovery, env overrides, and backend selection

use banter::config::Config;
use banter::BackendRegistry;
use serial_test::serial;
use std::io::Write;

/// Helper to clear all config-related env vars
fn clear_config_env_vars() {
    for key in [
        "BANTER_CONFIG_PATH",
        "BANTER_BACKEND",
        "BANTER_ADMIN_USERS",
        "TELEGRAM_BOT_TOKEN",
        "TELEGRAM_CHAT_ID",
        "OLLAMA_HOST",
        "BANTER_METRICS_LISTEN",
    ] {
        std::env::remove_var(key);
    }
}

/// Helper to create a temp config file and point BANTER_CONFIG_PATH at it
fn setup_config(content: &str) -> tempfile::TempDir {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    std::env::set_var("BANTER_CONFIG_PATH", config_path.to_str().unwrap());
    temp_dir
}

#[test]
#[serial]
fn test_config_path_from_env() {
    clear_config_env_vars();
    let _dir = setup_config(
        r#"
[conversation]
stall_secs = 120
command_prefix = "!chat"
"#,
    );

    let config = Config::load(None).unwrap();
    assert_eq!(config.conversation.stall_secs, 120);
    assert_eq!(config.conversation.command_prefix, "!chat");

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_env_completes_telegram_section() {
    clear_config_env_vars();
    let _dir = setup_config("[telegram]\nbot_token = \"1:file\"\n");
    std::env::set_var("TELEGRAM_CHAT_ID", "-100777");

    let config = Config::load(None).unwrap();
    assert_eq!(config.telegram_config().unwrap(), ("1:file", -100777));

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_env_token_overrides_file() {
    clear_config_env_vars();
    let _dir = setup_config("[telegram]\nbot_token = \"1:file\"\nchat_id = 9\n");
    std::env::set_var("TELEGRAM_BOT_TOKEN", "2:env");

    let config = Config::load(None).unwrap();
    assert_eq!(config.telegram_config().unwrap().0, "2:env");

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_invalid_file_is_an_error() {
    clear_config_env_vars();
    let _dir = setup_config("[conversation]\nhistory_capacity = 0\n");

    let err = Config::load(None).unwrap_err();
    assert!(err.to_string().contains("history_capacity"));

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_explicit_path_wins_over_env() {
    clear_config_env_vars();
    let _env_dir = setup_config("[conversation]\nstall_secs = 1\n");
    let dir = tempfile::tempdir().unwrap();
    let explicit = dir.path().join("explicit.toml");
    std::fs::write(&explicit, "[conversation]\nstall_secs = 77\n").unwrap();

    let config = Config::load(Some(&explicit)).unwrap();
    assert_eq!(config.conversation.stall_secs, 77);

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_backend_selected_from_env() {
    clear_config_env_vars();
    let _dir = setup_config("");
    std::env::set_var("BANTER_BACKEND", "mock");

    let config = Config::load(None).unwrap();
    let backend = BackendRegistry::default()
        .create_from_config(&config.backend)
        .unwrap();
    assert_eq!(backend.name(), "mock");

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_unknown_backend_is_rejected() {
    clear_config_env_vars();
    let _dir = setup_config("[backend]\ntype = \"carrier-pigeon\"\n");

    let config = Config::load(None).unwrap();
    let err = BackendRegistry::default()
        .create_from_config(&config.backend)
        .err()
        .unwrap();
    assert!(err.to_string().contains("Unknown backend"));

    clear_config_env_vars();
}

#[test]
fn test_example_config_is_valid() {
    let config = Config::from_toml_str(include_str!("../config.example.toml")).unwrap();
    config.validate().unwrap();

    let agents = config.resolved_agents();
    assert_eq!(agents.len(), 2);
    assert_eq!(agents[1].id, "bot2");
    assert!((agents[1].temperature - 0.9).abs() < f32::EPSILON);
    assert_eq!(config.telegram_config().unwrap().1, -1001234567890);
}
