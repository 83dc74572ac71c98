use flickr_cli::load_config::{load_config, read_config_file, save_config, FlickrConfig};
use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::{tempdir, NamedTempFile};

const FLICKR_ENV: [&str; 4] = [
    "FLICKR_CONSUMER_KEY",
    "FLICKR_CONSUMER_SECRET",
    "FLICKR_ACCESS_KEY",
    "FLICKR_ACCESS_SECRET",
];

fn clear_env() {
    for key in FLICKR_ENV {
        env::remove_var(key);
    }
}

fn config_file(yaml: &str) -> NamedTempFile {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), yaml).unwrap();
    config_file
}

/// A complete config file yields consumer credentials and an access token.
#[test]
#[serial]
fn test_load_config_success() {
    clear_env();
    let file = config_file(
        r#"
consumer_key: abc123
consumer_secret: def456
access_key: 72157-token
access_secret: tokensecret
"#,
    );

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.consumer().key, "abc123");
    assert_eq!(config.consumer().secret, "def456");
    let token = config.access_token().expect("token present");
    assert_eq!(token.token, "72157-token");
    assert_eq!(token.secret, "tokensecret");
}

/// Environment variables win over file values.
#[test]
#[serial]
fn test_load_config_env_overrides_file() {
    clear_env();
    let file = config_file("consumer_key: from-file\nconsumer_secret: file-secret\n");
    env::set_var("FLICKR_CONSUMER_KEY", "from-env");
    env::set_var("FLICKR_ACCESS_KEY", "env-token");
    env::set_var("FLICKR_ACCESS_SECRET", "env-token-secret");

    let config = load_config(file.path()).expect("Config should load");
    clear_env();

    assert_eq!(config.consumer_key, "from-env");
    assert_eq!(config.consumer_secret, "file-secret");
    assert_eq!(config.access_token().unwrap().token, "env-token");
}

/// Without an access token, loading works but asking for the token points to `auth`.
#[test]
#[serial]
fn test_load_config_without_token() {
    clear_env();
    let file = config_file("consumer_key: abc\nconsumer_secret: def\n");

    let config = load_config(file.path()).expect("Config should load");
    assert!(config.token().is_none());
    let msg = config.access_token().unwrap_err().to_string();
    assert!(msg.contains("auth"), "got: {msg}");
}

/// Missing consumer credentials are rejected.
#[test]
#[serial]
fn test_load_config_errors_on_missing_consumer_key() {
    clear_env();
    let file = config_file("consumer_secret: def\n");

    let msg = load_config(file.path()).unwrap_err().to_string();
    assert!(msg.contains("consumer_key"), "got: {msg}");
}

/// If the config file is not valid YAML, load_config errors and reports as such.
#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    clear_env();
    let file = config_file("not-yaml: [:::");

    let msg = load_config(file.path()).unwrap_err().to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

/// Saved configs read back unchanged and are owner-only.
#[test]
#[serial]
fn test_save_config_round_trip() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yml");
    let config = FlickrConfig {
        consumer_key: "abc".to_string(),
        consumer_secret: "def".to_string(),
        access_key: Some("tok".to_string()),
        access_secret: Some("sec".to_string()),
    };

    save_config(&path, &config).expect("save");
    assert_eq!(read_config_file(&path).unwrap(), config);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
